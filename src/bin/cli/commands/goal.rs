use anyhow::{Context, Result};
use chrono::Local;

use vademecum_lib::study::{GoalPeriod, StudyGoal};

use crate::app::App;
use crate::render::{self, Color};
use crate::{OutputFormat, PeriodArg};

impl From<PeriodArg> for GoalPeriod {
    fn from(period: PeriodArg) -> Self {
        match period {
            PeriodArg::Daily => GoalPeriod::Daily,
            PeriodArg::Weekly => GoalPeriod::Weekly,
            PeriodArg::Monthly => GoalPeriod::Monthly,
        }
    }
}

fn goal_json(goal: &StudyGoal) -> serde_json::Value {
    serde_json::json!({
        "id": goal.id.to_string(),
        "title": goal.title,
        "period": goal.period,
        "target": goal.target,
        "progress": goal.progress,
        "windowStart": goal.window_start.to_string(),
        "windowEnd": goal.window_end.to_string(),
        "completed": goal.is_completed(),
    })
}

pub fn run_add(
    app: &mut App,
    title: &str,
    period: PeriodArg,
    target: Option<u32>,
    format: &OutputFormat,
) -> Result<()> {
    let target = target.unwrap_or(app.config.study.daily_goal);
    let goal = app
        .study
        .add_goal(title, period.into(), target, Local::now().date_naive())
        .context("Failed to create goal")?;
    app.save_study()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&goal_json(&goal))?),
        OutputFormat::Plain => {
            println!("Created goal \"{}\": {} reviews ({:?})", goal.title, goal.target, goal.period);
            println!("  ID: {}", goal.id);
        }
    }

    Ok(())
}

pub fn run_list(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let goals = app.study.goals();

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = goals.iter().map(goal_json).collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if goals.is_empty() {
                println!("No goals.");
                return Ok(());
            }

            for goal in goals {
                let id = goal.id.to_string();
                let status = if goal.is_completed() {
                    render::paint("done", Color::GREEN, use_color)
                } else {
                    format!("{}/{}", goal.progress, goal.target)
                };
                println!("{} {} {} {}",
                    render::paint(&id[..8], Color::DIM, use_color),
                    render::progress_bar(goal.completion(), 20),
                    status,
                    goal.title);
                println!("         {:?}, {} to {}", goal.period, goal.window_start, goal.window_end);
            }
        }
    }

    Ok(())
}

pub fn run_progress(app: &mut App, goal_id: &str, amount: u32, format: &OutputFormat) -> Result<()> {
    let goal = app.find_goal(goal_id)?;
    let goal = app
        .study
        .record_goal_progress(goal.id, amount, Local::now().date_naive())
        .context("Failed to record progress")?;
    app.save_study()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&goal_json(&goal))?),
        OutputFormat::Plain => {
            println!("\"{}\": {}/{}", goal.title, goal.progress, goal.target);
            if goal.is_completed() {
                println!("Goal completed.");
            }
        }
    }

    Ok(())
}

pub fn run_delete(app: &mut App, goal_id: &str, format: &OutputFormat) -> Result<()> {
    let goal = app.find_goal(goal_id)?;
    app.study.remove_goal(goal.id).context("Failed to delete goal")?;
    app.save_study()?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "deleted": goal.id.to_string() });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => println!("Deleted goal \"{}\"", goal.title),
    }

    Ok(())
}
