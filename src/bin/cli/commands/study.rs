use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use chrono::Utc;

use vademecum_lib::article::ArticleRef;
use vademecum_lib::study::algorithm::format_interval;
use vademecum_lib::study::{StudyCard, StudySession};

use crate::app::App;
use crate::render::{self, Color};
use crate::OutputFormat;

fn card_json(card: &StudyCard) -> serde_json::Value {
    serde_json::json!({
        "id": card.id.to_string(),
        "codeId": card.code_id,
        "articleId": card.article_id,
        "articleNumber": card.article_number,
        "difficulty": card.difficulty.to_string(),
        "nextReview": card.next_review.to_rfc3339(),
        "timesReviewed": card.times_reviewed,
        "accuracy": card.accuracy(),
    })
}

fn days_until(card: &StudyCard) -> i64 {
    (card.next_review - Utc::now()).num_days()
}

pub fn run_add(app: &mut App, article: &ArticleRef, content: &str, format: &OutputFormat) -> Result<()> {
    let existing = app.study.find_card(article).is_some();
    let card = app.study.add_card(article, content).context("Failed to add card")?;
    app.save_study()?;

    match format {
        OutputFormat::Json => {
            let mut output = card_json(&card);
            output["created"] = serde_json::json!(!existing);
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if existing {
                println!("Already studying {} Art. {}", card.code_id, card.article_number);
            } else {
                println!("Added {} Art. {} to study", card.code_id, card.article_number);
            }
            println!("  ID: {}", card.id);
        }
    }

    Ok(())
}

pub fn run_add_favorites(app: &mut App, format: &OutputFormat) -> Result<()> {
    let favorites = app.favorites.list().context("Failed to load favorites")?;
    let added = app.study.add_cards_from(
        favorites.iter().map(|f| (&f.article, f.content.as_str())),
        Utc::now(),
    );
    app.save_study()?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "favorites": favorites.len(),
                "added": added,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Added {} of {} favorites to study", added, favorites.len());
        }
    }

    Ok(())
}

pub fn run_due(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let due = app.study.cards_for_review();

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = due.iter().map(|c| card_json(c)).collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if due.is_empty() {
                println!("No cards due for review.");
                return Ok(());
            }

            println!("{:<8} {:<8} {:<10} {:<6} {}", "ID", "Code", "Article", "Level", "Text");
            println!("{} {} {} {} {}",
                "\u{2500}".repeat(8),
                "\u{2500}".repeat(8),
                "\u{2500}".repeat(10),
                "\u{2500}".repeat(6),
                "\u{2500}".repeat(40));

            for card in &due {
                let id = card.id.to_string();
                println!("{:<8} {:<8} {:<10} {} {}",
                    &id[..8],
                    render::truncate(&card.code_id, 8),
                    render::truncate(&card.article_number, 10),
                    render::difficulty(card.difficulty, use_color),
                    render::truncate(&card.content, 40));
            }

            println!("\n{} cards due", due.len());
        }
    }

    Ok(())
}

pub fn run_review(
    app: &mut App,
    card_id: &str,
    correct: bool,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let card = app.find_card(card_id)?;
    let updated = app
        .study
        .review_card(card.id, correct)
        .context(format!("Card {} disappeared", card.id))?;
    app.save_study()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&card_json(&updated))?),
        OutputFormat::Plain => print_review_result(&updated, correct, use_color),
    }

    Ok(())
}

fn print_review_result(card: &StudyCard, correct: bool, use_color: bool) {
    let verdict = if correct {
        render::paint("correct", Color::GREEN, use_color)
    } else {
        render::paint("wrong", Color::RED, use_color)
    };
    println!("  {} -> {} (next review in {})",
        verdict,
        render::difficulty(card.difficulty, use_color).trim_end(),
        format_interval(days_until(card)));
}

enum Answer {
    Correct,
    Wrong,
    Quit,
}

fn ask(input: &mut impl BufRead) -> Result<Answer> {
    loop {
        print!("Did you remember it? [y/n/q] ");
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(Answer::Quit);
        }
        match line.trim().to_lowercase().as_str() {
            "y" | "s" | "yes" | "sim" => return Ok(Answer::Correct),
            "n" | "no" | "nao" | "não" => return Ok(Answer::Wrong),
            "q" | "quit" => return Ok(Answer::Quit),
            _ => continue,
        }
    }
}

/// Interactive study session over the due cards
pub fn run_session(app: &mut App, limit: Option<usize>, format: &OutputFormat, use_color: bool) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    session_with_input(app, limit, format, use_color, &mut input)
}

fn session_with_input(
    app: &mut App,
    limit: Option<usize>,
    format: &OutputFormat,
    use_color: bool,
    input: &mut impl BufRead,
) -> Result<()> {
    let due: Vec<StudyCard> = app
        .study
        .cards_for_review()
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .cloned()
        .collect();

    if due.is_empty() {
        println!("No cards due for review.");
        return Ok(());
    }

    app.study.start_session();
    let answered = review_cards(app, &due, input, use_color);

    // Answers given before a failed read still count
    let session = app.study.end_session();
    app.save_study()?;
    answered.context("Failed to read answer")?;

    if let Some(session) = session {
        print_session(&session, format)?;
    }
    Ok(())
}

fn review_cards(app: &mut App, due: &[StudyCard], input: &mut impl BufRead, use_color: bool) -> Result<()> {
    for (i, card) in due.iter().enumerate() {
        println!();
        println!("{} {}",
            render::paint(&format!("[{}/{}]", i + 1, due.len()), Color::DIM, use_color),
            render::paint(&format!("{} Art. {}", card.code_id, card.article_number), Color::BOLD, use_color));
        if !card.content.is_empty() {
            println!("{}", card.content);
        }

        let correct = match ask(input)? {
            Answer::Correct => true,
            Answer::Wrong => false,
            Answer::Quit => break,
        };
        if let Some(updated) = app.study.review_card(card.id, correct) {
            print_review_result(&updated, correct, use_color);
        }
    }
    Ok(())
}

fn print_session(session: &StudySession, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(session)?),
        OutputFormat::Plain => {
            println!();
            println!("Session: {} cards, {} correct, {}m {}s",
                session.cards_reviewed,
                session.correct_answers,
                session.duration_secs / 60,
                session.duration_secs % 60);
        }
    }
    Ok(())
}

pub fn run_stats(app: &App, format: &OutputFormat) -> Result<()> {
    let stats = app.study.stats();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Plain => {
            println!("Cards:          {}", stats.total_cards);
            println!("  due:          {}", stats.due_cards);
            println!("  mastered:     {}", stats.mastered_cards);
            println!("  hard:         {}", stats.hard_cards);
            println!("Reviews:        {}", stats.total_reviews);
            println!("Accuracy:       {:.0}%", stats.accuracy * 100.0);
            println!("Study time:     {}m", stats.total_study_secs / 60);
            println!("Sessions today: {}", stats.sessions_today);
            println!("Streak:         {} days (best {})", stats.current_streak, stats.longest_streak);
        }
    }

    Ok(())
}

pub fn run_remove(app: &mut App, card_id: &str, format: &OutputFormat) -> Result<()> {
    let card = app.find_card(card_id)?;
    app.study.remove_card(card.id);
    app.save_study()?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "removed": card.id.to_string() });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => println!("Removed {} Art. {} from study", card.code_id, card.article_number),
    }

    Ok(())
}
