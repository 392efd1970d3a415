mod app;
mod commands;
mod render;

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vademecum-cli", about = "Vade mecum study mode, favorites and notes", version)]
struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides the config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum PeriodArg {
    Daily,
    Weekly,
    Monthly,
}

#[derive(Subcommand)]
enum Command {
    /// Spaced repetition study cards and sessions
    #[command(subcommand)]
    Study(StudyCommand),

    /// Review goals
    #[command(subcommand)]
    Goal(GoalCommand),

    /// Favorite articles
    #[command(subcommand)]
    Fav(FavCommand),

    /// Annotations and comments
    #[command(subcommand)]
    Note(NoteCommand),
}

#[derive(Subcommand)]
enum StudyCommand {
    /// Add an article to study
    Add {
        /// Legal code id (e.g. cf88)
        code: String,
        /// Article id within the code
        article: String,
        /// Display number (defaults to the article id)
        #[arg(long)]
        number: Option<String>,
        /// Article text (use "-" to read from stdin)
        #[arg(long)]
        content: Option<String>,
    },

    /// Add every favorite article not yet studied
    AddFavorites,

    /// List cards due for review
    Due,

    /// Record an answer for one card
    Review {
        /// Card id or unique prefix
        card: String,
        /// The answer was right
        #[arg(long, conflicts_with = "wrong")]
        correct: bool,
        /// The answer was wrong
        #[arg(long)]
        wrong: bool,
    },

    /// Review due cards interactively
    Run {
        /// Maximum cards in this session
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show study statistics
    Stats,

    /// Remove a card
    Remove {
        /// Card id or unique prefix
        card: String,
    },
}

#[derive(Subcommand)]
enum GoalCommand {
    /// Create a goal
    Add {
        title: String,
        #[arg(long, default_value = "daily")]
        period: PeriodArg,
        /// Reviews to reach per period (default: study.daily_goal)
        #[arg(long)]
        target: Option<u32>,
    },

    /// List goals with progress
    List,

    /// Add progress to a goal
    Progress {
        /// Goal id or unique prefix
        goal: String,
        #[arg(default_value = "1")]
        amount: u32,
    },

    /// Delete a goal
    Delete {
        /// Goal id or unique prefix
        goal: String,
    },
}

#[derive(Subcommand)]
enum FavCommand {
    /// Add an article to favorites
    Add {
        code: String,
        article: String,
        #[arg(long)]
        number: Option<String>,
        /// Article text (use "-" to read from stdin)
        #[arg(long)]
        content: Option<String>,
    },

    /// List favorites
    List,

    /// Remove an article from favorites
    Remove { code: String, article: String },
}

#[derive(Subcommand)]
enum NoteCommand {
    /// Annotate an article
    Add {
        code: String,
        article: String,
        /// Annotation text (use "-" to read from stdin)
        text: String,
        #[arg(long)]
        number: Option<String>,
    },

    /// List annotations on an article
    List { code: String, article: String },

    /// Delete an annotation
    Delete { id: uuid::Uuid },

    /// Comment on an article
    Comment {
        code: String,
        article: String,
        text: String,
        #[arg(long)]
        number: Option<String>,
    },

    /// List comments on an article, newest first
    Comments { code: String, article: String },

    /// Upload annotations and comments kept on this device to the backend
    Migrate,
}

/// Resolve "-" as stdin
fn resolve_content(content: Option<String>) -> Option<String> {
    match content.as_deref() {
        Some("-") => {
            let mut buf = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf).ok();
            Some(buf)
        }
        _ => content,
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && std::io::stdout().is_terminal();
    let mut app = app::App::new(cli.config.as_deref(), cli.data_dir.as_deref())?;

    match cli.command {
        Command::Study(subcmd) => match subcmd {
            StudyCommand::Add { code, article, number, content } => {
                let article = app::article_ref(&code, &article, number.as_deref());
                let content = resolve_content(content).unwrap_or_default();
                commands::study::run_add(&mut app, &article, &content, &cli.format)?;
            }
            StudyCommand::AddFavorites => {
                commands::study::run_add_favorites(&mut app, &cli.format)?;
            }
            StudyCommand::Due => {
                commands::study::run_due(&app, &cli.format, use_color)?;
            }
            StudyCommand::Review { card, correct, wrong } => {
                if correct == wrong {
                    anyhow::bail!("Pass exactly one of --correct or --wrong");
                }
                commands::study::run_review(&mut app, &card, correct, &cli.format, use_color)?;
            }
            StudyCommand::Run { limit } => {
                commands::study::run_session(&mut app, limit, &cli.format, use_color)?;
            }
            StudyCommand::Stats => {
                commands::study::run_stats(&app, &cli.format)?;
            }
            StudyCommand::Remove { card } => {
                commands::study::run_remove(&mut app, &card, &cli.format)?;
            }
        },
        Command::Goal(subcmd) => match subcmd {
            GoalCommand::Add { title, period, target } => {
                commands::goal::run_add(&mut app, &title, period, target, &cli.format)?;
            }
            GoalCommand::List => {
                commands::goal::run_list(&app, &cli.format, use_color)?;
            }
            GoalCommand::Progress { goal, amount } => {
                commands::goal::run_progress(&mut app, &goal, amount, &cli.format)?;
            }
            GoalCommand::Delete { goal } => {
                commands::goal::run_delete(&mut app, &goal, &cli.format)?;
            }
        },
        Command::Fav(subcmd) => match subcmd {
            FavCommand::Add { code, article, number, content } => {
                let article = app::article_ref(&code, &article, number.as_deref());
                let content = resolve_content(content).unwrap_or_default();
                commands::fav::run_add(&app, article, &content, &cli.format)?;
            }
            FavCommand::List => {
                commands::fav::run_list(&app, &cli.format, use_color)?;
            }
            FavCommand::Remove { code, article } => {
                let article = app::article_ref(&code, &article, None);
                commands::fav::run_remove(&app, &article, &cli.format)?;
            }
        },
        Command::Note(subcmd) => {
            let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
            let service = app.note_service();
            runtime.block_on(async {
                match subcmd {
                    NoteCommand::Add { code, article, text, number } => {
                        let article = app::article_ref(&code, &article, number.as_deref());
                        let text = resolve_content(Some(text)).unwrap_or_default();
                        commands::note::run_add(&service, &article, &text, &cli.format).await
                    }
                    NoteCommand::List { code, article } => {
                        let article = app::article_ref(&code, &article, None);
                        commands::note::run_list(&service, &article, &cli.format, use_color).await
                    }
                    NoteCommand::Delete { id } => {
                        commands::note::run_delete(&service, id, &cli.format).await
                    }
                    NoteCommand::Comment { code, article, text, number } => {
                        let article = app::article_ref(&code, &article, number.as_deref());
                        commands::note::run_comment(&app, &service, &article, &text, &cli.format).await
                    }
                    NoteCommand::Comments { code, article } => {
                        let article = app::article_ref(&code, &article, None);
                        commands::note::run_comments(&service, &article, &cli.format, use_color).await
                    }
                    NoteCommand::Migrate => commands::note::run_migrate(&service, &cli.format).await,
                }
            })?;
        }
    }

    Ok(())
}
