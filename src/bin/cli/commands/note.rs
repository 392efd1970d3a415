use anyhow::{Context, Result};
use uuid::Uuid;

use vademecum_lib::article::ArticleRef;
use vademecum_lib::notes::{NoteService, SaveOutcome};

use crate::app::App;
use crate::render::{self, Color};
use crate::OutputFormat;

fn outcome_label(outcome: SaveOutcome) -> &'static str {
    match outcome {
        SaveOutcome::Saved => "saved",
        SaveOutcome::SavedLocally => "saved on this device (backend unavailable)",
    }
}

pub async fn run_add(service: &NoteService, article: &ArticleRef, text: &str, format: &OutputFormat) -> Result<()> {
    let (annotation, outcome) = service
        .add_annotation(article, text)
        .await
        .context("Failed to save annotation")?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "annotation": annotation,
                "outcome": outcome,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Annotation {}", outcome_label(outcome));
            println!("  ID: {}", annotation.id);
        }
    }

    Ok(())
}

pub async fn run_list(
    service: &NoteService,
    article: &ArticleRef,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let annotations = service.annotations(article).await.context("Failed to load annotations")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&annotations)?),
        OutputFormat::Plain => {
            if annotations.is_empty() {
                println!("No annotations on {} {}.", article.code_id, article.article_id);
                return Ok(());
            }

            for annotation in &annotations {
                let header = format!("{}  {}", annotation.id, annotation.updated_at.format("%Y-%m-%d %H:%M"));
                println!("{}", render::paint(&header, Color::DIM, use_color));
                println!("{}", annotation.content);
                println!();
            }
        }
    }

    Ok(())
}

pub async fn run_delete(service: &NoteService, id: Uuid, format: &OutputFormat) -> Result<()> {
    service.delete_annotation(id).await.context("Failed to delete annotation")?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "deleted": id.to_string() });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => println!("Deleted annotation {}", id),
    }

    Ok(())
}

pub async fn run_comment(
    app: &App,
    service: &NoteService,
    article: &ArticleRef,
    text: &str,
    format: &OutputFormat,
) -> Result<()> {
    let backend = &app.config.backend;
    let author_id = backend.user_id.as_deref().unwrap_or("local");
    let author_name = backend.user_name.as_deref().unwrap_or("Anonymous");

    let (comment, outcome) = service
        .add_comment(article, author_id, author_name, text)
        .await
        .context("Failed to post comment")?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "comment": comment,
                "outcome": outcome,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Comment {}", outcome_label(outcome));
            println!("  ID: {}", comment.id);
        }
    }

    Ok(())
}

pub async fn run_comments(
    service: &NoteService,
    article: &ArticleRef,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let comments = service.comments(article).await.context("Failed to load comments")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&comments)?),
        OutputFormat::Plain => {
            if comments.is_empty() {
                println!("No comments on {} {}.", article.code_id, article.article_id);
                return Ok(());
            }

            for comment in &comments {
                let header = format!("{}  {}", comment.author_name, comment.created_at.format("%Y-%m-%d %H:%M"));
                println!("{}", render::paint(&header, Color::BOLD, use_color));
                println!("{}", comment.content);
                println!();
            }
        }
    }

    Ok(())
}

pub async fn run_migrate(service: &NoteService, format: &OutputFormat) -> Result<()> {
    let migrated = service
        .migrate_local_to_remote()
        .await
        .context("Failed to migrate notes (are you signed in?)")?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "migrated": migrated });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => println!("Migrated {} notes to the backend", migrated),
    }

    Ok(())
}
