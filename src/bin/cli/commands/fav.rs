use anyhow::{Context, Result};

use vademecum_lib::article::ArticleRef;

use crate::app::App;
use crate::render;
use crate::OutputFormat;

pub fn run_add(app: &App, article: ArticleRef, content: &str, format: &OutputFormat) -> Result<()> {
    let favorite = app.favorites.add(article, content).context("Failed to add favorite")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&favorite)?),
        OutputFormat::Plain => {
            println!("Favorited {} Art. {}", favorite.article.code_id, favorite.article.article_number);
        }
    }

    Ok(())
}

pub fn run_list(app: &App, format: &OutputFormat, _use_color: bool) -> Result<()> {
    let favorites = app.favorites.list().context("Failed to load favorites")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&favorites)?),
        OutputFormat::Plain => {
            if favorites.is_empty() {
                println!("No favorites.");
                return Ok(());
            }

            for favorite in &favorites {
                let studying = if app.study.find_card(&favorite.article).is_some() { " [studying]" } else { "" };
                println!("{:<8} Art. {:<10} {}{}",
                    favorite.article.code_id,
                    favorite.article.article_number,
                    render::truncate(&favorite.content, 50),
                    studying);
            }

            println!("\n{} favorites", favorites.len());
        }
    }

    Ok(())
}

pub fn run_remove(app: &App, article: &ArticleRef, format: &OutputFormat) -> Result<()> {
    let removed = app.favorites.remove(article).context("Failed to remove favorite")?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "removed": removed });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if removed {
                println!("Removed {} {} from favorites", article.code_id, article.article_id);
            } else {
                println!("{} {} is not a favorite", article.code_id, article.article_id);
            }
        }
    }

    Ok(())
}
