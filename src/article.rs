//! Identity of an article inside a legal code

use serde::{Deserialize, Serialize};

/// Maximum number of characters of article text kept on cards and favorites
pub const EXCERPT_LEN: usize = 200;

/// Reference to one article of a code, statute or the constitution.
///
/// `code_id` names the code (e.g. `cc` for the Código Civil, `cf88` for the
/// constitution) and `article_id` is unique within it. `article_number` is
/// the human-facing label ("5º", "121-A").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRef {
    pub code_id: String,
    pub article_id: String,
    pub article_number: String,
}

impl ArticleRef {
    pub fn new(
        code_id: impl Into<String>,
        article_id: impl Into<String>,
        article_number: impl Into<String>,
    ) -> Self {
        Self {
            code_id: code_id.into(),
            article_id: article_id.into(),
            article_number: article_number.into(),
        }
    }

    /// Both identifiers are present
    pub fn is_valid(&self) -> bool {
        !self.code_id.trim().is_empty() && !self.article_id.trim().is_empty()
    }

    /// Whether two references point at the same article, ignoring the label
    pub fn same_article(&self, other: &ArticleRef) -> bool {
        self.code_id == other.code_id && self.article_id == other.article_id
    }
}

/// Truncate article text on a character boundary, appending an ellipsis
/// when anything was cut.
pub fn excerpt(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.chars().count() <= EXCERPT_LEN {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(EXCERPT_LEN).collect();
    format!("{}...", cut.trim_end())
}
