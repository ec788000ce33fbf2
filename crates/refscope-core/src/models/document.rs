use serde::{Deserialize, Serialize};

const SHORT_TITLE_LEN: usize = 100;

/// One journal article row from the reference manager, with its attached URLs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub doi: Option<String>,
    pub pmid: Option<String>,
    #[serde(default)]
    pub urls: Vec<String>,
}

impl Document {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Title cut to roughly 100 characters on a word boundary, for log lines.
    pub fn short_title(&self) -> String {
        let title = self.title.as_deref().unwrap_or_default();
        if title.chars().count() <= SHORT_TITLE_LEN {
            return title.to_string();
        }

        let cut: String = title.chars().take(SHORT_TITLE_LEN + 1).collect();
        let trimmed = cut.trim_end();
        match trimmed.rfind(char::is_whitespace) {
            Some(pos)
                if trimmed[pos..]
                    .trim_start()
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_') =>
            {
                format!("{}...", trimmed[..pos].trim_end())
            }
            _ => cut,
        }
    }
}

/// An author/editor row attached to a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    pub id: i64,
    pub document_id: i64,
    pub first_names: Option<String>,
    pub last_name: Option<String>,
}
