use std::fmt;

use serde::{Deserialize, Serialize};

/// The identifier kinds a registry can hand back for an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdKind {
    Doi,
    Pmid,
    Pmcid,
}

impl IdKind {
    /// Upper-case label used in annotation tags and log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Doi => "DOI",
            Self::Pmid => "PMID",
            Self::Pmcid => "PMCID",
        }
    }

    /// The `Documents` column holding this kind, if it has one.
    pub fn column(&self) -> Option<&'static str> {
        match self {
            Self::Doi => Some("doi"),
            Self::Pmid => Some("pmid"),
            Self::Pmcid => None,
        }
    }
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identifier triad returned by a successful registry lookup.
///
/// `None` means the registry did not say, not that the article has no such id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pmcid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pmid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
}

impl ResolvedIds {
    /// Builds a triad, dropping blank values.
    pub fn new(pmcid: Option<String>, pmid: Option<String>, doi: Option<String>) -> Self {
        Self {
            pmcid: non_blank(pmcid),
            pmid: non_blank(pmid),
            doi: non_blank(doi),
        }
    }

    pub fn get(&self, kind: IdKind) -> Option<&str> {
        match kind {
            IdKind::Doi => self.doi.as_deref(),
            IdKind::Pmid => self.pmid.as_deref(),
            IdKind::Pmcid => self.pmcid.as_deref(),
        }
    }

    /// Every kind with its value, in reporting order.
    pub fn fields(&self) -> [(IdKind, Option<&str>); 3] {
        [
            (IdKind::Pmcid, self.get(IdKind::Pmcid)),
            (IdKind::Pmid, self.get(IdKind::Pmid)),
            (IdKind::Doi, self.get(IdKind::Doi)),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.fields()
            .iter()
            .all(|(_, value)| value.is_none_or(|v| v.trim().is_empty()))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
