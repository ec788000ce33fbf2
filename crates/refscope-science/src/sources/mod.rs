use async_trait::async_trait;
use refscope_core::{IdKind, ResolvedIds};

use crate::error::Result;

/// One identifier registry.
///
/// `Ok(None)` means the registry answered and knows nothing about the id;
/// errors are reserved for failed calls and malformed or error responses.
#[async_trait]
pub trait IdSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn lookup(&self, id: &str, kind: IdKind) -> Result<Option<ResolvedIds>>;
}

/// Text of a JSON scalar; registries are inconsistent about quoting numbers.
pub(crate) fn json_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub mod eutils;
pub mod pmc_idconv;
