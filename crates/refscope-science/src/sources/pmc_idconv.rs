use async_trait::async_trait;
use refscope_core::{IdKind, RegistryConfig, ResolvedIds};
use serde_json::Value;

use crate::error::{Result, ScienceError};
use crate::http::RateLimitedClient;
use crate::sources::{IdSource, json_text};

const NAME: &str = "PMC ID Converter";

/// One-shot converter between PMCID, PMID and DOI.
///
/// NCBI documents no rate limit for this service, so calls are not gated.
pub struct PmcIdConverter {
    client: RateLimitedClient,
    base_url: String,
    tool: String,
    email: Option<String>,
}

impl PmcIdConverter {
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let client = RateLimitedClient::new(config.max_retries, &config.user_agent)?;
        Ok(Self::with_client(
            client,
            &config.idconv_url,
            &config.tool,
            config.email.clone(),
        ))
    }

    pub fn with_client(
        client: RateLimitedClient,
        base_url: &str,
        tool: &str,
        email: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            tool: tool.to_string(),
            email,
        }
    }

    pub async fn convert(&self, id: &str, kind: IdKind) -> Result<ResolvedIds> {
        let idtype = kind.label().to_ascii_lowercase();
        let mut query = vec![
            ("format", "json"),
            ("ids", id),
            ("idtype", idtype.as_str()),
            ("tool", self.tool.as_str()),
        ];
        if let Some(email) = &self.email {
            query.push(("email", email.as_str()));
        }

        let body = self.client.get_with_query(&self.base_url, &query).await?;
        parse_response(id, &body)
    }
}

#[async_trait]
impl IdSource for PmcIdConverter {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn lookup(&self, id: &str, kind: IdKind) -> Result<Option<ResolvedIds>> {
        self.convert(id, kind).await.map(Some)
    }
}

fn parse_response(id: &str, body: &str) -> Result<ResolvedIds> {
    let val: Value = serde_json::from_str(body)
        .map_err(|e| ScienceError::Parse(format!("{NAME} returned invalid JSON: {e}")))?;

    if val["status"].as_str() != Some("ok") {
        let message = val["message"].as_str().unwrap_or("no message");
        return Err(ScienceError::registry(
            NAME,
            format!("{NAME} API returned an error: {message}"),
            body,
        ));
    }

    let first = val["records"]
        .as_array()
        .and_then(|records| records.first())
        .ok_or_else(|| ScienceError::registry(NAME, format!("{NAME} API returned no results"), body))?;

    if first["status"].as_str() == Some("error") {
        return Err(ScienceError::registry(
            NAME,
            format!("{NAME} API could not find this ID: {id}"),
            body,
        ));
    }

    Ok(ResolvedIds::new(
        json_text(&first["pmcid"]),
        json_text(&first["pmid"]),
        json_text(&first["doi"]),
    ))
}
