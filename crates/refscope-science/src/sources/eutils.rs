use std::sync::Arc;

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use refscope_core::{IdKind, RegistryConfig, ResolvedIds};
use tracing::debug;

use crate::error::{Result, ScienceError};
use crate::http::{RateLimitedClient, RateLimiter};
use crate::sources::IdSource;

const NAME: &str = "PubMed E-utilities";

/// PubMed search-then-fetch lookup.
///
/// Every call passes through the shared [`RateLimiter`]; NCBI blocks clients
/// that exceed three requests per second.
pub struct EutilsClient {
    client: RateLimitedClient,
    base_url: String,
    tool: String,
    email: Option<String>,
}

impl EutilsClient {
    pub fn new(config: &RegistryConfig, limiter: Arc<RateLimiter>) -> Result<Self> {
        let client =
            RateLimitedClient::new(config.max_retries, &config.user_agent)?.with_limiter(limiter);
        Ok(Self::with_client(
            client,
            &config.eutils_url,
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
            base_url: base_url.trim_end_matches('/').to_string(),
            tool: tool.to_string(),
            email,
        }
    }

    /// PubMed search field for a kind: `DOI` or `uid`.
    pub fn field_code(kind: IdKind) -> Option<&'static str> {
        match kind {
            IdKind::Doi => Some("DOI"),
            IdKind::Pmid => Some("uid"),
            IdKind::Pmcid => None,
        }
    }

    /// PubMed uid of the first search hit, if any.
    pub async fn search(&self, id: &str, kind: IdKind) -> Result<Option<String>> {
        let Some(field) = Self::field_code(kind) else {
            return Ok(None);
        };
        let term = format!("{id}[{field}]");
        let url = format!("{}/esearch.fcgi", self.base_url);
        let query = self.query(&[("db", "pubmed"), ("usehistory", "n"), ("term", term.as_str())]);

        let xml = self.client.get_with_query(&url, &query).await?;
        first_search_id(&xml)
    }

    /// Full PubMed record for one uid, reduced to its identifier triad.
    pub async fn fetch(&self, uid: &str) -> Result<ResolvedIds> {
        let url = format!("{}/efetch.fcgi", self.base_url);
        let query = self.query(&[("db", "pubmed"), ("retmode", "xml"), ("id", uid)]);

        let xml = self.client.get_with_query(&url, &query).await?;
        parse_article_ids(&xml)
    }

    fn query<'a>(&'a self, params: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
        let mut query = params.to_vec();
        query.push(("tool", self.tool.as_str()));
        if let Some(email) = &self.email {
            query.push(("email", email.as_str()));
        }
        query
    }
}

#[async_trait]
impl IdSource for EutilsClient {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn lookup(&self, id: &str, kind: IdKind) -> Result<Option<ResolvedIds>> {
        let Some(uid) = self.search(id, kind).await? else {
            debug!(%kind, id, "no PubMed search hit");
            return Ok(None);
        };
        self.fetch(&uid).await.map(Some)
    }
}

fn xml_error(e: impl std::fmt::Display) -> ScienceError {
    ScienceError::Parse(format!("invalid {NAME} XML: {e}"))
}

/// Text of the first `<Id>` in an esearch result.
fn first_search_id(xml: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut in_id = false;
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => in_id = e.name().as_ref() == b"Id",
            Event::Text(t) if in_id => {
                let id = t.unescape().map_err(xml_error)?.trim().to_string();
                if !id.is_empty() {
                    return Ok(Some(id));
                }
            }
            Event::End(_) => in_id = false,
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn id_type(e: &BytesStart<'_>) -> Result<Option<String>> {
    match e.try_get_attribute("IdType").map_err(xml_error)? {
        Some(attr) => Ok(Some(attr.unescape_value().map_err(xml_error)?.into_owned())),
        None => Ok(None),
    }
}

const PMID_PARENTS: [&[u8]; 2] = [b"MedlineCitation", b"BookDocument"];
const ARTICLE_DATA: [&[u8]; 2] = [b"PubmedData", b"PubmedBookData"];

/// Which of the article's own ids the innermost open element holds.
///
/// Cited papers' ids sit under `ReferenceList` and `CommentsCorrections`,
/// whose parents never match.
fn own_id_kind(stack: &[Vec<u8>], e: &BytesStart<'_>) -> Result<Option<IdKind>> {
    match stack {
        [.., parent, leaf]
            if leaf.as_slice() == b"PMID" && PMID_PARENTS.contains(&parent.as_slice()) =>
        {
            Ok(Some(IdKind::Pmid))
        }
        [.., data, list, leaf]
            if leaf.as_slice() == b"ArticleId"
                && list.as_slice() == b"ArticleIdList"
                && ARTICLE_DATA.contains(&data.as_slice()) =>
        {
            Ok(match id_type(e)?.as_deref() {
                Some("pmc") => Some(IdKind::Pmcid),
                Some("doi") => Some(IdKind::Doi),
                _ => None,
            })
        }
        _ => Ok(None),
    }
}

/// The first article's own PMID, PMCID and DOI from an efetch document.
fn parse_article_ids(xml: &str) -> Result<ResolvedIds> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut ids = ResolvedIds::default();
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut current: Option<IdKind> = None;
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                stack.push(e.name().as_ref().to_vec());
                current = own_id_kind(&stack, &e)?;
            }
            Event::Text(t) => {
                let Some(kind) = current.take() else { continue };
                let slot = match kind {
                    IdKind::Pmid => &mut ids.pmid,
                    IdKind::Pmcid => &mut ids.pmcid,
                    IdKind::Doi => &mut ids.doi,
                };
                let value = t.unescape().map_err(xml_error)?.trim().to_string();
                if slot.is_none() && !value.is_empty() {
                    *slot = Some(value);
                }
            }
            Event::End(e) => {
                current = None;
                stack.pop();
                if matches!(e.name().as_ref(), b"PubmedArticle" | b"PubmedBookArticle") {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(ids)
}
