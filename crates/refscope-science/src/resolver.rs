use std::sync::Arc;

use async_trait::async_trait;
use refscope_core::{IdKind, RegistryConfig, ResolvedIds};
use tracing::debug;

use crate::error::Result;
use crate::http::RateLimiter;
use crate::sources::IdSource;
use crate::sources::eutils::EutilsClient;
use crate::sources::pmc_idconv::PmcIdConverter;

/// Turns one known identifier into the full identifier triad.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// `None` when no registry could match the id; registry failures never
    /// escape this call.
    async fn resolve(&self, id: &str, kind: IdKind) -> Option<ResolvedIds>;
}

/// Registries tried in order until one yields a non-empty triad.
pub struct IdentifierResolver {
    sources: Vec<Box<dyn IdSource>>,
}

impl IdentifierResolver {
    /// PMC ID Converter first, then PubMed search/fetch behind `limiter`.
    pub fn new(config: &RegistryConfig, limiter: Arc<RateLimiter>) -> Result<Self> {
        Ok(Self::with_sources(vec![
            Box::new(PmcIdConverter::new(config)?),
            Box::new(EutilsClient::new(config, limiter)?),
        ]))
    }

    /// Uses a fresh limiter spaced by `eutils_interval_ms`.
    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        Self::new(config, Arc::new(RateLimiter::new(config.eutils_interval())))
    }

    pub fn with_sources(sources: Vec<Box<dyn IdSource>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl Resolver for IdentifierResolver {
    async fn resolve(&self, id: &str, kind: IdKind) -> Option<ResolvedIds> {
        let id = id.trim();
        if id.is_empty() {
            return None;
        }

        for source in &self.sources {
            match source.lookup(id, kind).await {
                Ok(Some(ids)) if !ids.is_empty() => {
                    debug!(source = source.name(), %kind, id, "resolved");
                    return Some(ids);
                }
                Ok(_) => debug!(source = source.name(), %kind, id, "no match"),
                Err(e) => debug!(
                    source = source.name(),
                    %kind,
                    id,
                    error = %e,
                    response = e.response().unwrap_or_default(),
                    "lookup failed"
                ),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScienceError;
    use crate::http::RateLimitedClient;
    use mockito::{Matcher, Server};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Source returning a canned answer and recording what it was asked.
    struct Canned {
        answer: fn() -> Result<Option<ResolvedIds>>,
        calls: Arc<Mutex<Vec<(String, IdKind)>>>,
    }

    #[async_trait]
    impl IdSource for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn lookup(&self, id: &str, kind: IdKind) -> Result<Option<ResolvedIds>> {
            self.calls.lock().unwrap().push((id.to_string(), kind));
            (self.answer)()
        }
    }

    fn canned(answer: fn() -> Result<Option<ResolvedIds>>) -> (Box<dyn IdSource>, Arc<Mutex<Vec<(String, IdKind)>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Box::new(Canned {
                answer,
                calls: calls.clone(),
            }),
            calls,
        )
    }

    fn triad() -> Result<Option<ResolvedIds>> {
        Ok(Some(ResolvedIds::new(
            Some("PMC000111".into()),
            Some("12345678".into()),
            Some("10.1/x".into()),
        )))
    }

    fn registry_error() -> Result<Option<ResolvedIds>> {
        Err(ScienceError::registry("canned", "no results", "{}"))
    }

    fn nothing() -> Result<Option<ResolvedIds>> {
        Ok(None)
    }

    fn blank() -> Result<Option<ResolvedIds>> {
        Ok(Some(ResolvedIds::default()))
    }

    #[tokio::test]
    async fn primary_hit_skips_fallback() {
        let (primary, primary_calls) = canned(triad);
        let (fallback, fallback_calls) = canned(triad);
        let resolver = IdentifierResolver::with_sources(vec![primary, fallback]);

        let ids = resolver.resolve("12345678", IdKind::Pmid).await.unwrap();
        assert_eq!(ids.doi.as_deref(), Some("10.1/x"));
        assert_eq!(primary_calls.lock().unwrap().len(), 1);
        assert!(fallback_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn primary_error_falls_back() {
        let (primary, _) = canned(registry_error);
        let (fallback, fallback_calls) = canned(triad);
        let resolver = IdentifierResolver::with_sources(vec![primary, fallback]);

        let ids = resolver.resolve("10.1/x", IdKind::Doi).await;
        assert_eq!(ids.unwrap().pmcid.as_deref(), Some("PMC000111"));
        assert_eq!(
            fallback_calls.lock().unwrap().as_slice(),
            &[("10.1/x".to_string(), IdKind::Doi)]
        );
    }

    #[tokio::test]
    async fn all_failures_are_swallowed() {
        let (primary, _) = canned(registry_error);
        let (fallback, _) = canned(registry_error);
        let resolver = IdentifierResolver::with_sources(vec![primary, fallback]);
        assert_eq!(resolver.resolve("1", IdKind::Pmid).await, None);

        let (primary, _) = canned(nothing);
        let (fallback, _) = canned(blank);
        let resolver = IdentifierResolver::with_sources(vec![primary, fallback]);
        assert_eq!(resolver.resolve("1", IdKind::Pmid).await, None);
    }

    #[tokio::test]
    async fn blank_id_is_not_looked_up() {
        let (primary, calls) = canned(triad);
        let resolver = IdentifierResolver::with_sources(vec![primary]);
        assert_eq!(resolver.resolve("  ", IdKind::Doi).await, None);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn real_registries_fall_through_to_pubmed() {
        let mut server = Server::new_async().await;
        let _idconv = server
            .mock("GET", "/idconv/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status":"ok","records":[{"pmid":"87654321","status":"error","errmsg":"not in PMC"}]}"#)
            .create_async()
            .await;
        let _search = server
            .mock("GET", "/eutils/esearch.fcgi")
            .match_query(Matcher::UrlEncoded("term".into(), "87654321[uid]".into()))
            .with_status(200)
            .with_body("<eSearchResult><IdList><Id>87654321</Id></IdList></eSearchResult>")
            .create_async()
            .await;
        let _fetch = server
            .mock("GET", "/eutils/efetch.fcgi")
            .match_query(Matcher::UrlEncoded("id".into(), "87654321".into()))
            .with_status(200)
            .with_body(
                r#"<PubmedArticleSet><PubmedArticle><MedlineCitation><PMID Version="1">87654321</PMID></MedlineCitation>
                <PubmedData><ArticleIdList><ArticleId IdType="doi">10.5/y</ArticleId></ArticleIdList></PubmedData>
                </PubmedArticle></PubmedArticleSet>"#,
            )
            .create_async()
            .await;

        let http = || RateLimitedClient::new(0, "refscope-test").unwrap();
        let limiter = Arc::new(RateLimiter::new(Duration::ZERO));
        let resolver = IdentifierResolver::with_sources(vec![
            Box::new(PmcIdConverter::with_client(
                http(),
                &format!("{}/idconv/", server.url()),
                "refscope",
                None,
            )),
            Box::new(EutilsClient::with_client(
                http().with_limiter(limiter),
                &format!("{}/eutils", server.url()),
                "refscope",
                None,
            )),
        ]);

        let ids = resolver.resolve("87654321", IdKind::Pmid).await.unwrap();
        assert_eq!(ids.pmid.as_deref(), Some("87654321"));
        assert_eq!(ids.doi.as_deref(), Some("10.5/y"));
        assert_eq!(ids.pmcid, None);
    }

    #[tokio::test]
    async fn malformed_registry_bodies_yield_none() {
        let mut server = Server::new_async().await;
        let idconv = server
            .mock("GET", "/idconv/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>Service Unavailable</html>")
            .expect(1)
            .create_async()
            .await;
        let _search = server
            .mock("GET", "/eutils/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<eSearchResult><IdList><Id>87654321</Id></IdList></eSearchResult>")
            .create_async()
            .await;
        let fetch = server
            .mock("GET", "/eutils/efetch.fcgi")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<PubmedArticleSet><PubmedArticle><PMID>87654321</PubmedArticleSet>")
            .expect(1)
            .create_async()
            .await;

        let http = || RateLimitedClient::new(0, "refscope-test").unwrap();
        let resolver = IdentifierResolver::with_sources(vec![
            Box::new(PmcIdConverter::with_client(
                http(),
                &format!("{}/idconv/", server.url()),
                "refscope",
                None,
            )),
            Box::new(EutilsClient::with_client(
                http().with_limiter(Arc::new(RateLimiter::new(Duration::ZERO))),
                &format!("{}/eutils", server.url()),
                "refscope",
                None,
            )),
        ]);

        assert_eq!(resolver.resolve("10.5/y", IdKind::Doi).await, None);
        idconv.assert_async().await;
        fetch.assert_async().await;
    }

    #[tokio::test]
    async fn unreachable_registries_yield_none() {
        let config = RegistryConfig {
            idconv_url: "http://127.0.0.1:9/idconv/".to_string(),
            eutils_url: "http://127.0.0.1:9/eutils".to_string(),
            max_retries: 0,
            eutils_interval_ms: 0,
            ..RegistryConfig::default()
        };
        let resolver = IdentifierResolver::from_config(&config).unwrap();
        assert_eq!(resolver.resolve("10.1/x", IdKind::Doi).await, None);
    }
}
