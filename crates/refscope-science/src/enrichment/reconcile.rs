use once_cell::sync::Lazy;
use refscope_core::{Document, DocumentStore, IdKind, RefscopeConfig, ResolvedIds};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::enrichment::annotation::merge_tag;
use crate::enrichment::authors::normalize_first_names;
use crate::error::Result;
use crate::resolver::Resolver;

/// Papers2 imports leave DOIs in URLs like `papers2://publication/doi/10.1/x`.
static LEGACY_DOI_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^papers2://[^/]+/doi/(.+)").expect("valid legacy DOI URL regex"));

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Replace existing identifier columns and annotation tags.
    pub overwrite: bool,
    pub document_type: String,
    pub wrapper_marker: String,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self::from(&RefscopeConfig::default())
    }
}

impl From<&RefscopeConfig> for ReconcileOptions {
    fn from(config: &RefscopeConfig) -> Self {
        Self {
            overwrite: config.reconcile.overwrite,
            document_type: config.database.document_type.clone(),
            wrapper_marker: config.reconcile.wrapper_marker.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub matched: bool,
    /// Candidate kind that produced the match.
    pub via: Option<IdKind>,
    pub resolved: Option<ResolvedIds>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub total: usize,
    pub matched: usize,
    /// Records abandoned because the store failed mid-merge.
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuthorReport {
    pub examined: usize,
    pub corrected: usize,
}

/// DOI hidden in a legacy Papers2 URL.
pub fn legacy_url_doi(url: &str) -> Option<String> {
    let caps = LEGACY_DOI_URL_RE.captures(url.trim())?;
    let raw = caps.get(1)?.as_str();
    let doi = urlencoding::decode(raw)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    Some(doi).filter(|d| !d.trim().is_empty())
}

/// Lookup candidates in priority order: PMID, then DOI.
///
/// The DOI falls back to one buried in the document's URLs when the column is
/// empty.
pub fn candidates(doc: &Document) -> Vec<(IdKind, String)> {
    let present = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let mut out = Vec::with_capacity(2);
    if let Some(pmid) = present(&doc.pmid) {
        out.push((IdKind::Pmid, pmid));
    }
    let doi = present(&doc.doi).or_else(|| doc.urls.iter().find_map(|u| legacy_url_doi(u)));
    if let Some(doi) = doi {
        out.push((IdKind::Doi, doi));
    }
    out
}

/// Fills missing identifiers of stored documents from the registries.
pub struct RecordReconciler<S, R> {
    store: S,
    resolver: R,
    options: ReconcileOptions,
}

impl<S: DocumentStore, R: Resolver> RecordReconciler<S, R> {
    pub fn new(store: S, resolver: R, options: ReconcileOptions) -> Self {
        Self {
            store,
            resolver,
            options,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve one document and, unless `dry_run`, merge what was found.
    pub async fn reconcile(&self, doc: &Document, dry_run: bool) -> Result<ReconcileOutcome> {
        let mut outcome = ReconcileOutcome::default();
        for (kind, id) in candidates(doc) {
            if let Some(ids) = self.resolver.resolve(&id, kind).await {
                outcome = ReconcileOutcome {
                    matched: true,
                    via: Some(kind),
                    resolved: Some(ids),
                };
                break;
            }
        }

        let title = doc.short_title();
        match &outcome.resolved {
            Some(ids) => {
                info!("Matched \"{title}\"");
                for (kind, value) in ids.fields() {
                    info!("  |--> {}: {}", kind.label(), value.unwrap_or("?"));
                }
                if !dry_run {
                    self.merge(doc.id, ids, chrono::Utc::now().timestamp())?;
                }
            }
            None => info!("Could not match \"{title}\""),
        }
        Ok(outcome)
    }

    /// Write resolved identifiers into the document without disturbing
    /// existing values unless overwrite is on.
    pub fn merge(&self, document_id: i64, ids: &ResolvedIds, now: i64) -> Result<()> {
        for (kind, value) in ids.fields() {
            let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
                continue;
            };

            if kind.column().is_some() {
                let changed = self.store.set_identifier(
                    document_id,
                    kind,
                    value,
                    self.options.overwrite,
                    now,
                )?;
                debug!(document_id, %kind, value, changed, "structured identifier");
                continue;
            }

            let current = self.store.annotation(document_id)?;
            let merged = merge_tag(
                current.text.as_deref(),
                kind,
                value,
                self.options.overwrite,
                &self.options.wrapper_marker,
            );
            if current.text.as_deref() != Some(merged.as_str()) {
                self.store
                    .write_annotation(document_id, current.note_id, &merged)?;
                debug!(document_id, %kind, value, "annotation tag written");
            }
        }
        Ok(())
    }

    /// Reconcile every document of the configured type, newest first.
    ///
    /// Only failing to list documents aborts; per-record store failures are
    /// logged and counted.
    pub async fn reconcile_all(&self, dry_run: bool) -> Result<ReconcileReport> {
        let documents = self.store.documents(&self.options.document_type)?;
        let mut report = ReconcileReport {
            total: documents.len(),
            ..Default::default()
        };

        for doc in &documents {
            match self.reconcile(doc, dry_run).await {
                Ok(outcome) if outcome.matched => report.matched += 1,
                Ok(_) => {}
                Err(e) => {
                    warn!(document_id = doc.id, error = %e, "failed to update document");
                    report.failed += 1;
                }
            }
        }

        info!("Matched {} of {} documents.", report.matched, report.total);
        Ok(report)
    }

    /// Fix lowercase `a` initials in every contributor's first names.
    pub fn fix_author_names(&self, dry_run: bool) -> Result<AuthorReport> {
        let contributors = self.store.contributors()?;
        let mut report = AuthorReport {
            examined: contributors.len(),
            ..Default::default()
        };

        for person in &contributors {
            let Some(first) = person.first_names.as_deref() else {
                continue;
            };
            let fixed = normalize_first_names(first);
            if fixed == first {
                continue;
            }
            info!(
                "Author \"{first} {}\" -> \"{fixed}\"",
                person.last_name.as_deref().unwrap_or_default()
            );
            if !dry_run {
                self.store.set_first_names(person.id, &fixed)?;
            }
            report.corrected += 1;
        }

        info!("Corrected {} of {} contributors.", report.corrected, report.examined);
        Ok(report)
    }
}
