//! `{:KIND:value}` tags embedded in free-text annotations.
//!
//! Merge precedence, first applicable rule wins:
//! 1. a tag of the same kind exists: replaced under overwrite, else kept;
//! 2. the wrapper marker exists: the tag goes right after its first occurrence;
//! 3. the annotation has text: the tag is prepended with a space;
//! 4. otherwise the annotation becomes the tag alone.

use once_cell::sync::Lazy;
use refscope_core::IdKind;
use regex::{NoExpand, Regex};

static DOI_TAG_RE: Lazy<Regex> = Lazy::new(|| tag_regex(IdKind::Doi));
static PMID_TAG_RE: Lazy<Regex> = Lazy::new(|| tag_regex(IdKind::Pmid));
static PMCID_TAG_RE: Lazy<Regex> = Lazy::new(|| tag_regex(IdKind::Pmcid));

fn tag_regex(kind: IdKind) -> Regex {
    Regex::new(&format!(r"\{{:{}:([^}}]*)\}}", kind.label())).expect("valid note tag regex")
}

fn tag_pattern(kind: IdKind) -> &'static Regex {
    match kind {
        IdKind::Doi => &DOI_TAG_RE,
        IdKind::Pmid => &PMID_TAG_RE,
        IdKind::Pmcid => &PMCID_TAG_RE,
    }
}

pub fn note_tag(kind: IdKind, value: &str) -> String {
    format!("{{:{}:{}}}", kind.label(), value)
}

/// Value of the first tag of `kind` in `note`.
pub fn find_tag(note: &str, kind: IdKind) -> Option<&str> {
    tag_pattern(kind)
        .captures(note)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Annotation text after merging a `kind` tag carrying `value`.
pub fn merge_tag(
    note: Option<&str>,
    kind: IdKind,
    value: &str,
    overwrite: bool,
    marker: &str,
) -> String {
    let tag = note_tag(kind, value);
    let note = note.unwrap_or_default();

    if find_tag(note, kind).is_some() {
        if overwrite {
            return tag_pattern(kind)
                .replace_all(note, NoExpand(&tag))
                .into_owned();
        }
        return note.to_string();
    }

    if !marker.is_empty() && note.contains(marker) {
        return note.replacen(marker, &format!("{marker}{tag} "), 1);
    }

    if !note.trim().is_empty() {
        return format!("{tag} {note}");
    }

    tag
}
