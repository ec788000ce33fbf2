pub mod annotation;
pub mod authors;
pub mod reconcile;

pub use annotation::{find_tag, merge_tag, note_tag};
pub use authors::normalize_first_names;
pub use reconcile::{
    AuthorReport, ReconcileOptions, ReconcileOutcome, ReconcileReport, RecordReconciler,
    candidates, legacy_url_doi,
};
