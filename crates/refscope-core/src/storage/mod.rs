pub mod backup;
pub mod database;
pub mod location;

use crate::error::Result;
use crate::models::{Contributor, Document, IdKind};

/// Current annotation blob of a document and where it was read from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    pub text: Option<String>,
    /// The note row the text came from; `None` when it came from the document
    /// itself.
    pub note_id: Option<i64>,
}

/// Read/write access to the reference manager's document store.
///
/// The store's schema belongs to the reference manager. Implementations only
/// update existing documents; they never create or delete them.
pub trait DocumentStore {
    /// Documents of one type, newest (highest id) first, with their URLs.
    fn documents(&self, document_type: &str) -> Result<Vec<Document>>;

    /// Sets a structured identifier column and bumps `modified`.
    ///
    /// Without `overwrite` only an empty column is written. Returns whether a
    /// row changed.
    fn set_identifier(
        &self,
        document_id: i64,
        kind: IdKind,
        value: &str,
        overwrite: bool,
        modified: i64,
    ) -> Result<bool>;

    fn annotation(&self, document_id: i64) -> Result<Annotation>;

    /// Replaces the text of note row `note_id`, or inserts a note row when
    /// `None`. Other note rows of the document are left alone.
    fn write_annotation(&self, document_id: i64, note_id: Option<i64>, text: &str) -> Result<()>;

    fn contributors(&self) -> Result<Vec<Contributor>>;

    fn set_first_names(&self, contributor_id: i64, first_names: &str) -> Result<()>;
}
