use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row, params};
use tracing::debug;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::models::{Contributor, Document, IdKind};
use crate::storage::{Annotation, DocumentStore};

/// SQLite handle on a Mendeley Desktop database.
///
/// The schema is owned by Mendeley; this type never creates or migrates tables.
pub struct MendeleyDatabase {
    conn: Connection,
}

impl MendeleyDatabase {
    /// Open an existing database file for reading and writing.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::DatabaseNotFound(path.to_path_buf()));
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)?;
        Ok(Self { conn })
    }

    /// Wrap an already-open connection (used by tests with in-memory stores).
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    fn urls(&self, document_id: i64) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url FROM DocumentUrls WHERE documentId = ?1 ORDER BY position")?;
        let rows = stmt.query_map(params![document_id], |row| text_column(row, 0))?;

        let mut urls = Vec::new();
        for url in rows {
            if let Some(url) = url? {
                urls.push(url);
            }
        }
        Ok(urls)
    }
}

impl DocumentStore for MendeleyDatabase {
    fn documents(&self, document_type: &str) -> Result<Vec<Document>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, year, doi, pmid FROM Documents
             WHERE type = ?1 ORDER BY id DESC",
        )?;
        let rows = stmt.query_map(params![document_type], |row| {
            Ok(Document {
                id: row.get(0)?,
                title: text_column(row, 1)?,
                year: text_column(row, 2)?.and_then(|y| y.parse().ok()),
                doi: text_column(row, 3)?,
                pmid: text_column(row, 4)?,
                urls: Vec::new(),
            })
        })?;

        let mut documents = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        for doc in &mut documents {
            doc.urls = self.urls(doc.id)?;
        }
        debug!(count = documents.len(), document_type, "loaded documents");
        Ok(documents)
    }

    fn set_identifier(
        &self,
        document_id: i64,
        kind: IdKind,
        value: &str,
        overwrite: bool,
        modified: i64,
    ) -> Result<bool> {
        let column = kind
            .column()
            .ok_or_else(|| CoreError::UnstructuredKind(kind.label().to_string()))?;

        let sql = if overwrite {
            format!("UPDATE Documents SET {column} = ?1, modified = ?2 WHERE id = ?3")
        } else {
            format!(
                "UPDATE Documents SET {column} = ?1, modified = ?2
                 WHERE id = ?3 AND ({column} IS NULL OR {column} = '')"
            )
        };
        let changed = self
            .conn
            .execute(&sql, params![value, modified, document_id])?;
        Ok(changed > 0)
    }

    fn annotation(&self, document_id: i64) -> Result<Annotation> {
        let mut stmt = self.conn.prepare(
            "SELECT id, text FROM DocumentNotes WHERE documentId = ?1 ORDER BY id LIMIT 1",
        )?;
        let mut rows = stmt.query(params![document_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Annotation {
                text: text_column(row, 1)?,
                note_id: Some(row.get(0)?),
            });
        }

        let mut stmt = self
            .conn
            .prepare("SELECT note FROM Documents WHERE id = ?1 LIMIT 1")?;
        let mut rows = stmt.query(params![document_id])?;
        match rows.next()? {
            Some(row) => Ok(Annotation {
                text: text_column(row, 0)?,
                note_id: None,
            }),
            None => Err(CoreError::DocumentNotFound(document_id)),
        }
    }

    fn write_annotation(&self, document_id: i64, note_id: Option<i64>, text: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        let updated = match note_id {
            Some(id) => tx.execute(
                "UPDATE DocumentNotes SET text = ?1, baseNote = ?1 WHERE id = ?2 AND documentId = ?3",
                params![text, id, document_id],
            )?,
            None => 0,
        };
        if updated == 0 {
            let uuid = format!("{{{}}}", Uuid::new_v4());
            tx.execute(
                "INSERT INTO DocumentNotes (uuid, documentId, text, baseNote)
                 VALUES (?1, ?2, ?3, ?3)",
                params![uuid, document_id, text],
            )?;
            debug!(document_id, %uuid, "inserted note row");
        }
        tx.execute(
            "UPDATE Documents SET note = ?1 WHERE id = ?2",
            params![text, document_id],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn contributors(&self) -> Result<Vec<Contributor>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, documentId, firstNames, lastName FROM DocumentContributors ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Contributor {
                id: row.get(0)?,
                document_id: row.get(1)?,
                first_names: text_column(row, 2)?,
                last_name: text_column(row, 3)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn set_first_names(&self, contributor_id: i64, first_names: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE DocumentContributors SET firstNames = ?1 WHERE id = ?2",
            params![first_names, contributor_id],
        )?;
        Ok(())
    }
}

/// Reads a column as text whatever its storage class; Mendeley keeps PMIDs
/// as integers.
fn text_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    })
}
