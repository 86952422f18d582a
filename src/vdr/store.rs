use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::anyhow;

use crate::document::Document;
use crate::error::Error;

/// Shared `did → Document` table.
///
/// Clones share the same table. Writes are last-writer-wins; callers wanting
/// isolation (such as test harnesses) should construct their own store or call
/// [`DocumentStore::reset`].
#[derive(Clone, Debug, Default)]
pub struct DocumentStore {
    documents: Arc<RwLock<HashMap<String, Document>>>,
}

impl DocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the document stored for a DID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Other`] if the lock is poisoned.
    pub fn get(&self, did: &str) -> crate::Result<Option<Document>> {
        let documents = self.documents.read().map_err(|_| poisoned())?;
        Ok(documents.get(did).cloned())
    }

    /// Store a document, replacing any previous version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Other`] if the lock is poisoned.
    pub fn put(&self, doc: Document) -> crate::Result<()> {
        let mut documents = self.documents.write().map_err(|_| poisoned())?;
        documents.insert(doc.id.clone(), doc);
        Ok(())
    }

    /// Store a document only if none exists for its DID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyExists`] if the DID is taken.
    pub fn insert_new(&self, doc: Document) -> crate::Result<()> {
        let mut documents = self.documents.write().map_err(|_| poisoned())?;
        if documents.contains_key(&doc.id) {
            return Err(Error::AlreadyExists(doc.id));
        }
        documents.insert(doc.id.clone(), doc);
        Ok(())
    }

    /// Remove the document for a DID, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Other`] if the lock is poisoned.
    pub fn remove(&self, did: &str) -> crate::Result<Option<Document>> {
        let mut documents = self.documents.write().map_err(|_| poisoned())?;
        Ok(documents.remove(did))
    }

    /// Number of stored documents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Other`] if the lock is poisoned.
    pub fn len(&self) -> crate::Result<usize> {
        Ok(self.documents.read().map_err(|_| poisoned())?.len())
    }

    /// Returns `true` if no documents are stored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Other`] if the lock is poisoned.
    pub fn is_empty(&self) -> crate::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Remove every document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Other`] if the lock is poisoned.
    pub fn reset(&self) -> crate::Result<()> {
        self.documents.write().map_err(|_| poisoned())?.clear();
        Ok(())
    }
}

fn poisoned() -> Error {
    Error::Other(anyhow!("document store lock poisoned"))
}

#[cfg(test)]
mod test {
    use super::*;

    fn doc(id: &str) -> Document {
        Document {
            id: id.into(),
            ..Document::default()
        }
    }

    #[test]
    fn shared_between_clones() {
        let store = DocumentStore::new();
        let clone = store.clone();
        clone.put(doc("did:key:a")).expect("should put");
        assert!(store.get("did:key:a").expect("should get").is_some());

        store.reset().expect("should reset");
        assert_eq!(clone.len().expect("should count"), 0);
    }

    #[test]
    fn insert_new_once() {
        let store = DocumentStore::new();
        store.insert_new(doc("did:key:a")).expect("should insert");
        let err = store.insert_new(doc("did:key:a")).expect_err("should fail");
        assert!(matches!(err, Error::AlreadyExists(_)));

        assert!(store.remove("did:key:a").expect("should remove").is_some());
        store.insert_new(doc("did:key:a")).expect("should insert again");
    }
}
