use crate::error::{Error, Result};
use crate::tokenizer::count_words;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub content: String,
    /// Whitespace-delimited word count of the raw content.
    pub word_count: usize,
}

/// Issues millisecond timestamps as ids, bumping past the last issued value
/// so two documents created in the same millisecond never collide.
#[derive(Debug, Default)]
struct IdClock {
    last: i128,
}

impl IdClock {
    fn next(&mut self) -> String {
        let now = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        self.last = now.max(self.last + 1);
        self.last.to_string()
    }

    fn observe(&mut self, id: &str) {
        if let Ok(value) = id.parse::<i128>() {
            self.last = self.last.max(value);
        }
    }
}

#[derive(Debug, Default)]
pub struct DocumentStore {
    docs: Vec<Document>,
    by_id: HashMap<String, usize>,
    clock: IdClock,
}

impl DocumentStore {
    pub fn new() -> Self { Self::default() }

    /// Rebuild a store from persisted documents, keeping their order.
    pub fn from_documents(documents: Vec<Document>) -> Self {
        let mut store = Self::new();
        for doc in documents {
            store.commit(doc);
        }
        store
    }

    pub fn insert(&mut self, name: &str, content: &str) -> Document {
        let doc = self.stage(name, content);
        self.commit(doc.clone());
        doc
    }

    /// Build a document with a fresh id without storing it.
    pub fn stage(&mut self, name: &str, content: &str) -> Document {
        Document {
            id: self.clock.next(),
            name: name.to_string(),
            content: content.to_string(),
            word_count: count_words(content),
        }
    }

    pub fn commit(&mut self, doc: Document) {
        self.clock.observe(&doc.id);
        self.by_id.insert(doc.id.clone(), self.docs.len());
        tracing::debug!(id = %doc.id, name = %doc.name, "stored document");
        self.docs.push(doc);
    }

    /// Drop a committed document. Only used to roll back a failed ingestion,
    /// so the document is normally the last one.
    pub(crate) fn remove(&mut self, id: &str) -> Option<Document> {
        let slot = self.by_id.remove(id)?;
        let doc = self.docs.remove(slot);
        for pos in self.by_id.values_mut() {
            if *pos > slot {
                *pos -= 1;
            }
        }
        Some(doc)
    }

    /// All documents in insertion order.
    pub fn get_all(&self) -> &[Document] { &self.docs }

    pub fn get_by_id(&self, id: &str) -> Result<&Document> {
        self.by_id
            .get(id)
            .map(|&slot| &self.docs[slot])
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))
    }

    pub fn len(&self) -> usize { self.docs.len() }

    pub fn is_empty(&self) -> bool { self.docs.is_empty() }

    /// Remove every document. Ids keep increasing afterwards.
    pub fn clear(&mut self) {
        self.docs.clear();
        self.by_id.clear();
    }

    pub(crate) fn take_all(&mut self) -> Vec<Document> {
        self.by_id.clear();
        std::mem::take(&mut self.docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_lookup() {
        let mut store = DocumentStore::new();
        let doc = store.insert("notes.txt", "Hi, a cat-nap!");
        assert_eq!(doc.word_count, 3);
        assert_eq!(store.get_by_id(&doc.id).unwrap(), &doc);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let mut store = DocumentStore::new();
        let ids: Vec<i128> = (0..50)
            .map(|i| store.insert(&format!("{i}.txt"), "x").id.parse().unwrap())
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn ids_continue_after_loaded_documents() {
        let future = Document { id: "99999999999999".into(), name: "a".into(), content: String::new(), word_count: 0 };
        let mut store = DocumentStore::from_documents(vec![future]);
        let next = store.insert("b", "");
        assert_eq!(next.id, "100000000000000");
    }

    #[test]
    fn unknown_id_is_not_found() {
        let store = DocumentStore::new();
        assert!(matches!(store.get_by_id("42"), Err(Error::DocumentNotFound(id)) if id == "42"));
    }

    #[test]
    fn remove_keeps_other_lookups_valid() {
        let mut store = DocumentStore::new();
        let a = store.insert("a", "one");
        let b = store.insert("b", "two");
        let c = store.insert("c", "three");
        assert_eq!(store.remove(&b.id), Some(b.clone()));
        assert_eq!(store.get_by_id(&c.id).unwrap().name, "c");
        assert_eq!(store.get_by_id(&a.id).unwrap().name, "a");
        assert!(store.get_by_id(&b.id).is_err());
        let names: Vec<&str> = store.get_all().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn clear_is_repeatable() {
        let mut store = DocumentStore::new();
        store.insert("a", "one");
        store.clear();
        store.clear();
        assert!(store.is_empty());
    }
}
