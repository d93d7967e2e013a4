use crate::error::{Error, Result};
use crate::index::InvertedIndex;
use crate::persist::Persistence;
use crate::store::{Document, DocumentStore};
use serde::Serialize;

/// Suggestions shown under the search box.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub document: Document,
    pub frequency: u32,
    /// The normalized query that produced this result.
    pub search_term: String,
}

/// Document store and inverted index kept in sync and persisted through `P`
/// after every mutation.
///
/// Mutating calls take `&mut self`; callers that share an engine must
/// serialize access themselves.
pub struct SearchEngine<P: Persistence> {
    store: DocumentStore,
    index: InvertedIndex,
    persistence: P,
}

impl<P: Persistence> SearchEngine<P> {
    /// Load persisted state once and build the in-memory engine.
    pub fn open(persistence: P) -> Result<Self> {
        let snapshot = persistence.load()?;
        let store = DocumentStore::from_documents(snapshot.documents);
        tracing::info!(num_docs = store.len(), num_terms = snapshot.index.len(), "opened search engine");
        Ok(Self { store, index: snapshot.index, persistence })
    }

    /// Store, index and persist a document as one operation. If persisting
    /// fails, the document and its postings are removed again.
    pub fn add_document(&mut self, name: &str, content: &str) -> Result<Document> {
        let doc = self.store.stage(name, content);
        let batch = InvertedIndex::stage(&doc);

        self.store.commit(doc.clone());
        self.index.apply(&batch);

        if let Err(err) = self.flush() {
            self.index.revert(&batch);
            self.store.remove(&doc.id);
            tracing::warn!(id = %doc.id, name, error = %err, "rolled back document after failed save");
            return Err(err);
        }
        tracing::info!(id = %doc.id, name, words = doc.word_count, terms = batch.len(), "added document");
        Ok(doc)
    }

    /// Prefix search ranked by in-document frequency, highest first. Ties
    /// keep the order terms were first indexed, then posting insertion
    /// order. A document matching several terms is returned once per term.
    pub fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let term = normalize_query(query)?;
        let mut results = Vec::new();
        for matched in self.index.prefix_lookup(&term) {
            for posting in self.index.postings(matched) {
                // postings can outlive their document; skip those
                let Ok(document) = self.store.get_by_id(&posting.doc_id) else {
                    continue;
                };
                results.push(SearchResult {
                    document: document.clone(),
                    frequency: posting.frequency,
                    search_term: term.clone(),
                });
            }
        }
        results.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        tracing::debug!(query = %term, hits = results.len(), "search");
        Ok(results)
    }

    /// Indexed terms strictly longer than `prefix`, for autocompletion.
    pub fn suggest(&self, prefix: &str, limit: usize) -> Vec<String> {
        let prefix = prefix.trim().to_lowercase();
        if prefix.is_empty() {
            return Vec::new();
        }
        self.index
            .prefix_lookup(&prefix)
            .into_iter()
            .filter(|term| term.len() > prefix.len())
            .take(limit)
            .map(str::to_string)
            .collect()
    }

    /// Remove every document and term and persist the empty state. The
    /// previous state is restored if persisting fails.
    pub fn clear_all(&mut self) -> Result<()> {
        let documents = self.store.take_all();
        let index = std::mem::take(&mut self.index);
        if let Err(err) = self.flush() {
            for doc in documents {
                self.store.commit(doc);
            }
            self.index = index;
            return Err(err);
        }
        tracing::info!(removed = documents.len(), "cleared all documents");
        Ok(())
    }

    pub fn documents(&self) -> &[Document] { self.store.get_all() }

    pub fn document(&self, id: &str) -> Result<&Document> { self.store.get_by_id(id) }

    pub fn document_count(&self) -> usize { self.store.len() }

    pub fn index(&self) -> &InvertedIndex { &self.index }

    /// Write the full current state.
    pub fn flush(&self) -> Result<()> {
        self.persistence.save(self.store.get_all(), &self.index)
    }

    /// Flush and hand back the persistence adapter.
    pub fn close(self) -> Result<P> {
        self.flush()?;
        tracing::info!(num_docs = self.store.len(), "closed search engine");
        Ok(self.persistence)
    }
}

fn normalize_query(query: &str) -> Result<String> {
    let term = query.trim().to_lowercase();
    if term.is_empty() {
        return Err(Error::EmptyQuery);
    }
    Ok(term)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::{BlobPersistence, MemoryStore, Snapshot};
    use std::cell::Cell;

    fn engine() -> SearchEngine<BlobPersistence<MemoryStore>> {
        SearchEngine::open(BlobPersistence::new(MemoryStore::new())).unwrap()
    }

    /// Persistence that fails once `fail` is set.
    #[derive(Default)]
    struct Flaky {
        fail: Cell<bool>,
        saves: Cell<usize>,
    }

    impl Persistence for Flaky {
        fn load(&self) -> Result<Snapshot> { Ok(Snapshot::default()) }
        fn save(&self, _: &[Document], _: &InvertedIndex) -> Result<()> {
            if self.fail.get() {
                return Err(Error::Io(std::io::Error::other("disk full")));
            }
            self.saves.set(self.saves.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn added_document_is_retrievable() {
        let mut engine = engine();
        let doc = engine.add_document("a.txt", "some content here").unwrap();
        assert_eq!(engine.document(&doc.id).unwrap(), &doc);
        assert_eq!(engine.document_count(), 1);
    }

    #[test]
    fn ranks_by_frequency() {
        let mut engine = engine();
        let b = engine.add_document("b.txt", "cat cat").unwrap();
        let a = engine.add_document("a.txt", "cat cat cat cat cat").unwrap();
        let results = engine.search("cat").unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.id, a.id);
        assert_eq!(results[0].frequency, 5);
        assert_eq!(results[1].document.id, b.id);
        assert_eq!(results[1].search_term, "cat");
    }

    #[test]
    fn query_is_trimmed_and_lowercased() {
        let mut engine = engine();
        engine.add_document("a.txt", "Rustacean").unwrap();
        let results = engine.search("  RUST ").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].search_term, "rust");
    }

    #[test]
    fn blank_query_is_rejected() {
        let mut engine = engine();
        engine.add_document("a.txt", "content").unwrap();
        assert!(matches!(engine.search(""), Err(Error::EmptyQuery)));
        assert!(matches!(engine.search(" \t"), Err(Error::EmptyQuery)));
    }

    #[test]
    fn document_appears_once_per_matching_term() {
        let mut engine = engine();
        engine.add_document("a.txt", "cat catalog catalog").unwrap();
        let results = engine.search("cat").unwrap();
        let freqs: Vec<u32> = results.iter().map(|r| r.frequency).collect();
        assert_eq!(freqs, vec![2, 1]);
        assert!(results.iter().all(|r| r.document.name == "a.txt"));
    }

    #[test]
    fn equal_frequencies_keep_insertion_order() {
        let mut engine = engine();
        let first = engine.add_document("1.txt", "dog").unwrap();
        let second = engine.add_document("2.txt", "dog").unwrap();
        let ids: Vec<String> = engine.search("dog").unwrap().into_iter().map(|r| r.document.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[test]
    fn ties_across_terms_follow_term_insertion_order() {
        let mut engine = engine();
        engine.add_document("first.txt", "catalog").unwrap();
        engine.add_document("second.txt", "cat").unwrap();
        let names: Vec<String> = engine.search("cat").unwrap().into_iter().map(|r| r.document.name).collect();
        assert_eq!(names, vec!["first.txt", "second.txt"]);
    }

    #[test]
    fn dangling_postings_are_skipped() {
        let kept = Document { id: "1".into(), name: "kept.txt".into(), content: "orphan kept".into(), word_count: 2 };
        let gone = Document { id: "2".into(), name: "gone.txt".into(), content: "orphan".into(), word_count: 1 };
        let mut index = InvertedIndex::new();
        index.index_document(&gone);
        index.index_document(&kept);
        let persistence = BlobPersistence::new(MemoryStore::new());
        persistence.save(&[kept.clone()], &index).unwrap();

        let engine = SearchEngine::open(persistence).unwrap();
        assert_eq!(engine.index().postings("orphan").len(), 2);
        let results = engine.search("orphan").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document, kept);
    }

    #[test]
    fn suggestions_are_longer_than_prefix_and_capped() {
        let mut engine = engine();
        engine.add_document("a.txt", "car cart carbon cargo carpet carrot").unwrap();
        let all = engine.suggest("Car", DEFAULT_SUGGESTION_LIMIT);
        assert_eq!(all, vec!["cart", "carbon", "cargo", "carpet", "carrot"]);
        assert_eq!(engine.suggest("car", 2).len(), 2);
        assert!(engine.suggest(" ", 5).is_empty());
    }

    #[test]
    fn failed_save_rolls_back_ingestion() {
        let mut engine = SearchEngine::open(Flaky::default()).unwrap();
        engine.add_document("kept.txt", "kept words").unwrap();
        engine.persistence.fail.set(true);

        let err = engine.add_document("lost.txt", "lost words").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(engine.document_count(), 1);
        assert!(engine.index().postings("lost").is_empty());
        assert_eq!(engine.index().postings("words").len(), 1);
    }

    #[test]
    fn failed_clear_restores_state() {
        let mut engine = SearchEngine::open(Flaky::default()).unwrap();
        let doc = engine.add_document("a.txt", "persisted text").unwrap();
        engine.persistence.fail.set(true);

        assert!(engine.clear_all().is_err());
        assert_eq!(engine.document(&doc.id).unwrap().name, "a.txt");
        assert_eq!(engine.search("pers").unwrap().len(), 1);
    }

    #[test]
    fn every_mutation_is_saved() {
        let mut engine = SearchEngine::open(Flaky::default()).unwrap();
        engine.add_document("a.txt", "one").unwrap();
        engine.clear_all().unwrap();
        engine.clear_all().unwrap();
        assert_eq!(engine.persistence.saves.get(), 3);
        assert_eq!(engine.document_count(), 0);
    }
}
