use crate::store::Document;
use crate::tokenizer::term_frequencies;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Bound;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: String,
    pub frequency: u32,
    /// Copy of the document name so postings can be listed without a store lookup.
    pub doc_name: String,
}

/// Postings produced for one document, not yet applied to the index.
#[derive(Debug, Clone)]
pub struct PostingBatch {
    doc_id: String,
    entries: Vec<(String, Posting)>,
}

impl PostingBatch {
    pub fn doc_id(&self) -> &str { &self.doc_id }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(t, _)| t.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct TermEntry {
    /// Order in which the term was first indexed.
    seq: u64,
    postings: Vec<Posting>,
}

/// Term → postings map. Prefix lookups return terms in the order they were
/// first indexed; `iter` walks them lexicographically. Postings of a term stay
/// in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvertedIndex {
    terms: BTreeMap<String, TermEntry>,
    next_seq: u64,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Tokenize `doc.content` and append one posting per distinct term.
    pub fn index_document(&mut self, doc: &Document) {
        let batch = Self::stage(doc);
        self.apply(&batch);
    }

    /// Compute the postings of `doc` without touching the index.
    pub fn stage(doc: &Document) -> PostingBatch {
        let entries = term_frequencies(&doc.content)
            .into_iter()
            .map(|(term, frequency)| {
                let posting = Posting { doc_id: doc.id.clone(), frequency, doc_name: doc.name.clone() };
                (term, posting)
            })
            .collect();
        PostingBatch { doc_id: doc.id.clone(), entries }
    }

    pub fn apply(&mut self, batch: &PostingBatch) {
        for (term, posting) in &batch.entries {
            let next_seq = &mut self.next_seq;
            let entry = self.terms.entry(term.clone()).or_insert_with(|| {
                let seq = *next_seq;
                *next_seq += 1;
                TermEntry { seq, postings: Vec::new() }
            });
            entry.postings.push(posting.clone());
        }
        tracing::debug!(doc_id = %batch.doc_id, terms = batch.len(), "indexed document");
    }

    /// Undo an applied batch. Only the last posting of each term is
    /// inspected, so batches must be reverted in reverse order of application.
    pub fn revert(&mut self, batch: &PostingBatch) {
        for (term, _) in &batch.entries {
            let emptied = match self.terms.get_mut(term) {
                Some(TermEntry { postings, .. }) => {
                    if postings.last().is_some_and(|p| p.doc_id == batch.doc_id) {
                        postings.pop();
                    }
                    postings.is_empty()
                }
                None => false,
            };
            if emptied {
                self.terms.remove(term);
            }
        }
        tracing::debug!(doc_id = %batch.doc_id, "reverted postings");
    }

    /// Every indexed term that starts with `prefix`, in the order the terms
    /// were first indexed. The caller lowercases the prefix.
    pub fn prefix_lookup(&self, prefix: &str) -> Vec<&str> {
        let mut matches: Vec<(u64, &str)> = self
            .terms
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(term, _)| term.starts_with(prefix))
            .map(|(term, entry)| (entry.seq, term.as_str()))
            .collect();
        matches.sort_unstable_by_key(|(seq, _)| *seq);
        matches.into_iter().map(|(_, term)| term).collect()
    }

    pub fn postings(&self, term: &str) -> &[Posting] {
        self.terms.get(term).map(|e| e.postings.as_slice()).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Posting])> {
        self.terms.iter().map(|(t, e)| (t.as_str(), e.postings.as_slice()))
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }

    pub fn clear(&mut self) {
        self.terms.clear();
        self.next_seq = 0;
    }
}
