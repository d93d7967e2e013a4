//! In-process document search: tokenize uploaded documents into an inverted
//! index, answer prefix queries ranked by term frequency, and highlight the
//! matches. State is persisted as a whole through a key-value blob store.

pub mod decode;
pub mod engine;
pub mod error;
pub mod highlight;
pub mod index;
pub mod ingest;
pub mod persist;
pub mod store;
pub mod tokenizer;

pub use engine::{SearchEngine, SearchResult, DEFAULT_SUGGESTION_LIMIT};
pub use error::{Error, Result};
pub use index::{InvertedIndex, Posting};
pub use store::{Document, DocumentStore};
