use crate::decode::DecoderRegistry;
use crate::engine::SearchEngine;
use crate::error::Error;
use crate::persist::Persistence;
use crate::store::Document;

/// Outcome of an upload batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub added: Vec<Document>,
    pub failed: Vec<(String, Error)>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool { self.failed.is_empty() }
}

/// Decode and add files one at a time. A file that cannot be decoded or
/// stored is logged and recorded; the rest of the batch still runs.
pub fn ingest_batch<P, I, B>(engine: &mut SearchEngine<P>, decoders: &DecoderRegistry, files: I) -> BatchReport
where
    P: Persistence,
    I: IntoIterator<Item = (String, B)>,
    B: AsRef<[u8]>,
{
    let mut report = BatchReport::default();
    for (name, bytes) in files {
        let outcome = decoders
            .decode(&name, bytes.as_ref())
            .and_then(|content| engine.add_document(&name, &content));
        match outcome {
            Ok(doc) => report.added.push(doc),
            Err(err) => {
                tracing::warn!(file = %name, error = %err, "skipping file");
                report.failed.push((name, err));
            }
        }
    }
    tracing::info!(added = report.added.len(), failed = report.failed.len(), "ingested batch");
    report
}
