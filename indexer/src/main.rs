use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docfind_core::decode::DecoderRegistry;
use docfind_core::highlight::{count_occurrences, HighlightConfig, Highlighter};
use docfind_core::ingest::ingest_batch;
use docfind_core::persist::{BlobPersistence, SledStore};
use docfind_core::{SearchEngine, DEFAULT_SUGGESTION_LIMIT};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt};
use walkdir::WalkDir;

use std::fs;
use std::path::{Path, PathBuf};

type Engine = SearchEngine<BlobPersistence<SledStore>>;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Index documents and run prefix searches over them", long_about = None)]
struct Cli {
    /// Data directory holding the persisted documents and index
    #[arg(long, env = "DOCFIND_DATA", default_value = "./docfind-data", global = true)]
    data: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add files, or every supported file under a directory
    Add {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Prefix search, ranked by term frequency
    Search {
        query: String,
        /// Print results as JSON lines
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print a document, optionally highlighting a term
    Show {
        id: String,
        #[arg(long)]
        highlight: Option<String>,
    },
    /// List stored documents
    List,
    /// Complete a prefix from the indexed terms
    Suggest {
        prefix: String,
        #[arg(long, default_value_t = DEFAULT_SUGGESTION_LIMIT)]
        limit: usize,
    },
    /// Remove every document and the whole index
    Clear,
}

#[derive(Serialize)]
struct SearchLine<'a> {
    id: &'a str,
    name: &'a str,
    frequency: u32,
    occurrences: usize,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    let persistence = BlobPersistence::open_sled(&cli.data)
        .with_context(|| format!("opening data directory {}", cli.data))?;
    let mut engine = SearchEngine::open(persistence)?;

    match cli.command {
        Commands::Add { paths } => add(&mut engine, &paths)?,
        Commands::Search { query, json } => search(&engine, &query, json)?,
        Commands::Show { id, highlight } => {
            let doc = engine.document(&id)?;
            // plain newlines on a terminal
            let highlighter = Highlighter::new(HighlightConfig::new().tag("mark").line_break("\n"));
            println!("# {} ({} words)", doc.name, doc.word_count);
            println!("{}", highlighter.highlight(&doc.content, highlight.as_deref().unwrap_or("")));
        }
        Commands::List => {
            for doc in engine.documents() {
                println!("{}\t{}\t{} words", doc.id, doc.name, doc.word_count);
            }
            println!("{} documents", engine.document_count());
        }
        Commands::Suggest { prefix, limit } => {
            for term in engine.suggest(&prefix, limit) {
                println!("{term}");
            }
        }
        Commands::Clear => engine.clear_all()?,
    }

    engine.close()?;
    Ok(())
}

fn add(engine: &mut Engine, paths: &[String]) -> Result<()> {
    let decoders = DecoderRegistry::new();
    let files = collect_files(paths, &decoders);
    tracing::info!(files = files.len(), "collected input files");

    // one file in memory at a time
    let inputs = files.into_iter().filter_map(|path| {
        let name = path.to_string_lossy().into_owned();
        match fs::read(&path) {
            Ok(bytes) => Some((name, bytes)),
            Err(err) => {
                tracing::warn!(file = %name, error = %err, "cannot read file");
                None
            }
        }
    });
    let report = ingest_batch(engine, &decoders, inputs);

    for doc in &report.added {
        println!("added {}\t{}\t{} words", doc.id, doc.name, doc.word_count);
    }
    for (name, err) in &report.failed {
        eprintln!("skipped {name}: {err}");
    }
    Ok(())
}

fn search(engine: &Engine, query: &str, json: bool) -> Result<()> {
    let results = engine.search(query)?;
    if results.is_empty() && !json {
        println!("No results found");
        return Ok(());
    }
    for hit in &results {
        let occurrences = count_occurrences(&hit.document.content, &hit.search_term);
        if json {
            let line = SearchLine { id: &hit.document.id, name: &hit.document.name, frequency: hit.frequency, occurrences };
            println!("{}", serde_json::to_string(&line)?);
        } else {
            println!("{}\t{} ({} occurrences)", hit.document.id, hit.document.name, occurrences);
        }
    }
    Ok(())
}

/// Expand directories and keep the files the registry can decode. Explicit
/// file arguments are always kept so that unsupported ones get reported.
fn collect_files(paths: &[String], decoders: &DecoderRegistry) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    for input in paths {
        let input_path = Path::new(input);
        if input_path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input_path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| decoders.supports(&p.to_string_lossy()))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input_path.to_path_buf());
        }
    }
    files
}
