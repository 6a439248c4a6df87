use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use search_core::persist::{load_index, load_json_index, load_meta, save_index, IndexPaths};
use search_core::{search_with, DocCount, SearchHit, SearchOptions};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "tfidf-search")]
#[command(about = "Query and manage TF-IDF inverted indexes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank documents in an index against a free-text query
    Query {
        /// Index directory
        #[arg(long, default_value = "./index")]
        index: PathBuf,
        /// Number of results to print
        #[arg(short, default_value_t = 10)]
        k: usize,
        /// Document count used for idf: "docs" (distinct documents) or "terms" (legacy)
        #[arg(long, default_value = "docs")]
        doc_count: DocCount,
        /// Print results as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
        /// Query text
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Print term, document and posting counts of an index
    Inspect {
        /// Index directory
        #[arg(long, default_value = "./index")]
        index: PathBuf,
    },
    /// Convert a JSON term -> postings mapping into an index directory
    Import {
        /// JSON file mapping each term to [doc_id, title, weight] postings
        #[arg(long)]
        input: PathBuf,
        /// Output index directory
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Serialize)]
struct QueryOutput<'a> {
    query: &'a str,
    total_hits: usize,
    results: &'a [SearchHit],
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Query { index, k, doc_count, json, text } => run_query(&index, k, doc_count, json, &text.join(" ")),
        Commands::Inspect { index } => inspect(&index),
        Commands::Import { input, output } => import(&input, &output),
    }
}

fn run_query(index_dir: &Path, k: usize, doc_count: DocCount, json: bool, query: &str) -> Result<()> {
    let index = load_index(&IndexPaths::new(index_dir)).with_context(|| format!("loading {}", index_dir.display()))?;
    let hits = search_with(query, &index, &SearchOptions { doc_count, limit: None });
    let total_hits = hits.len();
    let shown = &hits[..k.min(total_hits)];

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &QueryOutput { query, total_hits, results: shown })?;
        writeln!(out)?;
    } else {
        write_hits(&mut out, query, shown, total_hits)?;
    }
    Ok(())
}

fn write_hits<W: Write>(out: &mut W, query: &str, shown: &[SearchHit], total_hits: usize) -> io::Result<()> {
    if shown.is_empty() {
        return writeln!(out, "no results for {query:?}");
    }
    for (rank, hit) in shown.iter().enumerate() {
        writeln!(out, "{:>3}  {:.6}  {:>8}  {}", rank + 1, hit.score, hit.doc_id, hit.title)?;
    }
    writeln!(out, "{} of {} hits", shown.len(), total_hits)
}

fn inspect(index_dir: &Path) -> Result<()> {
    let paths = IndexPaths::new(index_dir);
    let meta = load_meta(&paths)?;
    let index = load_index(&paths)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "index:      {}", index_dir.display())?;
    writeln!(out, "version:    {}", meta.version)?;
    writeln!(out, "created_at: {}", meta.created_at)?;
    writeln!(out, "terms:      {}", index.num_terms())?;
    writeln!(out, "documents:  {}", index.num_docs())?;
    writeln!(out, "postings:   {}", index.num_postings())?;
    Ok(())
}

fn import(input: &Path, output: &Path) -> Result<()> {
    let index = load_json_index(input).with_context(|| format!("importing {}", input.display()))?;
    tracing::info!(num_terms = index.num_terms(), num_docs = index.num_docs(), "parsed term mapping");
    save_index(&IndexPaths::new(output), &index)?;
    tracing::info!(output = %output.display(), "import complete");
    Ok(())
}
