use anyhow::Result;
use clap::{Parser, ValueEnum};
use slotdex_core::{IndexReader, SearchHit};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "query")]
#[command(about = "Show which indexed documents are most relevant to a query", long_about = None)]
struct Args {
    /// Query words
    query: Vec<String>,
    /// Directory holding dict, post and map files
    #[arg(short = 'd', long = "index", default_value = "./index")]
    index: PathBuf,
    /// Number of results to show
    #[arg(short = 'n', long, default_value_t = 10)]
    num_results: usize,
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

fn render_text(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No matches found\n".to_string();
    }
    hits.iter().map(|h| format!("{}: {} (weight {})\n", h.rank, h.filename, h.weight)).collect()
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let args = Args::parse();

    let mut reader = IndexReader::open(&args.index)?;
    let hits = reader.search(&args.query.join(" "), args.num_results)?;
    tracing::debug!(hits = hits.len(), "search finished");

    match args.format {
        Format::Text => print!("{}", render_text(&hits)),
        Format::Json => println!("{}", serde_json::to_string_pretty(&hits)?),
    }
    Ok(())
}
