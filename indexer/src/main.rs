use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use slotdex_core::config::{DOC_TABLE_SIZE, GLOBAL_TABLE_SIZE, STOPWORD_TABLE_SIZE};
use slotdex_core::stopwords::StopwordSet;
use slotdex_core::tokenizer::Tokenizer;
use slotdex_core::{index_directory, IdfBase, IndexConfig};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build a hash-addressed inverted index from a directory of documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Idf {
    /// idf = 1 + log10(N/df)
    Log10,
    /// idf = 1 + ln(N/df)
    Ln,
}

impl From<Idf> for IdfBase {
    fn from(idf: Idf) -> Self {
        match idf {
            Idf::Log10 => IdfBase::Log10,
            Idf::Ln => IdfBase::Ln,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Index every file in the input directory into dict, post and map files
    Build {
        /// Directory of documents
        #[arg(long)]
        input: PathBuf,
        /// Existing directory that receives the index files
        #[arg(long)]
        output: PathBuf,
        /// Stopword file; the built-in English list is used when absent
        #[arg(long, conflicts_with = "no_stopwords")]
        stopwords: Option<PathBuf>,
        /// Index every word, stopwords included
        #[arg(long, default_value_t = false)]
        no_stopwords: bool,
        /// Slots in the per-document term table
        #[arg(long, default_value_t = DOC_TABLE_SIZE)]
        doc_table_size: usize,
        /// Slots in the global term table, and records in the dict file
        #[arg(long, default_value_t = GLOBAL_TABLE_SIZE)]
        global_table_size: usize,
        /// Slots in the stopword table
        #[arg(long, default_value_t = STOPWORD_TABLE_SIZE)]
        stopword_table_size: usize,
        #[arg(long, value_enum, default_value_t = Idf::Log10)]
        idf: Idf,
        /// Reduce terms to English stems
        #[arg(long, default_value_t = false)]
        stem: bool,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            output,
            stopwords,
            no_stopwords,
            doc_table_size,
            global_table_size,
            stopword_table_size,
            idf,
            stem,
        } => {
            let config = IndexConfig { doc_table_size, global_table_size, stopword_table_size, idf_base: idf.into(), stem };
            let tokenizer = Tokenizer::new(stem);
            let stop = match (stopwords, no_stopwords) {
                (_, true) => StopwordSet::empty(stopword_table_size),
                (Some(path), false) => StopwordSet::from_file(&path, stopword_table_size, &tokenizer)?,
                (None, false) => StopwordSet::english(stopword_table_size, &tokenizer)?,
            };
            let summary = index_directory(&input, &output, config, stop)?;
            tracing::info!(output = %output.display(), docs = summary.num_docs, terms = summary.num_terms, "done");
            Ok(())
        }
    }
}
