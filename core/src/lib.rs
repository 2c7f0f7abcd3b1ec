pub mod config;
pub mod error;
pub mod hashtable;
pub mod persist;
pub mod pipeline;
pub mod record;
pub mod search;
pub mod stopwords;
pub mod tokenizer;

pub use config::{IdfBase, IndexConfig};
pub use error::{Error, Result};
pub use hashtable::{HashTable, Merge};
pub use pipeline::{index_directory, IndexSummary};
pub use search::{search, IndexReader, SearchHit};

pub type DocId = u32;
