use serde::{Deserialize, Serialize};

pub const DOC_TABLE_SIZE: usize = 50_000;
pub const GLOBAL_TABLE_SIZE: usize = 350_000;
pub const STOPWORD_TABLE_SIZE: usize = 3_000;

/// Logarithm used for inverse document frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdfBase {
    #[default]
    Log10,
    Ln,
}

impl IdfBase {
    /// idf = 1 + log(total_docs / doc_count)
    pub fn idf(self, total_docs: u32, doc_count: u32) -> f64 {
        let ratio = total_docs as f64 / doc_count.max(1) as f64;
        match self {
            IdfBase::Log10 => 1.0 + ratio.log10(),
            IdfBase::Ln => 1.0 + ratio.ln(),
        }
    }
}

/// Parameters of one indexing run. Persisted in `meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub doc_table_size: usize,
    pub global_table_size: usize,
    pub stopword_table_size: usize,
    #[serde(default)]
    pub idf_base: IdfBase,
    #[serde(default)]
    pub stem: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            doc_table_size: DOC_TABLE_SIZE,
            global_table_size: GLOBAL_TABLE_SIZE,
            stopword_table_size: STOPWORD_TABLE_SIZE,
            idf_base: IdfBase::Log10,
            stem: false,
        }
    }
}
