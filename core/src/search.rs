//! Query engine: hashed dictionary lookups straight into the index files.

use crate::error::{Error, Result};
use crate::hashtable::{hash_slot, rehash, HashTable};
use crate::persist::{load_meta_if_present, IndexPaths, MetaFile};
use crate::record::{
    decode_map_name, read_record, read_run, stored_term, DictionaryEntry, PostingEntry, DICT_RECORD_SIZE,
    MAP_RECORD_SIZE, POST_RECORD_SIZE,
};
use crate::tokenizer::Tokenizer;
use crate::DocId;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};

/// Results table slots per expected posting.
const RESULTS_LOAD: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub rank: usize,
    pub doc_id: DocId,
    pub filename: String,
    pub weight: u64,
}

/// A dictionary record that matched a query term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermMatch {
    pub term: String,
    pub doc_count: u32,
    pub posting_start: u64,
}

/// Read handles on one index directory. Each query opens its own.
pub struct IndexReader {
    dict: BufReader<File>,
    post: BufReader<File>,
    map: BufReader<File>,
    table_size: usize,
    meta: Option<MetaFile>,
}

fn open_file(path: PathBuf) -> Result<BufReader<File>> {
    match File::open(&path) {
        Ok(f) => Ok(BufReader::new(f)),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::InvalidPath(path)),
        Err(e) => Err(e.into()),
    }
}

impl IndexReader {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let paths = IndexPaths::new(dir);
        paths.ensure_dir()?;
        let dict = open_file(paths.dict())?;
        let dict_len = dict.get_ref().metadata()?.len();
        if dict_len == 0 || dict_len % DICT_RECORD_SIZE as u64 != 0 {
            return Err(Error::corrupt(format!(
                "dictionary length {dict_len} is not a positive multiple of {DICT_RECORD_SIZE}"
            )));
        }
        let table_size = (dict_len / DICT_RECORD_SIZE as u64) as usize;

        let meta = load_meta_if_present(&paths)?;
        if let Some(m) = &meta {
            if m.config.global_table_size != table_size {
                return Err(Error::corrupt(format!(
                    "dictionary holds {table_size} slots but meta.json says {}",
                    m.config.global_table_size
                )));
            }
        }

        Ok(Self { dict, post: open_file(paths.post())?, map: open_file(paths.map())?, table_size, meta })
    }

    pub fn table_size(&self) -> usize {
        self.table_size
    }

    pub fn meta(&self) -> Option<&MetaFile> {
        self.meta.as_ref()
    }

    /// The tokenizer the index was built with.
    pub fn tokenizer(&self) -> Tokenizer {
        Tokenizer::new(self.meta.as_ref().map(|m| m.config.stem).unwrap_or(false))
    }

    /// Follows the probe sequence of `term` through the dictionary file.
    /// Stops at a `!NULL` slot or after a full cycle.
    pub fn lookup(&mut self, term: &str) -> Result<Option<TermMatch>> {
        let wanted = stored_term(term);
        let start = hash_slot(term, self.table_size);
        let mut slot = start;
        for _ in 0..self.table_size {
            let record = read_record(&mut self.dict, slot as u64, DICT_RECORD_SIZE)?;
            match DictionaryEntry::decode(&record)? {
                DictionaryEntry::Null => return Ok(None),
                DictionaryEntry::Active { term: found, doc_count, posting_start } if found == wanted => {
                    return Ok(Some(TermMatch { term: found, doc_count, posting_start }));
                }
                _ => {}
            }
            slot = rehash(slot, self.table_size);
            if slot == start {
                break;
            }
        }
        tracing::debug!(term, "probe sequence exhausted");
        Ok(None)
    }

    pub fn postings(&mut self, m: &TermMatch) -> Result<Vec<PostingEntry>> {
        let buf = read_run(&mut self.post, m.posting_start, m.doc_count as usize, POST_RECORD_SIZE)?;
        buf.chunks_exact(POST_RECORD_SIZE).map(PostingEntry::decode).collect()
    }

    pub fn filename(&mut self, doc_id: DocId) -> Result<String> {
        let record = read_record(&mut self.map, doc_id as u64, MAP_RECORD_SIZE)?;
        decode_map_name(&record)
    }

    /// Ranks documents for already tokenized query terms.
    pub fn search_terms<S: AsRef<str>>(&mut self, terms: &[S], num_results: usize) -> Result<Vec<SearchHit>> {
        let mut matches = Vec::new();
        for term in terms {
            if let Some(m) = self.lookup(term.as_ref())? {
                matches.push(m);
            }
        }
        if matches.is_empty() {
            tracing::debug!(terms = terms.len(), "no matching terms");
            return Ok(Vec::new());
        }

        let expected: usize = matches.iter().map(|m| m.doc_count as usize).sum();
        let mut results: HashTable<u64> = HashTable::new(expected * RESULTS_LOAD);
        for m in &matches {
            for p in self.postings(m)? {
                results.insert(&p.doc_id.to_string(), p.weight)?;
            }
        }

        let mut candidates = Vec::with_capacity(results.unique_count());
        for (_, doc, &weight) in results.iter() {
            let doc_id = doc.parse().map_err(|_| Error::corrupt(format!("bad doc id {doc:?}")))?;
            candidates.push((doc_id, weight));
        }

        let mut hits = Vec::new();
        for (i, (doc_id, weight)) in top_k(candidates, num_results).into_iter().enumerate() {
            hits.push(SearchHit { rank: i + 1, doc_id, filename: self.filename(doc_id)?, weight });
        }
        tracing::debug!(matched_terms = matches.len(), hits = hits.len(), "query complete");
        Ok(hits)
    }

    /// Tokenizes `query` and ranks the matching documents.
    pub fn search(&mut self, query: &str, num_results: usize) -> Result<Vec<SearchHit>> {
        let terms: Vec<String> = self.tokenizer().tokenize(query).collect();
        self.search_terms(&terms, num_results)
    }
}

/// Opens the index in `index_dir` and runs one query against it.
pub fn search<P: AsRef<Path>>(query: &str, num_results: usize, index_dir: P) -> Result<Vec<SearchHit>> {
    IndexReader::open(index_dir)?.search(query, num_results)
}

#[derive(Debug, PartialEq, Eq)]
struct ScoredDoc {
    doc_id: DocId,
    weight: u64,
}

// Greater means worse, so the heap top is the weakest kept document.
impl Ord for ScoredDoc {
    fn cmp(&self, other: &Self) -> Ordering {
        other.weight.cmp(&self.weight).then(self.doc_id.cmp(&other.doc_id))
    }
}

impl PartialOrd for ScoredDoc {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The `k` heaviest documents, heaviest first. Equal weights put the lower
/// doc id first.
pub fn top_k<I: IntoIterator<Item = (DocId, u64)>>(candidates: I, k: usize) -> Vec<(DocId, u64)> {
    if k == 0 {
        return Vec::new();
    }
    let candidates = candidates.into_iter();
    let mut heap: BinaryHeap<ScoredDoc> = BinaryHeap::with_capacity(k.min(candidates.size_hint().0).saturating_add(1));
    for (doc_id, weight) in candidates {
        heap.push(ScoredDoc { doc_id, weight });
        if heap.len() > k {
            heap.pop();
        }
    }
    heap.into_sorted_vec().into_iter().map(|d| (d.doc_id, d.weight)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_k_orders_by_weight_descending() {
        let docs = [5u64, 1, 9, 3, 7].into_iter().enumerate().map(|(i, w)| (i as DocId, w));
        let weights: Vec<u64> = top_k(docs, 3).into_iter().map(|(_, w)| w).collect();
        assert_eq!(weights, [9, 7, 5]);
    }

    #[test]
    fn top_k_breaks_ties_by_lower_doc_id() {
        let top = top_k([(4, 10), (2, 10), (7, 10), (1, 3)], 2);
        assert_eq!(top, [(2, 10), (4, 10)]);
    }

    #[test]
    fn top_k_handles_small_inputs() {
        assert!(top_k([(0, 1)], 0).is_empty());
        assert_eq!(top_k([(3, 1), (8, 2)], 10), [(8, 2), (3, 1)]);
    }

    #[test]
    fn top_k_accepts_huge_k() {
        assert_eq!(top_k([(0, 5), (1, 9)], usize::MAX), [(1, 9), (0, 5)]);
        assert_eq!(top_k([(0, 5), (1, 9)], usize::MAX / 2), [(1, 9), (0, 5)]);
        assert!(top_k(Vec::<(DocId, u64)>::new(), usize::MAX).is_empty());
    }

    #[test]
    fn missing_index_is_invalid_path() {
        assert!(matches!(IndexReader::open("/nonexistent/index"), Err(Error::InvalidPath(_))));
    }
}
