//! Builds the `dict`, `post` and `map` files from a directory of documents.

use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::hashtable::{HashTable, Merge};
use crate::persist::{save_meta, IndexPaths, IndexWriters, MetaFile, FORMAT_VERSION};
use crate::record::{encode_map_name, DictionaryEntry, PostingEntry, DOC_ID_WIDTH};
use crate::stopwords::StopwordSet;
use crate::tokenizer::Tokenizer;
use crate::DocId;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const WEIGHT_SCALE: f64 = 100_000_000.0;

/// A document's relative term frequency for one term, before idf is known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPosting {
    pub doc_id: DocId,
    pub rtf: f64,
}

/// Everything the global table knows about one term.
#[derive(Debug, Clone, PartialEq)]
pub struct TermBucket {
    pub doc_count: u32,
    pub total_freq: u32,
    /// In document insertion order.
    pub postings: Vec<RawPosting>,
}

impl TermBucket {
    fn single(doc_id: DocId, freq: u32, rtf: f64) -> Self {
        Self { doc_count: 1, total_freq: freq, postings: vec![RawPosting { doc_id, rtf }] }
    }

    /// One occurrence in one document; pruned from the dictionary.
    pub fn is_singleton(&self) -> bool {
        self.doc_count == 1 && self.total_freq == 1
    }
}

impl Merge for TermBucket {
    fn merge(&mut self, other: Self) {
        self.doc_count += other.doc_count;
        self.total_freq += other.total_freq;
        self.postings.extend(other.postings);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub num_docs: u32,
    pub skipped_docs: u32,
    pub num_terms: u64,
    pub num_deleted: u64,
    pub num_postings: u64,
}

/// Result of [`IndexBuilder::finish`].
pub struct Finished<W: Write> {
    pub summary: IndexSummary,
    pub config: IndexConfig,
    pub writers: IndexWriters<W>,
}

/// State of one indexing run.
pub struct IndexBuilder<W: Write> {
    config: IndexConfig,
    tokenizer: Tokenizer,
    stopwords: StopwordSet,
    doc_table: HashTable<u32>,
    global: HashTable<TermBucket>,
    writers: IndexWriters<W>,
    next_doc_id: DocId,
    skipped_docs: u32,
}

impl<W: Write> IndexBuilder<W> {
    pub fn new(config: IndexConfig, stopwords: StopwordSet, writers: IndexWriters<W>) -> Self {
        Self {
            tokenizer: Tokenizer::new(config.stem),
            doc_table: HashTable::new(config.doc_table_size),
            global: HashTable::new(config.global_table_size),
            config,
            stopwords,
            writers,
            next_doc_id: 0,
            skipped_docs: 0,
        }
    }

    /// Counts the terms of one document, folds them into the global table
    /// and records its name in the map file.
    pub fn add_document(&mut self, name: &str, text: &str) -> Result<DocId> {
        let doc_id = self.next_doc_id;
        if doc_id == 10u32.pow(DOC_ID_WIDTH as u32) {
            tracing::warn!(doc_id, "document ids no longer fit the posting record and will be truncated");
        }

        for token in self.tokenizer.tokenize(text) {
            if token.chars().count() > 1 && !self.stopwords.contains(&token) {
                self.doc_table.insert(&token, 1)?;
            }
        }

        let total = self.doc_table.total_count();
        for (_, term, &freq) in self.doc_table.iter() {
            let rtf = freq as f64 / total as f64;
            self.global.insert(term, TermBucket::single(doc_id, freq, rtf))?;
        }
        tracing::debug!(doc_id, name, tokens = total, unique = self.doc_table.unique_count(), "scanned document");
        self.doc_table.reset();

        self.writers.map.write_all(encode_map_name(name).as_bytes())?;
        self.next_doc_id += 1;
        Ok(doc_id)
    }

    /// Notes a document that could not be read. It gets no doc id.
    pub fn skip_document(&mut self, err: &Error) {
        tracing::warn!(error = %err, "skipping document");
        self.skipped_docs += 1;
    }

    /// Writes one dictionary record per global slot and the postings of every
    /// surviving term.
    pub fn finish(mut self) -> Result<Finished<W>> {
        let total_docs = self.next_doc_id;
        let mut summary = IndexSummary { num_docs: total_docs, skipped_docs: self.skipped_docs, ..Default::default() };
        let mut post_line: u64 = 0;

        for slot in self.global.slots() {
            let entry = match slot {
                None => DictionaryEntry::Null,
                Some((_, bucket)) if bucket.is_singleton() => {
                    summary.num_deleted += 1;
                    DictionaryEntry::Deleted
                }
                Some((term, bucket)) => {
                    let entry = DictionaryEntry::Active {
                        term: term.to_string(),
                        doc_count: bucket.doc_count,
                        posting_start: post_line,
                    };
                    let idf = self.config.idf_base.idf(total_docs, bucket.doc_count);
                    for p in &bucket.postings {
                        let posting = PostingEntry { doc_id: p.doc_id, weight: scaled_weight(p.rtf, idf) };
                        self.writers.post.write_all(posting.encode().as_bytes())?;
                        post_line += 1;
                    }
                    summary.num_terms += 1;
                    entry
                }
            };
            self.writers.dict.write_all(entry.encode().as_bytes())?;
        }
        summary.num_postings = post_line;
        self.writers.flush()?;
        Ok(Finished { summary, config: self.config, writers: self.writers })
    }
}

/// rtf * idf scaled by 1e8 and truncated.
pub fn scaled_weight(rtf: f64, idf: f64) -> u64 {
    (rtf * idf * WEIGHT_SCALE) as u64
}

/// Regular, non-hidden files directly inside `dir`, sorted by file name.
pub fn list_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::InvalidPath(dir.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if entry.file_type().is_file() && !hidden {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// UTF-8 when valid, Latin-1 otherwise.
fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    }
}

/// Indexes every document in `input` into `output`.
pub fn index_directory(input: &Path, output: &Path, config: IndexConfig, stopwords: StopwordSet) -> Result<IndexSummary> {
    let out_paths = IndexPaths::new(output);
    out_paths.ensure_dir()?;
    let files = list_documents(input)?;
    tracing::info!(input = %input.display(), files = files.len(), "indexing directory");

    let mut builder = IndexBuilder::new(config, stopwords, IndexWriters::create(&out_paths)?);
    for path in files {
        match std::fs::read(&path) {
            Ok(bytes) => {
                let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                builder.add_document(&name, &decode_text(bytes))?;
            }
            Err(source) => builder.skip_document(&Error::DocumentRead { path, source }),
        }
    }

    let Finished { summary, config, .. } = builder.finish()?;
    let meta = MetaFile {
        version: FORMAT_VERSION,
        num_docs: summary.num_docs,
        num_terms: summary.num_terms,
        num_postings: summary.num_postings,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        config,
    };
    save_meta(&out_paths, &meta)?;

    tracing::info!(
        num_docs = summary.num_docs,
        skipped = summary.skipped_docs,
        num_terms = summary.num_terms,
        num_deleted = summary.num_deleted,
        num_postings = summary.num_postings,
        "index build complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashtable::{hash_slot, rehash};
    use crate::record::{DICT_RECORD_SIZE, POST_RECORD_SIZE};

    fn small_config() -> IndexConfig {
        IndexConfig { doc_table_size: 101, global_table_size: 211, stopword_table_size: 31, ..Default::default() }
    }

    fn builder() -> IndexBuilder<Vec<u8>> {
        let writers = IndexWriters { dict: Vec::new(), post: Vec::new(), map: Vec::new() };
        IndexBuilder::new(small_config(), StopwordSet::empty(31), writers)
    }

    fn dict_at(dict: &[u8], slot: usize) -> DictionaryEntry {
        DictionaryEntry::decode(&dict[slot * DICT_RECORD_SIZE..(slot + 1) * DICT_RECORD_SIZE]).unwrap()
    }

    #[test]
    fn bucket_merge_concatenates_postings() {
        let mut a = TermBucket::single(0, 2, 0.5);
        a.merge(TermBucket::single(1, 1, 0.25));
        assert_eq!(a.doc_count, 2);
        assert_eq!(a.total_freq, 3);
        assert_eq!(a.postings.iter().map(|p| p.doc_id).collect::<Vec<_>>(), [0, 1]);
        assert!(!a.is_singleton());
        assert!(TermBucket::single(3, 1, 1.0).is_singleton());
    }

    #[test]
    fn writes_one_dictionary_record_per_slot() {
        let mut b = builder();
        b.add_document("doc0.txt", "apple apple banana").unwrap();
        b.add_document("doc1.txt", "banana cherry").unwrap();
        let Finished { summary, writers, .. } = b.finish().unwrap();

        assert_eq!(writers.dict.len(), 211 * DICT_RECORD_SIZE);
        assert_eq!(summary.num_docs, 2);
        assert_eq!(summary.num_terms, 2);
        assert_eq!(summary.num_deleted, 1);
        assert_eq!(summary.num_postings, 3);
        // banana and cherry share home slot 12; cherry was probed one stride on.
        let home = hash_slot("cherry", 211);
        assert_eq!(home, hash_slot("banana", 211));
        assert!(matches!(dict_at(&writers.dict, home), DictionaryEntry::Active { ref term, .. } if term == "banana"));
        assert_eq!(dict_at(&writers.dict, rehash(home, 211)), DictionaryEntry::Deleted);
        assert!(matches!(
            dict_at(&writers.dict, hash_slot("apple", 211)),
            DictionaryEntry::Active { ref term, doc_count: 1, .. } if term == "apple"
        ));
        assert_eq!(writers.post.len(), 3 * POST_RECORD_SIZE);
        assert_eq!(writers.map, b"doc0.txt     \ndoc1.txt     \n");
    }

    #[test]
    fn postings_of_a_term_are_contiguous_in_insertion_order() {
        let mut b = builder();
        b.add_document("a", "banana banana").unwrap();
        b.add_document("b", "banana kiwi kiwi").unwrap();
        let Finished { writers, .. } = b.finish().unwrap();
        let DictionaryEntry::Active { doc_count, posting_start, .. } = dict_at(&writers.dict, hash_slot("banana", 211)) else {
            panic!("banana missing");
        };
        assert_eq!(doc_count, 2);
        let start = posting_start as usize * POST_RECORD_SIZE;
        let first = PostingEntry::decode(&writers.post[start..start + POST_RECORD_SIZE]).unwrap();
        let second = PostingEntry::decode(&writers.post[start + POST_RECORD_SIZE..start + 2 * POST_RECORD_SIZE]).unwrap();
        // idf = 1 + log10(2/2) = 1
        assert_eq!(first, PostingEntry { doc_id: 0, weight: 100_000_000 });
        assert_eq!(second, PostingEntry { doc_id: 1, weight: 33_333_333 });
    }

    #[test]
    fn skipped_documents_consume_no_doc_id() {
        let mut b = builder();
        let err = Error::DocumentRead {
            path: PathBuf::from("gone.html"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        b.skip_document(&err);
        assert_eq!(b.add_document("kept.html", "plum plum").unwrap(), 0);
        b.skip_document(&err);
        assert_eq!(b.add_document("next.html", "plum").unwrap(), 1);

        let Finished { summary, writers, .. } = b.finish().unwrap();
        assert_eq!(summary.num_docs, 2);
        assert_eq!(summary.skipped_docs, 2);
        assert_eq!(writers.map, b"kept.html    \nnext.html    \n");
    }

    #[test]
    fn weights_scale_and_truncate() {
        assert_eq!(scaled_weight(0.5, 1.0), 50_000_000);
        assert_eq!(scaled_weight(1.0 / 3.0, 1.0), 33_333_333);
    }

    #[test]
    fn short_tokens_and_stopwords_are_not_counted() {
        let writers = IndexWriters { dict: Vec::new(), post: Vec::new(), map: Vec::new() };
        let stop = StopwordSet::from_text("the", 31, &Tokenizer::default()).unwrap();
        let mut b = IndexBuilder::new(small_config(), stop, writers);
        b.add_document("d", "the a apple").unwrap();
        let slot = b.global.iter().map(|(_, term, bucket)| (term.to_string(), bucket.clone())).collect::<Vec<_>>();
        assert_eq!(slot.len(), 1);
        assert_eq!(slot[0].0, "apple");
        assert_eq!(slot[0].1.postings[0].rtf, 1.0);
    }

    #[test]
    fn list_documents_is_sorted_and_skips_hidden() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.html", "a.html", ".hidden"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let files = list_documents(dir.path()).unwrap();
        let names: Vec<_> = files.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
        assert_eq!(names, ["a.html", "b.html"]);
    }

    #[test]
    fn latin1_documents_decode() {
        assert_eq!(decode_text(vec![b'c', b'a', b'f', 0xE9]), "café");
        assert_eq!(decode_text("naïve".as_bytes().to_vec()), "naïve");
    }
}
