use crate::config::IndexConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub version: u32,
    pub num_docs: u32,
    pub num_terms: u64,
    pub num_postings: u64,
    pub created_at: String,
    pub config: IndexConfig,
}

/// File locations of one index directory.
#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn dict(&self) -> PathBuf { self.root.join("dict") }
    pub fn post(&self) -> PathBuf { self.root.join("post") }
    pub fn map(&self) -> PathBuf { self.root.join("map") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }

    /// Fails with [`Error::InvalidPath`] unless the root is an existing directory.
    pub fn ensure_dir(&self) -> Result<()> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(Error::InvalidPath(self.root.clone()))
        }
    }
}

/// Sinks for the three record files.
pub struct IndexWriters<W: Write = BufWriter<File>> {
    pub dict: W,
    pub post: W,
    pub map: W,
}

impl IndexWriters {
    pub fn create(paths: &IndexPaths) -> Result<Self> {
        Ok(Self {
            dict: BufWriter::new(File::create(paths.dict())?),
            post: BufWriter::new(File::create(paths.post())?),
            map: BufWriter::new(File::create(paths.map())?),
        })
    }
}

impl<W: Write> IndexWriters<W> {
    pub fn flush(&mut self) -> Result<()> {
        self.dict.flush()?;
        self.post.flush()?;
        self.map.flush()?;
        Ok(())
    }
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let f = File::open(paths.meta())?;
    let meta: MetaFile = serde_json::from_reader(BufReader::new(f))?;
    Ok(meta)
}

/// `meta.json` if the directory has one. Indexes written by other tools may not.
pub fn load_meta_if_present(paths: &IndexPaths) -> Result<Option<MetaFile>> {
    if paths.meta().is_file() {
        load_meta(paths).map(Some)
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn meta_round_trip() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let meta = MetaFile {
            version: FORMAT_VERSION,
            num_docs: 2,
            num_terms: 2,
            num_postings: 3,
            created_at: "2024-01-01T00:00:00Z".into(),
            config: IndexConfig::default(),
        };
        save_meta(&paths, &meta).unwrap();
        let loaded = load_meta_if_present(&paths).unwrap().unwrap();
        assert_eq!(loaded.num_postings, 3);
        assert_eq!(loaded.config, IndexConfig::default());
    }

    #[test]
    fn missing_directory_is_invalid_path() {
        let paths = IndexPaths::new("/nonexistent/index");
        assert!(matches!(paths.ensure_dir(), Err(Error::InvalidPath(_))));
        assert!(load_meta_if_present(&paths).unwrap().is_none());
    }
}
