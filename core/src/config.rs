use std::path::{Path, PathBuf};

use crate::persist::IndexPaths;

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_INDEX_DIR: &str = "./index";

/// Locations of the aligned per-document field files, one line per document.
#[derive(Debug, Clone)]
pub struct CorpusPaths {
    pub root: PathBuf,
}

impl CorpusPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn title(&self) -> PathBuf { self.root.join("title.txt") }
    pub fn author(&self) -> PathBuf { self.root.join("author.txt") }
    pub fn category(&self) -> PathBuf { self.root.join("category.txt") }
    pub fn body(&self) -> PathBuf { self.root.join("post_text.txt") }
    pub fn inlinks(&self) -> PathBuf { self.root.join("num_inlinks.txt") }
    pub fn url(&self) -> PathBuf { self.root.join("post_url.txt") }
}

/// Every path a build or a search touches, handed to components at construction.
#[derive(Debug, Clone)]
pub struct Config {
    pub corpus: CorpusPaths,
    pub index: IndexPaths,
}

impl Config {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(data_dir: P, index_dir: Q) -> Self {
        Self { corpus: CorpusPaths::new(data_dir), index: IndexPaths::new(index_dir) }
    }
}

impl Default for Config {
    fn default() -> Self { Self::new(DEFAULT_DATA_DIR, DEFAULT_INDEX_DIR) }
}
