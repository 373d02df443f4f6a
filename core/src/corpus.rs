//! Reader for the aligned per-document field files left behind by ingestion.
//!
//! Line `i` of every file belongs to document `i`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::config::CorpusPaths;
use crate::{CorpusError, DocId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub author: String,
    pub category: String,
    pub body: String,
}

impl Document {
    /// Title, author, category and body, each trimmed, joined by single spaces.
    pub fn content(&self) -> String {
        [&self.title, &self.author, &self.category, &self.body]
            .iter()
            .map(|f| f.trim())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn open(path: &Path) -> Result<BufReader<File>, CorpusError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| CorpusError::Read { path: path.to_path_buf(), source })
}

fn read_lines(path: &Path) -> Result<Vec<String>, CorpusError> {
    open(path)?
        .lines()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| CorpusError::Read { path: path.to_path_buf(), source })
}

/// Load every document, in doc_id order.
pub fn load_documents(paths: &CorpusPaths) -> Result<Vec<Document>, CorpusError> {
    let titles = read_lines(&paths.title())?;
    let expected = titles.len();
    let read_field = |field: &'static str, path: &Path| -> Result<Vec<String>, CorpusError> {
        let lines = read_lines(path)?;
        if lines.len() != expected {
            return Err(CorpusError::MisalignedCorpus { field, found: lines.len(), expected });
        }
        Ok(lines)
    };
    let authors = read_field("author", &paths.author())?;
    let categories = read_field("category", &paths.category())?;
    let bodies = read_field("post_text", &paths.body())?;

    let docs: Vec<Document> = titles
        .into_iter()
        .zip(authors)
        .zip(categories)
        .zip(bodies)
        .map(|(((title, author), category), body)| Document { title, author, category, body })
        .collect();
    tracing::info!(num_docs = docs.len(), root = %paths.root.display(), "loaded corpus");
    Ok(docs)
}

/// Inbound-link counts for the whole corpus.
#[derive(Debug, Clone, Default)]
pub struct LinkPopularity {
    counts: Vec<u64>,
    total: u64,
}

impl LinkPopularity {
    pub fn new(counts: Vec<u64>) -> Self {
        let total = counts.iter().sum();
        Self { counts, total }
    }

    pub fn load(paths: &CorpusPaths) -> Result<Self, CorpusError> {
        let path = paths.inlinks();
        let mut counts = Vec::new();
        for (i, line) in read_lines(&path)?.into_iter().enumerate() {
            let value = line.trim();
            let count = value
                .parse::<u64>()
                .map_err(|_| CorpusError::BadInlinkCount { line: i + 1, value: value.to_string() })?;
            counts.push(count);
        }
        Ok(Self::new(counts))
    }

    pub fn total(&self) -> u64 { self.total }

    pub fn len(&self) -> usize { self.counts.len() }

    pub fn is_empty(&self) -> bool { self.counts.is_empty() }

    /// The document's share of all inbound links, in `[0, 1]`. Zero everywhere when
    /// the corpus has no links at all.
    pub fn share(&self, doc_id: DocId) -> Result<f64, CorpusError> {
        let count = *self
            .counts
            .get(doc_id as usize)
            .ok_or(CorpusError::CorpusMismatch(doc_id))?;
        if self.total == 0 {
            return Ok(0.0);
        }
        Ok(count as f64 / self.total as f64)
    }
}

/// Display fields of a ranked document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocDetails {
    pub title: String,
    pub url: String,
}

/// Titles and URLs of every document, read once so results come from the same
/// snapshot as the link counts.
#[derive(Debug, Clone, Default)]
pub struct DocCatalog {
    details: Vec<DocDetails>,
}

impl DocCatalog {
    pub fn new(details: Vec<DocDetails>) -> Self { Self { details } }

    pub fn load(paths: &CorpusPaths) -> Result<Self, CorpusError> {
        let titles = read_lines(&paths.title())?;
        let urls = read_lines(&paths.url())?;
        if urls.len() != titles.len() {
            return Err(CorpusError::MisalignedCorpus { field: "post_url", found: urls.len(), expected: titles.len() });
        }
        let details = titles
            .into_iter()
            .zip(urls)
            .map(|(title, url)| DocDetails { title: title.trim().to_string(), url: url.trim().to_string() })
            .collect();
        Ok(Self { details })
    }

    pub fn len(&self) -> usize { self.details.len() }

    pub fn is_empty(&self) -> bool { self.details.is_empty() }

    pub fn get(&self, doc_id: DocId) -> Result<&DocDetails, CorpusError> {
        self.details.get(doc_id as usize).ok_or(CorpusError::CorpusMismatch(doc_id))
    }
}
