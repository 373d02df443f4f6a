use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub type DocId = u32;

/// Posting list for one term: how many documents contain it and how often each does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Posting {
    /// Number of distinct documents in `term_frequencies`, never the sum of counts.
    pub document_frequency: u32,
    pub term_frequencies: BTreeMap<DocId, u32>,
}

impl Posting {
    /// Count one occurrence of the term in `doc_id`.
    pub fn record(&mut self, doc_id: DocId) {
        let tf = self.term_frequencies.entry(doc_id).or_insert(0);
        if *tf == 0 {
            self.document_frequency += 1;
        }
        *tf += 1;
    }

    pub fn tf(&self, doc_id: DocId) -> Option<u32> {
        self.term_frequencies.get(&doc_id).copied()
    }
}

/// Immutable inverted index: terms in ascending byte order, each with its posting list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvertedIndex {
    pub num_docs: u32,
    pub postings: BTreeMap<String, Posting>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    pub fn get(&self, term: &str) -> Option<&Posting> { self.postings.get(term) }
}

/// Source of posting lists for the query side.
///
/// Implemented by the in-memory index produced at build time and by the on-disk
/// reader, so searchers are written once against either snapshot.
pub trait PostingSource {
    /// Total number of documents `N` in the indexed collection.
    fn num_docs(&self) -> u32;

    /// Whether the term has a posting list.
    fn contains(&self, term: &str) -> bool;

    /// Fetch the posting lists of the given terms. Unknown terms are absent from the
    /// result rather than an error.
    fn fetch<'t, I>(&self, terms: I) -> Result<HashMap<String, Posting>, crate::IndexError>
    where
        I: IntoIterator<Item = &'t str>;
}

impl PostingSource for InvertedIndex {
    fn num_docs(&self) -> u32 { self.num_docs }

    fn contains(&self, term: &str) -> bool { self.postings.contains_key(term) }

    fn fetch<'t, I>(&self, terms: I) -> Result<HashMap<String, Posting>, crate::IndexError>
    where
        I: IntoIterator<Item = &'t str>,
    {
        Ok(terms
            .into_iter()
            .filter_map(|t| self.postings.get(t).map(|p| (t.to_string(), p.clone())))
            .collect())
    }
}

/// Build metadata stored next to the index artifacts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexMeta {
    pub num_docs: u32,
    pub num_terms: u64,
    pub created_at: String,
    pub version: u32,
}
