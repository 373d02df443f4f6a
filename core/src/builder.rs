use std::collections::HashMap;

use crate::corpus::Document;
use crate::tokenizer::normalize;
use crate::{DocId, InvertedIndex, Posting};

const PROGRESS_EVERY: u32 = 1000;

/// Accumulates posting lists over documents fed in doc_id order.
#[derive(Default)]
pub struct IndexBuilder {
    next_doc_id: DocId,
    postings: HashMap<String, Posting>,
}

impl IndexBuilder {
    pub fn new() -> Self { Self::default() }

    /// Normalize one document's content and count its terms under the next doc_id,
    /// which is returned.
    pub fn add_document(&mut self, content: &str) -> DocId {
        let doc_id = self.next_doc_id;
        self.next_doc_id += 1;
        for term in normalize(content) {
            self.postings.entry(term).or_default().record(doc_id);
        }
        if self.next_doc_id % PROGRESS_EVERY == 0 {
            tracing::info!(processed = self.next_doc_id, "indexing documents");
        }
        doc_id
    }

    pub fn num_docs(&self) -> u32 { self.next_doc_id }

    /// Sort the accumulated postings by term into the final index.
    pub fn finish(self) -> InvertedIndex {
        let index = InvertedIndex {
            num_docs: self.next_doc_id,
            postings: self.postings.into_iter().collect(),
        };
        tracing::info!(num_docs = index.num_docs, num_terms = index.num_terms(), "accumulated postings");
        index
    }
}

/// Build the inverted index of a whole corpus; doc_ids are positions in `documents`.
pub fn build<'a, I>(documents: I) -> InvertedIndex
where
    I: IntoIterator<Item = &'a Document>,
{
    let mut builder = IndexBuilder::new();
    for doc in documents {
        builder.add_document(&doc.content());
    }
    builder.finish()
}
