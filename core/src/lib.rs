//! Inverted-index construction and ranked keyword retrieval blending tf-idf cosine
//! similarity with inbound-link popularity.

pub mod builder;
pub mod config;
pub mod corpus;
pub mod error;
pub mod index;
pub mod persist;
pub mod query;
pub mod rank;
pub mod tokenizer;

pub use error::{CorpusError, IndexError};
pub use index::{DocId, IndexMeta, InvertedIndex, Posting, PostingSource};
