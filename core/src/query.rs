use std::collections::{BTreeMap, HashMap};

use crate::tokenizer::normalize;
use crate::{IndexError, Posting, PostingSource};

/// A query reduced to indexed terms, with only the postings it needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedQuery {
    /// Occurrences of each indexed query term in the query string.
    pub term_frequencies: BTreeMap<String, u32>,
    pub postings: HashMap<String, Posting>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Normalization left no terms (only stopwords or punctuation).
    NoTerms,
    /// None of the query terms is in the vocabulary.
    NoMatches,
    Matched(ProcessedQuery),
}

/// Count term occurrences the way a document's term frequencies are counted.
pub fn term_frequencies(query: &str) -> BTreeMap<String, u32> {
    let mut tf = BTreeMap::new();
    for term in normalize(query) {
        *tf.entry(term).or_insert(0) += 1;
    }
    tf
}

/// Normalize `query` and fetch the postings of its indexed terms from `source`.
pub fn process<S: PostingSource>(source: &S, query: &str) -> Result<QueryOutcome, IndexError> {
    let mut tf = term_frequencies(query);
    if tf.is_empty() {
        return Ok(QueryOutcome::NoTerms);
    }
    tf.retain(|term, _| {
        let known = source.contains(term);
        if !known {
            tracing::debug!(term = term.as_str(), "query term not in vocabulary");
        }
        known
    });
    if tf.is_empty() {
        return Ok(QueryOutcome::NoMatches);
    }
    let postings = source.fetch(tf.keys().map(String::as_str))?;
    Ok(QueryOutcome::Matched(ProcessedQuery { term_frequencies: tf, postings }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::IndexBuilder;

    fn index() -> crate::InvertedIndex {
        let mut b = IndexBuilder::new();
        b.add_document("foo bar foo");
        b.add_document("baz");
        b.finish()
    }

    #[test]
    fn counts_repeated_terms() {
        let tf = term_frequencies("foo foo the bar");
        assert_eq!(tf.get("foo"), Some(&2));
        assert_eq!(tf.get("bar"), Some(&1));
        assert_eq!(tf.len(), 2);
    }

    #[test]
    fn stopword_query_has_no_terms() {
        assert_eq!(process(&index(), "the and of !").unwrap(), QueryOutcome::NoTerms);
    }

    #[test]
    fn unknown_terms_have_no_matches() {
        assert_eq!(process(&index(), "quux zzz").unwrap(), QueryOutcome::NoMatches);
    }

    #[test]
    fn unknown_terms_are_dropped() {
        let QueryOutcome::Matched(q) = process(&index(), "foo quux").unwrap() else {
            panic!("expected matches");
        };
        assert_eq!(q.term_frequencies.len(), 1);
        assert_eq!(q.postings["foo"].tf(0), Some(2));
    }
}
