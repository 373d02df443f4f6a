//! Relevance scoring: ltc query weights, lnc document weights restricted to the query
//! terms, cosine similarity blended with inbound-link popularity.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::corpus::LinkPopularity;
use crate::query::ProcessedQuery;
use crate::{CorpusError, DocId, Posting};

/// Weight of link popularity in the final score; cosine similarity gets the rest.
pub const LINK_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f64,
    pub cosine: f64,
    pub popularity: f64,
}

fn log_tf(tf: u32) -> f64 { 1.0 + (tf as f64).ln() }

/// L2-normalize in place; an all-zero vector stays zero.
fn l2_normalize<K>(weights: &mut BTreeMap<K, f64>) {
    let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm == 0.0 {
        return;
    }
    for w in weights.values_mut() {
        *w /= norm;
    }
}

/// ltc: `(1 + ln tf) * ln(N / df)` per query term, normalized over the query terms.
pub fn query_weights<'q>(
    term_frequencies: &'q BTreeMap<String, u32>,
    postings: &HashMap<String, Posting>,
    num_docs: u32,
) -> BTreeMap<&'q str, f64> {
    let n = num_docs as f64;
    let mut weights = BTreeMap::new();
    for (term, &tf) in term_frequencies {
        let Some(posting) = postings.get(term) else { continue };
        if posting.document_frequency == 0 || tf == 0 {
            continue;
        }
        let idf = (n / posting.document_frequency as f64).ln();
        weights.insert(term.as_str(), log_tf(tf) * idf);
    }
    l2_normalize(&mut weights);
    weights
}

/// lnc: `1 + ln tf` for every query term a document contains, normalized over those
/// terms only. Document terms outside the query never enter the vector.
pub fn document_weights<'q>(
    query_terms: impl IntoIterator<Item = &'q str>,
    postings: &HashMap<String, Posting>,
) -> BTreeMap<DocId, BTreeMap<&'q str, f64>> {
    let mut docs: BTreeMap<DocId, BTreeMap<&'q str, f64>> = BTreeMap::new();
    for term in query_terms {
        let Some(posting) = postings.get(term) else { continue };
        for (&doc_id, &tf) in &posting.term_frequencies {
            docs.entry(doc_id).or_default().insert(term, log_tf(tf));
        }
    }
    for weights in docs.values_mut() {
        l2_normalize(weights);
    }
    docs
}

/// Score every document containing at least one query term.
pub fn score(query: &ProcessedQuery, num_docs: u32, links: &LinkPopularity) -> Result<Vec<ScoredDoc>, CorpusError> {
    let q = query_weights(&query.term_frequencies, &query.postings, num_docs);
    let docs = document_weights(query.term_frequencies.keys().map(String::as_str), &query.postings);

    let mut scored = Vec::with_capacity(docs.len());
    for (doc_id, weights) in docs {
        let cosine: f64 = weights
            .iter()
            .map(|(term, w)| w * q.get(term).copied().unwrap_or(0.0))
            .sum();
        let popularity = links.share(doc_id)?;
        scored.push(ScoredDoc {
            doc_id,
            score: LINK_WEIGHT * popularity + (1.0 - LINK_WEIGHT) * cosine,
            cosine,
            popularity,
        });
    }
    Ok(scored)
}

/// Highest scores first; equal scores in ascending doc_id order.
fn by_rank(a: &ScoredDoc, b: &ScoredDoc) -> Ordering {
    b.score.total_cmp(&a.score).then(a.doc_id.cmp(&b.doc_id))
}

/// Keep the `k` best documents, in rank order.
pub fn top_k(mut scored: Vec<ScoredDoc>, k: usize) -> Vec<ScoredDoc> {
    if k < scored.len() {
        scored.select_nth_unstable_by(k, by_rank);
        scored.truncate(k);
    }
    scored.sort_by(by_rank);
    scored
}

/// Score the query's candidates and return the top `k`.
pub fn rank(query: &ProcessedQuery, num_docs: u32, links: &LinkPopularity, k: usize) -> Result<Vec<ScoredDoc>, CorpusError> {
    let scored = score(query, num_docs, links)?;
    let candidates = scored.len();
    let top = top_k(scored, k);
    tracing::debug!(candidates, returned = top.len(), "ranked documents");
    Ok(top)
}
