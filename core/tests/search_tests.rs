use linkrank_core::builder::build;
use linkrank_core::config::{Config, CorpusPaths};
use linkrank_core::corpus::{load_documents, DocCatalog, LinkPopularity};
use linkrank_core::persist::{publish, IndexReader};
use linkrank_core::query::{process, QueryOutcome};
use linkrank_core::rank::rank;
use linkrank_core::{CorpusError, PostingSource};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const EPS: f64 = 1e-12;

fn write_corpus(root: &Path, docs: &[(&str, &str)], inlinks: &[u64]) {
    fs::create_dir_all(root).unwrap();
    let lines = |f: &dyn Fn(usize) -> String| (0..docs.len()).map(|i| f(i) + "\n").collect::<String>();
    fs::write(root.join("title.txt"), lines(&|i| docs[i].0.to_string())).unwrap();
    fs::write(root.join("author.txt"), lines(&|_| String::new())).unwrap();
    fs::write(root.join("category.txt"), lines(&|_| String::new())).unwrap();
    fs::write(root.join("post_text.txt"), lines(&|i| docs[i].1.to_string())).unwrap();
    fs::write(root.join("post_url.txt"), lines(&|i| format!("http://example.com/{i}"))).unwrap();
    let counts: String = inlinks.iter().map(|c| format!("{c}\n")).collect();
    fs::write(root.join("num_inlinks.txt"), counts).unwrap();
}

fn setup(docs: &[(&str, &str)], inlinks: &[u64]) -> (tempfile::TempDir, Config) {
    let dir = tempdir().unwrap();
    let config = Config::new(dir.path().join("data"), dir.path().join("index"));
    write_corpus(&config.corpus.root, docs, inlinks);
    let documents = load_documents(&config.corpus).unwrap();
    publish(&config.index, &build(&documents)).unwrap();
    (dir, config)
}

fn three_docs() -> (tempfile::TempDir, Config) {
    setup(&[("foo", "foo bar"), ("bar", "baz"), ("qux", "foo")], &[2, 1, 1])
}

#[test]
fn ranks_by_blended_score() {
    let (_dir, config) = three_docs();
    let reader = IndexReader::open(&config.index).unwrap();
    let links = LinkPopularity::load(&config.corpus).unwrap();

    let QueryOutcome::Matched(query) = process(&reader, "foo").unwrap() else {
        panic!("expected matches");
    };
    assert_eq!(query.postings["foo"].document_frequency, 2);
    assert_eq!(query.postings["foo"].tf(0), Some(2));
    let top = rank(&query, reader.num_docs(), &links, 10).unwrap();
    let ids: Vec<u32> = top.iter().map(|d| d.doc_id).collect();
    assert_eq!(ids, vec![0, 2]);
    assert!((top[0].score - 0.75).abs() < EPS);
    assert!((top[1].score - 0.625).abs() < EPS);
    assert!((top[0].popularity - 0.5).abs() < EPS);
}

#[test]
fn single_occurrence_term_has_unit_cosine() {
    let (_dir, config) = three_docs();
    let reader = IndexReader::open(&config.index).unwrap();
    let links = LinkPopularity::load(&config.corpus).unwrap();
    let QueryOutcome::Matched(query) = process(&reader, "qux").unwrap() else {
        panic!("expected matches");
    };
    let top = rank(&query, reader.num_docs(), &links, 10).unwrap();
    assert_eq!(top.len(), 1);
    assert!((top[0].cosine - 1.0).abs() < EPS);
}

#[test]
fn result_count_is_bounded_by_candidates() {
    let (_dir, config) = three_docs();
    let reader = IndexReader::open(&config.index).unwrap();
    let links = LinkPopularity::load(&config.corpus).unwrap();
    let QueryOutcome::Matched(query) = process(&reader, "foo baz").unwrap() else {
        panic!("expected matches");
    };
    assert_eq!(rank(&query, 3, &links, 1).unwrap().len(), 1);
    assert_eq!(rank(&query, 3, &links, 10).unwrap().len(), 3);
}

#[test]
fn empty_outcomes() {
    let (_dir, config) = three_docs();
    let reader = IndexReader::open(&config.index).unwrap();
    assert_eq!(process(&reader, "the, of!").unwrap(), QueryOutcome::NoTerms);
    assert_eq!(process(&reader, "zebra").unwrap(), QueryOutcome::NoMatches);
}

#[test]
fn details_for_ranked_documents() {
    let (_dir, config) = three_docs();
    let catalog = DocCatalog::load(&config.corpus).unwrap();
    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog.get(0).unwrap().title, "foo");
    assert_eq!(catalog.get(2).unwrap().url, "http://example.com/2");
    assert!(matches!(catalog.get(9), Err(CorpusError::CorpusMismatch(9))));

    fs::write(config.corpus.url(), "http://example.com/0\n").unwrap();
    let err = DocCatalog::load(&config.corpus).unwrap_err();
    assert!(matches!(err, CorpusError::MisalignedCorpus { field: "post_url", found: 1, expected: 3 }));
}

#[test]
fn misaligned_corpus_is_rejected() {
    let dir = tempdir().unwrap();
    let paths = CorpusPaths::new(dir.path());
    write_corpus(dir.path(), &[("a", "b"), ("c", "d")], &[1, 1]);
    fs::write(paths.author(), "only one\n").unwrap();
    let err = load_documents(&paths).unwrap_err();
    assert!(matches!(err, CorpusError::MisalignedCorpus { field: "author", found: 1, expected: 2 }));
}

#[test]
fn bad_inlink_count_is_rejected() {
    let dir = tempdir().unwrap();
    let paths = CorpusPaths::new(dir.path());
    write_corpus(dir.path(), &[("a", "b")], &[1]);
    fs::write(paths.inlinks(), "seven\n").unwrap();
    assert!(matches!(LinkPopularity::load(&paths), Err(CorpusError::BadInlinkCount { line: 1, .. })));
}
