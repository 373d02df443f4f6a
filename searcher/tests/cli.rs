use linkrank_core::builder::build;
use linkrank_core::config::Config;
use linkrank_core::corpus::load_documents;
use linkrank_core::persist::publish;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn setup(dir: &Path, with_index: bool) -> Config {
    let config = Config::new(dir.join("data"), dir.join("index"));
    let data = &config.corpus.root;
    fs::create_dir_all(data).unwrap();
    fs::write(data.join("title.txt"), "foo\nbar\nqux\n").unwrap();
    fs::write(data.join("author.txt"), "\n\n\n").unwrap();
    fs::write(data.join("category.txt"), "\n\n\n").unwrap();
    fs::write(data.join("post_text.txt"), "foo bar\nbaz\nfoo\n").unwrap();
    fs::write(data.join("post_url.txt"), "http://ex.com/0\nhttp://ex.com/1\nhttp://ex.com/2\n").unwrap();
    fs::write(data.join("num_inlinks.txt"), "2\n1\n1\n").unwrap();
    if with_index {
        publish(&config.index, &build(&load_documents(&config.corpus).unwrap())).unwrap();
    }
    config
}

fn search(config: &Config, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_search"))
        .args(args)
        .arg("--data-dir")
        .arg(&config.corpus.root)
        .arg("--index-dir")
        .arg(&config.index.root)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(out: &Output) -> String { String::from_utf8_lossy(&out.stdout).into_owned() }

#[test]
fn prints_ranked_results() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path(), true);
    let out = search(&config, &["foo"]);
    assert_eq!(out.status.code(), Some(0));
    assert_eq!(
        stdout(&out),
        "1. Doc_ID = 0 ; Score = 0.75\nTitle = foo\nURL = http://ex.com/0\n\
         2. Doc_ID = 2 ; Score = 0.625\nTitle = qux\nURL = http://ex.com/2\n"
    );
}

#[test]
fn k_limits_and_falls_back() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path(), true);
    let one = search(&config, &["foo", "1"]);
    assert_eq!(stdout(&one).lines().count(), 3);

    for bad in ["0", "100001", "abc"] {
        let out = search(&config, &["foo", bad]);
        assert_eq!(out.status.code(), Some(0), "k={bad}");
        assert_eq!(stdout(&out).lines().count(), 6, "k={bad}");
        assert!(String::from_utf8_lossy(&out.stderr).contains("setting k = 10"));
    }
}

#[test]
fn no_results_is_success() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path(), true);
    for query in ["zebra", "the of"] {
        let out = search(&config, &[query]);
        assert_eq!(out.status.code(), Some(0));
        assert_eq!(stdout(&out), "No results found\n");
    }
}

#[test]
fn missing_index_exits_with_one() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path(), false);
    let out = search(&config, &["foo"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("indexer build"));
}

#[test]
fn bad_usage_exits_with_one() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path(), true);
    assert_eq!(search(&config, &[]).status.code(), Some(1));
    assert_eq!(search(&config, &["foo", "2", "extra"]).status.code(), Some(1));
}
