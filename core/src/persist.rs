//! On-disk index: posting file, offset table, seek table and meta, published as one
//! generation at a time.
//!
//! Layout under the index root:
//!
//! ```text
//! CURRENT              name of the published generation
//! gen-000002/
//!     postings.txt     term \t {"df":..,"docs":[[doc_id,tf],..]}, sorted by term
//!     offsets.txt      N, then "term line" per term, same order
//!     postings.seek    bincode Vec<u64>: byte position of every posting line
//!     meta.json
//! ```

use crate::{DocId, IndexError, IndexMeta, InvertedIndex, Posting, PostingSource};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, create_dir_all, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;
const GENERATION_PREFIX: &str = "gen-";
const TERM_SEPARATOR: char = '\t';

#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn current(&self) -> PathBuf { self.root.join("CURRENT") }
    pub fn generation(&self, name: &str) -> GenerationPaths {
        GenerationPaths { dir: self.root.join(name) }
    }
}

/// Artifact paths inside one generation directory.
#[derive(Debug, Clone)]
pub struct GenerationPaths {
    pub dir: PathBuf,
}

impl GenerationPaths {
    pub fn postings(&self) -> PathBuf { self.dir.join("postings.txt") }
    pub fn offsets(&self) -> PathBuf { self.dir.join("offsets.txt") }
    pub fn seek(&self) -> PathBuf { self.dir.join("postings.seek") }
    pub fn meta(&self) -> PathBuf { self.dir.join("meta.json") }
}

// --- Posting line codec ---

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PostingRecord {
    df: u32,
    docs: Vec<(DocId, u32)>,
}

/// Encode one posting line, without the trailing newline.
pub fn encode_posting_line(term: &str, posting: &Posting) -> Result<String, IndexError> {
    let record = PostingRecord {
        df: posting.document_frequency,
        docs: posting.term_frequencies.iter().map(|(d, tf)| (*d, *tf)).collect(),
    };
    let json = serde_json::to_string(&record).map_err(|e| IndexError::encode("posting record", e))?;
    Ok(format!("{term}{TERM_SEPARATOR}{json}"))
}

/// Decode one posting line; `line` is its 0-based offset, used in errors.
pub fn decode_posting_line(line: u64, text: &str) -> Result<(String, Posting), IndexError> {
    let text = text.trim_end_matches(['\n', '\r']);
    let (term, json) = text
        .split_once(TERM_SEPARATOR)
        .ok_or_else(|| IndexError::malformed(line, "missing term separator"))?;
    if term.is_empty() {
        return Err(IndexError::malformed(line, "empty term"));
    }
    let record: PostingRecord = serde_json::from_str(json).map_err(|e| IndexError::malformed(line, e))?;
    if record.df as usize != record.docs.len() {
        return Err(IndexError::malformed(
            line,
            format!("df {} does not match {} documents", record.df, record.docs.len()),
        ));
    }
    let mut term_frequencies = BTreeMap::new();
    let mut prev: Option<DocId> = None;
    for (doc_id, tf) in record.docs {
        if prev.is_some_and(|p| p >= doc_id) {
            return Err(IndexError::malformed(line, format!("doc ids not ascending at {doc_id}")));
        }
        if tf == 0 {
            return Err(IndexError::malformed(line, format!("zero frequency for doc {doc_id}")));
        }
        term_frequencies.insert(doc_id, tf);
        prev = Some(doc_id);
    }
    Ok((term.to_string(), Posting { document_frequency: record.df, term_frequencies }))
}

// --- Writing ---

fn generation_number(name: &str) -> Option<u32> {
    name.strip_prefix(GENERATION_PREFIX)?.parse().ok()
}

fn generation_name(n: u32) -> String { format!("{GENERATION_PREFIX}{n:06}") }

fn existing_generations(root: &Path) -> Result<Vec<u32>, IndexError> {
    let mut gens = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if let Some(n) = entry.file_name().to_str().and_then(generation_number) {
            gens.push(n);
        }
    }
    gens.sort_unstable();
    Ok(gens)
}

/// Write the posting, offset, seek and meta files of `index` into `paths.dir`.
pub fn write_generation(paths: &GenerationPaths, index: &InvertedIndex) -> Result<IndexMeta, IndexError> {
    create_dir_all(&paths.dir)?;

    let mut seek: Vec<u64> = Vec::with_capacity(index.num_terms());
    let postings_file = File::create(paths.postings())?;
    let mut postings = BufWriter::new(postings_file);
    let offsets_file = File::create(paths.offsets())?;
    let mut offsets = BufWriter::new(offsets_file);
    writeln!(offsets, "{}", index.num_docs)?;

    let mut position = 0u64;
    for (line, (term, posting)) in index.postings.iter().enumerate() {
        let encoded = encode_posting_line(term, posting)?;
        seek.push(position);
        writeln!(postings, "{encoded}")?;
        writeln!(offsets, "{term} {line}")?;
        position += encoded.len() as u64 + 1;
    }
    postings.into_inner().map_err(|e| e.into_error())?.sync_all()?;
    offsets.into_inner().map_err(|e| e.into_error())?.sync_all()?;

    let bytes = bincode::serialize(&seek).map_err(|e| IndexError::encode("seek table", e))?;
    let mut f = File::create(paths.seek())?;
    f.write_all(&bytes)?;
    f.sync_all()?;

    let meta = IndexMeta {
        num_docs: index.num_docs,
        num_terms: index.num_terms() as u64,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .map_err(|e| IndexError::encode("build timestamp", e))?,
        version: FORMAT_VERSION,
    };
    save_meta(paths, &meta)?;
    Ok(meta)
}

/// Result of a publish: the generation now named by `CURRENT`.
#[derive(Debug, Clone)]
pub struct Published {
    pub generation: String,
    pub meta: IndexMeta,
}

/// Write `index` into a fresh generation and atomically point `CURRENT` at it.
///
/// Readers resolve `CURRENT` once and hold every artifact they need open, so they see
/// the previous or the new generation in full even after its directory is removed.
/// The previous generation stays on disk for readers about to open it; older ones are
/// removed.
pub fn publish(paths: &IndexPaths, index: &InvertedIndex) -> Result<Published, IndexError> {
    create_dir_all(&paths.root)?;
    let existing = existing_generations(&paths.root)?;
    let next = existing.last().map_or(1, |n| n + 1);
    let generation = generation_name(next);
    let gen_paths = paths.generation(&generation);
    fs::create_dir(&gen_paths.dir)?;
    let meta = write_generation(&gen_paths, index)?;

    let previous = read_current(paths).ok();
    let mut pointer = tempfile::NamedTempFile::new_in(&paths.root)?;
    writeln!(pointer, "{generation}")?;
    pointer.as_file().sync_all()?;
    pointer.persist(paths.current()).map_err(|e| e.error)?;
    tracing::info!(%generation, root = %paths.root.display(), "published index generation");

    let keep_from = previous.as_deref().and_then(generation_number).unwrap_or(next);
    for n in existing.into_iter().filter(|n| *n < keep_from) {
        let dir = paths.generation(&generation_name(n)).dir;
        if let Err(e) = fs::remove_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to remove stale generation");
        }
    }
    Ok(Published { generation, meta })
}

pub fn save_meta(paths: &GenerationPaths, meta: &IndexMeta) -> Result<(), IndexError> {
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta).map_err(|e| IndexError::encode("index meta", e))?;
    f.write_all(json.as_bytes())?;
    f.sync_all()?;
    Ok(())
}

// --- Reading ---

/// Name of the published generation.
pub fn read_current(paths: &IndexPaths) -> Result<String, IndexError> {
    let pointer = paths.current();
    let name = fs::read_to_string(&pointer).map_err(|e| IndexError::unavailable(&pointer, e))?;
    let name = name.trim();
    if generation_number(name).is_none() {
        return Err(IndexError::unavailable(&pointer, format!("invalid generation name {name:?}")));
    }
    Ok(name.to_string())
}

pub fn load_meta(paths: &GenerationPaths) -> Result<IndexMeta, IndexError> {
    let path = paths.meta();
    let mut buf = String::new();
    File::open(&path)
        .and_then(|mut f| f.read_to_string(&mut buf))
        .map_err(|e| IndexError::unavailable(&path, e))?;
    serde_json::from_str(&buf).map_err(|e| IndexError::unavailable(&path, e))
}

/// Term to posting-line lookup, plus the collection size `N`.
#[derive(Debug, Clone, Default)]
pub struct OffsetTable {
    num_docs: u32,
    offsets: HashMap<String, u64>,
}

impl OffsetTable {
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let f = File::open(path).map_err(|e| IndexError::unavailable(path, e))?;
        let mut lines = BufReader::new(f).lines();
        let first = lines
            .next()
            .ok_or_else(|| IndexError::unavailable(path, "empty offset file"))?
            .map_err(|e| IndexError::unavailable(path, e))?;
        let num_docs = first
            .trim()
            .parse::<u32>()
            .map_err(|e| IndexError::unavailable(path, format!("line 1: invalid document count: {e}")))?;

        let mut offsets = HashMap::new();
        for (i, line) in lines.enumerate() {
            let line = line.map_err(|e| IndexError::unavailable(path, e))?;
            let bad = |reason: &str| IndexError::unavailable(path, format!("line {}: {reason}", i + 2));
            let (term, offset) = line.trim_end().split_once(' ').ok_or_else(|| bad("expected `term offset`"))?;
            let offset = offset.parse::<u64>().map_err(|_| bad("invalid offset"))?;
            offsets.insert(term.to_string(), offset);
        }
        Ok(Self { num_docs, offsets })
    }

    pub fn num_docs(&self) -> u32 { self.num_docs }

    pub fn len(&self) -> usize { self.offsets.len() }

    pub fn is_empty(&self) -> bool { self.offsets.is_empty() }

    /// Line offset of the term's posting, `None` when the term is not indexed.
    pub fn lookup(&self, term: &str) -> Option<u64> { self.offsets.get(term).copied() }
}

/// Read-only view of one published generation.
///
/// The posting file stays open for the reader's lifetime, so a later publish that
/// removes the generation directory does not take the snapshot away.
#[derive(Debug)]
pub struct IndexReader {
    generation: String,
    meta: IndexMeta,
    offsets: OffsetTable,
    seek: Option<Vec<u64>>,
    postings: Mutex<File>,
}

impl IndexReader {
    /// Open the generation `CURRENT` names, loading its offset and seek tables.
    pub fn open(paths: &IndexPaths) -> Result<Self, IndexError> {
        let generation = read_current(paths)?;
        let gen_paths = paths.generation(&generation);
        let postings_path = gen_paths.postings();
        let postings = File::open(&postings_path).map_err(|e| IndexError::unavailable(&postings_path, e))?;
        let offsets = OffsetTable::load(&gen_paths.offsets())?;
        let seek = load_seek_table(&gen_paths, offsets.len())?;
        let meta = load_meta(&gen_paths)?;
        tracing::debug!(%generation, terms = offsets.len(), seek = seek.is_some(), "opened index");
        Ok(Self { generation, meta, offsets, seek, postings: Mutex::new(postings) })
    }

    pub fn generation(&self) -> &str { &self.generation }

    pub fn offsets(&self) -> &OffsetTable { &self.offsets }

    pub fn meta(&self) -> &IndexMeta { &self.meta }

    /// One seek and one line read per requested posting.
    fn fetch_seek(&self, seek: &[u64], wanted: &[(u64, &str)]) -> Result<HashMap<String, Posting>, IndexError> {
        let mut file = self.postings.lock();
        let mut reader = BufReader::new(&mut *file);
        let mut out = HashMap::with_capacity(wanted.len());
        let mut buf = String::new();
        for &(line, term) in wanted {
            let position = *seek
                .get(line as usize)
                .ok_or_else(|| IndexError::malformed(line, "offset beyond seek table"))?;
            reader.seek(SeekFrom::Start(position))?;
            buf.clear();
            if reader.read_line(&mut buf)? == 0 {
                return Err(IndexError::malformed(line, "posting file ends early"));
            }
            let (found, posting) = decode_posting_line(line, &buf)?;
            check_term(line, term, &found)?;
            out.insert(found, posting);
        }
        Ok(out)
    }

    /// Single ascending scan, stopping after the highest requested line.
    fn fetch_scan(&self, wanted: &[(u64, &str)]) -> Result<HashMap<String, Posting>, IndexError> {
        let mut file = self.postings.lock();
        file.seek(SeekFrom::Start(0))?;
        let reader = BufReader::new(&mut *file);
        let mut out = HashMap::with_capacity(wanted.len());
        let mut next = wanted.iter().peekable();
        for (i, text) in reader.lines().enumerate() {
            let Some(&&(line, term)) = next.peek() else { break };
            if i as u64 != line {
                continue;
            }
            let (found, posting) = decode_posting_line(line, &text?)?;
            check_term(line, term, &found)?;
            out.insert(found, posting);
            next.next();
        }
        if let Some(&(line, _)) = next.next() {
            return Err(IndexError::malformed(line, "posting file ends early"));
        }
        Ok(out)
    }
}

fn check_term(line: u64, expected: &str, found: &str) -> Result<(), IndexError> {
    if expected != found {
        return Err(IndexError::malformed(line, format!("expected term {expected:?}, found {found:?}")));
    }
    Ok(())
}

fn load_seek_table(paths: &GenerationPaths, num_terms: usize) -> Result<Option<Vec<u64>>, IndexError> {
    let path = paths.seek();
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "seek table missing, falling back to sequential scan");
            return Ok(None);
        }
        Err(e) => return Err(IndexError::unavailable(&path, e)),
    };
    let seek: Vec<u64> = bincode::deserialize(&bytes).map_err(|e| IndexError::unavailable(&path, e))?;
    if seek.len() != num_terms {
        return Err(IndexError::unavailable(
            &path,
            format!("{} entries for {num_terms} terms", seek.len()),
        ));
    }
    Ok(Some(seek))
}

impl PostingSource for IndexReader {
    fn num_docs(&self) -> u32 { self.offsets.num_docs() }

    fn contains(&self, term: &str) -> bool { self.offsets.lookup(term).is_some() }

    fn fetch<'t, I>(&self, terms: I) -> Result<HashMap<String, Posting>, IndexError>
    where
        I: IntoIterator<Item = &'t str>,
    {
        let mut wanted: Vec<(u64, &str)> = Vec::new();
        for term in terms {
            match self.offsets.lookup(term) {
                Some(line) => wanted.push((line, term)),
                None => tracing::debug!(term, "term not in vocabulary"),
            }
        }
        wanted.sort_unstable();
        wanted.dedup();
        if wanted.is_empty() {
            return Ok(HashMap::new());
        }
        match &self.seek {
            Some(seek) => self.fetch_seek(seek, &wanted),
            None => self.fetch_scan(&wanted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(docs: &[(DocId, u32)]) -> Posting {
        Posting { document_frequency: docs.len() as u32, term_frequencies: docs.iter().copied().collect() }
    }

    #[test]
    fn posting_line_format() {
        let line = encode_posting_line("foo", &posting(&[(0, 2), (2, 1)])).unwrap();
        assert_eq!(line, "foo\t{\"df\":2,\"docs\":[[0,2],[2,1]]}");
        let (term, p) = decode_posting_line(0, &line).unwrap();
        assert_eq!(term, "foo");
        assert_eq!(p, posting(&[(0, 2), (2, 1)]));
    }

    #[test]
    fn rejects_malformed_lines() {
        let cases = [
            "foo {\"df\":1,\"docs\":[[0,1]]}",
            "\t{\"df\":1,\"docs\":[[0,1]]}",
            "foo\t[1, {0: 1}]",
            "foo\t{\"df\":2,\"docs\":[[0,1]]}",
            "foo\t{\"df\":2,\"docs\":[[3,1],[1,1]]}",
            "foo\t{\"df\":1,\"docs\":[[0,0]]}",
            "foo\t{\"df\":1,\"docs\":[[0,1]],\"extra\":1}",
        ];
        for case in cases {
            let err = decode_posting_line(7, case).unwrap_err();
            assert!(matches!(err, IndexError::MalformedPosting { line: 7, .. }), "{case}: {err}");
        }
    }

    #[test]
    fn generation_names_round_trip() {
        assert_eq!(generation_name(12), "gen-000012");
        assert_eq!(generation_number("gen-000012"), Some(12));
        assert_eq!(generation_number("postings.txt"), None);
    }
}
