use std::io;
use std::path::PathBuf;

use crate::DocId;

/// Failures reading or writing index artifacts.
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    /// An artifact is absent, unreadable or structurally invalid; the index has to be rebuilt.
    #[error("index unavailable at {}: {reason}", path.display())]
    Unavailable { path: PathBuf, reason: String },
    /// A posting line does not decode into its record.
    #[error("malformed posting at line {line}: {reason}")]
    MalformedPosting { line: u64, reason: String },
    #[error("cannot encode {what}: {reason}")]
    Encode { what: &'static str, reason: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl IndexError {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Unavailable { path: path.into(), reason: reason.to_string() }
    }

    pub(crate) fn malformed(line: u64, reason: impl ToString) -> Self {
        Self::MalformedPosting { line, reason: reason.to_string() }
    }

    pub(crate) fn encode(what: &'static str, reason: impl ToString) -> Self {
        Self::Encode { what, reason: reason.to_string() }
    }
}

/// Failures reading the aligned per-document field files.
#[derive(thiserror::Error, Debug)]
pub enum CorpusError {
    #[error("cannot read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    /// The text field files disagree on the number of documents.
    #[error("misaligned corpus: {field} has {found} lines, expected {expected}")]
    MisalignedCorpus { field: &'static str, found: usize, expected: usize },
    /// `line` is 1-based.
    #[error("invalid inbound link count {value:?} at line {line}")]
    BadInlinkCount { line: usize, value: String },
    /// A ranked document has no entry in the per-document files.
    #[error("document {0} is missing from the corpus")]
    CorpusMismatch(DocId),
}
