//! Core types for fake-detector

use serde::{Deserialize, Serialize};

/// Identifier NZBGet assigns to a download (`NZBID`)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadId(pub i64);

impl DownloadId {
    /// Create a new DownloadId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for DownloadId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for DownloadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DownloadId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Identifier of a single file inside a download
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub i64);

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A file of a download as reported by the host's `listfiles` call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedFile {
    /// File id, used when editing the queue
    #[serde(rename = "ID")]
    pub id: FileId,
    /// Filename as announced in the NZB
    #[serde(rename = "Filename")]
    pub filename: String,
}

/// Queue-script event passed in `NZBNA_EVENT`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueueEvent {
    /// The NZB was just added to the queue
    NzbAdded,
    /// One file of the download finished
    FileDownloaded,
    /// All files of the download finished
    NzbDownloaded,
    /// Any event this script does not handle
    Other(String),
}

impl QueueEvent {
    /// Parse the raw event name
    pub fn parse(raw: &str) -> Self {
        match raw {
            "NZB_ADDED" => QueueEvent::NzbAdded,
            "FILE_DOWNLOADED" => QueueEvent::FileDownloaded,
            "NZB_DOWNLOADED" => QueueEvent::NzbDownloaded,
            other => QueueEvent::Other(other.to_string()),
        }
    }

    /// Whether the script acts on this event
    pub fn is_supported(&self) -> bool {
        !matches!(self, QueueEvent::Other(_))
    }
}

/// How the host invoked the script
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Invocation {
    /// Queue script (`NZBNA_*` variables)
    Queue(QueueEvent),
    /// Post-processing script (`NZBPP_*` variables)
    PostProcess,
}

impl Invocation {
    /// Environment variable prefix for the download context in this mode
    pub fn prefix(&self) -> &'static str {
        match self {
            Invocation::Queue(_) => "NZBNA_",
            Invocation::PostProcess => "NZBPP_",
        }
    }

    /// Whether this is a post-processing invocation
    pub fn is_post_process(&self) -> bool {
        matches!(self, Invocation::PostProcess)
    }
}

/// Name of the annotation telling later scripts the download is a fake
pub const FAKE_PARAM: &str = "PPSTATUS_FAKE";

/// Name of the annotation recording that inner files were already reordered
pub const SORTED_PARAM: &str = "FAKEDETECTOR_SORTED";

/// A command line the host parses from the script's standard output
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    /// Mark the download as bad (`[NZB] MARK=BAD`)
    MarkBad,
    /// Set (or clear, with an empty value) a persistent download parameter
    SetParam {
        /// Parameter name without the `NZBPR_` prefix
        key: String,
        /// New value, empty to clear
        value: String,
    },
}

impl Directive {
    /// Set a download parameter
    pub fn set_param(key: &str, value: &str) -> Self {
        Directive::SetParam {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

impl std::fmt::Display for Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Directive::MarkBad => write!(f, "[NZB] MARK=BAD"),
            Directive::SetParam { key, value } => write!(f, "[NZB] NZBPR_{}={}", key, value),
        }
    }
}

/// Process exit status understood by the host
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptExit {
    /// Post-processing succeeded (93)
    Success,
    /// Post-processing failed (94)
    Error,
    /// Nothing was done (95)
    None,
    /// Queue event this script does not handle (0)
    Ignored,
    /// Not started by a compatible host (1)
    Incompatible,
}

impl ScriptExit {
    /// Numeric process exit code
    pub fn code(self) -> i32 {
        match self {
            ScriptExit::Success => 93,
            ScriptExit::Error => 94,
            ScriptExit::None => 95,
            ScriptExit::Ignored => 0,
            ScriptExit::Incompatible => 1,
        }
    }
}

/// What one invocation decided: directives to print and the exit status
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    /// Directives in emission order
    pub directives: Vec<Directive>,
    /// Exit status
    pub exit: ScriptExit,
}

impl Outcome {
    /// Outcome without directives
    pub fn exit(exit: ScriptExit) -> Self {
        Self {
            directives: Vec::new(),
            exit,
        }
    }
}
