//! Configuration types for fake-detector
//!
//! NZBGet hands everything to a script through environment variables:
//! - `NZBOP_*` global options (control port, temp dir, unrar command)
//! - `NZBPO_*` options of this script (categories, banned extensions)
//! - `NZBNA_*` / `NZBPP_*` context of the download being processed
//! - `NZBPR_*` parameters previously set on the download
//!
//! [`ScriptEnv`] is a snapshot of those variables so parsing never touches the
//! process environment directly; [`Config`] and [`InvocationContext`] are
//! built from it once and passed down explicitly.

use crate::error::{Error, Result};
use crate::types::{DownloadId, FAKE_PARAM, Invocation, QueueEvent, SORTED_PARAM};
use regex::Regex;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// Media extensions that make a download worth protecting
pub const DEFAULT_MEDIA_EXTENSIONS: &[&str] = &[
    ".mkv", ".avi", ".divx", ".xvid", ".mov", ".wmv", ".mp4", ".mpg", ".mpeg", ".vob", ".iso",
    ".m4v",
];

/// Name of the sub-directory of `NZBOP_TEMPDIR` holding inspection caches
pub const CACHE_DIR_NAME: &str = "FakeDetector";

/// Default limit for a single archive listing
const DEFAULT_LIST_TIMEOUT_SECS: u64 = 300;

/// Default NZBGet control port
const DEFAULT_CONTROL_PORT: u16 = 6789;

/// Snapshot of the environment the host passed to the script
///
/// Values are kept as the host sent them. NZBGet passes paths and download
/// names as raw bytes, so text accessors see a lossy UTF-8 rendering while
/// [`ScriptEnv::path`] keeps the exact bytes.
#[derive(Clone, Debug, Default)]
pub struct ScriptEnv {
    vars: HashMap<String, String>,
    raw: HashMap<String, OsString>,
}

impl ScriptEnv {
    /// Capture the current process environment
    pub fn from_process() -> Self {
        let mut env = Self::default();
        for (key, value) in std::env::vars_os() {
            env.set_os(key.to_string_lossy(), value);
        }
        env
    }

    /// Build from explicit key/value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut env = Self::default();
        for (key, value) in pairs {
            env.set(key, value);
        }
        env
    }

    /// Set or replace a variable
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        self.set_os(key, OsString::from(value));
    }

    /// Set or replace a variable from raw bytes
    pub fn set_os(&mut self, key: impl Into<String>, value: impl Into<OsString>) {
        let key = key.into();
        let value = value.into();
        self.vars
            .insert(key.clone(), value.to_string_lossy().into_owned());
        self.raw.insert(key, value);
    }

    /// Remove a variable
    pub fn remove(&mut self, key: &str) {
        self.vars.remove(key);
        self.raw.remove(key);
    }

    /// Value of a variable, if present
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Value of a variable as an exact path, if present
    pub fn path(&self, key: &str) -> Option<PathBuf> {
        self.raw.get(key).map(PathBuf::from)
    }

    /// Whether a variable is present (even if empty)
    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Value of a variable that must be present
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| Error::config(key, format!("{} is not set", key)))
    }

    /// Path-valued variable that must be present
    pub fn require_path(&self, key: &str) -> Result<PathBuf> {
        self.path(key)
            .ok_or_else(|| Error::config(key, format!("{} is not set", key)))
    }
}

/// Connection to the NZBGet control interface
#[derive(Clone, Debug)]
pub struct HostConfig {
    /// Control IP (`0.0.0.0` is rewritten to loopback)
    pub host: String,
    /// Control port
    pub port: u16,
    /// Control username
    pub username: String,
    /// Control password
    pub password: String,
    /// Timeout for a single request
    pub timeout: Duration,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_CONTROL_PORT,
            username: String::new(),
            password: String::new(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl HostConfig {
    fn from_env(env: &ScriptEnv) -> Result<Self> {
        let defaults = Self::default();

        let host = match env.get("NZBOP_CONTROLIP").map(str::trim) {
            None | Some("") | Some("0.0.0.0") => defaults.host,
            Some(ip) => ip.to_string(),
        };

        let port = match env.get("NZBOP_CONTROLPORT") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                Error::config(
                    "NZBOP_CONTROLPORT",
                    format!("invalid control port '{}'", raw),
                )
            })?,
            None => defaults.port,
        };

        Ok(Self {
            host,
            port,
            username: env.get("NZBOP_CONTROLUSERNAME").unwrap_or("").to_string(),
            password: env.get("NZBOP_CONTROLPASSWORD").unwrap_or("").to_string(),
            timeout: defaults.timeout,
        })
    }

    /// URL of the JSON-RPC endpoint (credentials are sent as basic auth)
    pub fn rpc_url(&self) -> Result<url::Url> {
        let raw = format!("http://{}:{}/jsonrpc", self.host, self.port);
        url::Url::parse(&raw).map_err(|e| {
            Error::config(
                "NZBOP_CONTROLIP",
                format!("cannot build RPC URL from '{}': {}", raw, e),
            )
        })
    }
}

/// External archive tool settings
#[derive(Clone, Debug)]
pub struct ToolsConfig {
    /// Raw `NZBOP_UNRARCMD`, possibly with extra switches
    pub unrar_command: String,
    /// Limit for listing one file
    pub list_timeout: Duration,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            unrar_command: "unrar".to_string(),
            list_timeout: Duration::from_secs(DEFAULT_LIST_TIMEOUT_SECS),
        }
    }
}

impl ToolsConfig {
    fn from_env(env: &ScriptEnv) -> Result<Self> {
        let defaults = Self::default();

        let unrar_command = match env.get("NZBOP_UNRARCMD").map(str::trim) {
            None | Some("") => defaults.unrar_command,
            Some(cmd) => cmd.to_string(),
        };

        let list_timeout = match env.get("NZBPO_LISTTIMEOUT").map(str::trim) {
            None | Some("") => defaults.list_timeout,
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| {
                    Error::config(
                        "NZBPO_LISTTIMEOUT",
                        format!("invalid listing timeout '{}'", raw),
                    )
                })?;
                if secs == 0 {
                    return Err(Error::config(
                        "NZBPO_LISTTIMEOUT",
                        "listing timeout must be at least 1 second",
                    ));
                }
                Duration::from_secs(secs)
            }
        };

        Ok(Self {
            unrar_command,
            list_timeout,
        })
    }
}

/// Detection policy
#[derive(Clone, Debug)]
pub struct DetectionConfig {
    /// Category wildcards to check; empty means every category
    pub categories: Vec<String>,
    /// Extensions that mark a download as fake on their own (lowercase, with dot)
    pub banned_extensions: Vec<String>,
    /// Media extensions (lowercase, with dot)
    pub media_extensions: Vec<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            banned_extensions: Vec::new(),
            media_extensions: DEFAULT_MEDIA_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl DetectionConfig {
    fn from_env(env: &ScriptEnv) -> Self {
        Self {
            categories: split_list(env.get("NZBPO_CATEGORIES").unwrap_or("")),
            banned_extensions: parse_extension_list(
                env.get("NZBPO_BANNEDEXTENSIONS").unwrap_or(""),
            ),
            ..Self::default()
        }
    }

    /// Whether downloads of this category should be checked
    ///
    /// Patterns support `*` and `?` and are matched case-insensitively.
    #[must_use]
    pub fn matches_category(&self, category: &str) -> bool {
        if self.categories.is_empty() {
            return true;
        }
        self.categories
            .iter()
            .any(|pattern| wildcard_matches(pattern, category))
    }
}

/// Location of the per-download inspection caches
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Directory holding one file per download id
    pub root: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: std::env::temp_dir().join(CACHE_DIR_NAME),
        }
    }
}

impl CacheConfig {
    fn from_env(env: &ScriptEnv) -> Self {
        match env.get("NZBOP_TEMPDIR").map(str::trim) {
            Some(dir) if !dir.is_empty() => Self {
                root: PathBuf::from(dir).join(CACHE_DIR_NAME),
            },
            _ => Self::default(),
        }
    }
}

/// Complete script configuration
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Host control connection
    pub host: HostConfig,
    /// Archive tool
    pub tools: ToolsConfig,
    /// Detection policy
    pub detection: DetectionConfig,
    /// Inspection cache location
    pub cache: CacheConfig,
}

impl Config {
    /// Build the configuration from the host-supplied environment
    pub fn from_env(env: &ScriptEnv) -> Result<Self> {
        Ok(Self {
            host: HostConfig::from_env(env)?,
            tools: ToolsConfig::from_env(env)?,
            detection: DetectionConfig::from_env(env),
            cache: CacheConfig::from_env(env),
        })
    }
}

/// The download this invocation is about
#[derive(Clone, Debug)]
pub struct InvocationContext {
    /// Queue event or post-processing
    pub invocation: Invocation,
    /// Download category
    pub category: String,
    /// Download directory
    pub directory: PathBuf,
    /// Download name, for logging
    pub nzb_name: String,
    /// Download id
    pub download_id: DownloadId,
    /// `NZBPP_STATUS` (post-processing only)
    pub status: Option<String>,
    /// `NZBPP_TOTALSTATUS` (post-processing only)
    pub total_status: Option<String>,
    /// Previous value of the fake annotation
    pub fake_param: Option<String>,
    /// Previous value of the sorted flag
    pub sorted_param: Option<String>,
}

impl InvocationContext {
    /// Determine the invocation mode and read the download context
    pub fn from_env(env: &ScriptEnv) -> Result<Self> {
        let invocation = match env.get("NZBNA_EVENT") {
            Some(event) => Invocation::Queue(QueueEvent::parse(event)),
            None => Invocation::PostProcess,
        };
        let prefix = invocation.prefix();
        let var = |name: &str| format!("{}{}", prefix, name);

        let id_key = var("NZBID");
        let download_id = env
            .require(&id_key)?
            .parse()
            .map_err(|_| Error::config(&id_key, "download id is not a number"))?;

        Ok(Self {
            category: env.get(&var("CATEGORY")).unwrap_or("").to_string(),
            directory: env.require_path(&var("DIRECTORY"))?,
            nzb_name: env.require(&var("NZBNAME"))?.to_string(),
            download_id,
            status: env.get("NZBPP_STATUS").map(str::to_string),
            total_status: env.get("NZBPP_TOTALSTATUS").map(str::to_string),
            fake_param: env.get(&format!("NZBPR_{}", FAKE_PARAM)).map(str::to_string),
            sorted_param: env
                .get(&format!("NZBPR_{}", SORTED_PARAM))
                .map(str::to_string),
            invocation,
        })
    }

    /// Whether an earlier run annotated this download as fake
    pub fn previously_fake(&self) -> bool {
        self.fake_param.as_deref() == Some("yes")
    }

    /// Whether inner files were already reordered
    pub fn already_sorted(&self) -> bool {
        self.sorted_param.as_deref() == Some("yes")
    }
}

/// Split a comma-separated option, trimming whitespace and dropping empty items
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a comma-separated extension list into lowercase `.ext` form
pub fn parse_extension_list(raw: &str) -> Vec<String> {
    split_list(raw)
        .into_iter()
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            if ext.starts_with('.') {
                ext
            } else {
                format!(".{}", ext)
            }
        })
        .collect()
}

/// Shell-style wildcard match (`*`, `?`), case-insensitive
fn wildcard_matches(pattern: &str, text: &str) -> bool {
    let mut re = String::from("(?i)^");
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');

    match Regex::new(&re) {
        Ok(regex) => regex.is_match(text),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "ignoring invalid category pattern");
            false
        }
    }
}
