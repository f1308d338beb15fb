//! Archive lister using the external unrar binary

use super::traits::ArchiveLister;
use crate::config::ToolsConfig;
use crate::error::ListError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Lister running `unrar vb` on each archive
///
/// `vb` prints one bare member name per line, which is all the detector needs.
/// `-p-` keeps unrar from prompting for a password on archives with encrypted
/// headers; such archives fail to list instead of blocking the invocation.
pub struct UnrarLister {
    binary_path: PathBuf,
    timeout: Duration,
}

impl UnrarLister {
    /// Create a lister with an explicit binary path
    pub fn new(binary_path: PathBuf, timeout: Duration) -> Self {
        Self {
            binary_path,
            timeout,
        }
    }

    /// Create a lister from the host's unrar command line
    ///
    /// The executable is taken out of `NZBOP_UNRARCMD` (which may carry
    /// extraction switches) and bare names are looked up in `PATH`.
    pub fn from_config(tools: &ToolsConfig) -> Self {
        let executable = executable_from_command(&tools.unrar_command);
        let binary_path = resolve_in_path(executable);
        debug!(command = %tools.unrar_command, binary = ?binary_path, "resolved archive tool");
        Self::new(binary_path, tools.list_timeout)
    }

    /// Path of the binary this lister runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }
}

#[async_trait]
impl ArchiveLister for UnrarLister {
    async fn list(&self, archive: &Path) -> Result<Vec<String>, ListError> {
        let run = Command::new(&self.binary_path)
            .arg("vb")
            .arg("-p-")
            .arg(archive)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, run).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ListError::ToolNotFound {
                    tool: self.binary_path.clone(),
                    reason: e.to_string(),
                });
            }
            Ok(Err(e)) => {
                return Err(ListError::Spawn {
                    tool: self.binary_path.clone(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(ListError::TimedOut {
                    file: archive.to_path_buf(),
                    timeout: self.timeout,
                });
            }
        };

        if !output.status.success() {
            return Err(ListError::NonZeroExit {
                file: archive.to_path_buf(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8(output.stdout).map_err(|_| ListError::UnreadableOutput {
            file: archive.to_path_buf(),
        })?;

        Ok(parse_listing(&stdout))
    }

    fn name(&self) -> &'static str {
        "unrar"
    }
}

/// Member names from bare listing output, one per non-empty line
pub fn parse_listing(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Executable part of a command line that may carry extra arguments
///
/// Recognizes, in order:
/// - a leading double-quoted path: `"C:\Program Files\unrar.exe" x -o+`
/// - an unquoted path containing spaces that exists on disk
/// - otherwise the first whitespace-separated token: `unrar -ai`
pub fn executable_from_command(command: &str) -> PathBuf {
    let command = command.trim();

    if let Some(rest) = command.strip_prefix('"') {
        let end = rest.find('"').unwrap_or(rest.len());
        return PathBuf::from(&rest[..end]);
    }

    let tokens: Vec<&str> = command.split_whitespace().collect();
    for n in (2..=tokens.len()).rev() {
        let candidate = tokens[..n].join(" ");
        if Path::new(&candidate).is_file() {
            return PathBuf::from(candidate);
        }
    }

    PathBuf::from(tokens.first().copied().unwrap_or(command))
}

/// Look a bare program name up in `PATH`; paths are returned unchanged
fn resolve_in_path(executable: PathBuf) -> PathBuf {
    if executable.components().count() > 1 || executable.is_absolute() {
        return executable;
    }
    which::which(&executable).unwrap_or(executable)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executable_is_first_token() {
        assert_eq!(executable_from_command("unrar"), PathBuf::from("unrar"));
        assert_eq!(
            executable_from_command("  /usr/bin/unrar -ai -o+ "),
            PathBuf::from("/usr/bin/unrar")
        );
    }

    #[test]
    fn quoted_executable_keeps_spaces() {
        assert_eq!(
            executable_from_command(r#""C:\Program Files\WinRAR\UnRAR.exe" x -y"#),
            PathBuf::from(r"C:\Program Files\WinRAR\UnRAR.exe")
        );
        assert_eq!(
            executable_from_command(r#""/opt/my tools/unrar"#),
            PathBuf::from("/opt/my tools/unrar")
        );
    }

    #[test]
    fn unquoted_existing_path_with_spaces() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("my tools");
        std::fs::create_dir(&dir).unwrap();
        let tool = dir.join("unrar");
        std::fs::write(&tool, "").unwrap();

        let command = format!("{} -ai", tool.display());
        assert_eq!(executable_from_command(&command), tool);
    }

    #[test]
    fn empty_command_yields_empty_path() {
        assert_eq!(executable_from_command("   "), PathBuf::from(""));
    }

    #[test]
    fn explicit_paths_are_not_searched() {
        let path = PathBuf::from("/nonexistent/bin/unrar");
        assert_eq!(resolve_in_path(path.clone()), path);
    }

    #[test]
    fn unknown_bare_name_is_kept() {
        let name = PathBuf::from("nonexistent-unrar-binary-xyz");
        assert_eq!(resolve_in_path(name.clone()), name);
    }

    #[test]
    fn listing_output_skips_blank_lines() {
        let out = "Movie/movie.mkv\r\n\nMovie/setup.exe\n   \n";
        assert_eq!(parse_listing(out), vec!["Movie/movie.mkv", "Movie/setup.exe"]);
    }

    #[tokio::test]
    async fn missing_binary_is_tool_not_found() {
        let lister = UnrarLister::new(
            PathBuf::from("/nonexistent/path/to/unrar"),
            Duration::from_secs(5),
        );
        let err = lister.list(Path::new("test.rar")).await.unwrap_err();
        assert!(err.is_fatal(), "expected ToolNotFound, got {err:?}");
    }

    #[cfg(unix)]
    mod with_fake_tool {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn fake_tool(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-unrar");
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[tokio::test]
        async fn successful_listing_returns_lines() {
            let temp = tempfile::TempDir::new().unwrap();
            let tool = fake_tool(temp.path(), r#"printf 'a.mkv\nb/c.exe\n'"#);
            let lister = UnrarLister::new(tool, Duration::from_secs(10));

            let names = lister.list(Path::new("x.rar")).await.unwrap();
            assert_eq!(names, vec!["a.mkv", "b/c.exe"]);
        }

        #[tokio::test]
        async fn tool_receives_list_mode_and_file() {
            let temp = tempfile::TempDir::new().unwrap();
            let tool = fake_tool(temp.path(), r#"echo "$1|$2|$3""#);
            let lister = UnrarLister::new(tool, Duration::from_secs(10));

            let names = lister.list(Path::new("/dl/x.part01.rar")).await.unwrap();
            assert_eq!(names, vec!["vb|-p-|/dl/x.part01.rar"]);
        }

        #[tokio::test]
        async fn non_zero_exit_is_reported_with_stderr() {
            let temp = tempfile::TempDir::new().unwrap();
            let tool = fake_tool(temp.path(), "echo 'is not RAR archive' >&2; exit 10");
            let lister = UnrarLister::new(tool, Duration::from_secs(10));

            match lister.list(Path::new("movie.mkv")).await.unwrap_err() {
                ListError::NonZeroExit { code, stderr, .. } => {
                    assert_eq!(code, Some(10));
                    assert_eq!(stderr, "is not RAR archive");
                }
                other => panic!("expected NonZeroExit, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn invalid_utf8_output_is_unreadable() {
            let temp = tempfile::TempDir::new().unwrap();
            let tool = fake_tool(temp.path(), r#"printf '\377\376\n'"#);
            let lister = UnrarLister::new(tool, Duration::from_secs(10));

            let err = lister.list(Path::new("x.rar")).await.unwrap_err();
            assert!(matches!(err, ListError::UnreadableOutput { .. }));
        }

        #[tokio::test]
        async fn hung_tool_times_out() {
            let temp = tempfile::TempDir::new().unwrap();
            let tool = fake_tool(temp.path(), "sleep 5");
            let lister = UnrarLister::new(tool, Duration::from_millis(200));

            let err = lister.list(Path::new("x.rar")).await.unwrap_err();
            assert!(matches!(err, ListError::TimedOut { .. }));
        }
    }
}
