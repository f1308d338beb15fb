//! Download directories, fake archive tools and host environments

use fake_detector::ScriptEnv;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::MockServer;

/// Download id used by every scenario
pub const NZB_ID: &str = "42";

/// Scratch space laid out like an NZBGet installation
pub struct HostDirs {
    pub temp: TempDir,
    pub download: PathBuf,
    pub temp_dir: PathBuf,
}

impl HostDirs {
    /// Create the download directory with empty `files`
    pub fn with_files(files: &[&str]) -> Self {
        let temp = TempDir::new().unwrap();
        let download = temp.path().join("downloads").join("Movie.2024");
        let temp_dir = temp.path().join("nzbget-temp");
        std::fs::create_dir_all(&download).unwrap();
        std::fs::create_dir_all(&temp_dir).unwrap();
        for file in files {
            let path = download.join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, b"").unwrap();
        }
        Self {
            temp,
            download,
            temp_dir,
        }
    }

    /// Cache file of the scenario's download
    pub fn cache_file(&self) -> PathBuf {
        self.temp_dir.join("FakeDetector").join(NZB_ID)
    }

    /// Install a shell script standing in for unrar
    pub fn fake_unrar(&self, body: &str) -> PathBuf {
        let path = self.temp.path().join("bin").join("unrar");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}

/// Global options every invocation carries
pub fn host_env(dirs: &HostDirs, server: &MockServer, unrar: &Path) -> ScriptEnv {
    let address = server.address();
    ScriptEnv::from_pairs([
        ("NZBOP_ARTICLECACHE", "0".to_string()),
        ("NZBOP_CONTROLIP", address.ip().to_string()),
        ("NZBOP_CONTROLPORT", address.port().to_string()),
        ("NZBOP_CONTROLUSERNAME", "nzbget".to_string()),
        ("NZBOP_CONTROLPASSWORD", "tegbzn6789".to_string()),
        ("NZBOP_TEMPDIR", dirs.temp_dir.to_string_lossy().into_owned()),
        ("NZBOP_UNRARCMD", format!("{} x -o+", unrar.display())),
    ])
}

/// Queue-script environment for `event`
pub fn queue_env(mut env: ScriptEnv, dirs: &HostDirs, event: &str) -> ScriptEnv {
    env.set("NZBNA_EVENT", event);
    env.set("NZBNA_NZBID", NZB_ID);
    env.set("NZBNA_NZBNAME", "Movie.2024");
    env.set("NZBNA_CATEGORY", "Movies");
    env.set("NZBNA_DIRECTORY", dirs.download.to_string_lossy());
    env
}

/// Post-processing environment for a successful download
pub fn post_process_env(mut env: ScriptEnv, dirs: &HostDirs) -> ScriptEnv {
    env.set("NZBPP_NZBID", NZB_ID);
    env.set("NZBPP_NZBNAME", "Movie.2024");
    env.set("NZBPP_CATEGORY", "Movies");
    env.set("NZBPP_DIRECTORY", dirs.download.to_string_lossy());
    env.set("NZBPP_STATUS", "SUCCESS/ALL");
    env.set("NZBPP_TOTALSTATUS", "SUCCESS");
    env
}
