//! One script invocation, from startup checks to the final exit status
//!
//! ```text
//! STARTUP_CHECK → (REORDER)? → (EXIT_EARLY | CATEGORY_CHECK → DETECT → ANNOTATE → (CLEANUP)? → EXIT)
//! ```
//!
//! Nothing here prints directly: the result is an [`Outcome`] with the
//! directives to emit and the exit status, so a run can be inspected in tests.

use crate::cache::InspectionCache;
use crate::cleanup::cleanup_caches;
use crate::config::{Config, InvocationContext, ScriptEnv};
use crate::detector::FakeDetector;
use crate::error::Result;
use crate::host::{HostApi, JsonRpcClient};
use crate::listing::{ArchiveLister, UnrarLister};
use crate::reorder::sort_inner_files;
use crate::types::{
    Directive, FAKE_PARAM, Invocation, Outcome, QueueEvent, SORTED_PARAM, ScriptExit,
};
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Status NZBGet reports for downloads already marked bad
const STATUS_BAD: &str = "FAILURE/BAD";

/// Decide from the raw environment whether the script should run at all
///
/// Returns the exit status to use when it should not.
pub fn startup_check(env: &ScriptEnv) -> Option<ScriptExit> {
    let from_host = env.contains("NZBNA_EVENT") || env.contains("NZBPP_DIRECTORY");
    if !from_host || !env.contains("NZBOP_ARTICLECACHE") {
        return Some(ScriptExit::Incompatible);
    }

    // Newer hosts send events this script predates
    if let Some(event) = env.get("NZBNA_EVENT")
        && !QueueEvent::parse(event).is_supported()
    {
        return Some(ScriptExit::Ignored);
    }

    if env.get("NZBPP_STATUS") == Some(STATUS_BAD) {
        return Some(ScriptExit::Success);
    }

    // "Post-process again" from history may run after the files were deleted
    if let Some(dir) = env.path("NZBPP_DIRECTORY")
        && !dir.exists()
    {
        info!("Destination directory doesn't exist, exiting");
        return Some(ScriptExit::None);
    }

    if env.get("NZBPP_TOTALSTATUS") == Some("FAILURE") {
        return Some(ScriptExit::None);
    }

    None
}

/// Runs the fake detector for one invocation
pub struct Orchestrator {
    config: Config,
    host: Arc<dyn HostApi>,
    lister: Arc<dyn ArchiveLister>,
}

impl Orchestrator {
    /// Create an orchestrator with explicit collaborators
    pub fn new(config: Config, host: Arc<dyn HostApi>, lister: Arc<dyn ArchiveLister>) -> Self {
        Self {
            config,
            host,
            lister,
        }
    }

    /// Create an orchestrator talking to the real host and unrar
    ///
    /// # Errors
    /// Returns error if the host connection settings are invalid
    pub fn from_config(config: Config) -> Result<Self> {
        let host: Arc<dyn HostApi> = Arc::new(JsonRpcClient::new(&config.host)?);
        let lister: Arc<dyn ArchiveLister> = Arc::new(UnrarLister::from_config(&config.tools));
        Ok(Self::new(config, host, lister))
    }

    /// Process one invocation; failures are logged and turned into an error exit
    pub async fn run(&self, ctx: &InvocationContext) -> Outcome {
        let mut directives = Vec::new();
        let exit = match self.execute(ctx, &mut directives).await {
            Ok(exit) => exit,
            Err(e) => {
                error!("Fake detection for {} failed: {}", ctx.nzb_name, e);
                ScriptExit::Error
            }
        };
        Outcome { directives, exit }
    }

    async fn execute(
        &self,
        ctx: &InvocationContext,
        directives: &mut Vec<Directive>,
    ) -> Result<ScriptExit> {
        if let Invocation::Queue(event) = &ctx.invocation {
            let added = *event == QueueEvent::NzbAdded;
            let first_file = *event == QueueEvent::FileDownloaded && !ctx.already_sorted();

            if added || first_file {
                info!(
                    "Sorting inner files for earlier fake detection for {}",
                    ctx.nzb_name
                );
                match sort_inner_files(self.host.as_ref(), ctx.download_id).await {
                    Ok(_) => directives.push(Directive::set_param(SORTED_PARAM, "yes")),
                    // Not marked sorted, so the next downloaded file retries
                    Err(e) if !added => error!("Could not sort inner files: {}", e),
                    Err(e) => return Err(e),
                }
                if added {
                    return Ok(ScriptExit::None);
                }
            }
        }

        if !self.config.detection.matches_category(&ctx.category) {
            debug!(
                "Skipping fake detection for {} (not matching category)",
                ctx.nzb_name
            );
            return Ok(ScriptExit::None);
        }

        if !ctx.directory.is_dir() {
            info!(
                "Download directory for {} doesn't exist yet, skipping",
                ctx.nzb_name
            );
            return Ok(ScriptExit::None);
        }

        debug!("Detecting fake for {}", ctx.nzb_name);

        let cache = InspectionCache::new(&self.config.cache.root, ctx.download_id);
        let detector = FakeDetector::new(&self.config.detection, self.lister.clone(), cache);

        if detector.detect(&ctx.nzb_name, &ctx.directory).await? {
            // Later scripts can check NZBPR_PPSTATUS_FAKE=yes
            directives.push(Directive::set_param(FAKE_PARAM, "yes"));
            directives.push(Directive::MarkBad);
        } else if ctx.previously_fake() {
            // "Download again" of a download an earlier run flagged
            directives.push(Directive::set_param(FAKE_PARAM, ""));
        }

        debug!("Detecting completed for {}", ctx.nzb_name);

        if ctx.invocation.is_post_process()
            && let Err(e) = cleanup_caches(
                self.host.as_ref(),
                &self.config.cache.root,
                Some(ctx.download_id),
            )
            .await
        {
            error!("Could not clean up inspection caches: {}", e);
        }

        Ok(ScriptExit::Success)
    }
}

/// Printed when the script is started outside a compatible host
pub const INCOMPATIBLE_BANNER: &[&str] = &[
    "*** NZBGet queue script ***",
    "This script is supposed to be called from nzbget (14.0 or later).",
];

/// Write the directives of `outcome` in emission order
///
/// An incompatible start prints the banner instead, for whoever ran the
/// script by hand.
///
/// # Errors
/// Returns error if writing fails
pub fn write_outcome(out: &mut impl Write, outcome: &Outcome) -> std::io::Result<()> {
    if outcome.exit == ScriptExit::Incompatible {
        for line in INCOMPATIBLE_BANNER {
            writeln!(out, "{}", line)?;
        }
    }
    for directive in &outcome.directives {
        writeln!(out, "{}", directive)?;
    }
    out.flush()
}

/// Full script run over a captured environment
///
/// Performs the startup check, parses configuration and context, and runs the
/// orchestrator against the real host and archive tool.
pub async fn run_script(env: &ScriptEnv) -> Outcome {
    if let Some(exit) = startup_check(env) {
        return Outcome::exit(exit);
    }

    // Without its download context the host is not one this script supports
    let ctx = match InvocationContext::from_env(env) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("{}", e);
            return Outcome::exit(ScriptExit::Incompatible);
        }
    };

    match Config::from_env(env).and_then(Orchestrator::from_config) {
        Ok(orchestrator) => orchestrator.run(&ctx).await,
        Err(e) => {
            error!("{}", e);
            Outcome::exit(ScriptExit::Error)
        }
    }
}
