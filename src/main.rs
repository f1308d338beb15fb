//! NZBGet entry point for fake-detector.
//!
//! NZBGet starts the binary as a queue script (`NZBNA_*` variables) and as a
//! post-processing script (`NZBPP_*` variables). Logs, directives and the exit
//! code are all it gets back.

use fake_detector::{ScriptEnv, init_logging, run_script, write_outcome};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let env = ScriptEnv::from_process();
    init_logging();

    let outcome = run_script(&env).await;

    // Nothing useful can be reported if stdout is gone
    let _ = write_outcome(&mut std::io::stdout().lock(), &outcome);
    std::process::exit(outcome.exit.code());
}
