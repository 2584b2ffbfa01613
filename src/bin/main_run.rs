use anyhow::Result;
use prompt_sweep::{App, Config, RunMode};

#[tokio::main]
async fn main() -> Result<()> {
    prompt_sweep::logger::init();

    let config = Config::from_env();
    let fail_rate_threshold = config.fail_rate_threshold;

    let app = App::initialize(config)?;
    let summary = app.run(RunMode::Main).await?;

    // A sweep that mostly failed should fail the pipeline it runs in,
    // even though each individual failure is already on the ledger.
    if summary.dispatched > 0 && summary.failure_rate() > fail_rate_threshold {
        anyhow::bail!(
            "failure rate {:.1}% exceeded the {:.0}% threshold",
            summary.failure_rate() * 100.0,
            fail_rate_threshold * 100.0
        );
    }

    Ok(())
}
