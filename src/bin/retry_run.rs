use anyhow::Result;
use prompt_sweep::{App, Config, RunMode};

#[tokio::main]
async fn main() -> Result<()> {
    prompt_sweep::logger::init();

    let config = Config::from_env();
    let app = App::initialize(config)?;

    // Partial recovery is still progress; the updated ledger is the
    // result. Only infrastructure errors fail the process.
    app.run(RunMode::Retry).await?;

    Ok(())
}
