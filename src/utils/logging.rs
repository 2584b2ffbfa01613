//! Log formatting helpers.
//!
//! Banner-style run logging shared by both binaries. Everything here is
//! presentation only; the counts come from the scheduler and the ledger.

use tracing::{info, warn};

use crate::models::{RunMode, RunSummary};
use crate::providers::ProviderId;

/// Announce the run before any work is dispatched.
pub fn log_startup(
    mode: RunMode,
    max_workers: usize,
    batch_size: usize,
    providers: &[ProviderId],
) {
    let provider_names: Vec<&str> = providers.iter().map(|p| p.as_str()).collect();
    info!("{}", "=".repeat(60));
    info!("🚀 Prompt sweep starting: {} run", mode);
    info!("📊 Max workers: {} | Batch size: {}", max_workers, batch_size);
    info!("🤖 Providers: {}", provider_names.join(", "));
    info!("{}", "=".repeat(60));
}

/// Describe the work set once it is known.
pub fn log_work_set(mode: RunMode, total: usize, pause_secs: u64) {
    match mode {
        RunMode::Main => info!("✓ {} queries loaded from the source", total),
        RunMode::Retry => info!("✓ {} ledger entries eligible for retry", total),
    }
    if pause_secs > 0 {
        info!("💡 Pausing {}s between batches", pause_secs);
    }
}

pub fn log_batch_start(
    batch_num: usize,
    total_batches: usize,
    start: usize,
    end: usize,
    total: usize,
) {
    info!("\n{}", "=".repeat(60));
    info!("📦 Dispatching batch {}/{}", batch_num, total_batches);
    info!("📄 Queries {}-{} of {}", start, end, total);
    info!("{}", "=".repeat(60));
}

/// Final stats banner, printed after every outcome is collected.
pub fn log_run_summary(summary: &RunSummary, outstanding: usize, terminal: usize) {
    info!("\n{}", "=".repeat(60));
    info!(
        "📊 {} run complete in {:.1} min",
        summary.mode,
        summary.duration.as_secs_f64() / 60.0
    );
    info!("{}", "=".repeat(60));
    info!("✅ Succeeded: {}/{}", summary.succeeded, summary.dispatched);
    info!("❌ Failed: {}", summary.failed);
    info!("📒 Ledger: {} outstanding ({} terminal)", outstanding, terminal);
    info!("📈 Success rate: {:.1}%", summary.success_rate() * 100.0);
    info!("{}", "=".repeat(60));
}

/// Retry-only recap comparing the ledger before and after the run. Every
/// dispatched query in a retry run started out as a ledger entry, so
/// `dispatched` is the initial failed count.
pub fn log_retry_recap(summary: &RunSummary) {
    info!("📊 Initial failed: {}", summary.dispatched);
    info!("✅ Recovered: {}", summary.succeeded);
    info!("❌ Still failing: {}", summary.failed);
    if summary.failed > 0 {
        warn!("⚠️ {} queries still failing", summary.failed);
    } else if summary.succeeded > 0 {
        info!("🎉 All retried queries recovered");
    }
}

/// Truncate long text for log display.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
