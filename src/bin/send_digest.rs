//! Builds and sends the daily digest once, then exits.

use cyber_briefing::config::Settings;
use cyber_briefing::notify::DispatchOutcome;
use cyber_briefing::{build_state, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let settings = Settings::load_or_default();
    let state = build_state(&settings);

    let outcome = state.dispatcher.dispatch().await;
    println!("send-digest: {outcome:?}");
    if outcome == DispatchOutcome::Failed {
        anyhow::bail!("digest could not be sent");
    }
    Ok(())
}
