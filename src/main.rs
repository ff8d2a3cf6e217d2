//! Cybersecurity briefing service: binary entrypoint.
//! Boots the Axum HTTP server and the daily digest task.

use shuttle_axum::ShuttleAxum;

use cyber_briefing::config::Settings;
use cyber_briefing::metrics::Metrics;
use cyber_briefing::notify::spawn_digest_scheduler;
use cyber_briefing::{build_state, init_tracing, router};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    init_tracing();

    let settings = Settings::load_or_default();
    let state = build_state(&settings);

    if !settings.schedule.enabled {
        tracing::info!(target: "digest", "digest scheduler disabled");
    } else if let Some((at, tz)) = settings.schedule.resolve() {
        spawn_digest_scheduler(state.dispatcher.clone(), at, tz);
    }

    let mut app = router(state);
    match Metrics::init() {
        Ok(m) => app = app.merge(m.router::<()>()),
        Err(e) => tracing::warn!(error = ?e, "metrics disabled"),
    }

    Ok(app.into())
}
