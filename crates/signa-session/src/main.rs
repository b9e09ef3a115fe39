//! Practice session runner.
//!
//! Runs one session against the synthetic camera and a replayed classifier
//! script, prints the summary as JSON and appends it to the local store.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use signa_models::SessionUpdate;
use signa_session::{RunnerConfig, SessionConfig, SessionController};
use signa_store::{JsonLinesSummaryStore, SummaryStore};
use signa_vision::{ReplayClassifier, SyntheticFrameSource};

/// Used when no replay script is configured: a few signs with noise between.
const DEMO_SCRIPT: &str = r#"{
    "steps": [
        {"label": "A", "score": 0.91}, {"label": "A", "score": 0.88},
        {"label": "A", "score": 0.93}, null,
        {"label": "B", "score": 0.45}, {"label": "B", "score": 0.82},
        {"label": "L", "score": 0.77}, {"label": "L", "score": 0.79},
        null, null
    ]
}"#;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    if let Err(e) = run().await {
        error!("Session runner failed: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("signa=info,signa_session=info,signa_vision=info,signa_store=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn run() -> anyhow::Result<()> {
    let config = SessionConfig::from_env();
    let runner = RunnerConfig::from_env();
    info!("Session config: {:?}", config);
    config.validate().context("invalid session config")?;

    let catalog = config.load_catalog().context("loading label catalog")?;
    let classifier = match &runner.replay_script {
        Some(path) => ReplayClassifier::load(path)
            .with_context(|| format!("loading replay script {}", path.display()))?,
        None => ReplayClassifier::from_json(DEMO_SCRIPT)?,
    };
    let store: Arc<dyn SummaryStore> = Arc::new(JsonLinesSummaryStore::new(&runner.store_path));

    let mut session = SessionController::new(
        config,
        catalog,
        Box::new(SyntheticFrameSource::new(640, 480).with_warmup(3)),
        Arc::new(classifier),
        Arc::clone(&store),
    );
    session.set_auto_rotate(true);

    let mut updates = session.subscribe();
    let watcher = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(SessionUpdate::Idle) => {}
                Ok(SessionUpdate::Detected { label, confidence }) => {
                    debug!(label = %label, confidence, "Detected");
                }
                Ok(update) => info!(kind = update.kind(), "{:?}", update),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Update watcher lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    session
        .start(runner.user_id.clone())
        .await
        .context("starting session")?;

    tokio::select! {
        _ = tokio::time::sleep(runner.session_length) => {
            info!("Session time elapsed");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    let summary = session.stop().await;
    let stats = session.loop_stats();
    info!(
        ticks = stats.ticks,
        emitted = stats.emitted,
        fps = stats.fps,
        "Detection loop finished"
    );

    match summary {
        Some(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
        None => println!("{{}}"),
    }

    let report = session.progress(&runner.user_id).await?;
    info!(
        sessions = report.sessions,
        total_signs = report.total_signs,
        league = report.league.as_str(),
        "Progress for {}", runner.user_id
    );

    drop(session);
    watcher.abort();
    Ok(())
}
