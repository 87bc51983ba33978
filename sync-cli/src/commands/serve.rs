//! Serve command - run a driver session and serve the node directory.
//!
//! No native Z-Wave stack is linked into this binary, so the session runs
//! against the in-process driver. Notifications come from a replay script.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use zwave_sync_driver::MockDriver;
use zwave_sync_manager::{http::build_router, Config, LifecycleController};

use super::replay;

/// Run the serve command until ctrl-c or a fatal session error.
pub async fn run(
    mut config: Config,
    controller_path: Option<String>,
    replay_script: Option<&Path>,
    no_http: bool,
) -> Result<()> {
    if let Some(path) = controller_path {
        config.session.controller_path = path;
    }
    if no_http {
        config.http.enabled = false;
    }

    // Parse the script up front so a typo fails before the session opens.
    let script = match replay_script {
        Some(path) => Some(replay::load(path).await?),
        None => None,
    };

    warn!("no native driver linked, using the in-process driver");
    let driver = MockDriver::new();
    let session_path = config.session.controller_path.clone();
    let http = config.http.clone();

    let mut controller = LifecycleController::new(Arc::new(driver.clone()), config);
    controller
        .start(&session_path)
        .await
        .with_context(|| format!("Failed to start session on {session_path}"))?;

    let manager = controller.manager();

    if http.enabled {
        let listener = tokio::net::TcpListener::bind(&http.bind_address)
            .await
            .with_context(|| format!("Failed to bind {}", http.bind_address))?;
        info!(address = %http.bind_address, "HTTP server listening");

        let mut state = controller.state_watch();
        let app = build_router(manager.clone());
        tokio::spawn(async move {
            let shutdown = async move {
                state.terminated().await;
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(error = %e, "HTTP server failed");
            }
        });
    }

    if let Some(events) = script {
        let driver = driver.clone();
        tokio::spawn(async move {
            replay::feed(&driver, events).await;
        });
    }

    let stop = controller.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C detected");
            stop.stop();
        }
    });

    let report = controller.run().await.context("Driver session failed")?;

    info!(
        reason = ?report.reason,
        teardown_failures = report.teardown_failures.len(),
        notifications = manager
            .metrics()
            .notifications_total
            .load(std::sync::atomic::Ordering::Relaxed),
        "session ended"
    );
    for failure in &report.teardown_failures {
        warn!(%failure, "teardown step did not complete");
    }

    Ok(())
}
