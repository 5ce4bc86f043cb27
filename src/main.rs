use anyhow::Result;
use sitepulse::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

use sitepulse::aggregator::{Aggregator, SessionEvent};
use sitepulse::source::{CompositeSource, HttpStatusSource, StatusSource};
use sitepulse::transport::ApiClient;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

/// Log in with configured credentials; failures are logged, polling runs regardless.
async fn login(client: &ApiClient, remote: &config::RemoteConfig) {
    let (Some(username), Some(password)) = (&remote.username, &remote.password) else {
        return;
    };
    match client.login(username, password).await {
        Ok(_) => tracing::info!(username = %username, "logged in to console API"),
        Err(e) => tracing::warn!(error = %e, operation = "login", "login failed"),
    }
}

/// Global session handling: the transport already cleared the token; log in again if we can.
fn spawn_session_handler(
    aggregator: &Aggregator,
    client: Arc<ApiClient>,
    remote: config::RemoteConfig,
) -> tokio::task::JoinHandle<()> {
    let mut events = aggregator.session_events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::Unauthorized { at }) => {
                    tracing::warn!(at = %at, "session expired or rejected");
                    login(&client, &remote).await;
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!("session handler lagged, skipped {} events", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let session = Arc::new(session::SessionContext::file(&app_config.session.path));
    if let Err(e) = session.load() {
        tracing::warn!(error = %e, operation = "load_session", "ignoring unreadable session file");
    }
    let client = Arc::new(ApiClient::new(
        &app_config.remote.base_url,
        Duration::from_millis(app_config.remote.request_timeout_ms),
        session.clone(),
    )?);
    if !session.is_authenticated() {
        login(&client, &app_config.remote).await;
    }

    let sources: Vec<Arc<dyn StatusSource>> = app_config
        .remote
        .sources
        .iter()
        .map(|s| {
            Arc::new(HttpStatusSource::new(
                client.clone(),
                s.name.clone(),
                s.path.clone(),
                s.field.clone(),
            )) as Arc<dyn StatusSource>
        })
        .collect();
    let source: Arc<dyn StatusSource> = match sources.len() {
        1 => sources.into_iter().next().ok_or_else(|| anyhow::anyhow!("no sources"))?,
        _ => Arc::new(CompositeSource::new(sources)),
    };

    let fallback = app_config
        .fallback
        .enabled
        .then_some(fallback::FallbackProvider);
    let aggregator = Aggregator::new(source, fallback);
    let session_handle =
        spawn_session_handler(&aggregator, client.clone(), app_config.remote.clone());

    let mut scheduler = scheduler::RefreshScheduler::new(aggregator.clone()).with_stats_log_interval(
        Duration::from_secs(app_config.polling.stats_log_interval_secs),
    );
    scheduler.start(Duration::from_millis(app_config.polling.interval_ms))?;

    let app = routes::app(aggregator, client);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    let in_container = std::path::Path::new("/.dockerenv").exists()
        || std::env::var("CONTAINER").as_deref() == Ok("1");

    if in_container {
        // In Docker: run server until error or SIGTERM (no signal handler; avoids immediate exit)
        axum::serve(listener, app).await?;
    } else {
        tokio::select! {
            result = axum::serve(listener, app) => {
                result?;
            }
            _ = async {
                #[cfg(unix)]
                {
                    let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                        Ok(s) => s,
                        Err(_) => {
                            let _ = tokio::signal::ctrl_c().await;
                            return;
                        }
                    };
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = sigterm.recv() => {}
                    }
                }
                #[cfg(not(unix))]
                {
                    let _ = tokio::signal::ctrl_c().await;
                }
            } => {
                tracing::info!("Received shutdown signal");
            }
        }
    }

    scheduler.shutdown().await;
    session_handle.abort();
    Ok(())
}
