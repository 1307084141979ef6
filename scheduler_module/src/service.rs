//! HTTP trigger endpoint and the cron-driven daily loop.

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use chrono::Local;
use cron::Schedule;
use tokio::task;
use tracing::{error, info};

use content_module::TextGenerator;

use crate::config::ServiceConfig;
use crate::gemini::GeminiClient;
use crate::jobs::{self, JobError};
use crate::BoxError;

#[derive(Clone)]
struct AppState {
    config: Arc<ServiceConfig>,
}

pub async fn run_server(
    config: ServiceConfig,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), BoxError> {
    let schedule = Schedule::from_str(&config.daily_cron)
        .map_err(|err| format!("invalid DAILY_CRON '{}': {}", config.daily_cron, err))?;
    let config = Arc::new(config);

    let mut cron_control = spawn_cron_loop(config.clone(), schedule);

    let host: IpAddr = config
        .host
        .parse()
        .map_err(|_| format!("invalid host: {}", config.host))?;
    let addr = SocketAddr::new(host, config.port);
    info!("content service listening on {}", addr);

    let app = Router::new()
        .route("/healthz", get(health))
        .route("/jobs/:name/run", post(trigger_job))
        .with_state(AppState {
            config: config.clone(),
        });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let serve_result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;
    cron_control.stop_and_join();
    serve_result?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// POST /jobs/:name/run — run one job on a blocking thread.
async fn trigger_job(State(state): State<AppState>, Path(name): Path<String>) -> impl IntoResponse {
    let config = state.config.clone();
    let job_name = name.clone();
    let result = task::spawn_blocking(move || execute_job(&job_name, &config)).await;

    match result {
        Ok(Ok(())) => (StatusCode::OK, format!("job '{}' completed", name)),
        Ok(Err(JobError::UnknownJob(name))) => {
            (StatusCode::NOT_FOUND, format!("unknown job '{}'", name))
        }
        Ok(Err(err)) => {
            error!("job '{}' failed: {}", name, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("job '{}' failed: {}", name, err),
            )
        }
        Err(err) => {
            error!("job '{}' panicked: {}", name, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("job '{}' aborted", name),
            )
        }
    }
}

fn execute_job(name: &str, config: &ServiceConfig) -> Result<(), JobError> {
    let generator: Arc<dyn TextGenerator> = Arc::new(
        GeminiClient::new(
            config.gemini_api_url.clone(),
            config.gemini_api_key.clone(),
            config.gemini_timeout,
        )
        .map_err(|err| JobError::Generation(err.to_string()))?,
    );
    jobs::run_job(name, generator, config)
}

struct CronControl {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CronControl {
    fn stop_and_join(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Background thread firing the daily digest on the configured schedule.
/// Sleeps in one-second slices so shutdown is prompt.
fn spawn_cron_loop(config: Arc<ServiceConfig>, schedule: Schedule) -> CronControl {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    let handle = thread::spawn(move || {
        info!("cron loop started with schedule '{}'", config.daily_cron);
        while !stop_flag.load(Ordering::SeqCst) {
            let next = match schedule.upcoming(Local).next() {
                Some(next) => next,
                None => {
                    error!("schedule '{}' yields no future runs", config.daily_cron);
                    return;
                }
            };
            info!("next daily run at {}", next);

            while Local::now() < next {
                if stop_flag.load(Ordering::SeqCst) {
                    return;
                }
                thread::sleep(Duration::from_secs(1));
            }

            if let Err(err) = execute_job("daily_digest", &config) {
                error!("scheduled daily digest failed: {}", err);
            }
        }
        info!("cron loop stopped");
    });
    CronControl {
        stop,
        handle: Some(handle),
    }
}
