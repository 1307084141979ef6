use std::env;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crate::BoxError;

const DEFAULT_GEMINI_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub gemini_api_url: String,
    pub gemini_api_key: String,
    pub gemini_timeout: Duration,
    /// Sender address; `send_emails_module` falls back to `EMAIL_FROM` when unset.
    pub email_from: Option<String>,
    pub recipients: Vec<String>,
    pub history_path: PathBuf,
    /// Past collocations re-surfaced per digest.
    pub review_count: usize,
    /// New collocations requested per digest.
    pub new_item_count: usize,
    pub batch_workers: usize,
    pub task_timeout: Duration,
    /// Six-field cron expression for the daily run.
    pub daily_cron: String,
    /// Optional HTML template file overriding the built-in email shell.
    pub template_path: Option<PathBuf>,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, BoxError> {
        dotenvy::dotenv().ok();

        let host = env::var("SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("SERVICE_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(9002);

        let gemini_api_url =
            env::var("GEMINI_API_URL").unwrap_or_else(|_| DEFAULT_GEMINI_API_URL.to_string());
        let gemini_api_key = env_var_non_empty("GEMINI_API_KEY")
            .ok_or_else(|| "GEMINI_API_KEY not set".to_string())?;
        let gemini_timeout = env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|value| *value > 0)
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(120));

        let email_from = env_var_non_empty("EMAIL_FROM");
        let recipients: Vec<String> = env_var_non_empty("EMAIL_RECIPIENTS")
            .map(|value| {
                value
                    .split(',')
                    .map(|address| address.trim().to_string())
                    .filter(|address| !address.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        if recipients.is_empty() {
            return Err("EMAIL_RECIPIENTS not set".to_string().into());
        }

        let history_path = resolve_path(env::var("HISTORY_PATH").unwrap_or_else(|_| {
            default_runtime_root()
                .join("collocation_history.json")
                .to_string_lossy()
                .into_owned()
        }))?;

        let review_count = env_usize("REVIEW_COUNT", 3);
        let new_item_count = env_usize("NEW_ITEM_COUNT", 5);
        let batch_workers = env_usize("BATCH_WORKERS", 4);
        let task_timeout = env::var("TASK_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|value| *value > 0)
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(120));

        let daily_cron = env::var("DAILY_CRON").unwrap_or_else(|_| "0 0 6 * * *".to_string());
        let template_path = match env_var_non_empty("EMAIL_TEMPLATE_PATH") {
            Some(raw) => Some(resolve_path(raw)?),
            None => None,
        };

        Ok(Self {
            host,
            port,
            gemini_api_url,
            gemini_api_key,
            gemini_timeout,
            email_from,
            recipients,
            history_path,
            review_count,
            new_item_count,
            batch_workers,
            task_timeout,
            daily_cron,
            template_path,
        })
    }
}

fn env_var_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn default_runtime_root() -> PathBuf {
    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".daily_english")
}

fn resolve_path(raw: String) -> Result<PathBuf, io::Error> {
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        Ok(path)
    } else {
        let cwd = env::current_dir()?;
        Ok(cwd.join(path))
    }
}
