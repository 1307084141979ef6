pub mod config;
pub mod gemini;
pub mod jobs;
pub mod prompts;
mod service;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub use config::ServiceConfig;
pub use gemini::GeminiClient;
pub use jobs::{run_job, JobError};
pub use service::run_server;
