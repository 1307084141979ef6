//! Bounded worker pool for generating several pieces of content in one run.
//!
//! Requests are fanned out over a fixed number of worker threads through a
//! crossbeam channel. Results are re-ordered to submission order before
//! returning. A task that fails or times out is dropped from the output
//! with a warning; the batch only errors when every task failed.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::bounded;
use tracing::warn;

use crate::errors::ContentError;

/// A source of generated text, usually an LLM client.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, GeneratorError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum GeneratorError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("generator returned an empty response")]
    EmptyResponse,
    #[error("no generated text within {0} seconds")]
    TimedOut(u64),
}

/// One unit of work in a batch.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Caller-chosen identifier, carried through to the result.
    pub id: String,
    pub prompt: String,
}

/// One completed unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedItem {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub workers: usize,
    pub task_timeout: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            task_timeout: Duration::from_secs(120),
        }
    }
}

/// Run every request through the generator on a bounded worker pool.
///
/// Output order matches submission order regardless of which worker
/// finishes first. Failed or timed-out tasks are omitted and logged.
/// Returns `ContentError::PartialBatch` only when no task produced text.
pub fn generate_batch(
    generator: Arc<dyn TextGenerator>,
    requests: Vec<GenerationRequest>,
    options: BatchOptions,
) -> Result<Vec<GeneratedItem>, ContentError> {
    if requests.is_empty() {
        return Ok(Vec::new());
    }
    let submitted = requests.len();
    let workers = options.workers.clamp(1, submitted);

    let (work_tx, work_rx) = bounded::<(usize, GenerationRequest)>(submitted);
    let (result_tx, result_rx) =
        bounded::<(usize, String, Result<String, GeneratorError>)>(submitted);

    // Capacity covers every request, so these sends cannot block.
    for (index, request) in requests.into_iter().enumerate() {
        let _ = work_tx.send((index, request));
    }
    drop(work_tx);

    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let work_rx = work_rx.clone();
        let result_tx = result_tx.clone();
        let generator = Arc::clone(&generator);
        let timeout = options.task_timeout;
        handles.push(thread::spawn(move || {
            for (index, request) in work_rx {
                let outcome = run_with_timeout(Arc::clone(&generator), request.prompt, timeout);
                let _ = result_tx.send((index, request.id, outcome));
            }
        }));
    }
    drop(result_tx);

    let mut completed: Vec<(usize, GeneratedItem)> = Vec::with_capacity(submitted);
    let mut failed = 0usize;
    for (index, id, outcome) in result_rx {
        match outcome {
            Ok(text) if !text.trim().is_empty() => {
                completed.push((index, GeneratedItem { id, text }));
            }
            Ok(_) => {
                failed += 1;
                warn!("batch task {} failed: {}", id, GeneratorError::EmptyResponse);
            }
            Err(err) => {
                failed += 1;
                warn!("batch task {} failed: {}", id, err);
            }
        }
    }
    for handle in handles {
        let _ = handle.join();
    }

    if failed == submitted {
        return Err(ContentError::PartialBatch { submitted, failed });
    }
    if failed > 0 {
        warn!("{}", ContentError::PartialBatch { submitted, failed });
    }

    completed.sort_by_key(|(index, _)| *index);
    Ok(completed.into_iter().map(|(_, item)| item).collect())
}

/// Run one generation on its own thread and give up after `timeout`.
///
/// A timed-out generation keeps running detached; its result is discarded
/// when the inner thread eventually finishes.
fn run_with_timeout(
    generator: Arc<dyn TextGenerator>,
    prompt: String,
    timeout: Duration,
) -> Result<String, GeneratorError> {
    let (done_tx, done_rx) = bounded::<Result<String, GeneratorError>>(1);
    thread::spawn(move || {
        let result = generator.generate(&prompt);
        let _ = done_tx.send(result);
    });
    match done_rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => Err(GeneratorError::TimedOut(timeout.as_secs())),
    }
}
