//! Daily content jobs: generate, assemble, persist, deliver.
//!
//! Degraded renders still deliver; only generation and transport failures
//! propagate. The cron loop and the HTTP trigger both dispatch through
//! [`run_job`].

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use chrono::Local;
use content_module::{
    assemble, escape_html, generate_batch, BatchOptions, ContentType, FormattedBlock,
    GenerationRequest, HistoryEntry, HistoryStore, RenderedSection, TextGenerator,
};
use send_emails_module::{
    build_email_html, render_document, render_sections, send_email, SendEmailParams,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::prompts;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("unknown job '{0}'")]
    UnknownJob(String),
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("collocation payload is not a JSON array of cards: {0}")]
    Parse(String),
    #[error(transparent)]
    History(#[from] content_module::HistoryStoreError),
    #[error(transparent)]
    Delivery(#[from] send_emails_module::SendEmailError),
}

/// Dispatch a job by its route name.
pub fn run_job(
    name: &str,
    generator: Arc<dyn TextGenerator>,
    config: &ServiceConfig,
) -> Result<(), JobError> {
    match name {
        "daily_digest" => run_daily_digest(generator, config),
        "reading_practice" => run_reading_practice(generator, config),
        "listening_practice" => run_listening_practice(generator, config),
        "collocation_batch" => run_collocation_batch(generator, config),
        other => Err(JobError::UnknownJob(other.to_string())),
    }
}

/// The full daily email: reading and listening practice generated in
/// parallel, a passage explanation, and the collocation digest.
pub fn run_daily_digest(
    generator: Arc<dyn TextGenerator>,
    config: &ServiceConfig,
) -> Result<(), JobError> {
    let practice_html = build_practice_digest(Arc::clone(&generator), config)?;

    let store = HistoryStore::new(&config.history_path);
    let today = Local::now().date_naive();
    let (sections, entries) = build_collocation_sections(
        generator.as_ref(),
        &store,
        config.review_count,
        config.new_item_count,
        today,
    )?;
    store.save(entries, today)?;

    let content = format!("{}{}", practice_html, render_sections(&sections));
    deliver(config, "Daily English Practice", &content)
}

pub fn run_reading_practice(
    generator: Arc<dyn TextGenerator>,
    config: &ServiceConfig,
) -> Result<(), JobError> {
    let content = build_reading_practice(generator.as_ref())?;
    deliver(config, "Daily Reading Practice", &content)
}

pub fn run_listening_practice(
    generator: Arc<dyn TextGenerator>,
    config: &ServiceConfig,
) -> Result<(), JobError> {
    let content = build_listening_practice(generator.as_ref())?;
    deliver(config, "Daily Listening Practice", &content)
}

pub fn run_collocation_batch(
    generator: Arc<dyn TextGenerator>,
    config: &ServiceConfig,
) -> Result<(), JobError> {
    let store = HistoryStore::new(&config.history_path);
    let today = Local::now().date_naive();
    let (sections, entries) = build_collocation_sections(
        generator.as_ref(),
        &store,
        config.review_count,
        config.new_item_count,
        today,
    )?;
    store.save(entries, today)?;
    deliver(config, "Daily Collocations", &render_sections(&sections))
}

/// Generate reading and listening practice in parallel and render both,
/// with the reading explanation appended.
fn build_practice_digest(
    generator: Arc<dyn TextGenerator>,
    config: &ServiceConfig,
) -> Result<String, JobError> {
    let requests = vec![
        GenerationRequest {
            id: "reading".to_string(),
            prompt: prompts::READING_PRACTICE.to_string(),
        },
        GenerationRequest {
            id: "listening".to_string(),
            prompt: prompts::LISTENING_PRACTICE.to_string(),
        },
    ];
    let options = BatchOptions {
        workers: config.batch_workers,
        task_timeout: config.task_timeout,
    };
    let items = generate_batch(Arc::clone(&generator), requests, options)
        .map_err(|err| JobError::Generation(err.to_string()))?;

    let mut html = String::new();
    for item in &items {
        match item.id.as_str() {
            "reading" => {
                html.push_str(&render_document(&assemble(
                    &item.text,
                    ContentType::ReadingPractice,
                )));
                html.push_str(&explanation_html(generator.as_ref(), &item.text));
            }
            "listening" => {
                html.push_str(&render_document(&assemble(
                    &item.text,
                    ContentType::ListeningPractice,
                )));
            }
            other => warn!("unexpected batch item id '{}'", other),
        }
    }
    Ok(html)
}

fn build_reading_practice(generator: &dyn TextGenerator) -> Result<String, JobError> {
    let raw = generator
        .generate(prompts::READING_PRACTICE)
        .map_err(|err| JobError::Generation(err.to_string()))?;
    let practice = assemble(&raw, ContentType::ReadingPractice);
    Ok(format!(
        "{}{}",
        render_document(&practice),
        explanation_html(generator, &raw)
    ))
}

fn build_listening_practice(generator: &dyn TextGenerator) -> Result<String, JobError> {
    let raw = generator
        .generate(prompts::LISTENING_PRACTICE)
        .map_err(|err| JobError::Generation(err.to_string()))?;
    Ok(render_document(&assemble(&raw, ContentType::ListeningPractice)))
}

/// Explain generated practice material. A failed explanation drops that
/// part of the email instead of failing the whole job.
fn explanation_html(generator: &dyn TextGenerator, practice: &str) -> String {
    match generator.generate(&prompts::explanation_prompt(practice)) {
        Ok(raw) => render_document(&assemble(&raw, ContentType::PassageExplanation)),
        Err(err) => {
            warn!("passage explanation skipped: {}", err);
            String::new()
        }
    }
}

/// Build the collocation digest: new cards generated against the history
/// exclusion list, plus a review sample of past entries. Returns the
/// renderable sections and the entries to persist.
fn build_collocation_sections(
    generator: &dyn TextGenerator,
    store: &HistoryStore,
    review_count: usize,
    new_count: usize,
    today: chrono::NaiveDate,
) -> Result<(Vec<RenderedSection>, Vec<HistoryEntry>), JobError> {
    let review = store.select_for_review(review_count, today);
    let excluded = store.exclusion_keys();

    let raw = generator
        .generate(&prompts::collocation_prompt(new_count, &excluded))
        .map_err(|err| JobError::Generation(err.to_string()))?;
    let cards = parse_collocation_cards(&raw)?;
    info!("generated {} collocation cards", cards.len());

    let entries: Vec<HistoryEntry> = cards.iter().map(CollocationCard::to_entry).collect();

    let mut sections = vec![RenderedSection {
        title: "New Collocations".to_string(),
        blocks: cards.iter().map(CollocationCard::to_block).collect(),
    }];
    if !review.is_empty() {
        sections.push(RenderedSection {
            title: "Review".to_string(),
            blocks: review.iter().map(entry_block).collect(),
        });
    }
    Ok((sections, entries))
}

#[derive(Debug, Clone, Deserialize)]
struct CollocationCard {
    collocation: String,
    #[serde(default)]
    meaning: String,
    #[serde(default)]
    example: String,
    #[serde(default, alias = "academicUsage")]
    academic_usage: String,
}

impl CollocationCard {
    fn to_entry(&self) -> HistoryEntry {
        let mut fields = BTreeMap::new();
        for (key, value) in [
            ("meaning", &self.meaning),
            ("example", &self.example),
            ("academic_usage", &self.academic_usage),
        ] {
            if !value.trim().is_empty() {
                fields.insert(key.to_string(), value.trim().to_string());
            }
        }
        HistoryEntry::new(self.collocation.trim(), fields)
    }

    fn to_block(&self) -> FormattedBlock {
        entry_block(&self.to_entry())
    }
}

fn entry_block(entry: &HistoryEntry) -> FormattedBlock {
    FormattedBlock::DefinitionItem {
        term: escape_html(&entry.item),
        fields: entry
            .fields
            .iter()
            .map(|(key, value)| (display_label(key), escape_html(value)))
            .collect(),
    }
}

/// `academic_usage` -> `Academic usage`.
fn display_label(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => spaced,
    }
}

/// Pull the JSON array out of model output that may be fenced or wrapped
/// in prose.
fn parse_collocation_cards(raw: &str) -> Result<Vec<CollocationCard>, JobError> {
    let start = raw
        .find('[')
        .ok_or_else(|| JobError::Parse("no JSON array found".to_string()))?;
    let end = raw
        .rfind(']')
        .filter(|end| *end > start)
        .ok_or_else(|| JobError::Parse("unterminated JSON array".to_string()))?;
    let cards: Vec<CollocationCard> = serde_json::from_str(&raw[start..=end])
        .map_err(|err| JobError::Parse(err.to_string()))?;
    Ok(cards
        .into_iter()
        .filter(|card| !card.collocation.trim().is_empty())
        .collect())
}

fn deliver(config: &ServiceConfig, subject: &str, content: &str) -> Result<(), JobError> {
    let now = Local::now();
    let template = config
        .template_path
        .as_deref()
        .and_then(|path| match fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(err) => {
                warn!("template {} unreadable, using built-in: {}", path.display(), err);
                None
            }
        });
    let html = build_email_html(
        template.as_deref(),
        &now.format("%A, %d %B %Y").to_string(),
        content,
        &now.format("%Y-%m-%d %H:%M").to_string(),
    );

    let params = SendEmailParams {
        subject: format!("{} - {}", subject, now.format("%d %b %Y")),
        html_body: html,
        from: config.email_from.clone(),
        to: config.recipients.clone(),
        ..Default::default()
    };
    let response = send_email(&params)?;
    info!(
        "delivered '{}' to {} recipients, message_id={}",
        subject,
        params.to.len(),
        response.message_id
    );
    Ok(())
}
