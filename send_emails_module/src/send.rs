//! Outbound email delivery via Postmark.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

const POSTMARK_API_BASE: &str = "https://api.postmarkapp.com";
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default)]
pub struct SendEmailParams {
    pub subject: String,
    pub html_body: String,
    /// Sender address; falls back to the `EMAIL_FROM` env var.
    pub from: Option<String>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    /// Every regular file in this directory is attached, sorted by name.
    pub attachments_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendEmailResponse {
    #[serde(rename = "MessageID")]
    pub message_id: String,
    #[serde(rename = "SubmittedAt")]
    pub submitted_at: String,
}

#[derive(Debug, Error)]
pub enum SendEmailError {
    #[error("POSTMARK_SERVER_TOKEN not set")]
    MissingToken,
    #[error("no sender address: set params.from or EMAIL_FROM")]
    MissingSender,
    #[error("no recipients")]
    NoRecipients,
    #[error("attachment read failed: {0}")]
    Attachment(#[from] std::io::Error),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("postmark rejected the message: status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Send one email through the Postmark transactional API.
pub fn send_email(params: &SendEmailParams) -> Result<SendEmailResponse, SendEmailError> {
    dotenvy::dotenv().ok();
    let token =
        std::env::var("POSTMARK_SERVER_TOKEN").map_err(|_| SendEmailError::MissingToken)?;
    post_email(POSTMARK_API_BASE, &token, params)
}

pub(crate) fn post_email(
    api_base: &str,
    token: &str,
    params: &SendEmailParams,
) -> Result<SendEmailResponse, SendEmailError> {
    let from = params
        .from
        .clone()
        .or_else(|| std::env::var("EMAIL_FROM").ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(SendEmailError::MissingSender)?;
    if params.to.is_empty() {
        return Err(SendEmailError::NoRecipients);
    }

    let mut payload = json!({
        "From": from,
        "To": params.to.join(","),
        "Subject": params.subject,
        "HtmlBody": params.html_body,
        "MessageStream": "outbound",
    });
    if !params.cc.is_empty() {
        payload["Cc"] = Value::String(params.cc.join(","));
    }
    if !params.bcc.is_empty() {
        payload["Bcc"] = Value::String(params.bcc.join(","));
    }
    if let Some(dir) = params.attachments_dir.as_deref() {
        let attachments = collect_attachments(dir)?;
        if !attachments.is_empty() {
            payload["Attachments"] = Value::Array(attachments);
        }
    }

    let client = reqwest::blocking::Client::builder()
        .timeout(SEND_TIMEOUT)
        .build()?;
    let response = client
        .post(format!("{}/email", api_base))
        .header("Accept", "application/json")
        .header("X-Postmark-Server-Token", token)
        .json(&payload)
        .send()?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(SendEmailError::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json::<SendEmailResponse>()?)
}

/// Base64-encode every regular file in `dir` as a Postmark attachment.
fn collect_attachments(dir: &Path) -> Result<Vec<Value>, std::io::Error> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut attachments = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = fs::read(&path)?;
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("attachment")
            .to_string();
        let mime = mime_guess::from_path(&path).first_or_octet_stream();
        attachments.push(json!({
            "Name": name,
            "Content": BASE64.encode(&bytes),
            "ContentType": mime.essence_str(),
        }));
    }
    Ok(attachments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn params(to: &[&str]) -> SendEmailParams {
        SendEmailParams {
            subject: "Daily Practice".to_string(),
            html_body: "<p>hello</p>".to_string(),
            from: Some("tutor@example.com".to_string()),
            to: to.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn posts_payload_and_parses_response() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/email")
            .match_header("x-postmark-server-token", "test-token")
            .match_body(Matcher::PartialJson(json!({
                "From": "tutor@example.com",
                "To": "learner@example.com",
                "Subject": "Daily Practice",
                "HtmlBody": "<p>hello</p>",
            })))
            .with_status(200)
            .with_body(r#"{"MessageID":"msg-1","SubmittedAt":"2026-08-25T06:00:00Z"}"#)
            .create();

        let response = post_email(&server.url(), "test-token", &params(&["learner@example.com"]))
            .expect("send");
        assert_eq!(response.message_id, "msg-1");
        assert_eq!(response.submitted_at, "2026-08-25T06:00:00Z");
        mock.assert();
    }

    #[test]
    fn multiple_recipients_are_comma_joined() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/email")
            .match_body(Matcher::PartialJson(json!({
                "To": "a@example.com,b@example.com",
            })))
            .with_status(200)
            .with_body(r#"{"MessageID":"msg-2","SubmittedAt":"2026-08-25T06:00:00Z"}"#)
            .create();

        post_email(
            &server.url(),
            "t",
            &params(&["a@example.com", "b@example.com"]),
        )
        .expect("send");
        mock.assert();
    }

    #[test]
    fn attachments_are_base64_encoded_with_mime_type() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("notes.txt"), b"hello world").expect("write attachment");

        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/email")
            .match_body(Matcher::PartialJson(json!({
                "Attachments": [{
                    "Name": "notes.txt",
                    "Content": BASE64.encode(b"hello world"),
                    "ContentType": "text/plain",
                }],
            })))
            .with_status(200)
            .with_body(r#"{"MessageID":"msg-3","SubmittedAt":"2026-08-25T06:00:00Z"}"#)
            .create();

        let mut p = params(&["learner@example.com"]);
        p.attachments_dir = Some(dir.path().to_path_buf());
        post_email(&server.url(), "t", &p).expect("send");
        mock.assert();
    }

    #[test]
    fn api_rejection_surfaces_status_and_body() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/email")
            .with_status(422)
            .with_body(r#"{"ErrorCode":300,"Message":"Invalid 'To' address"}"#)
            .create();

        let err = post_email(&server.url(), "t", &params(&["bad"])).expect_err("should fail");
        match err {
            SendEmailError::Rejected { status, body } => {
                assert_eq!(status, 422);
                assert!(body.contains("Invalid 'To' address"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn empty_recipient_list_is_rejected_before_sending() {
        let err = post_email("http://unused.invalid", "t", &params(&[])).expect_err("no recipients");
        assert!(matches!(err, SendEmailError::NoRecipients));
    }

    #[test]
    fn missing_sender_is_rejected() {
        let mut p = params(&["learner@example.com"]);
        p.from = Some("   ".to_string());
        // Blank sender and no fallback should fail fast.
        std::env::remove_var("EMAIL_FROM");
        let err = post_email("http://unused.invalid", "t", &p).expect_err("no sender");
        assert!(matches!(err, SendEmailError::MissingSender));
    }
}
