pub mod render;
pub mod send;

pub use render::{build_email_html, render_document, render_sections, DEFAULT_TEMPLATE};
pub use send::{send_email, SendEmailError, SendEmailParams, SendEmailResponse};
