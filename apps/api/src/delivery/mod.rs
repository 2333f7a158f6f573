// Delivery pipeline: hands generated content to the recipient.
// Google Docs → PDF when a service account is configured, plain text + HTML otherwise.
// Runs after generation; the generation core knows nothing about it.

pub mod email;
pub mod google_docs;
pub mod handlers;
pub mod html;

use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::delivery::email::{compose_pdf_email, compose_text_email, SmtpMailer};
use crate::delivery::google_docs::{GoogleCredentials, GoogleDocsClient};
use crate::settings::EffectiveSettings;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("email is not configured: {0}")]
    NotConfigured(String),

    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build email: {0}")]
    Compose(String),

    #[error("failed to send email: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("failed to sign Google credentials: {0}")]
    GoogleAuth(#[from] jsonwebtoken::errors::Error),

    #[error("Google API error (status {status}): {message}")]
    Google { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<lettre::error::Error> for DeliveryError {
    fn from(e: lettre::error::Error) -> Self {
        DeliveryError::Compose(e.to_string())
    }
}

/// SMTP account used to send results.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

/// What is being delivered and to whom.
#[derive(Debug, Clone)]
pub struct DeliveryRequest<'a> {
    pub recipient: &'a str,
    pub website_name: &'a str,
    pub page_title: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    GooglePdf,
    TextAndHtml,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReport {
    pub mode: DeliveryMode,
    pub document_url: Option<String>,
    pub attachments: Vec<String>,
}

/// Google export runs only with a real service account and no skip flag.
pub fn google_credentials_for_export(settings: &EffectiveSettings) -> Option<&GoogleCredentials> {
    if settings.skip_google_apis {
        return None;
    }
    settings
        .google
        .as_ref()
        .filter(|g| g.is_service_account())
}

/// Exports (when possible) and emails the content.
pub async fn deliver(
    http: &Client,
    settings: &EffectiveSettings,
    request: &DeliveryRequest<'_>,
) -> Result<DeliveryReport, DeliveryError> {
    let smtp = settings.smtp.as_ref().ok_or_else(|| {
        DeliveryError::NotConfigured(
            "SMTP host, user, password and from address are required".to_string(),
        )
    })?;
    let mailer = SmtpMailer::new(smtp)?;

    match google_credentials_for_export(settings) {
        Some(credentials) => {
            info!("Exporting \"{}\" through Google Docs", request.page_title);
            let docs = GoogleDocsClient::authorize(http.clone(), credentials).await?;
            let document = docs
                .create_document(
                    &format!("{} - SEO Content", request.page_title),
                    request.content,
                    settings.drive_folder_id.as_deref(),
                )
                .await?;
            let pdf = docs.export_pdf(&document.id).await?;
            info!("Google document {} exported ({} bytes)", document.id, pdf.len());

            let (message, attachments) =
                compose_pdf_email(mailer.from(), request, pdf.to_vec())?;
            mailer.send(message).await?;

            Ok(DeliveryReport {
                mode: DeliveryMode::GooglePdf,
                document_url: Some(document.url),
                attachments,
            })
        }
        None => {
            info!("Google export skipped, sending text and HTML attachments");
            let (message, attachments) = compose_text_email(mailer.from(), request)?;
            mailer.send(message).await?;

            Ok(DeliveryReport {
                mode: DeliveryMode::TextAndHtml,
                document_url: None,
                attachments,
            })
        }
    }
}
