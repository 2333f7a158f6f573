// SMTP delivery and message composition.
// Composition is pure (testable without a server); SmtpMailer owns the transport.

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::delivery::html::MarkdownRenderer;
use crate::delivery::{DeliveryError, DeliveryRequest, SmtpSettings};

/// Port that expects TLS from the first byte; every other port upgrades via STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self, DeliveryError> {
        let builder = if settings.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
        };

        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(
                settings.user.clone(),
                settings.password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            from: sender(settings)?,
        })
    }

    pub fn from(&self) -> &Mailbox {
        &self.from
    }

    pub async fn send(&self, message: Message) -> Result<(), DeliveryError> {
        self.transport.send(message).await?;
        Ok(())
    }

    /// Connects and authenticates without sending anything.
    pub async fn verify(&self) -> Result<bool, DeliveryError> {
        Ok(self.transport.test_connection().await?)
    }
}

/// `"<from_name>" <from_email>`
pub fn sender(settings: &SmtpSettings) -> Result<Mailbox, DeliveryError> {
    let address: Address = settings.from_email.parse()?;
    Ok(Mailbox::new(Some(settings.from_name.clone()), address))
}

/// `<site>-<title>` with everything but ASCII alphanumerics, Thai letters and
/// whitespace removed, and whitespace runs collapsed to `_`.
pub fn clean_filename(website_name: &str, page_title: &str) -> String {
    format!("{}-{}", clean_part(website_name), clean_part(page_title))
}

fn clean_part(s: &str) -> String {
    let kept: String = s
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || is_thai(*c) || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join("_")
}

fn is_thai(c: char) -> bool {
    ('\u{0E00}'..='\u{0E7F}').contains(&c)
}

pub fn subject(page_title: &str) -> String {
    format!("SEO content for: {page_title}")
}

// ────────────────────────────────────────────────────────────────────────────
// Message bodies
// ────────────────────────────────────────────────────────────────────────────

fn notification_html(page_title: &str, attachment_list: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #333;">Your SEO content is ready</h2>
  <p>Hello,</p>
  <p>The SEO content for "<strong>{}</strong>" has been generated.</p>
  <p>The complete content is attached:</p>
  <ul>
{attachment_list}
  </ul>
  <hr style="border: none; border-top: 1px solid #eee; margin: 20px 0;">
  <p style="color: #666; font-size: 14px;">Thank you for using SEO Content Generator.</p>
</div>"#,
        html_escape(page_title)
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn recipient(request: &DeliveryRequest<'_>) -> Result<Mailbox, DeliveryError> {
    let address: Address = request.recipient.parse()?;
    Ok(Mailbox::new(None, address))
}

fn content_type(value: &str) -> Result<ContentType, DeliveryError> {
    ContentType::parse(value).map_err(|e| DeliveryError::Compose(e.to_string()))
}

/// Email carrying the exported PDF. Returns the message and attachment names.
pub fn compose_pdf_email(
    from: &Mailbox,
    request: &DeliveryRequest<'_>,
    pdf: Vec<u8>,
) -> Result<(Message, Vec<String>), DeliveryError> {
    let filename = format!(
        "{}_SEO_Content.pdf",
        clean_filename(request.website_name, request.page_title)
    );
    let list = format!("    <li><strong>{}</strong> (PDF)</li>", html_escape(&filename));

    let message = Message::builder()
        .from(from.clone())
        .to(recipient(request)?)
        .subject(subject(request.page_title))
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::html(notification_html(request.page_title, &list)))
                .singlepart(
                    Attachment::new(filename.clone())
                        .body(pdf, content_type("application/pdf")?),
                ),
        )?;

    Ok((message, vec![filename]))
}

/// Email carrying the raw text and a styled HTML rendering.
pub fn compose_text_email(
    from: &Mailbox,
    request: &DeliveryRequest<'_>,
) -> Result<(Message, Vec<String>), DeliveryError> {
    let base = clean_filename(request.website_name, request.page_title);
    let txt_name = format!("{base}_SEO_Content.txt");
    let html_name = format!("{base}_SEO_Content.html");

    let rendered = MarkdownRenderer::new().render_document(request.page_title, request.content);
    let list = format!(
        "    <li><strong>{}</strong> (plain text)</li>\n    <li><strong>{}</strong> (formatted HTML, internal links in red)</li>",
        html_escape(&txt_name),
        html_escape(&html_name)
    );

    let message = Message::builder()
        .from(from.clone())
        .to(recipient(request)?)
        .subject(subject(request.page_title))
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::html(notification_html(request.page_title, &list)))
                .singlepart(
                    Attachment::new(txt_name.clone())
                        .body(request.content.to_string(), ContentType::TEXT_PLAIN),
                )
                .singlepart(
                    Attachment::new(html_name.clone()).body(rendered, ContentType::TEXT_HTML),
                ),
        )?;

    Ok((message, vec![txt_name, html_name]))
}

/// Short message used by the settings page to prove SMTP works.
pub fn compose_test_email(from: &Mailbox, to: &str) -> Result<Message, DeliveryError> {
    let address: Address = to.parse()?;
    let message = Message::builder()
        .from(from.clone())
        .to(Mailbox::new(None, address))
        .subject("SEO Content Generator: test email")
        .singlepart(SinglePart::html(
            r#"<div style="font-family: Arial, sans-serif;">
  <h2>SMTP is configured correctly</h2>
  <p>This test message was sent from SEO Content Generator.</p>
</div>"#
                .to_string(),
        ))?;
    Ok(message)
}

/// Verifies the SMTP login, then sends the test message.
pub async fn send_test_email(settings: &SmtpSettings, to: &str) -> Result<(), DeliveryError> {
    let mailer = SmtpMailer::new(settings)?;
    mailer.verify().await?;
    let message = compose_test_email(mailer.from(), to)?;
    mailer.send(message).await?;
    info!("Test email sent to {to}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp(port: u16) -> SmtpSettings {
        SmtpSettings {
            host: "smtp.example.com".to_string(),
            port,
            user: "mailer".to_string(),
            password: "secret".to_string(),
            from_email: "noreply@example.com".to_string(),
            from_name: "Acme Mailer".to_string(),
        }
    }

    fn request() -> DeliveryRequest<'static> {
        DeliveryRequest {
            recipient: "editor@acme.example",
            website_name: "Acme Coffee!",
            page_title: "Pour-over Guide",
            content: "# Pour-over\n\nTry [beans](/beans).",
        }
    }

    fn formatted(message: &Message) -> String {
        String::from_utf8_lossy(&message.formatted()).into_owned()
    }

    #[test]
    fn test_clean_filename() {
        assert_eq!(clean_filename("Acme Coffee!", "Pour-over  Guide"), "Acme_Coffee-Pourover_Guide");
        assert_eq!(clean_filename("ร้าน กาแฟ", "A/B"), "ร้าน_กาแฟ-AB");
        assert_eq!(clean_filename("  site ", "title"), "site-title");
    }

    #[test]
    fn test_sender_mailbox() {
        let mailbox = sender(&smtp(587)).unwrap();
        assert_eq!(mailbox.email.to_string(), "noreply@example.com");
        assert_eq!(mailbox.name.as_deref(), Some("Acme Mailer"));

        let mut bad = smtp(587);
        bad.from_email = "not-an-address".to_string();
        assert!(matches!(sender(&bad), Err(DeliveryError::Address(_))));
    }

    #[test]
    fn test_text_email_has_txt_and_html_attachments() {
        let from = sender(&smtp(587)).unwrap();
        let (message, names) = compose_text_email(&from, &request()).unwrap();
        assert_eq!(
            names,
            vec![
                "Acme_Coffee-Pourover_Guide_SEO_Content.txt".to_string(),
                "Acme_Coffee-Pourover_Guide_SEO_Content.html".to_string(),
            ]
        );

        let raw = formatted(&message);
        assert!(raw.contains("SEO content for: Pour-over Guide"));
        assert!(raw.contains("Acme_Coffee-Pourover_Guide_SEO_Content.txt"));
        assert!(raw.contains("Acme_Coffee-Pourover_Guide_SEO_Content.html"));
    }

    #[test]
    fn test_pdf_email_names_attachment() {
        let from = sender(&smtp(465)).unwrap();
        let (message, names) =
            compose_pdf_email(&from, &request(), b"%PDF-1.4".to_vec()).unwrap();
        assert_eq!(names, vec!["Acme_Coffee-Pourover_Guide_SEO_Content.pdf".to_string()]);
        assert!(formatted(&message).contains("application/pdf"));
    }

    #[test]
    fn test_invalid_recipient_is_rejected() {
        let from = sender(&smtp(587)).unwrap();
        let mut req = request();
        req.recipient = "nobody";
        assert!(matches!(
            compose_text_email(&from, &req),
            Err(DeliveryError::Address(_))
        ));
        assert!(compose_test_email(&from, "nobody").is_err());
    }

    #[tokio::test]
    async fn test_mailer_builds_for_both_tls_modes() {
        assert!(SmtpMailer::new(&smtp(465)).is_ok());
        assert!(SmtpMailer::new(&smtp(587)).is_ok());
    }
}
