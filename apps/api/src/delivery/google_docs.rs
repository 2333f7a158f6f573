/// Google Docs / Drive REST client authenticated as a service account.
///
/// Auth is the two-legged JWT bearer flow: a signed RS256 assertion is
/// exchanged for a short-lived access token, which then authorizes the Docs
/// and Drive calls made for one delivery.
use bytes::Bytes;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::delivery::DeliveryError;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DOCS_API_URL: &str = "https://docs.googleapis.com/v1/documents";
const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SCOPES: &str =
    "https://www.googleapis.com/auth/documents https://www.googleapis.com/auth/drive";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const SERVICE_ACCOUNT_DOMAIN: &str = ".iam.gserviceaccount.com";
/// Google rejects assertions valid for longer than an hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Clone, PartialEq)]
pub struct GoogleCredentials {
    pub client_email: String,
    /// PEM, with real newlines.
    pub private_key: String,
    pub project_id: Option<String>,
}

impl GoogleCredentials {
    pub fn is_service_account(&self) -> bool {
        self.client_email.ends_with(SERVICE_ACCOUNT_DOMAIN)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedDocument {
    document_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoogleDocument {
    pub id: String,
    pub url: String,
}

impl GoogleDocument {
    fn new(id: String) -> Self {
        let url = format!("https://docs.google.com/document/d/{id}/edit");
        Self { id, url }
    }
}

/// Signs the token-exchange assertion for `credentials`.
pub fn sign_assertion(credentials: &GoogleCredentials, now: i64) -> Result<String, DeliveryError> {
    let claims = Claims {
        iss: &credentials.client_email,
        scope: SCOPES,
        aud: TOKEN_URL,
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    };
    let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())?;
    Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
}

pub struct GoogleDocsClient {
    client: Client,
    access_token: String,
}

impl GoogleDocsClient {
    /// Exchanges a signed assertion for an access token.
    pub async fn authorize(
        client: Client,
        credentials: &GoogleCredentials,
    ) -> Result<Self, DeliveryError> {
        let assertion = sign_assertion(credentials, Utc::now().timestamp())?;

        let response = client
            .post(TOKEN_URL)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let token: TokenResponse = check_status(response).await?.json().await?;

        debug!("Google access token obtained for {}", credentials.client_email);
        Ok(Self {
            client,
            access_token: token.access_token,
        })
    }

    /// Creates the document, fills it, files it and shares it read-only by link.
    pub async fn create_document(
        &self,
        title: &str,
        content: &str,
        folder_id: Option<&str>,
    ) -> Result<GoogleDocument, DeliveryError> {
        let response = self
            .client
            .post(DOCS_API_URL)
            .bearer_auth(&self.access_token)
            .json(&json!({ "title": title }))
            .send()
            .await?;
        let created: CreatedDocument = check_status(response).await?.json().await?;
        let document = GoogleDocument::new(created.document_id);

        let response = self
            .client
            .post(format!("{DOCS_API_URL}/{}:batchUpdate", document.id))
            .bearer_auth(&self.access_token)
            .json(&json!({
                "requests": [
                    { "insertText": { "location": { "index": 1 }, "text": content } }
                ]
            }))
            .send()
            .await?;
        check_status(response).await?;

        if let Some(folder) = folder_id {
            let response = self
                .client
                .patch(format!("{DRIVE_FILES_URL}/{}", document.id))
                .bearer_auth(&self.access_token)
                .query(&[("addParents", folder), ("fields", "id,parents")])
                .json(&json!({}))
                .send()
                .await?;
            check_status(response).await?;
            debug!("Document {} moved to folder {folder}", document.id);
        }

        let response = self
            .client
            .post(format!("{DRIVE_FILES_URL}/{}/permissions", document.id))
            .bearer_auth(&self.access_token)
            .json(&json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await?;
        check_status(response).await?;

        info!("Google document created: {}", document.url);
        Ok(document)
    }

    pub async fn export_pdf(&self, document_id: &str) -> Result<Bytes, DeliveryError> {
        let response = self
            .client
            .get(format!("{DRIVE_FILES_URL}/{document_id}/export"))
            .bearer_auth(&self.access_token)
            .query(&[("mimeType", "application/pdf")])
            .send()
            .await?;
        Ok(check_status(response).await?.bytes().await?)
    }

    pub async fn delete_document(&self, document_id: &str) -> Result<(), DeliveryError> {
        let response = self
            .client
            .delete(format!("{DRIVE_FILES_URL}/{document_id}"))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

/// Token, create and delete round trip used by the settings page.
pub async fn test_google_access(
    client: Client,
    credentials: &GoogleCredentials,
) -> Result<(), DeliveryError> {
    let docs = GoogleDocsClient::authorize(client, credentials).await?;
    let document = docs
        .create_document("API connection test", "Connection test.", None)
        .await?;
    docs.delete_document(&document.id).await?;
    info!("Google API test passed for {}", credentials.client_email);
    Ok(())
}

async fn check_status(response: Response) -> Result<Response, DeliveryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(google_error(status.as_u16(), &body))
}

/// Pulls `error.message` (API errors) or `error_description` (token errors)
/// out of a Google error body.
fn google_error(status: u16, body: &str) -> DeliveryError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("error_description"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string());
    DeliveryError::Google { status, message }
}
