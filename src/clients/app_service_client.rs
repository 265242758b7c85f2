use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AppServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to sign service token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("Unexpected status {0} from app service")]
    UnexpectedStatus(StatusCode),
    #[error("Invalid app service URL '{0}'")]
    InvalidBaseUrl(String),
}

/// HTTP client for the learning-session service
#[derive(Debug)]
pub struct AppServiceClient {
    client: Client,
    base_url: Url,
    jwt_secret: String,
    service_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(rename = "type")]
    type_: String,
    exp: usize,
}

impl AppServiceClient {
    pub fn new(base_url: String, jwt_secret: String, service_name: String) -> Result<Self, AppServiceError> {
        let parsed = Url::parse(&base_url).map_err(|_| AppServiceError::InvalidBaseUrl(base_url.clone()))?;
        if parsed.cannot_be_a_base() {
            return Err(AppServiceError::InvalidBaseUrl(base_url));
        }
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: parsed,
            jwt_secret,
            service_name,
        })
    }

    fn generate_token(&self) -> Result<String, AppServiceError> {
        // 1 minute expiration
        let expiration = Utc::now().timestamp() + 60;

        let claims = Claims {
            sub: self.service_name.clone(),
            type_: "service".to_string(),
            exp: expiration as usize,
        };

        Ok(encode(&Header::default(), &claims, &EncodingKey::from_secret(self.jwt_secret.as_bytes()))?)
    }

    /// Base URL with `segments` appended, each one percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// GET a resource and interpret 2xx as present, 403/404 as absent
    async fn probe(&self, url: Url) -> Result<bool, AppServiceError> {
        let token = self.generate_token()?;
        let response = self.client.get(url.clone())
            .header("Authorization", format!("Bearer {}", token))
            .send().await?;
        debug!("App service answered {} for {}", response.status(), url);
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => Ok(false),
            other => Err(AppServiceError::UnexpectedStatus(other)),
        }
    }

    /// Does the learning session exist
    pub async fn session_exists(&self, session_id: i64) -> Result<bool, AppServiceError> {
        let session = session_id.to_string();
        self.probe(self.endpoint(&["sessions", &session])).await
    }

    /// Is the user a participant of the learning session
    pub async fn is_participant(&self, session_id: i64, user_id: &str) -> Result<bool, AppServiceError> {
        let session = session_id.to_string();
        self.probe(self.endpoint(&["sessions", &session, "participants", user_id])).await
    }
}
