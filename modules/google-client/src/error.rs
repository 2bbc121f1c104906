use thiserror::Error;

pub type Result<T> = std::result::Result<T, GoogleError>;

#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for GoogleError {
    fn from(err: reqwest::Error) -> Self {
        GoogleError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for GoogleError {
    fn from(err: serde_json::Error) -> Self {
        GoogleError::Parse(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for GoogleError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        GoogleError::Auth(err.to_string())
    }
}

impl From<base64::DecodeError> for GoogleError {
    fn from(err: base64::DecodeError) -> Self {
        GoogleError::Parse(format!("base64: {err}"))
    }
}

impl From<url::ParseError> for GoogleError {
    fn from(err: url::ParseError) -> Self {
        GoogleError::Parse(err.to_string())
    }
}

pub(crate) async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if !status.is_success() {
        let message = resp.text().await.unwrap_or_default();
        return Err(GoogleError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(resp)
}
