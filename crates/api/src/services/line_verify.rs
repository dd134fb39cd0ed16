//! LINE Login ID-token verification.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use domain::services::{IdentityVerifier, VerifyError};

use crate::config::AuthConfig;

/// Verifies ID tokens against the LINE Login verify endpoint.
pub struct LineIdTokenVerifier {
    client: Client,
    verify_url: String,
    channel_id: String,
}

/// Fields of the verify response this service reads.
#[derive(Debug, Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    sub: Option<String>,
}

impl LineIdTokenVerifier {
    pub fn new(config: &AuthConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.verify_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            verify_url: config.verify_url.clone(),
            channel_id: config.login_channel_id.clone(),
        })
    }
}

fn subject_from_body(body: &str) -> Result<String, VerifyError> {
    let parsed: VerifyResponse =
        serde_json::from_str(body).map_err(|e| VerifyError::Malformed(e.to_string()))?;
    parsed
        .sub
        .filter(|s| !s.is_empty())
        .ok_or(VerifyError::MissingSubject)
}

#[async_trait]
impl IdentityVerifier for LineIdTokenVerifier {
    async fn verify(&self, id_token: &str) -> Result<String, VerifyError> {
        let response = self
            .client
            .post(&self.verify_url)
            .form(&[("id_token", id_token), ("client_id", self.channel_id.as_str())])
            .send()
            .await
            .map_err(|e| VerifyError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VerifyError::Transport(e.to_string()))?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "ID token rejected by verifier");
            return Err(VerifyError::Status(status.as_u16()));
        }

        subject_from_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_extracted() {
        let body = r#"{"iss":"https://access.line.me","sub":"U0123456789abcdef0123456789abcdef","aud":"1650000000","exp":1,"iat":0}"#;
        assert_eq!(
            subject_from_body(body).unwrap(),
            "U0123456789abcdef0123456789abcdef"
        );
    }

    #[test]
    fn test_missing_subject() {
        assert!(matches!(
            subject_from_body(r#"{"aud":"1650000000"}"#),
            Err(VerifyError::MissingSubject)
        ));
        assert!(matches!(
            subject_from_body(r#"{"sub":""}"#),
            Err(VerifyError::MissingSubject)
        ));
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(
            subject_from_body("<html>"),
            Err(VerifyError::Malformed(_))
        ));
    }
}
