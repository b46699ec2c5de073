// SPDX-License-Identifier: MPL-2.0

use crate::config::{HTTP_TIMEOUT_SECS, USER_AGENT};
use crate::graph::client::ClientError;
use crate::graph::types::GraphErrorBody;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// The HTTP capabilities the Graph client needs: GET a URL, or POST a form
/// to it, and get JSON back.
///
/// Non-2xx responses must come back as [`ClientError::Api`].
#[async_trait]
pub trait GraphTransport: Send + Sync {
    async fn get_json(&self, url: &Url) -> Result<serde_json::Value, ClientError>;

    async fn post_form(
        &self,
        url: &Url,
        form: &[(&str, &str)],
    ) -> Result<serde_json::Value, ClientError>;
}

/// Production transport over reqwest.
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl GraphTransport for ReqwestTransport {
    async fn get_json(&self, url: &Url) -> Result<serde_json::Value, ClientError> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        read_json(response).await
    }

    async fn post_form(
        &self,
        url: &Url,
        form: &[(&str, &str)],
    ) -> Result<serde_json::Value, ClientError> {
        let response = self
            .http
            .post(url.clone())
            .form(form)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        read_json(response).await
    }
}

async fn read_json(response: reqwest::Response) -> Result<serde_json::Value, ClientError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ClientError::Network(e.to_string()))?;

    if !status.is_success() {
        // Graph explains itself in an error envelope; fall back to the raw body.
        let message = serde_json::from_str::<GraphErrorBody>(&body)
            .map(|b| match b.error.code {
                Some(code) => format!("{} (code {code})", b.error.message),
                None => b.error.message,
            })
            .unwrap_or(body);
        return Err(ClientError::Api {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| ClientError::InvalidResponse(e.to_string()))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{closed_port, serve_once};

    async fn get(base: &str, path: &str) -> Result<serde_json::Value, ClientError> {
        let url = Url::parse(&format!("{base}{path}")).unwrap();
        ReqwestTransport::new().unwrap().get_json(&url).await
    }

    #[tokio::test]
    async fn test_graph_error_envelope_becomes_api_error() {
        let body = r#"{"error":{"message":"Invalid OAuth access token","type":"OAuthException","code":190}}"#;
        let (base, server) = serve_once("400 Bad Request", body).await;

        let result = get(&base, "/v18.0/page-1?access_token=bad").await;
        match result {
            Err(ClientError::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid OAuth access token (code 190)");
            }
            other => panic!("expected api error, got {other:?}"),
        }

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /v18.0/page-1?access_token=bad "));
    }

    #[tokio::test]
    async fn test_plain_error_body_is_kept_verbatim() {
        let (base, _server) = serve_once("502 Bad Gateway", "upstream down").await;
        let result = get(&base, "/v18.0/page-1").await;
        match result {
            Err(ClientError::Api { status, message }) => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream down");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_success_with_non_json_body_is_invalid_response() {
        let (base, _server) = serve_once("200 OK", "<html>maintenance</html>").await;
        let result = get(&base, "/v18.0/page-1").await;
        assert!(matches!(result, Err(ClientError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_success_returns_json() {
        let (base, _server) = serve_once("200 OK", r#"{"id":"page-1","name":"Acme"}"#).await;
        let result = get(&base, "/v18.0/page-1").await;
        assert_eq!(result.unwrap()["name"], "Acme");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let base = closed_port().await;
        let result = get(&base, "/v18.0/page-1").await;
        assert!(matches!(result, Err(ClientError::Network(_))));
    }

    #[tokio::test]
    async fn test_post_form_sends_urlencoded_body() {
        let (base, server) = serve_once("200 OK", r#"{"id":"page-1_99"}"#).await;
        let url = Url::parse(&format!("{base}/v18.0/page-1/feed")).unwrap();

        let value = ReqwestTransport::new()
            .unwrap()
            .post_form(&url, &[("message", "fresh bread"), ("access_token", "tok-42")])
            .await
            .unwrap();
        assert_eq!(value["id"], "page-1_99");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v18.0/page-1/feed "));
        assert!(request.ends_with("message=fresh+bread&access_token=tok-42"));
    }
}
