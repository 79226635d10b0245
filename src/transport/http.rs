use async_trait::async_trait;
use reqwest::{header, Client, Method};
use tracing::debug;

use crate::Result;

use super::{ApiMethod, ApiRequest, ApiResponse, Transport, TransportConfig};

/// reqwest-backed transport
pub struct HttpTransport {
    /// HTTP client
    client: Client,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client })
    }

    fn method(method: ApiMethod) -> Method {
        match method {
            ApiMethod::Post => Method::POST,
            ApiMethod::Get => Method::GET,
            ApiMethod::Put => Method::PUT,
            ApiMethod::Delete => Method::DELETE,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let authorization = header::HeaderValue::from_str(&request.credentials.bearer())
            .map_err(|e| crate::Error::InvalidCredentials(e.to_string()))?;

        let mut builder = self
            .client
            .request(Self::method(request.method), request.url.clone())
            .header(header::AUTHORIZATION, authorization);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| crate::Error::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| crate::Error::Transport(e.to_string()))?;

        debug!(method = %request.method, url = %request.url, status, "API response");

        Ok(ApiResponse {
            status,
            body: ApiResponse::decode_body(&text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_new_with_default_config() {
        assert!(HttpTransport::new(&TransportConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_user_agent_is_client_error() {
        let config = TransportConfig {
            user_agent: "bad\nagent".to_string(),
            ..Default::default()
        };

        let err = HttpTransport::new(&config).err().unwrap();

        assert!(matches!(err, Error::Http(_)), "{:?}", err);
        assert!(!err.is_transport());
    }
}
