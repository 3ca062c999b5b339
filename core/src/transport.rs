//! Pluggable execution of `HttpRequest` values.
//!
//! The core never performs I/O itself. A `Transport` takes a built request
//! to the network and hands back the raw response, leaving status
//! interpretation to `RepoClient::parse_*`.

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes a single HTTP round trip.
///
/// Implementations must return non-2xx responses as `Ok` so the parser can
/// map them; `Err` is reserved for failures that produced no response.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

#[cfg(feature = "ureq")]
pub use self::ureq_transport::UreqTransport;

#[cfg(feature = "ureq")]
mod ureq_transport {
    use std::io::Read as _;
    use std::time::Duration;

    use ureq::http;

    use super::Transport;
    use crate::error::ApiError;
    use crate::http::{HttpRequest, HttpResponse};

    /// A blocking [`Transport`] backed by a pooled [`ureq::Agent`].
    #[derive(Debug, Clone)]
    pub struct UreqTransport {
        agent: ureq::Agent,
    }

    impl UreqTransport {
        /// Every request, body download included, must finish within
        /// `timeout`.
        pub fn new(timeout: Duration) -> Self {
            let agent = ureq::Agent::config_builder()
                .timeout_global(Some(timeout))
                // Status codes are mapped by the parser, not by ureq.
                .http_status_as_error(false)
                .build()
                .new_agent();
            Self { agent }
        }

        pub fn from_agent(agent: ureq::Agent) -> Self {
            Self { agent }
        }
    }

    impl Transport for UreqTransport {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            let mut builder = http::Request::builder()
                .method(request.method.as_str())
                .uri(&request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            let result = match request.body {
                Some(body) => {
                    let req = builder
                        .body(body)
                        .map_err(|e| ApiError::InvalidInput(e.to_string()))?;
                    self.agent.run(req)
                }
                None => {
                    let req = builder
                        .body(())
                        .map_err(|e| ApiError::InvalidInput(e.to_string()))?;
                    self.agent.run(req)
                }
            };

            match result {
                Ok(response) => convert_response(response),
                Err(ureq::Error::Timeout(_)) => {
                    Err(ApiError::Transport("request timed out".to_string()))
                }
                Err(e) => Err(ApiError::Transport(e.to_string())),
            }
        }
    }

    fn convert_response(response: http::Response<ureq::Body>) -> Result<HttpResponse, ApiError> {
        let (parts, body) = response.into_parts();

        let mut bytes = Vec::new();
        body.into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let headers = parts
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        Ok(HttpResponse {
            status: parts.status.as_u16(),
            headers,
            body: bytes,
        })
    }
}
