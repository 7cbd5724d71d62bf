//! HTTP client for CalDAV operations.
//!
//! Requests go out unauthenticated until the server answers 401; the
//! challenge it sends picks the scheme, which is then reused for every later
//! request on this client.

use reqwest::{Client, Method, Response, StatusCode};
use tracing::{debug, trace, warn};

use crate::connect::Credentials;
use crate::error::{ProviderError, ProviderResult};

use super::auth::AuthScheme;
use super::config::CalDavConfig;

const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";
const ICS_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

/// One request, rebuilt for the authenticated retry.
struct DavRequest<'a> {
    method: &'static str,
    url: &'a str,
    body: &'a str,
    content_type: &'static str,
    depth: Option<u8>,
    create_only: bool,
}

/// HTTP client bound to one account.
pub struct CalDavClient {
    client: Client,
    credentials: Credentials,
    scheme: Option<AuthScheme>,
}

impl CalDavClient {
    pub fn new(config: &CalDavConfig, credentials: Credentials) -> ProviderResult<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self {
            client,
            credentials,
            scheme: None,
        })
    }

    /// PROPFIND with the given depth; returns the multistatus body.
    pub async fn propfind(&mut self, url: &str, body: &str, depth: u8) -> ProviderResult<String> {
        let response = self
            .execute(DavRequest {
                method: "PROPFIND",
                url,
                body,
                content_type: XML_CONTENT_TYPE,
                depth: Some(depth),
                create_only: false,
            })
            .await?;
        read_body(response).await
    }

    /// REPORT at depth 1; returns the multistatus body.
    pub async fn report(&mut self, url: &str, body: &str) -> ProviderResult<String> {
        let response = self
            .execute(DavRequest {
                method: "REPORT",
                url,
                body,
                content_type: XML_CONTENT_TYPE,
                depth: Some(1),
                create_only: false,
            })
            .await?;
        read_body(response).await
    }

    /// Creates a calendar object with `If-None-Match: *` and returns its
    /// ETag when the server reports one.
    pub async fn put_new(&mut self, url: &str, ics: &str) -> ProviderResult<Option<String>> {
        let response = self
            .execute(DavRequest {
                method: "PUT",
                url,
                body: ics,
                content_type: ICS_CONTENT_TYPE,
                depth: None,
                create_only: true,
            })
            .await?;
        Ok(response
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim_matches('"').to_string()))
    }

    async fn execute(&mut self, request: DavRequest<'_>) -> ProviderResult<Response> {
        let response = self.send(&request).await?;

        if response.status() == StatusCode::UNAUTHORIZED && self.scheme.is_none() {
            let challenge = response
                .headers()
                .get("www-authenticate")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("Basic");
            debug!(url = %request.url, "Received 401, authenticating");
            self.scheme = Some(AuthScheme::from_challenge(challenge));
            let retried = self.send(&request).await?;
            return check_status(retried).await;
        }

        check_status(response).await
    }

    async fn send(&mut self, request: &DavRequest<'_>) -> ProviderResult<Response> {
        let method = Method::from_bytes(request.method.as_bytes()).map_err(|_| {
            ProviderError::internal(format!("invalid HTTP method: {}", request.method))
        })?;

        let mut builder = self
            .client
            .request(method, request.url)
            .header("Content-Type", request.content_type)
            .body(request.body.to_string());
        if let Some(depth) = request.depth {
            builder = builder.header("Depth", depth.to_string());
        }
        if request.create_only {
            builder = builder.header("If-None-Match", "*");
        }
        if let Some(scheme) = self.scheme.as_mut() {
            let uri_path = url::Url::parse(request.url)
                .map(|u| u.path().to_string())
                .unwrap_or_else(|_| request.url.to_string());
            let header = scheme.authorize(
                request.method,
                &uri_path,
                &self.credentials.identifier,
                &self.credentials.secret,
            );
            builder = builder.header("Authorization", header);
        }

        trace!(method = %request.method, url = %request.url, "Sending request");
        builder.send().await.map_err(transport_error)
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::timeout("calendar server did not respond in time").with_source(e)
    } else {
        ProviderError::network(format!("calendar server unreachable: {}", e)).with_source(e)
    }
}

async fn read_body(response: Response) -> ProviderResult<String> {
    response.text().await.map_err(transport_error)
}

/// Maps non-success statuses onto provider error codes.
async fn check_status(response: Response) -> ProviderResult<Response> {
    let status = response.status();
    trace!(status = %status, "Received response");

    if status.is_success() {
        return Ok(response);
    }

    Err(match status {
        StatusCode::UNAUTHORIZED => {
            ProviderError::authentication_rejected("calendar server rejected the credentials")
        }
        StatusCode::FORBIDDEN => {
            ProviderError::permission_denied("access denied by calendar server")
        }
        StatusCode::NOT_FOUND => ProviderError::not_found("calendar resource not found"),
        StatusCode::PRECONDITION_FAILED => {
            ProviderError::input_invalid("an event with this uid already exists")
        }
        StatusCode::TOO_MANY_REQUESTS => {
            ProviderError::rate_limited("too many requests to calendar server")
        }
        s if s.is_server_error() => {
            let body = response.text().await.unwrap_or_default();
            ProviderError::server(format!("server error ({}): {}", s, body))
        }
        s => {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %s, body = %body, "Unexpected response status");
            ProviderError::invalid_response(format!("unexpected status {}", s))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn client_creation() {
        let config = CalDavConfig::new("https://caldav.example.com/")
            .unwrap()
            .with_timeout(Duration::from_secs(10));
        let client = CalDavClient::new(&config, Credentials::new("user", "pass"));
        assert!(client.is_ok());
    }

    #[test]
    fn starts_without_scheme() {
        let config = CalDavConfig::new("https://caldav.example.com/").unwrap();
        let client = CalDavClient::new(&config, Credentials::new("user", "pass")).unwrap();
        assert!(client.scheme.is_none());
    }
}
