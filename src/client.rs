use async_trait::async_trait;
use futures::Stream;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::env;
use std::pin::Pin;
use std::time::{Duration, Instant};
use url::Url;

use crate::chunks::decode_chunks;
use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::types::{
    AuthResponse, ChatRequest, EvaluationRequest, ExampleQuestionsResponse, SessionToken,
    ThreadCreateResponse, ThreadId,
};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/";

/// Environment variable consulted when no base URL is given explicitly.
pub const BASE_URL_ENV: &str = "CHATLINE_BASE_URL";

/// Text chunks of a streamed answer, in arrival order.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// The remote chat service.
///
/// Every call is a single request with no retry.  Implementations map
/// non-success statuses onto [`Error`] variants.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Obtain a fresh session token.
    async fn authenticate(&self) -> Result<SessionToken>;

    /// Succeeds only if the service still accepts `token`.
    async fn check_token(&self, token: &SessionToken) -> Result<()>;

    /// Open a new conversation thread.
    async fn create_thread(&self, token: &SessionToken) -> Result<ThreadId>;

    /// Ask a question and receive the answer incrementally.
    async fn chat(&self, token: &SessionToken, request: &ChatRequest) -> Result<ChunkStream>;

    /// Post feedback for a message.
    async fn evaluate(&self, token: &SessionToken, request: &EvaluationRequest) -> Result<()>;

    /// Fetch the example questions offered on an empty conversation.
    async fn example_questions(&self, token: &SessionToken) -> Result<Vec<String>>;
}

/// HTTP implementation of [`ChatBackend`].
#[derive(Debug, Clone)]
pub struct Backend {
    client: ReqwestClient,
    base_url: Url,
    timeout: Option<Duration>,
}

impl Backend {
    /// Create a backend for the service at `base_url`.
    ///
    /// The base URL falls back to the `CHATLINE_BASE_URL` environment variable
    /// and then to a local default.  No request timeout is applied unless one
    /// is given.
    pub fn new(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = match base_url {
            Some(url) => url,
            None => env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        };
        let base_url = parse_base_url(&base_url)?;

        let mut builder = ReqwestClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {e}"),
                Some(Box::new(e)),
            )
        })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// The service root every endpoint is joined onto.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn headers(&self, token: Option<&SessionToken>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = token {
            let value = HeaderValue::from_str(&token.bearer()).map_err(|_| {
                Error::validation(
                    "session token is not a valid header value",
                    Some("token".to_string()),
                )
            })?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {e}"),
                self.timeout.map(|t| t.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }

    /// Send `request` and turn a non-success status into an error.
    async fn execute(&self, endpoint: &'static str, request: RequestBuilder) -> Result<Response> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let response = request.send().await.map_err(|e| {
            CLIENT_REQUEST_ERRORS.click();
            self.send_error(e)
        });
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        let response = response?;
        tracing::debug!(endpoint, status = response.status().as_u16(), "response received");
        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(process_error_response(response).await);
        }
        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        response.json::<T>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {e}"),
                Some(Box::new(e)),
            )
        })
    }
}

#[async_trait]
impl ChatBackend for Backend {
    async fn authenticate(&self) -> Result<SessionToken> {
        let request = self
            .client
            .get(self.endpoint("auth")?)
            .headers(self.headers(None)?);
        let response = self.execute("auth", request).await?;
        let body: AuthResponse = Self::read_json(response).await?;
        Ok(body.token)
    }

    async fn check_token(&self, token: &SessionToken) -> Result<()> {
        let request = self
            .client
            .get(self.endpoint("auth/check")?)
            .headers(self.headers(Some(token))?);
        self.execute("auth/check", request).await?;
        Ok(())
    }

    async fn create_thread(&self, token: &SessionToken) -> Result<ThreadId> {
        let request = self
            .client
            .post(self.endpoint("thread/create")?)
            .headers(self.headers(Some(token))?);
        let response = self.execute("thread/create", request).await?;
        let body: ThreadCreateResponse = Self::read_json(response).await?;
        Ok(body.thread_id)
    }

    async fn chat(&self, token: &SessionToken, request: &ChatRequest) -> Result<ChunkStream> {
        let mut headers = self.headers(Some(token))?;
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        let request = self
            .client
            .post(self.endpoint("chat")?)
            .headers(headers)
            .json(request);
        let response = self.execute("chat", request).await?;
        Ok(Box::pin(decode_chunks(response.bytes_stream())))
    }

    async fn evaluate(&self, token: &SessionToken, request: &EvaluationRequest) -> Result<()> {
        let request = self
            .client
            .post(self.endpoint("evaluation")?)
            .headers(self.headers(Some(token))?)
            .json(request);
        self.execute("evaluation", request).await?;
        Ok(())
    }

    async fn example_questions(&self, token: &SessionToken) -> Result<Vec<String>> {
        let request = self
            .client
            .get(self.endpoint("examples")?)
            .headers(self.headers(Some(token))?);
        let response = self.execute("examples", request).await?;
        let body: ExampleQuestionsResponse = Self::read_json(response).await?;
        Ok(body.questions)
    }
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    if url.cannot_be_a_base() {
        return Err(Error::url(
            format!("'{base_url}' cannot be used as a base URL"),
            None,
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

async fn process_error_response(response: Response) -> Error {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|val| val.to_str().ok())
        .and_then(|val| val.parse::<u64>().ok());
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            return Error::http_client(
                format!("Failed to read error response: {e}"),
                Some(Box::new(e)),
            );
        }
    };
    error_for_status(status, &body, retry_after)
}

/// Map a non-success status and its body onto an [`Error`].
pub(crate) fn error_for_status(status: StatusCode, body: &str, retry_after: Option<u64>) -> Error {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ErrorField {
        Text(String),
        Detail { message: Option<String> },
    }

    #[derive(Deserialize)]
    struct ErrorResponse {
        error: Option<ErrorField>,
        message: Option<String>,
    }

    let parsed = serde_json::from_str::<ErrorResponse>(body).ok();
    let message = parsed
        .and_then(|e| match e.error {
            Some(ErrorField::Text(text)) => Some(text),
            Some(ErrorField::Detail { message }) => message.or(e.message),
            None => e.message,
        })
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_string()
        });

    match status.as_u16() {
        401 => Error::authentication(message),
        403 => Error::permission(message),
        404 => Error::not_found(message),
        408 => Error::timeout(message, None),
        429 => Error::rate_limit(message, retry_after),
        500 => Error::internal_server(message),
        502..=504 => Error::service_unavailable(message, retry_after),
        code => Error::api(code, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_creation() {
        let backend = Backend::new(Some("http://localhost:9000/api".to_string()), None).unwrap();
        assert_eq!(backend.base_url().as_str(), "http://localhost:9000/api/");
        assert_eq!(
            backend.endpoint("auth/check").unwrap().as_str(),
            "http://localhost:9000/api/auth/check"
        );
    }

    #[test]
    fn invalid_base_url() {
        assert!(Backend::new(Some("not a url".to_string()), None).is_err());
        assert!(Backend::new(Some("mailto:someone@example.com".to_string()), None).is_err());
    }

    #[test]
    fn bearer_header_is_set() {
        let backend = Backend::new(Some("http://localhost/".to_string()), None).unwrap();
        let headers = backend.headers(Some(&SessionToken::new("abc"))).unwrap();
        assert_eq!(headers[header::AUTHORIZATION], "Bearer abc");
        let headers = backend.headers(None).unwrap();
        assert!(!headers.contains_key(header::AUTHORIZATION));
        assert!(
            backend
                .headers(Some(&SessionToken::new("bad\ntoken")))
                .is_err()
        );
    }

    #[test]
    fn status_mapping() {
        let err = error_for_status(StatusCode::UNAUTHORIZED, "", None);
        assert!(err.is_authentication());
        assert!(err.to_string().contains("Unauthorized"));

        let err = error_for_status(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error":"boom"}"#, None);
        assert_eq!(err.status_code(), Some(500));
        assert!(err.to_string().contains("boom"));

        let err = error_for_status(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"slow down"}}"#,
            Some(3),
        );
        assert_eq!(err.status_code(), Some(429));
        assert!(err.to_string().contains("slow down"));

        let err = error_for_status(StatusCode::BAD_GATEWAY, "upstream gone", None);
        assert!(err.is_server_error());
        assert!(err.to_string().contains("upstream gone"));

        let err = error_for_status(StatusCode::REQUEST_TIMEOUT, "", None);
        assert!(err.is_timeout());

        let err = error_for_status(StatusCode::IM_A_TEAPOT, r#"{"message":"short"}"#, None);
        assert_eq!(err.status_code(), Some(418));
        assert!(err.to_string().contains("short"));
    }
}
