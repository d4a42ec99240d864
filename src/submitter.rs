use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use url::Url;

use crate::auth::TokenProvider;
use crate::error::SubmitError;
use crate::quiz::QuizId;

const MILESTONE_PATH: &str = "update-quiz-milestone";

/// Body of the milestone update: `scores` is the number of correct answers,
/// `milestones` the accumulated marks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub quiz_id: QuizId,
    pub scores: u32,
    pub milestones: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Receipt {
    #[serde(default)]
    pub message: Option<String>,
}

pub trait SubmitResult {
    fn submit(
        &self,
        submission: &Submission,
    ) -> impl Future<Output = Result<Receipt, SubmitError>> + Send;
}

/// Process-wide HTTP client for the milestone backend.
#[derive(Debug, Clone)]
pub struct MilestoneClient {
    http: Client,
    endpoint: Url,
}

impl MilestoneClient {
    pub fn new(base_url: &Url, timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            endpoint: milestone_endpoint(base_url),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Binds the client to whoever `tokens` says is signed in.
    pub fn with_tokens<T: TokenProvider>(&self, tokens: T) -> ResultSubmitter<T> {
        ResultSubmitter {
            client: self.clone(),
            tokens,
        }
    }
}

// `Url::join` drops the last path segment unless the base ends with '/'.
fn milestone_endpoint(base_url: &Url) -> Url {
    let mut endpoint = base_url.clone();
    if !endpoint.path().ends_with('/') {
        let path = format!("{}/", endpoint.path());
        endpoint.set_path(&path);
    }
    endpoint.join(MILESTONE_PATH).unwrap_or(endpoint)
}

#[derive(Debug, Clone)]
pub struct ResultSubmitter<T> {
    client: MilestoneClient,
    tokens: T,
}

impl<T: TokenProvider> SubmitResult for ResultSubmitter<T> {
    #[instrument(level = "info", skip(self), fields(endpoint = %self.client.endpoint))]
    async fn submit(&self, submission: &Submission) -> Result<Receipt, SubmitError> {
        let Some(token) = self.tokens.bearer_token() else {
            warn!("No stored token, skipping milestone update");
            return Err(SubmitError::AuthMissing);
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
            warn!("Stored token is corrupt, skipping milestone update: {e}");
            SubmitError::InvalidToken
        })?;
        headers.insert(AUTHORIZATION, bearer);

        let response = self
            .client
            .http
            .post(self.client.endpoint.clone())
            .headers(headers)
            .json(submission)
            .send()
            .await
            .map_err(|e| {
                warn!("Milestone request failed: {e}");
                SubmitError::NetworkUnreachable(e.to_string())
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            warn!("Failed to read milestone response: {e}");
            SubmitError::NetworkUnreachable(e.to_string())
        })?;

        if status != StatusCode::OK {
            let message = serde_json::from_str::<Receipt>(&body)
                .ok()
                .and_then(|r| r.message)
                .unwrap_or_else(|| status.to_string());
            warn!("Milestone update rejected with {status}: {message}");
            return Err(SubmitError::ServerRejected(message));
        }

        let receipt = serde_json::from_str::<Receipt>(&body).unwrap_or_default();
        info!(
            "Milestone updated for quiz {}: {} correct, {} points",
            submission.quiz_id, submission.scores, submission.milestones
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode as AxumStatus};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    use super::*;
    use crate::auth::StaticToken;

    #[derive(Clone, Default)]
    struct Backend {
        requests: Arc<Mutex<Vec<(Option<String>, Option<String>, Value)>>>,
        reply: Arc<Mutex<Option<(u16, Value)>>>,
    }

    async fn milestone_handler(
        State(backend): State<Backend>,
        headers: AxumHeaders,
        Json(body): Json<Value>,
    ) -> impl IntoResponse {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        backend.requests.lock().unwrap().push((
            header("authorization"),
            header("content-type"),
            body,
        ));

        let (status, reply) = backend
            .reply
            .lock()
            .unwrap()
            .clone()
            .unwrap_or((200, json!({ "message": "Milestone updated" })));
        (AxumStatus::from_u16(status).unwrap(), Json(reply)).into_response()
    }

    async fn spawn_backend(backend: Backend) -> Url {
        let app = Router::new()
            .route("/api/update-quiz-milestone", post(milestone_handler))
            .with_state(backend);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api").parse().unwrap()
    }

    fn submission() -> Submission {
        Submission {
            quiz_id: QuizId::Number(11),
            scores: 2,
            milestones: 8,
        }
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let with_slash: Url = "https://shop.example/api/".parse().unwrap();
        let without_slash: Url = "https://shop.example/api".parse().unwrap();

        assert_eq!(
            milestone_endpoint(&with_slash).as_str(),
            "https://shop.example/api/update-quiz-milestone"
        );
        assert_eq!(
            milestone_endpoint(&without_slash).as_str(),
            "https://shop.example/api/update-quiz-milestone"
        );
    }

    #[tokio::test]
    async fn posts_tally_with_bearer_token() {
        let backend = Backend::default();
        let base = spawn_backend(backend.clone()).await;
        let submitter = MilestoneClient::new(&base, None)
            .unwrap()
            .with_tokens(StaticToken::new("secret"));

        let receipt = submitter.submit(&submission()).await.unwrap();

        assert_eq!(receipt.message.as_deref(), Some("Milestone updated"));
        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let (auth, content_type, body) = &requests[0];
        assert_eq!(auth.as_deref(), Some("Bearer secret"));
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(
            body,
            &json!({ "quiz_id": 11, "scores": 2, "milestones": 8 })
        );
    }

    #[tokio::test]
    async fn missing_token_never_reaches_backend() {
        let backend = Backend::default();
        let base = spawn_backend(backend.clone()).await;
        let submitter = MilestoneClient::new(&base, None)
            .unwrap()
            .with_tokens(StaticToken::missing());

        let err = submitter.submit(&submission()).await.unwrap_err();

        assert_eq!(err, SubmitError::AuthMissing);
        assert!(backend.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_token_is_not_reported_as_signed_out() {
        let backend = Backend::default();
        let base = spawn_backend(backend.clone()).await;
        let submitter = MilestoneClient::new(&base, None)
            .unwrap()
            .with_tokens(StaticToken::new("tok\nen"));

        let err = submitter.submit(&submission()).await.unwrap_err();

        assert_eq!(err, SubmitError::InvalidToken);
        assert!(backend.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_ok_status_is_rejection() {
        let backend = Backend::default();
        *backend.reply.lock().unwrap() =
            Some((422, json!({ "message": "Quiz already completed" })));
        let base = spawn_backend(backend.clone()).await;
        let submitter = MilestoneClient::new(&base, None)
            .unwrap()
            .with_tokens(StaticToken::new("secret"));

        let err = submitter.submit(&submission()).await.unwrap_err();

        assert_eq!(
            err,
            SubmitError::ServerRejected("Quiz already completed".into())
        );
    }

    #[tokio::test]
    async fn other_success_codes_are_rejected_too() {
        let backend = Backend::default();
        *backend.reply.lock().unwrap() = Some((201, json!({})));
        let base = spawn_backend(backend.clone()).await;
        let submitter = MilestoneClient::new(&base, None)
            .unwrap()
            .with_tokens(StaticToken::new("secret"));

        let err = submitter.submit(&submission()).await.unwrap_err();

        assert_eq!(err, SubmitError::ServerRejected("201 Created".into()));
    }

    #[tokio::test]
    async fn unreachable_backend_is_network_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let base: Url = format!("http://{addr}/").parse().unwrap();
        let submitter = MilestoneClient::new(&base, Some(Duration::from_secs(5)))
            .unwrap()
            .with_tokens(StaticToken::new("secret"));

        let err = submitter.submit(&submission()).await.unwrap_err();
        assert!(matches!(err, SubmitError::NetworkUnreachable(_)));
    }
}
