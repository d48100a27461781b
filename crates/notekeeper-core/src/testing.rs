//! Scripted transport and recording session store for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};

use crate::api::{ApiError, ApiRequest, ApiResponse, Transport};
use crate::auth::SessionStore;
use crate::models::User;

type Reply = Result<ApiResponse, ApiError>;
type Handler = Box<dyn Fn(&ApiRequest) -> Reply + Send + Sync>;

/// A request as the fake transport saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub method: Method,
    pub endpoint: String,
    pub authorization: Option<String>,
    pub body: Option<serde_json::Value>,
}

/// Transport answering from a queue of canned replies, or from a handler
/// once the queue is empty.
pub struct FakeTransport {
    replies: Mutex<VecDeque<Reply>>,
    handler: Option<Handler>,
    requests: Mutex<Vec<Recorded>>,
    yield_first: bool,
}

impl FakeTransport {
    pub fn scripted(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            handler: None,
            requests: Mutex::new(Vec::new()),
            yield_first: false,
        }
    }

    pub fn with_handler(handler: impl Fn(&ApiRequest) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            handler: Some(Box::new(handler)),
            requests: Mutex::new(Vec::new()),
            yield_first: false,
        }
    }

    /// Yield to the scheduler before answering so concurrent calls interleave.
    pub fn yielding(mut self) -> Self {
        self.yield_first = true;
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, endpoint: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.endpoint == endpoint)
            .count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn request(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        if self.yield_first {
            tokio::task::yield_now().await;
        }
        self.requests.lock().unwrap().push(Recorded {
            method: request.method.clone(),
            endpoint: request.endpoint.clone(),
            authorization: request.authorization().map(str::to_string),
            body: request.body.clone(),
        });

        let queued = self.replies.lock().unwrap().pop_front();
        match (queued, &self.handler) {
            (Some(reply), _) => reply,
            (None, Some(handler)) => handler(&request),
            (None, None) => panic!("unexpected request to {}", request.endpoint),
        }
    }
}

pub fn ok(body: &str) -> Reply {
    Ok(ApiResponse::new(StatusCode::OK, body))
}

pub fn fail(status: u16, body: &str) -> Reply {
    Err(ApiError::from_status(
        StatusCode::from_u16(status).expect("valid status"),
        body,
    ))
}

/// Session store that records every mutation.
#[derive(Default)]
pub struct RecordingStore {
    state: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    user: Option<User>,
    token: Option<String>,
    expired: bool,
    set_auth_calls: Vec<(User, String)>,
    logout_calls: usize,
}

impl RecordingStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        let store = Self::default();
        {
            let mut state = store.state.lock().unwrap();
            state.user = Some(user("u0"));
            state.token = Some(token.to_string());
        }
        store
    }

    pub fn expired(self) -> Self {
        self.state.lock().unwrap().expired = true;
        self
    }

    pub fn set_auth_calls(&self) -> Vec<(User, String)> {
        self.state.lock().unwrap().set_auth_calls.clone()
    }

    pub fn logout_calls(&self) -> usize {
        self.state.lock().unwrap().logout_calls
    }
}

impl SessionStore for RecordingStore {
    fn token(&self) -> Option<String> {
        self.state.lock().unwrap().token.clone()
    }

    fn is_token_expired(&self) -> bool {
        self.state.lock().unwrap().expired
    }

    fn set_auth(&self, user: User, token: String) {
        let mut state = self.state.lock().unwrap();
        state.set_auth_calls.push((user.clone(), token.clone()));
        state.user = Some(user);
        state.token = Some(token);
        state.expired = false;
    }

    fn logout(&self) {
        let mut state = self.state.lock().unwrap();
        state.logout_calls += 1;
        state.user = None;
        state.token = None;
    }
}

pub fn user(id: &str) -> User {
    User {
        id: id.to_string(),
        email: String::new(),
        created_at: None,
    }
}
