// Copyright 2023 Remi Bernotavicius

use crate::store::SessionStore;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

pub mod models;
#[cfg(test)]
pub mod test_server;

/// How long the "session expired" notice stays up before the sign-in page replaces the
/// current page.
pub const SIGN_IN_REDIRECT_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Error)]
pub enum Error {
    #[error("couldn't reach the server: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{message}")]
    Backend { status: u16, message: String },
    #[error("your session has expired, please sign in again")]
    Unauthorized,
    #[error("unexpected response from the server: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl Error {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Backend { status, .. } => Some(*status),
            Self::Unauthorized => Some(StatusCode::UNAUTHORIZED.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Deserialize, Debug)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub total_pages: usize,
}

/// Response to a mutation, the payload is not used by any caller.
#[derive(Deserialize, Debug, Default)]
pub struct Acknowledgement {
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: serde_json::Value,
}

/// The only way out to the backend. Carries the cookie jar for the session and owns the
/// session store so that a 401 from any request clears it in one place.
pub struct Connection {
    client: Client,
    base_url: String,
    session: SessionStore,
    session_expired: bool,
    sign_in_redirect: Option<Instant>,
}

impl Connection {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            session: SessionStore::default(),
            session_expired: false,
            sign_in_redirect: None,
        })
    }

    /// Full URL for `path`, used for navigations that bypass the connection such as the
    /// spreadsheet export.
    pub fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let params = query.iter().map(|(key, value)| (*key, value.as_str()));
        Url::parse_with_params(&format!("{}{path}", self.base_url), params)
            .map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionStore {
        &mut self.session
    }

    /// True once after a request was rejected with 401.
    pub fn take_session_expired(&mut self) -> bool {
        std::mem::take(&mut self.session_expired)
    }

    /// True once the post-401 delay has elapsed and the sign-in page should be shown.
    pub fn sign_in_redirect_due(&mut self, now: Instant) -> bool {
        match self.sign_in_redirect {
            Some(at) if now >= at => {
                self.sign_in_redirect = None;
                true
            }
            _ => false,
        }
    }

    pub fn sign_in_redirect_pending(&self) -> bool {
        self.sign_in_redirect.is_some()
    }

    /// Drops a pending redirect and notice once a new session exists.
    pub fn session_restored(&mut self) {
        self.session_expired = false;
        self.sign_in_redirect = None;
    }

    pub fn get<T: DeserializeOwned>(
        &mut self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Envelope<T>> {
        let request = self.request(Method::GET, path).query(query);
        self.send(request)
    }

    pub fn get_paginated<T: DeserializeOwned>(
        &mut self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Paginated<T>> {
        let request = self.request(Method::GET, path).query(query);
        self.send(request)
    }

    pub fn post<B: Serialize + ?Sized>(&mut self, path: &str, body: &B) -> Result<Acknowledgement> {
        let request = self.request(Method::POST, path).json(body);
        self.send(request)
    }

    /// Posts credentials. A 401 here is a rejected sign-in rather than an expired session, so
    /// it comes back as a `Backend` error carrying the server's message.
    pub fn post_credentials<T: DeserializeOwned, B: Serialize + ?Sized>(
        &mut self,
        path: &str,
        body: &B,
    ) -> Result<Envelope<T>> {
        let request = self.request(Method::POST, path).json(body);
        self.exchange(request)
    }

    pub fn patch<B: Serialize + ?Sized>(&mut self, path: &str, body: &B) -> Result<Acknowledgement> {
        let request = self.request(Method::PATCH, path).json(body);
        self.send(request)
    }

    pub fn delete(&mut self, path: &str) -> Result<Acknowledgement> {
        let request = self.request(Method::DELETE, path);
        self.send(request)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        log::debug!("{method} {path}");
        self.client.request(method, format!("{}{path}", self.base_url))
    }

    fn send<R: DeserializeOwned>(&mut self, request: RequestBuilder) -> Result<R> {
        match self.exchange(request) {
            Err(Error::Backend { status: 401, .. }) => {
                self.unauthorized();
                Err(Error::Unauthorized)
            }
            result => result,
        }
    }

    fn exchange<R: DeserializeOwned>(&self, request: RequestBuilder) -> Result<R> {
        let response = request.send()?;
        let status = response.status();
        let url = response.url().path().to_owned();
        let body = response.text()?;

        if !status.is_success() {
            let message = backend_message(status, &body);
            log::warn!("{url} failed with {status}: {message}");
            return Err(Error::Backend {
                status: status.as_u16(),
                message,
            });
        }

        let body = if body.trim().is_empty() { "{}" } else { &body };
        Ok(serde_json::from_str(body)?)
    }

    fn unauthorized(&mut self) {
        log::warn!("session rejected, signing out");
        self.session.clear();
        self.session_expired = true;
        if self.sign_in_redirect.is_none() {
            self.sign_in_redirect = Some(Instant::now() + SIGN_IN_REDIRECT_DELAY);
        }
    }
}

fn backend_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error: serde_json::Value::String(message),
        }) => message,
        Ok(ErrorBody { error }) if !error.is_null() => error.to_string(),
        _ => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_owned(),
    }
}

#[cfg(test)]
use test_server::{Reply, TestServer};

#[test]
fn get_unwraps_envelope_and_forwards_query() {
    let server = TestServer::start(|_| {
        Reply::json(200, r#"{"data": [{"id": 2, "code": "VIP", "name": "Paviliun"}], "message": "ok"}"#)
    });
    let mut conn = Connection::new(&server.base_url()).unwrap();

    let rooms: Envelope<Vec<models::RoomType>> =
        conn.get("/room-type", &[("active", "1".into())]).unwrap();
    assert_eq!(rooms.data[0].code, "VIP");
    assert_eq!(rooms.message, "ok");

    let requests = server.requests();
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].url, "/room-type?active=1");
}

#[test]
fn backend_error_field_becomes_message() {
    let server = TestServer::start(|_| Reply::json(409, r#"{"error": "code already exists"}"#));
    let mut conn = Connection::new(&server.base_url()).unwrap();

    let error = conn
        .post("/diet", &serde_json::json!({"code": "DM", "name": "x"}))
        .unwrap_err();
    assert_eq!(error.to_string(), "code already exists");
    assert_eq!(error.status(), Some(409));
    assert!(!conn.take_session_expired());
}

#[test]
fn unauthorized_clears_session_and_schedules_sign_in() {
    let server = TestServer::start(|_| Reply::json(401, r#"{"error": "unauthorized"}"#));
    let mut conn = Connection::new(&server.base_url()).unwrap();
    conn.session_mut().set(models::UserSession {
        user_id: models::UserId(5),
        username: "perawat1".into(),
        name: "Rina".into(),
        role: models::UserRole::Nurse,
    });

    let error = conn.get::<Vec<models::Diet>>("/diet", &[]).unwrap_err();
    assert!(matches!(error, Error::Unauthorized));
    assert!(!conn.session().is_authenticated());

    assert!(conn.take_session_expired());
    assert!(!conn.take_session_expired());

    assert!(!conn.sign_in_redirect_due(Instant::now()));
    assert!(conn.sign_in_redirect_pending());
    assert!(conn.sign_in_redirect_due(Instant::now() + SIGN_IN_REDIRECT_DELAY));
    assert!(!conn.sign_in_redirect_pending());
}

#[test]
fn empty_mutation_response_is_accepted() {
    let server = TestServer::start(|_| Reply::json(204, ""));
    let mut conn = Connection::new(&server.base_url()).unwrap();
    conn.delete("/diet/4").unwrap();
    assert_eq!(server.requests()[0].method, "DELETE");
}

#[test]
fn export_url_includes_query() {
    let conn = Connection::new("http://localhost:8080/api/v1/").unwrap();
    assert_eq!(
        conn.url("/daily-patient-meal/export", &[("date", "2025-03-01".into())])
            .unwrap()
            .as_str(),
        "http://localhost:8080/api/v1/daily-patient-meal/export?date=2025-03-01"
    );
    assert_eq!(
        conn.url("/patient", &[("keyword", "siti & budi".into())])
            .unwrap()
            .query(),
        Some("keyword=siti+%26+budi")
    );
}

#[test]
fn rejected_credentials_keep_the_server_message() {
    let server = TestServer::start(|_| Reply::json(401, r#"{"error": "wrong password"}"#));
    let mut conn = Connection::new(&server.base_url()).unwrap();

    let error = conn
        .post_credentials::<models::UserSession, _>(
            "/auth/sign-in",
            &serde_json::json!({"username": "admin", "password": "nope"}),
        )
        .unwrap_err();
    assert_eq!(error.to_string(), "wrong password");
    assert_eq!(error.status(), Some(401));
    assert!(!conn.take_session_expired());
    assert!(!conn.sign_in_redirect_pending());
}
