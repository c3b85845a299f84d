#![allow(dead_code)]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

use subdesk::auth::jwt::{encode_token, Claims};
use subdesk::config::{Config, DEFAULT_MAIL_FROM};
use subdesk::db::{MemoryRestaurants, RepositoryError, RestaurantRepository};
use subdesk::email::{MailError, Mailer, SentEmail};
use subdesk::models::{NewRestaurant, Restaurant, RestaurantPatch};

pub const JWT_SECRET: &str = "test-jwt-secret-that-is-long-enough";

/// A running test server backed by in-memory storage.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub restaurants: Arc<MemoryRestaurants>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Token for a dashboard administrator.
    pub fn admin_token(&self) -> String {
        token(true)
    }

    /// Token for an authenticated user without admin rights.
    pub fn user_token(&self) -> String {
        token(false)
    }

    /// Insert a restaurant directly into storage.
    pub async fn seed(&self, new: NewRestaurant) -> Restaurant {
        self.restaurants
            .insert(new.into_restaurant(Utc::now()))
            .await
            .expect("seed restaurant failed")
    }

    /// POST the subscription check, return (body, status).
    pub async fn check(&self, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/v1/check-subscription"))
            .json(body)
            .send()
            .await
            .expect("check request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated GET request.
    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated POST request with JSON body.
    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated PUT request with JSON body.
    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("put request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated DELETE request.
    pub async fn delete_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

pub fn token(admin: bool) -> String {
    let claims = Claims::new("tester@example.com", admin, chrono::Duration::minutes(15));
    encode_token(&claims, JWT_SECRET).expect("encode token")
}

pub fn test_config() -> Config {
    Config {
        database_url: None,
        jwt_secret: JWT_SECRET.to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        max_body_size: 65_536,
        trusted_proxies: vec![],
        log_level: "warn".to_string(),
        repository_timeout: Duration::from_secs(5),
        mail_timeout: Duration::from_secs(5),
        notify_concurrency: 2,
        check_rate_limit: 0,
        mail_from: DEFAULT_MAIL_FROM.to_string(),
        mail: None,
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config(), true).await
}

/// Spawn the router on a random port. `with_mailer = false` leaves the app
/// without a mail transport.
pub async fn spawn_app_with(config: Config, with_mailer: bool) -> TestApp {
    let restaurants = Arc::new(MemoryRestaurants::new());
    let mailer = Arc::new(RecordingMailer::default());

    let configured: Option<Arc<dyn Mailer>> = if with_mailer {
        Some(mailer.clone() as Arc<dyn Mailer>)
    } else {
        None
    };
    let (app, _state) = subdesk::build_app(config, restaurants.clone(), configured);

    let addr = serve(app).await;

    TestApp {
        addr,
        client: Client::new(),
        restaurants,
        mailer,
    }
}

/// Spawn the router over an arbitrary repository, returning its address.
pub async fn spawn_with_repository(repository: Arc<dyn RestaurantRepository>) -> (SocketAddr, Client) {
    let mailer: Arc<dyn Mailer> = Arc::new(RecordingMailer::default());
    let (app, _state) = subdesk::build_app(test_config(), repository, Some(mailer));
    (serve(app).await, Client::new())
}

async fn serve(app: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Server failed");
    });

    addr
}

/// A sent message captured by [`RecordingMailer`].
#[derive(Debug, Clone)]
pub struct Delivery {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Mailer that records every message and fails for selected recipients.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Delivery>>,
    pub failing: Mutex<HashSet<String>>,
}

impl RecordingMailer {
    pub fn fail_for(&self, address: &str) {
        self.failing.lock().unwrap().insert(address.to_string());
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<SentEmail, MailError> {
        if self.failing.lock().unwrap().contains(to) {
            return Err(MailError::from(format!("Mailbox unavailable: {to}")));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(Delivery {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(SentEmail {
            id: Some(format!("msg-{}", sent.len())),
        })
    }
}

/// Mailer that never answers.
pub struct StalledMailer;

#[async_trait]
impl Mailer for StalledMailer {
    async fn send(&self, _to: &str, _subject: &str, _html: &str) -> Result<SentEmail, MailError> {
        std::future::pending::<()>().await;
        Ok(SentEmail::default())
    }
}

/// Repository whose every call fails like an unreachable database.
pub struct BrokenRepository;

fn unavailable() -> RepositoryError {
    RepositoryError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl RestaurantRepository for BrokenRepository {
    async fn list(&self) -> Result<Vec<Restaurant>, RepositoryError> {
        Err(unavailable())
    }

    async fn find_by_id(&self, _id: Uuid) -> Result<Option<Restaurant>, RepositoryError> {
        Err(unavailable())
    }

    async fn find_by_project_id(
        &self,
        _project_id: &str,
    ) -> Result<Option<Restaurant>, RepositoryError> {
        Err(unavailable())
    }

    async fn find_expiring(
        &self,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> Result<Vec<Restaurant>, RepositoryError> {
        Err(unavailable())
    }

    async fn insert(&self, _restaurant: Restaurant) -> Result<Restaurant, RepositoryError> {
        Err(unavailable())
    }

    async fn update(
        &self,
        _id: Uuid,
        _patch: RestaurantPatch,
    ) -> Result<Option<Restaurant>, RepositoryError> {
        Err(unavailable())
    }

    async fn delete(&self, _id: Uuid) -> Result<bool, RepositoryError> {
        Err(unavailable())
    }
}

/// Fixture restaurant with trial starting at `trial_start`.
pub fn restaurant(name: &str, trial_start: DateTime<Utc>) -> Restaurant {
    NewRestaurant {
        trial_start: Some(trial_start),
        ..NewRestaurant::named(name)
    }
    .into_restaurant(trial_start)
}
