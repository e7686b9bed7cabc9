// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared integration test harness.
//!
//! Every external service the API talks to is replaced by one in-process
//! axum server bound to a random local port:
//! - `/auth/v1/*`: email/password accounts with opaque tokens
//! - `/rest/v1/{table}`: JSON rows with `eq.`/`ilike.`/`gte.` filters,
//!   `order`, `offset`/`limit` and `Prefer: count=exact`
//! - `/gemini/*` and `/deepseek/*`: canned text with failure switches
//! - `/search/html/`: a fixed results page

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use market_analyst::config::Config;
use market_analyst::routes::create_router;
use market_analyst::AppState;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

pub const GEMINI_TEXT: &str = "Análise gerada pelo Gemini";
pub const DEEPSEEK_TEXT: &str = "Análise gerada pelo DeepSeek";
pub const TEST_PASSWORD: &str = "Test123!@#";

const SEARCH_PAGE: &str = r#"
<html><body>
  <div class="result">
    <h2 class="result__title"><a>Mercado em expansão</a></h2>
    <a class="result__url" href="https://example.com/1">example.com</a>
    <a class="result__snippet">O setor cresceu 12% no último ano.</a>
  </div>
  <div class="result">
    <h2 class="result__title"><a>Principais concorrentes</a></h2>
    <a class="result__snippet">Três empresas dominam o mercado.</a>
  </div>
</body></html>
"#;

#[derive(Debug, Clone)]
struct Account {
    id: Uuid,
    email: String,
    password: String,
}

/// State of the fake backend. Tests flip the switches and read the counters.
#[derive(Default)]
pub struct FakeBackend {
    accounts: Mutex<Vec<Account>>,
    access_tokens: Mutex<HashMap<String, Uuid>>,
    refresh_tokens: Mutex<HashMap<String, Uuid>>,
    tables: Mutex<HashMap<String, Vec<Value>>>,
    pub deleted_auth_users: Mutex<Vec<Uuid>>,
    pub search_queries: Mutex<Vec<String>>,

    pub gemini_fails: AtomicBool,
    pub deepseek_fails: AtomicBool,
    pub search_fails: AtomicBool,
    pub storage_insert_fails: AtomicBool,

    pub gemini_calls: AtomicUsize,
    pub deepseek_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
}

impl FakeBackend {
    /// Create an auth account plus profile row and return a live access token.
    pub fn seed_user(&self, email: &str, nome: &str) -> (Uuid, String) {
        let id = Uuid::new_v4();
        self.accounts.lock().unwrap().push(Account {
            id,
            email: email.to_string(),
            password: TEST_PASSWORD.to_string(),
        });
        self.rows_mut("users", |rows| {
            rows.push(json!({
                "id": id,
                "email": email,
                "nome": nome,
                "empresa": null,
                "created_at": Utc::now(),
                "updated_at": null,
            }))
        });
        (id, self.issue_access_token(id))
    }

    /// Store an analysis row directly.
    pub fn seed_analysis(&self, user_id: Uuid, segmento: &str, created_at: DateTime<Utc>) -> Uuid {
        let id = Uuid::new_v4();
        self.rows_mut("analyses", |rows| {
            rows.push(json!({
                "id": id,
                "user_id": user_id,
                "segmento": segmento,
                "contexto_adicional": null,
                "resultado": format!("Resultado para {}", segmento),
                "metadata": { "segmento": segmento, "webResultsCount": 0 },
                "created_at": created_at,
                "updated_at": null,
            }))
        });
        id
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn has_account(&self, email: &str) -> bool {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .any(|a| a.email == email)
    }

    fn rows_mut<R>(&self, table: &str, f: impl FnOnce(&mut Vec<Value>) -> R) -> R {
        let mut tables = self.tables.lock().unwrap();
        f(tables.entry(table.to_string()).or_default())
    }

    fn issue_access_token(&self, user_id: Uuid) -> String {
        let token = format!("access-{}", Uuid::new_v4());
        self.access_tokens
            .lock()
            .unwrap()
            .insert(token.clone(), user_id);
        token
    }

    fn issue_session(&self, account: &Account) -> Value {
        let access_token = self.issue_access_token(account.id);
        let refresh_token = format!("refresh-{}", Uuid::new_v4());
        self.refresh_tokens
            .lock()
            .unwrap()
            .insert(refresh_token.clone(), account.id);
        json!({
            "access_token": access_token,
            "refresh_token": refresh_token,
            "expires_in": 3600,
            "token_type": "bearer",
            "user": { "id": account.id, "email": account.email },
        })
    }

    fn account_by_id(&self, id: Uuid) -> Option<Account> {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id)
            .cloned()
    }
}

pub type Fake = Arc<FakeBackend>;

// ─── Auth ────────────────────────────────────────────────────

async fn signup(State(fake): State<Fake>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    if fake.has_account(&email) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "msg": "User already registered" })),
        )
            .into_response();
    }

    let account = Account {
        id: Uuid::new_v4(),
        email: email.clone(),
        password: body["password"].as_str().unwrap_or_default().to_string(),
    };
    fake.accounts.lock().unwrap().push(account.clone());
    Json(json!({ "id": account.id, "email": email })).into_response()
}

async fn token(
    State(fake): State<Fake>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let account = match params.get("grant_type").map(String::as_str) {
        Some("password") => {
            let email = body["email"].as_str().unwrap_or_default();
            let password = body["password"].as_str().unwrap_or_default();
            fake.accounts
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.email == email && a.password == password)
                .cloned()
        }
        Some("refresh_token") => {
            let refresh = body["refresh_token"].as_str().unwrap_or_default();
            let user_id = fake.refresh_tokens.lock().unwrap().remove(refresh);
            user_id.and_then(|id| fake.account_by_id(id))
        }
        _ => None,
    };

    match account {
        Some(account) => Json(fake.issue_session(&account)).into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials",
            })),
        )
            .into_response(),
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

async fn auth_user(State(fake): State<Fake>, headers: HeaderMap) -> Response {
    let user_id = bearer(&headers).and_then(|t| fake.access_tokens.lock().unwrap().get(&t).copied());
    match user_id.and_then(|id| fake.account_by_id(id)) {
        Some(account) => Json(json!({ "id": account.id, "email": account.email })).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "msg": "invalid JWT" })),
        )
            .into_response(),
    }
}

async fn logout(State(fake): State<Fake>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = bearer(&headers) {
        fake.access_tokens.lock().unwrap().remove(&token);
    }
    StatusCode::NO_CONTENT
}

async fn admin_delete(State(fake): State<Fake>, Path(id): Path<Uuid>) -> Json<Value> {
    fake.accounts.lock().unwrap().retain(|a| a.id != id);
    fake.deleted_auth_users.lock().unwrap().push(id);
    Json(json!({}))
}

// ─── REST tables ─────────────────────────────────────────────

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value.as_str()?.parse().ok()
}

fn field_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Whether `row` passes one PostgREST-style filter.
fn matches_filter(row: &Value, column: &str, filter: &str) -> bool {
    let field = &row[column];
    if let Some(expected) = filter.strip_prefix("eq.") {
        field_as_string(field) == expected
    } else if let Some(pattern) = filter.strip_prefix("ilike.") {
        let needle = pattern.trim_matches('*').to_lowercase();
        field_as_string(field).to_lowercase().contains(&needle)
    } else if let Some(bound) = filter.strip_prefix("gte.") {
        match (timestamp(field), bound.parse::<DateTime<Utc>>()) {
            (Some(value), Ok(bound)) => value >= bound,
            _ => false,
        }
    } else {
        false
    }
}

const RESERVED_PARAMS: [&str; 4] = ["select", "order", "offset", "limit"];

fn filtered(rows: &[Value], params: &[(String, String)]) -> Vec<Value> {
    rows.iter()
        .filter(|row| {
            params
                .iter()
                .filter(|(k, _)| !RESERVED_PARAMS.contains(&k.as_str()))
                .all(|(k, v)| matches_filter(row, k, v))
        })
        .cloned()
        .collect()
}

fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn prefers(headers: &HeaderMap, value: &str) -> bool {
    headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(value))
}

fn storage_error(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": message })),
    )
        .into_response()
}

async fn rest_table(
    State(fake): State<Fake>,
    Path(table): Path<String>,
    method: Method,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
    body: axum::body::Bytes,
) -> Response {
    match method {
        Method::GET | Method::HEAD => {
            let mut rows = filtered(&fake.rows(&table), &params);
            if param(&params, "order") == Some("created_at.desc") {
                rows.sort_by_key(|r| std::cmp::Reverse(timestamp(&r["created_at"])));
            }

            let total = rows.len();
            let offset: usize = param(&params, "offset").and_then(|v| v.parse().ok()).unwrap_or(0);
            let limit: usize = param(&params, "limit")
                .and_then(|v| v.parse().ok())
                .unwrap_or(usize::MAX);
            let page: Vec<Value> = rows.into_iter().skip(offset).take(limit).collect();

            let mut response = Json(&page).into_response();
            if prefers(&headers, "count=exact") {
                let range = if page.is_empty() {
                    format!("*/{}", total)
                } else {
                    format!("{}-{}/{}", offset, offset + page.len() - 1, total)
                };
                response
                    .headers_mut()
                    .insert(header::CONTENT_RANGE, range.parse().unwrap());
            }
            response
        }
        Method::POST => {
            if fake.storage_insert_fails.load(Ordering::SeqCst) {
                return storage_error("insert failed");
            }
            let Ok(mut row) = serde_json::from_slice::<Value>(&body) else {
                return storage_error("invalid body");
            };
            if row.get("id").is_none() {
                row["id"] = json!(Uuid::new_v4());
            }
            if row.get("updated_at").is_none() {
                row["updated_at"] = Value::Null;
            }
            fake.rows_mut(&table, |rows| rows.push(row.clone()));
            (StatusCode::CREATED, Json(json!([row]))).into_response()
        }
        Method::PATCH => {
            let Ok(Value::Object(changes)) = serde_json::from_slice::<Value>(&body) else {
                return storage_error("invalid body");
            };
            let updated = fake.rows_mut(&table, |rows| {
                let mut updated = Vec::new();
                for row in rows.iter_mut() {
                    if filtered(std::slice::from_ref(row), &params).is_empty() {
                        continue;
                    }
                    for (k, v) in &changes {
                        row[k] = v.clone();
                    }
                    updated.push(row.clone());
                }
                updated
            });
            Json(updated).into_response()
        }
        Method::DELETE => {
            let removed = fake.rows_mut(&table, |rows| {
                let removed = filtered(rows, &params);
                rows.retain(|row| filtered(std::slice::from_ref(row), &params).is_empty());
                removed
            });
            Json(removed).into_response()
        }
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

// ─── AI providers & search ───────────────────────────────────

async fn gemini(State(fake): State<Fake>, uri: Uri, headers: HeaderMap) -> Response {
    fake.gemini_calls.fetch_add(1, Ordering::SeqCst);
    let keyed = headers
        .get("x-goog-api-key")
        .is_some_and(|v| v == "test_gemini_key");
    if !keyed || uri.query().is_some_and(|q| q.contains("key=")) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": { "message": "API key must be sent in x-goog-api-key" } })),
        )
            .into_response();
    }
    if fake.gemini_fails.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": { "message": "Gemini is unavailable" } })),
        )
            .into_response();
    }
    Json(json!({
        "candidates": [{ "content": { "parts": [{ "text": GEMINI_TEXT }] } }]
    }))
    .into_response()
}

async fn deepseek(State(fake): State<Fake>) -> Response {
    fake.deepseek_calls.fetch_add(1, Ordering::SeqCst);
    if fake.deepseek_fails.load(Ordering::SeqCst) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": { "message": "DeepSeek is unavailable" } })),
        )
            .into_response();
    }
    Json(json!({
        "choices": [{ "message": { "role": "assistant", "content": DEEPSEEK_TEXT } }]
    }))
    .into_response()
}

async fn search(
    State(fake): State<Fake>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    fake.search_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(q) = params.get("q") {
        fake.search_queries.lock().unwrap().push(q.clone());
    }
    if fake.search_fails.load(Ordering::SeqCst) {
        return StatusCode::FORBIDDEN.into_response();
    }
    ([(header::CONTENT_TYPE, "text/html")], SEARCH_PAGE).into_response()
}

/// Start the fake backend and return its base URL.
pub async fn start_fake_backend() -> (String, Fake) {
    let fake = Arc::new(FakeBackend::default());

    let app = Router::new()
        .route("/auth/v1/signup", post(signup))
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/user", get(auth_user))
        .route("/auth/v1/logout", post(logout))
        .route("/auth/v1/admin/users/{id}", delete(admin_delete))
        .route("/rest/v1/{table}", any(rest_table))
        .route("/gemini/v1beta/models/{*model}", post(gemini))
        .route("/deepseek/chat/completions", post(deepseek))
        .route("/search/html/", get(search))
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake backend");
    let addr = listener.local_addr().expect("fake backend address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    (format!("http://{}", addr), fake)
}

// ─── App under test ──────────────────────────────────────────

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub fake: Fake,
}

impl TestApp {
    /// Send a request and return status, headers and parsed JSON body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, headers, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, HeaderMap, Value) {
        self.send(request(Method::GET, uri, token, None)).await
    }

    pub async fn post(
        &self,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, HeaderMap, Value) {
        self.send(request(Method::POST, uri, token, Some(body))).await
    }
}

/// Build a request with an optional bearer token and JSON body.
pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Create a test app wired to a fresh fake backend.
pub async fn create_test_app() -> TestApp {
    create_test_app_with(|_| {}).await
}

/// Like `create_test_app`, with a chance to adjust the config first.
pub async fn create_test_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let (base_url, fake) = start_fake_backend().await;
    let mut config = Config::test_default(&base_url);
    configure(&mut config);

    let state = Arc::new(AppState::from_config(config).expect("build app state"));
    TestApp {
        router: create_router(state.clone()),
        state,
        fake,
    }
}
