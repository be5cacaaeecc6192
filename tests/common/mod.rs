//! Shared test infrastructure: an in-process ACME-DNS API and an authoritative DNS zone.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::{Arc, Mutex};

use acmedash::Config;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::UdpSocket;
use tower_http::trace::TraceLayer;
use trust_dns_proto::op::{Header, MessageType, OpCode, ResponseCode};
use trust_dns_proto::rr::{Name, RData, Record, RecordType};
use trust_dns_server::authority::MessageResponseBuilder;
use trust_dns_server::client::rr::LowerName;
use trust_dns_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};
use trust_dns_server::ServerFuture;

// --- Constants ---

pub const API_KEY: &str = "test-api-key";
pub const BASE_DOMAIN: &str = "acme.example.com";
pub const CHALLENGE_TXT: &str = "LPsIwTo7o8BoG0-vjCyGQGBWSVIPxI-i_X336eUOQZo";

// --- Configuration ---

/// A dashboard configuration pointing at `api_url`.
pub fn config(api_url: &str, api_key: &str, state_path: Option<&Path>) -> Config {
    let mut conf = json!({
        "api_url": api_url,
        "api_key": api_key,
        "api_timeout": 5,
        "dashboard": { "username": "admin", "password": "hunter2" },
        "dns_check": "remote",
    });
    if let Some(path) = state_path {
        conf["state_path"] = json!(path.to_str().unwrap());
    }
    Config::try_from_json(&conf.to_string()).unwrap()
}

/// A loopback URL with nothing listening behind it.
pub fn unused_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

// --- Fake ACME-DNS API ---

#[derive(Debug, Clone)]
pub struct Account {
    pub subdomain: String,
    pub username: String,
    pub password: String,
    pub fulldomain: String,
    pub allowfrom: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub txt: Option<String>,
}

#[derive(Default)]
struct Backend {
    accounts: Vec<Account>,
    delegations: HashMap<String, String>,
    down: bool,
    next_id: u32,
}

type SharedBackend = Arc<Mutex<Backend>>;

/// An ACME-DNS API served over HTTP on an ephemeral loopback port.
pub struct FakeAcmeDns {
    pub url: String,
    backend: SharedBackend,
}

impl FakeAcmeDns {
    /// Start serving on the current runtime.
    pub fn start() -> Self {
        let backend = SharedBackend::default();
        let router = Router::new()
            .route("/domains", get(domains))
            .route("/register", post(register))
            .route("/update", post(update))
            .route("/health", get(health))
            .route("/dns-check", post(dns_check))
            .layer(TraceLayer::new_for_http())
            .with_state(backend.clone());

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = hyper::Server::from_tcp(listener)
            .unwrap()
            .serve(router.into_make_service());
        tokio::spawn(server);

        Self {
            url: format!("http://{addr}"),
            backend,
        }
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.backend.lock().unwrap().accounts.clone()
    }

    pub fn txt(&self, subdomain: &str) -> Option<String> {
        self.accounts()
            .into_iter()
            .find(|a| a.subdomain == subdomain)
            .and_then(|a| a.txt)
    }

    /// Drop a registration server-side, as an administrator would.
    pub fn forget(&self, fulldomain: &str) {
        self.backend
            .lock()
            .unwrap()
            .accounts
            .retain(|a| a.fulldomain != fulldomain);
    }

    /// Make every endpoint but `/register` and `/update` answer with a server error.
    pub fn set_down(&self, down: bool) {
        self.backend.lock().unwrap().down = down;
    }

    /// Have `/dns-check` report `_acme-challenge.<domain>` as a CNAME for `target`.
    pub fn delegate(&self, domain: &str, target: &str) {
        self.backend
            .lock()
            .unwrap()
            .delegations
            .insert(format!("_acme-challenge.{domain}"), target.to_string());
    }
}

struct ApiError {
    status: StatusCode,
    reason: String,
}

impl ApiError {
    fn new(status: StatusCode, reason: &str) -> Self {
        Self {
            status,
            reason: reason.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.reason }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), "malformed_json_payload")
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[allow(clippy::unused_async)]
async fn domains(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    if header(&headers, "X-Api-Key") != Some(API_KEY) {
        return Err(ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized"));
    }
    let backend = backend.lock().unwrap();
    if backend.down {
        return Err(ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "db_error"));
    }
    if backend.accounts.is_empty() {
        return Ok(Json(Value::Null));
    }
    let domains = backend
        .accounts
        .iter()
        .map(|a| {
            json!({
                "subdomain": a.subdomain,
                "username": a.username,
                "fulldomain": a.fulldomain,
                "allowfrom": a.allowfrom,
                "created_at": a.created_at,
                "updated_at": a.updated_at,
            })
        })
        .collect();
    Ok(Json(Value::Array(domains)))
}

#[derive(Deserialize)]
struct RegisterBody {
    #[serde(default)]
    allowfrom: Option<Vec<String>>,
}

#[allow(clippy::unused_async)]
async fn register(
    State(backend): State<SharedBackend>,
    WithRejection(Json(body), _): WithRejection<Json<RegisterBody>, ApiError>,
) -> (StatusCode, Json<Value>) {
    let mut backend = backend.lock().unwrap();
    backend.next_id += 1;
    let id = backend.next_id;
    let account = Account {
        subdomain: format!("sub{id:04}"),
        username: format!("user{id:04}"),
        password: format!("secret-password-{id:04}"),
        fulldomain: format!("sub{id:04}.{BASE_DOMAIN}"),
        allowfrom: body.allowfrom.unwrap_or_default(),
        created_at: 1_700_000_000 + i64::from(id),
        updated_at: 1_700_000_000 + i64::from(id),
        txt: None,
    };
    let response = json!({
        "subdomain": account.subdomain,
        "username": account.username,
        "password": account.password,
        "fulldomain": account.fulldomain,
        "allowfrom": account.allowfrom,
    });
    backend.accounts.push(account);
    (StatusCode::CREATED, Json(response))
}

#[derive(Deserialize)]
struct UpdateBody {
    subdomain: String,
    txt: String,
}

#[allow(clippy::unused_async)]
async fn update(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    WithRejection(Json(body), _): WithRejection<Json<UpdateBody>, ApiError>,
) -> Result<Json<Value>, ApiError> {
    let forbidden = || ApiError::new(StatusCode::UNAUTHORIZED, "forbidden");
    let user = header(&headers, "X-Api-User").ok_or_else(forbidden)?;
    let key = header(&headers, "X-Api-Key").ok_or_else(forbidden)?;

    let mut backend = backend.lock().unwrap();
    let account = backend
        .accounts
        .iter_mut()
        .find(|a| a.username == user && a.password == key && a.subdomain == body.subdomain)
        .ok_or_else(forbidden)?;
    if body.txt.len() != CHALLENGE_TXT.len() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "bad_txt"));
    }
    account.txt = Some(body.txt.clone());
    account.updated_at += 1;
    Ok(Json(json!({ "txt": body.txt })))
}

#[allow(clippy::unused_async)]
async fn health(State(backend): State<SharedBackend>) -> Response {
    if backend.lock().unwrap().down {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "error", "message": "database unavailable" })),
        )
            .into_response();
    }
    Json(json!({ "status": "online" })).into_response()
}

#[derive(Deserialize)]
struct CheckBody {
    domain: String,
    fulldomain: String,
}

#[allow(clippy::unused_async)]
async fn dns_check(
    State(backend): State<SharedBackend>,
    WithRejection(Json(body), _): WithRejection<Json<CheckBody>, ApiError>,
) -> Json<Value> {
    let challenge = format!("_acme-challenge.{}", body.domain);
    let expected = body.fulldomain;
    let backend = backend.lock().unwrap();
    Json(match backend.delegations.get(&challenge) {
        Some(target) if target.eq_ignore_ascii_case(&expected) => json!({
            "valid": true,
            "has_cname": true,
            "cname_target": target,
            "expected": expected,
            "message": format!("DNS configuration is correct! CNAME points to {target}"),
        }),
        Some(target) => json!({
            "valid": false,
            "has_cname": true,
            "cname_target": target,
            "expected": expected,
            "message": format!("CNAME points to wrong target. Found: {target}, Expected: {expected}"),
        }),
        None => json!({
            "valid": false,
            "has_cname": false,
            "cname_target": "",
            "expected": expected,
            "error": "NXDOMAIN",
            "message": format!("No CNAME record found for {challenge}"),
        }),
    })
}

// --- Fake DNS zone ---

/// Authoritative answers for a handful of names. Anything else is NXDOMAIN.
#[derive(Clone, Default)]
pub struct FakeZone {
    cnames: HashMap<LowerName, Name>,
    hosts: HashMap<LowerName, Ipv4Addr>,
}

fn fqdn(name: &str) -> Name {
    Name::from_ascii(format!("{}.", name.trim_end_matches('.'))).unwrap()
}

impl FakeZone {
    pub fn cname(mut self, name: &str, target: &str) -> Self {
        self.cnames.insert(fqdn(name).into(), fqdn(target));
        self
    }

    pub fn host(mut self, name: &str, addr: Ipv4Addr) -> Self {
        self.hosts.insert(fqdn(name).into(), addr);
        self
    }

    /// Serve the zone over UDP on an ephemeral loopback port.
    pub async fn serve(self) -> SocketAddr {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let mut server = ServerFuture::new(self);
        server.register_socket(socket);
        tokio::spawn(server.block_until_done());
        addr
    }

    fn answers(&self, name: &LowerName, query_type: RecordType) -> Option<Vec<Record>> {
        if let Some(target) = self.cnames.get(name) {
            let mut records = vec![Record::from_rdata(
                name.into(),
                60,
                RData::CNAME(target.clone()),
            )];
            if query_type == RecordType::A {
                if let Some(addr) = self.hosts.get(&LowerName::from(target.clone())) {
                    records.push(Record::from_rdata(target.clone(), 60, RData::A(*addr)));
                }
            }
            return Some(records);
        }
        let addr = self.hosts.get(name)?;
        Some(match query_type {
            RecordType::A => vec![Record::from_rdata(name.into(), 60, RData::A(*addr))],
            _ => Vec::new(),
        })
    }

    async fn respond<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> std::io::Result<ResponseInfo> {
        let builder = MessageResponseBuilder::from_message_request(request);
        if request.op_code() != OpCode::Query || request.message_type() != MessageType::Query {
            return response_handle
                .send_response(builder.error_msg(request.header(), ResponseCode::NotImp))
                .await;
        }

        let query = request.query();
        let mut header = Header::response_from_request(request.header());
        header.set_authoritative(true);
        match self.answers(query.name(), query.query_type()) {
            Some(records) => {
                let response = builder.build(header, records.iter(), &[], &[], &[]);
                response_handle.send_response(response).await
            }
            None => {
                header.set_response_code(ResponseCode::NXDomain);
                response_handle
                    .send_response(builder.build_no_records(header))
                    .await
            }
        }
    }
}

#[async_trait::async_trait]
impl RequestHandler for FakeZone {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        response_handle: R,
    ) -> ResponseInfo {
        match self.respond(request, response_handle).await {
            Ok(info) => info,
            Err(err) => {
                tracing::error!("error answering query: {err:?}");
                let mut header = Header::new();
                header.set_response_code(ResponseCode::ServFail);
                header.into()
            }
        }
    }
}
