#![allow(clippy::unwrap_used)]

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Method, Request, StatusCode, header},
};
use diaflow::{
    api::{AppState, router},
    config::{AppConfig, database::create_tables},
};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use std::net::{IpAddr, SocketAddr};
use tower::ServiceExt;

async fn app_with(config: AppConfig) -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    create_tables(&db).await.unwrap();
    router(AppState::new(db, config))
}

async fn app() -> Router {
    app_with(AppConfig::default()).await
}

struct Call<'a> {
    method: Method,
    uri: &'a str,
    account: Option<&'a str>,
    peer: Option<&'a str>,
    forwarded_for: Option<&'a str>,
    body: Option<Value>,
}

impl<'a> Call<'a> {
    fn new(method: Method, uri: &'a str) -> Self {
        Self {
            method,
            uri,
            account: None,
            peer: None,
            forwarded_for: None,
            body: None,
        }
    }

    fn as_account(mut self, account: &'a str) -> Self {
        self.account = Some(account);
        self
    }

    /// Address the connection comes from.
    fn from_ip(mut self, ip: &'a str) -> Self {
        self.peer = Some(ip);
        self
    }

    fn forwarded_for(mut self, ip: &'a str) -> Self {
        self.forwarded_for = Some(ip);
        self
    }

    fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    async fn send(self, app: &Router) -> (StatusCode, axum::http::HeaderMap, Value) {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        if let Some(account) = self.account {
            builder = builder.header("X-Account-ID", account);
        }
        if let Some(ip) = self.forwarded_for {
            builder = builder.header("X-Forwarded-For", ip);
        }
        let mut req = match self.body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        if let Some(ip) = self.peer {
            let ip: IpAddr = ip.parse().unwrap();
            req.extensions_mut()
                .insert(ConnectInfo(SocketAddr::new(ip, 40000)));
        }

        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, headers, body)
    }
}

async fn onboard(app: &Router, account: &str) {
    let (status, _, body) = Call::new(Method::POST, "/patients")
        .as_account(account)
        .json(json!({"displayName": account}))
        .send(app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accountId"], account);
}

#[tokio::test]
async fn healthz_reports_database() {
    let app = app().await;
    let (status, _, body) = Call::new(Method::GET, "/healthz").send(&app).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "db_ok": true}));
}

#[tokio::test]
async fn unknown_or_missing_identity_is_401() {
    let app = app().await;

    let (status, headers, _) = Call::new(Method::GET, "/supplies").send(&app).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(headers["X-Error-Code"], "unauthenticated");

    let (status, _, _) = Call::new(Method::GET, "/supplies")
        .as_account("never-onboarded")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn onboarding_is_idempotent() {
    let app = app().await;
    onboard(&app, "acct-1").await;
    onboard(&app, "acct-1").await;

    let (status, _, body) = Call::new(Method::GET, "/patients/me")
        .as_account("acct-1")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["displayName"], "acct-1");
}

#[tokio::test]
async fn movement_below_threshold_opens_one_alert() {
    let app = app().await;
    onboard(&app, "acct-1").await;

    let (status, _, supply) = Call::new(Method::POST, "/supplies")
        .as_account("acct-1")
        .json(json!({
            "name": "Tiras",
            "category": "test_strips",
            "minimumThreshold": 3,
            "openingBalance": 2
        }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(supply["currentBalance"], 2);
    let id = supply["id"].as_i64().unwrap();

    let uri = format!("/supplies/{id}/movements");
    let (status, _, applied) = Call::new(Method::POST, &uri)
        .as_account("acct-1")
        .json(json!({"quantity": -1, "reason": "usage"}))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(applied["newBalance"], 1);
    assert_eq!(applied["movement"]["quantity"], -1);

    let (status, headers, body) = Call::new(Method::POST, &uri)
        .as_account("acct-1")
        .json(json!({"quantity": -5, "reason": "usage"}))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers["X-Error-Code"], "validation_error");
    assert_eq!(body["code"], "validation_error");

    let (_, _, movements) = Call::new(Method::GET, &uri)
        .as_account("acct-1")
        .send(&app)
        .await;
    // Opening balance plus one usage
    assert_eq!(movements.as_array().unwrap().len(), 2);

    let (status, _, alerts) = Call::new(Method::GET, "/alerts?active=yes")
        .as_account("acct-1")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    let alerts = alerts.as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["supplyId"], id);
}

#[tokio::test]
async fn malformed_movement_is_400() {
    let app = app().await;
    onboard(&app, "acct-1").await;
    let (_, _, supply) = Call::new(Method::POST, "/supplies")
        .as_account("acct-1")
        .json(json!({"name": "Agujas", "openingBalance": 5}))
        .send(&app)
        .await;
    let uri = format!("/supplies/{}/movements", supply["id"]);

    let (status, _, body) = Call::new(Method::POST, &uri)
        .as_account("acct-1")
        .json(json!({"quantity": 1, "reason": "eaten"}))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn alerts_are_private_to_their_owner() {
    let app = app().await;
    onboard(&app, "owner").await;
    onboard(&app, "intruder").await;

    Call::new(Method::POST, "/supplies")
        .as_account("owner")
        .json(json!({"name": "Sensor", "minimumThreshold": 1}))
        .send(&app)
        .await;
    let (_, _, alerts) = Call::new(Method::GET, "/alerts")
        .as_account("owner")
        .send(&app)
        .await;
    let uri = format!("/alerts/{}", alerts[0]["id"]);

    let (status, _, _) = Call::new(Method::PATCH, &uri)
        .as_account("intruder")
        .json(json!({"active": false}))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, alert) = Call::new(Method::PATCH, &uri)
        .as_account("owner")
        .json(json!({"active": false}))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(alert["active"], false);
    assert!(!alert["resolvedAt"].is_null());

    let (status, _, _) = Call::new(Method::GET, "/alerts?active=perhaps")
        .as_account("owner")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn kit_checklist_round_trip() {
    let app = app().await;
    onboard(&app, "acct-1").await;

    let (status, _, kit) = Call::new(Method::POST, "/kits")
        .as_account("acct-1")
        .json(json!({"name": "Viaje", "description": "Mochila azul"}))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = kit["id"].as_i64().unwrap();
    let token = kit["publicToken"].as_str().unwrap().to_string();

    let (status, _, elements) = Call::new(Method::POST, &format!("/kits/{id}/elements"))
        .as_account("acct-1")
        .json(json!({"items": [
            {"label": "Tiras", "requiredQuantity": 2},
            {"label": "Agujas", "requiredQuantity": 3, "unit": "u"}
        ]}))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(elements.as_array().unwrap().len(), 2);

    let public_uri = format!("/public/kits/{token}");
    let (status, _, public) = Call::new(Method::GET, &public_uri)
        .from_ip("198.51.100.1")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(public["name"], "Viaje");
    assert_eq!(public["elements"][0]["requiredQuantity"], 2);
    assert!(!public.to_string().contains(&token));

    let (status, _, outcome) = Call::new(Method::POST, &format!("{public_uri}/verify"))
        .from_ip("198.51.100.1")
        .json(json!({"items": [{"label": "Tiras", "quantity": 1}]}))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome, json!({"ok": false, "shortfalls": {"Tiras": 1, "Agujas": 3}}));

    let (status, _, outcome) = Call::new(Method::POST, &format!("/kits/{id}/verify"))
        .as_account("acct-1")
        .json(json!({"items": [
            {"label": "Tiras", "quantity": 1},
            {"label": "Tiras", "quantity": 1},
            {"label": "Agujas", "quantity": "3"}
        ]}))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome, json!({"ok": true, "shortfalls": {}}));

    let (_, _, history) = Call::new(Method::GET, &format!("/kits/{id}/verifications"))
        .as_account("acct-1")
        .send(&app)
        .await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["origin"], "private");
    assert_eq!(history[1]["origin"], "public_qr");

    let (status, _, qr) = Call::new(Method::GET, &format!("/kits/{id}/qr"))
        .as_account("acct-1")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(qr["url"], format!("http://localhost:8000/public/kits/{token}"));
    assert!(qr["svg"].as_str().unwrap().contains("<svg"));
    assert!(qr["data_url"].as_str().unwrap().starts_with("data:image/svg+xml;base64,"));

    let (status, _, rotated) = Call::new(Method::POST, &format!("/kits/{id}/rotate_token"))
        .as_account("acct-1")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    let new_token = rotated["newToken"].as_str().unwrap();
    assert_ne!(new_token, token);

    let (status, _, _) = Call::new(Method::GET, &public_uri)
        .from_ip("198.51.100.1")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = Call::new(Method::GET, &format!("/public/kits/{new_token}"))
        .from_ip("198.51.100.1")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn duplicate_element_labels_are_rejected() {
    let app = app().await;
    onboard(&app, "acct-1").await;
    let (_, _, kit) = Call::new(Method::POST, "/kits")
        .as_account("acct-1")
        .json(json!({"name": "Escuela"}))
        .send(&app)
        .await;

    let (status, _, body) = Call::new(Method::POST, &format!("/kits/{}/elements", kit["id"]))
        .as_account("acct-1")
        .json(json!({"items": [{"label": "Tiras"}, {"label": "Tiras"}]}))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn public_endpoints_are_rate_limited_per_caller() {
    let mut config = AppConfig::default();
    config.rate_limits.public_per_minute = 2;
    let app = app_with(config).await;

    for _ in 0..2 {
        let (status, _, _) = Call::new(Method::GET, "/public/kits/unknown")
            .from_ip("203.0.113.9")
            .send(&app)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    let (status, headers, body) = Call::new(Method::GET, "/public/kits/unknown")
        .from_ip("203.0.113.9")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(headers.contains_key(header::RETRY_AFTER));
    assert_eq!(body["code"], "rate_limited");

    // A different caller has its own window
    let (status, _, _) = Call::new(Method::GET, "/public/kits/unknown")
        .from_ip("203.0.113.10")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn spoofed_forwarded_for_shares_the_peer_quota() {
    let mut config = AppConfig::default();
    config.rate_limits.public_per_minute = 2;
    let app = app_with(config).await;

    for spoofed in ["198.51.100.1", "198.51.100.2"] {
        let (status, _, _) = Call::new(Method::GET, "/public/kits/unknown")
            .from_ip("203.0.113.9")
            .forwarded_for(spoofed)
            .send(&app)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    let (status, _, _) = Call::new(Method::GET, "/public/kits/unknown")
        .from_ip("203.0.113.9")
        .forwarded_for("198.51.100.3")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn trusted_proxy_forwards_client_identity() {
    let mut config = AppConfig::default();
    config.rate_limits.public_per_minute = 1;
    config.rate_limits.trusted_proxies = vec!["10.0.0.1".parse().unwrap()];
    let app = app_with(config).await;

    for client in ["198.51.100.1", "198.51.100.2"] {
        let (status, _, _) = Call::new(Method::GET, "/public/kits/unknown")
            .from_ip("10.0.0.1")
            .forwarded_for(client)
            .send(&app)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    let (status, _, _) = Call::new(Method::GET, "/public/kits/unknown")
        .from_ip("10.0.0.1")
        .forwarded_for("198.51.100.1")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn malformed_path_and_query_are_json_400() {
    let app = app().await;
    onboard(&app, "acct-1").await;

    let (status, headers, body) = Call::new(Method::GET, "/kits/abc")
        .as_account("acct-1")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers["X-Error-Code"], "validation_error");
    assert_eq!(body["code"], "validation_error");
    assert!(body["message"].is_string());

    let (status, headers, body) = Call::new(Method::GET, "/supplies/1.5/movements")
        .as_account("acct-1")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers["X-Error-Code"], "validation_error");
    assert_eq!(body["code"], "validation_error");
}
