// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Integration tests for the Entra ID Authorization Code + PKCE login
//!
//! The Microsoft identity platform is replaced by a wiremock server and the
//! browser by Rocket's tracked local client, which keeps cookies between
//! requests the way a user agent does.

mod common;

use std::collections::HashMap;
use std::time::Duration;

use common::{enabled_settings, host, set_cookie, set_cookies, unsigned_id_token, TestServer};
use rocket::http::{Header, Status};
use rust_entra_login::auth::cookies::{STATE_COOKIE, VERIFIER_COOKIE};
use rust_entra_login::auth::pkce::code_challenge;
use rust_entra_login::auth::session::JwtSessionIssuer;
use rust_entra_login::auth::users::UserStore;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

const TOKEN_PATH: &str = "/t1/oauth2/v2.0/token";

/// What the browser learned from `GET /auth/entra`.
struct StartedLogin {
    authorize_url: Url,
    state: String,
    verifier: String,
}

async fn start_login(server: &TestServer) -> StartedLogin {
    let response = server.client.get("/auth/entra").header(host()).dispatch().await;
    assert_eq!(response.status(), Status::Found);

    let location = response
        .headers()
        .get_one("Location")
        .expect("redirect location");
    let authorize_url = Url::parse(location).expect("absolute authorize URL");
    let state = response
        .cookies()
        .get(STATE_COOKIE)
        .expect("state cookie")
        .value()
        .to_string();
    let verifier = response
        .cookies()
        .get(VERIFIER_COOKIE)
        .expect("verifier cookie")
        .value()
        .to_string();

    StartedLogin {
        authorize_url,
        state,
        verifier,
    }
}

async fn mock_token_response(server: &TestServer, id_token: String) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 3600,
            "access_token": "access-token",
            "id_token": id_token
        })))
        .mount(&server.provider)
        .await;
}

fn callback_uri(code: &str, state: &str) -> String {
    format!("/auth/entra/callback?code={}&state={}", code, state)
}

#[rocket::async_test]
async fn test_full_login_flow() {
    let server = TestServer::start(enabled_settings()).await;
    mock_token_response(
        &server,
        unsigned_id_token(json!({ "email": "a@b.com", "oid": "oid-1" })),
    )
    .await;

    // Step 1: the redirect to the provider
    let login = start_login(&server).await;
    assert_eq!(
        login.authorize_url.path(),
        "/t1/oauth2/v2.0/authorize",
        "authorize endpoint is tenant scoped"
    );
    let params: HashMap<String, String> =
        login.authorize_url.query_pairs().into_owned().collect();
    assert_eq!(params["client_id"], "c1");
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["response_mode"], "query");
    assert_eq!(params["scope"], "openid profile email");
    assert_eq!(params["code_challenge_method"], "S256");
    assert_eq!(params["state"], login.state);
    assert_eq!(params["code_challenge"], code_challenge(&login.verifier));
    assert_eq!(
        params["redirect_uri"],
        "http://site.example/auth/entra/callback"
    );

    // Step 2: the provider sends the browser back
    let response = server
        .client
        .get(callback_uri("auth-code-1", &login.state))
        .header(host())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Found);
    assert_eq!(response.headers().get_one("Location"), Some("/admin"));

    let cookies = set_cookies(&response);
    for name in [STATE_COOKIE, VERIFIER_COOKIE] {
        let cleared = set_cookie(&cookies, name).expect("transport cookie cleared");
        assert!(cleared.contains("Max-Age=0"), "{} not expired: {}", name, cleared);
    }

    // Step 3: the session cookie belongs to the new user
    let session_cookie = response
        .cookies()
        .get("payload-token")
        .expect("session cookie")
        .clone();
    assert_eq!(session_cookie.http_only(), Some(true));

    let user = server
        .users
        .find_by_email("a@b.com")
        .await
        .unwrap()
        .expect("user created");
    assert_eq!(user.entra_id.as_deref(), Some("oid-1"));

    let issuer = JwtSessionIssuer::from_config(&server.config.session).unwrap();
    let claims = issuer.verify(session_cookie.value()).unwrap();
    assert_eq!(claims.id, user.id.to_string());
    assert_eq!(claims.email, "a@b.com");
    assert_eq!(claims.collection, "users");

    // Step 4: the token request carried the PKCE proof
    let requests = server.provider.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let form: HashMap<String, String> = serde_urlencoded::from_bytes(&requests[0].body).unwrap();
    assert_eq!(form["grant_type"], "authorization_code");
    assert_eq!(form["client_id"], "c1");
    assert_eq!(form["code"], "auth-code-1");
    assert_eq!(form["code_verifier"], login.verifier);
    assert_eq!(form["redirect_uri"], params["redirect_uri"]);
    assert!(!form.contains_key("client_secret"));
}

#[rocket::async_test]
async fn test_transport_cookie_attributes() {
    let server = TestServer::start(enabled_settings()).await;

    let response = server.client.get("/auth/entra").header(host()).dispatch().await;
    let cookies = set_cookies(&response);
    for name in [STATE_COOKIE, VERIFIER_COOKIE] {
        let cookie = set_cookie(&cookies, name).expect("transport cookie set");
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=600"));
        assert!(!cookie.contains("Secure"), "plain HTTP request: {}", cookie);
    }

    let response = server
        .client
        .get("/auth/entra")
        .header(host())
        .header(Header::new("X-Forwarded-Proto", "https"))
        .dispatch()
        .await;
    let cookies = set_cookies(&response);
    for name in [STATE_COOKIE, VERIFIER_COOKIE] {
        let cookie = set_cookie(&cookies, name).expect("transport cookie set");
        assert!(cookie.contains("Secure"), "HTTPS request: {}", cookie);
    }
    let location = Url::parse(response.headers().get_one("Location").unwrap()).unwrap();
    let redirect_uri = location
        .query_pairs()
        .find(|(k, _)| k == "redirect_uri")
        .map(|(_, v)| v.into_owned());
    assert_eq!(
        redirect_uri.as_deref(),
        Some("https://site.example/auth/entra/callback")
    );
}

#[rocket::async_test]
async fn test_configured_redirect_uri_and_secret_are_used() {
    let mut settings = enabled_settings();
    settings.redirect_uri = Some("https://cms.example/auth/entra/callback".to_string());
    settings.client_secret = Some("s3cret".to_string());
    let server = TestServer::start(settings).await;
    mock_token_response(&server, unsigned_id_token(json!({ "upn": "u@b.com" }))).await;

    let login = start_login(&server).await;
    let params: HashMap<String, String> =
        login.authorize_url.query_pairs().into_owned().collect();
    assert_eq!(
        params["redirect_uri"],
        "https://cms.example/auth/entra/callback"
    );

    let response = server
        .client
        .get(callback_uri("code", &login.state))
        .header(host())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Found);

    let requests = server.provider.received_requests().await.unwrap();
    let form: HashMap<String, String> = serde_urlencoded::from_bytes(&requests[0].body).unwrap();
    assert_eq!(form["redirect_uri"], "https://cms.example/auth/entra/callback");
    assert_eq!(form["client_secret"], "s3cret");
    assert!(server.users.find_by_email("u@b.com").await.unwrap().is_some());
}

#[rocket::async_test]
async fn test_state_mismatch_is_rejected() {
    let server = TestServer::start(enabled_settings()).await;
    mock_token_response(&server, unsigned_id_token(json!({ "email": "a@b.com" }))).await;

    let _login = start_login(&server).await;
    let response = server
        .client
        .get(callback_uri("code", "forged-state"))
        .header(host())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    let cookies = set_cookies(&response);
    assert!(set_cookie(&cookies, STATE_COOKIE).unwrap().contains("Max-Age=0"));
    assert!(set_cookie(&cookies, VERIFIER_COOKIE).unwrap().contains("Max-Age=0"));
    assert_eq!(
        response.into_string().await.as_deref(),
        Some("Invalid OAuth state")
    );

    // The provider was never called
    assert!(server.provider.received_requests().await.unwrap().is_empty());
    assert!(server.users.is_empty());
}

#[rocket::async_test]
async fn test_missing_parameters_or_cookies_are_rejected() {
    let server = TestServer::start(enabled_settings()).await;

    // No cookies at all: still answers with expired transport cookies
    let response = server
        .client
        .get(callback_uri("code", "state"))
        .header(host())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    let cookies = set_cookies(&response);
    assert!(set_cookie(&cookies, STATE_COOKIE).is_some());
    assert!(set_cookie(&cookies, VERIFIER_COOKIE).is_some());

    // Cookies present, code missing
    let login = start_login(&server).await;
    let response = server
        .client
        .get(format!("/auth/entra/callback?state={}", login.state))
        .header(host())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    // Cookies present, state missing
    let _login = start_login(&server).await;
    let response = server
        .client
        .get("/auth/entra/callback?code=abc")
        .header(host())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
}

#[rocket::async_test]
async fn test_rejected_exchange_creates_no_user() {
    let server = TestServer::start(enabled_settings()).await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "AADSTS54005: OAuth2 Authorization code was already redeemed"
        })))
        .mount(&server.provider)
        .await;

    let login = start_login(&server).await;
    let response = server
        .client
        .get(callback_uri("code", &login.state))
        .header(host())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
    let body = response.into_string().await.unwrap();
    assert_eq!(body, "Failed to exchange OAuth code");
    assert!(!body.contains("AADSTS"));
    assert!(server.users.is_empty());
}

#[rocket::async_test]
async fn test_token_without_email_sets_no_session() {
    let server = TestServer::start(enabled_settings()).await;
    mock_token_response(&server, unsigned_id_token(json!({ "oid": "oid-1", "name": "No Mail" })))
        .await;

    let login = start_login(&server).await;
    let response = server
        .client
        .get(callback_uri("code", &login.state))
        .header(host())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    let cookies = set_cookies(&response);
    assert!(set_cookie(&cookies, "payload-token").is_none());
    assert_eq!(response.into_string().await.as_deref(), Some("No email found"));
    assert!(server.users.is_empty());
}

#[rocket::async_test]
async fn test_group_policy_is_enforced() {
    let mut settings = enabled_settings();
    settings.allowed_group_id = Some("admins".to_string());
    let server = TestServer::start(settings).await;
    mock_token_response(
        &server,
        unsigned_id_token(json!({ "email": "a@b.com", "groups": ["staff"] })),
    )
    .await;

    let login = start_login(&server).await;
    let response = server
        .client
        .get(callback_uri("code", &login.state))
        .header(host())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);
    let cookies = set_cookies(&response);
    assert!(set_cookie(&cookies, "payload-token").is_none());
    assert!(set_cookie(&cookies, STATE_COOKIE).unwrap().contains("Max-Age=0"));
    assert_eq!(
        response.into_string().await.as_deref(),
        Some("Not allowed to access admin")
    );
    assert!(server.users.is_empty());
}

#[rocket::async_test]
async fn test_group_member_is_allowed() {
    let mut settings = enabled_settings();
    settings.allowed_group_id = Some("admins".to_string());
    let server = TestServer::start(settings).await;
    mock_token_response(
        &server,
        unsigned_id_token(json!({ "email": "a@b.com", "groups": ["staff", "admins"] })),
    )
    .await;

    let login = start_login(&server).await;
    let response = server
        .client
        .get(callback_uri("code", &login.state))
        .header(host())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Found);
    assert_eq!(response.headers().get_one("Location"), Some("/admin"));
}

#[rocket::async_test]
async fn test_default_open_group_policy() {
    let server = TestServer::start(enabled_settings()).await;
    mock_token_response(
        &server,
        unsigned_id_token(json!({ "preferred_username": "someone@tenant.example" })),
    )
    .await;

    let login = start_login(&server).await;
    let response = server
        .client
        .get(callback_uri("code", &login.state))
        .header(host())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Found);
    assert!(response.cookies().get("payload-token").is_some());

    let user = server
        .users
        .find_by_email("someone@tenant.example")
        .await
        .unwrap()
        .expect("user created");
    assert_eq!(user.entra_id, None);
}

#[rocket::async_test]
async fn test_replayed_callback_fails() {
    let server = TestServer::start(enabled_settings()).await;
    mock_token_response(&server, unsigned_id_token(json!({ "email": "a@b.com" }))).await;

    let login = start_login(&server).await;
    let first = server
        .client
        .get(callback_uri("code", &login.state))
        .header(host())
        .dispatch()
        .await;
    assert_eq!(first.status(), Status::Found);

    // The tracked client dropped the expired transport cookies
    let second = server
        .client
        .get(callback_uri("code", &login.state))
        .header(host())
        .dispatch()
        .await;
    assert_eq!(second.status(), Status::BadRequest);
    assert_eq!(server.provider.received_requests().await.unwrap().len(), 1);
}

#[rocket::async_test]
async fn test_existing_user_is_reused() {
    let server = TestServer::start(enabled_settings()).await;
    mock_token_response(&server, unsigned_id_token(json!({ "email": "a@b.com" }))).await;

    for _ in 0..2 {
        let login = start_login(&server).await;
        let response = server
            .client
            .get(callback_uri("code", &login.state))
            .header(host())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Found);
    }
    assert_eq!(server.users.len(), 1);
}

#[rocket::async_test]
async fn test_second_login_overwrites_the_first() {
    let server = TestServer::start(enabled_settings()).await;
    mock_token_response(&server, unsigned_id_token(json!({ "email": "a@b.com" }))).await;

    let first = start_login(&server).await;
    let second = start_login(&server).await;
    assert_ne!(first.state, second.state);
    assert_ne!(first.verifier, second.verifier);

    let response = server
        .client
        .get(callback_uri("code", &first.state))
        .header(host())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    // The rejected attempt also cleared the pending second attempt
    let response = server
        .client
        .get(callback_uri("code", &second.state))
        .header(host())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
}

#[rocket::async_test]
async fn test_callback_when_disabled_meanwhile() {
    let server = TestServer::start(enabled_settings()).await;
    let login = start_login(&server).await;

    server
        .settings
        .replace(Default::default())
        .expect("settings replaced");

    let response = server
        .client
        .get(callback_uri("code", &login.state))
        .header(host())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);
    let cookies = set_cookies(&response);
    assert!(set_cookie(&cookies, STATE_COOKIE).unwrap().contains("Max-Age=0"));
    assert!(server.provider.received_requests().await.unwrap().is_empty());
}

#[rocket::async_test]
async fn test_public_origin_overrides_host() {
    let server = TestServer::start_with(enabled_settings(), |config| {
        config.server.public_origin = Some("https://www.site.example/".to_string());
    })
    .await;

    let login = start_login(&server).await;
    let params: HashMap<String, String> =
        login.authorize_url.query_pairs().into_owned().collect();
    assert_eq!(
        params["redirect_uri"],
        "https://www.site.example/auth/entra/callback"
    );
}

#[rocket::async_test]
async fn test_custom_admin_path() {
    let server = TestServer::start_with(enabled_settings(), |config| {
        config.server.admin_path = "/cms/admin".to_string();
    })
    .await;
    mock_token_response(&server, unsigned_id_token(json!({ "email": "a@b.com" }))).await;

    let login = start_login(&server).await;
    let response = server
        .client
        .get(callback_uri("code", &login.state))
        .header(host())
        .dispatch()
        .await;
    assert_eq!(response.headers().get_one("Location"), Some("/cms/admin"));
}

#[rocket::async_test]
async fn test_requests_without_host() {
    // Disabled: the settings gate answers before the origin matters
    let server = TestServer::start(Default::default()).await;
    let response = server.client.get("/auth/entra").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);

    let response = server.client.get(callback_uri("code", "state")).dispatch().await;
    assert_eq!(response.status(), Status::BadRequest);
    let cookies = set_cookies(&response);
    assert!(set_cookie(&cookies, STATE_COOKIE).unwrap().contains("Max-Age=0"));
    assert!(set_cookie(&cookies, VERIFIER_COOKIE).unwrap().contains("Max-Age=0"));

    // Enabled without a redirect URI: nothing to derive the callback from
    let server = TestServer::start(enabled_settings()).await;
    let response = server.client.get("/auth/entra").dispatch().await;
    assert_eq!(response.status(), Status::BadRequest);
    assert!(set_cookies(&response).is_empty());

    // A configured redirect URI does not need the host
    let mut settings = enabled_settings();
    settings.redirect_uri = Some("https://cms.example/auth/entra/callback".to_string());
    let server = TestServer::start(settings).await;
    let response = server.client.get("/auth/entra").dispatch().await;
    assert_eq!(response.status(), Status::Found);
}

#[rocket::async_test]
async fn test_token_endpoint_timeout_is_not_retried() {
    let server = TestServer::start_with(enabled_settings(), |config| {
        config.identity.http_timeout_secs = 1;
    })
    .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "token_type": "Bearer",
                    "id_token": unsigned_id_token(json!({ "email": "a@b.com" }))
                }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server.provider)
        .await;

    let login = start_login(&server).await;
    let response = server
        .client
        .get(callback_uri("code", &login.state))
        .header(host())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
    assert_eq!(
        response.into_string().await.as_deref(),
        Some("Failed to exchange OAuth code")
    );

    let token_requests = server
        .provider
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == TOKEN_PATH)
        .count();
    assert_eq!(token_requests, 1);
    assert!(server.users.is_empty());
}

#[rocket::async_test]
async fn test_token_response_without_id_token() {
    let server = TestServer::start(enabled_settings()).await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 3600,
            "access_token": "access-token"
        })))
        .mount(&server.provider)
        .await;

    let login = start_login(&server).await;
    let response = server
        .client
        .get(callback_uri("code", &login.state))
        .header(host())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
    let cookies = set_cookies(&response);
    assert!(set_cookie(&cookies, "payload-token").is_none());
    assert_eq!(
        response.into_string().await.as_deref(),
        Some("Failed to exchange OAuth code")
    );
    assert!(server.users.is_empty());
}
