//! In-process fake of the Bulwark authentication service
//!
//! Implements just enough server-side session state (acknowledgment, device
//! binding, revocation, renewal) to exercise the client contract end to end.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};

use guard_client::{Guard, GuardConfig};
use guard_core::test_utils::{published_test_key, sample_claims, sign_token, TEST_KEY_ID};
use guard_core::{AccessTokenClaims, PublishedKey};
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Clone)]
struct Session {
    email: String,
    refresh_token: String,
    claims: AccessTokenClaims,
    device_id: Option<String>,
    revoked: bool,
}

#[derive(Debug, Default)]
struct State {
    passwords: HashMap<String, String>,
    magic_codes: HashMap<String, String>,
    social_tokens: HashMap<(String, String), String>,
    sessions: HashMap<String, Session>,
    published_keys: Vec<PublishedKey>,
}

#[derive(Clone, Default)]
pub struct FakeBulwark {
    state: Arc<Mutex<State>>,
}

impl FakeBulwark {
    pub fn new() -> Self {
        let fake = Self::default();
        fake.publish_keys(vec![published_test_key(TEST_KEY_ID)]);
        fake
    }

    pub fn add_account(&self, email: &str, password: &str) {
        self.state
            .lock()
            .unwrap()
            .passwords
            .insert(email.to_string(), password.to_string());
    }

    pub fn add_social_identity(&self, provider: &str, token: &str, email: &str) {
        self.state
            .lock()
            .unwrap()
            .social_tokens
            .insert((provider.to_string(), token.to_string()), email.to_string());
    }

    /// Code mailed out by the last magic-link request for `email`
    pub fn magic_code_for(&self, email: &str) -> Option<String> {
        self.state.lock().unwrap().magic_codes.get(email).cloned()
    }

    pub fn publish_keys(&self, keys: Vec<PublishedKey>) {
        self.state.lock().unwrap().published_keys = keys;
    }

    /// Start a mock server answering every route from this fake
    pub async fn start(&self) -> MockServer {
        init_tracing();
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(self.clone())
            .mount(&server)
            .await;
        server
    }

    fn issue_pair(state: &mut State, email: &str) -> ResponseTemplate {
        let mut claims = sample_claims(email);
        claims.jti = Uuid::new_v4().to_string();
        if email.starts_with("admin") {
            claims.roles.push("Admin".to_string());
        }

        let access_token = sign_token(Some(TEST_KEY_ID), &claims);
        let refresh_token = Uuid::new_v4().to_string();

        state.sessions.insert(
            access_token.clone(),
            Session {
                email: email.to_string(),
                refresh_token: refresh_token.clone(),
                claims,
                device_id: None,
                revoked: false,
            },
        );

        ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": access_token,
            "refreshToken": refresh_token,
        }))
    }

    fn handle(&self, method: &str, path: &str, body: &Value) -> ResponseTemplate {
        let mut state = self.state.lock().unwrap();
        let field = |name: &str| body.get(name).and_then(Value::as_str).unwrap_or_default().to_string();

        match (method, path) {
            ("POST", "/authentication/authenticate") => {
                let email = field("email");
                let password_ok = state
                    .passwords
                    .get(&email)
                    .is_some_and(|password| *password == field("password"));
                if password_ok {
                    Self::issue_pair(&mut state, &email)
                } else {
                    rejected(400, "Invalid credentials")
                }
            }
            ("POST", "/passwordless/magic/authenticate") => {
                let email = field("email");
                match state.magic_codes.remove(&email) {
                    Some(code) if code == field("code") => Self::issue_pair(&mut state, &email),
                    _ => rejected(400, "Invalid magic code"),
                }
            }
            ("POST", "/passwordless/social/authenticate") => {
                let key = (field("provider"), field("socialToken"));
                match state.social_tokens.get(&key).cloned() {
                    Some(email) => Self::issue_pair(&mut state, &email),
                    None => rejected(400, "Social token rejected"),
                }
            }
            ("POST", "/authentication/acknowledge") => {
                let access_token = field("accessToken");
                let Some(session) = state.sessions.get_mut(&access_token) else {
                    return rejected(400, "Unknown token");
                };
                if session.email != field("email") || session.refresh_token != field("refreshToken") {
                    return rejected(400, "Token pair does not match account");
                }
                session.device_id = Some(field("deviceId"));
                ResponseTemplate::new(200)
            }
            ("POST", "/authentication/accesstoken/validate") => {
                let Some(session) = state.sessions.get(&field("token")) else {
                    return rejected(400, "Unknown token");
                };
                if session.revoked {
                    return rejected(400, "Token has been revoked");
                }
                match &session.device_id {
                    None => rejected(400, "Token has not been acknowledged"),
                    Some(device) if *device != field("deviceId") => {
                        rejected(400, "Token was acknowledged on another device")
                    }
                    Some(_) if session.email != field("email") => rejected(400, "Account mismatch"),
                    Some(_) => ResponseTemplate::new(200).set_body_json(&session.claims),
                }
            }
            ("POST", "/authentication/renew") => {
                let refresh_token = field("token");
                let device_id = field("deviceId");
                let Some(session) = state
                    .sessions
                    .values_mut()
                    .find(|s| s.refresh_token == refresh_token && !s.revoked)
                else {
                    return rejected(400, "Refresh token is not valid");
                };
                if session.device_id.as_deref() != Some(device_id.as_str()) {
                    return rejected(400, "Refresh token is not valid for this device");
                }
                session.revoked = true;
                let email = session.email.clone();
                Self::issue_pair(&mut state, &email)
            }
            ("POST", "/authentication/revoke") => {
                let Some(session) = state.sessions.get_mut(&field("token")) else {
                    return rejected(400, "Unknown token");
                };
                if session.device_id.as_deref() != Some(field("deviceId").as_str()) {
                    return rejected(400, "Token was acknowledged on another device");
                }
                session.revoked = true;
                ResponseTemplate::new(200)
            }
            ("GET", "/keys") => ResponseTemplate::new(200).set_body_json(&state.published_keys),
            ("GET", p) if p.starts_with("/passwordless/magic/request/") => {
                let encoded = &p["/passwordless/magic/request/".len()..];
                let email = urlencoding::decode(encoded)
                    .map(|e| e.into_owned())
                    .unwrap_or_default();
                if !state.passwords.contains_key(&email) {
                    return rejected(404, "Account not found");
                }
                state.magic_codes.insert(email, "424242".to_string());
                ResponseTemplate::new(200)
            }
            _ => ResponseTemplate::new(404),
        }
    }
}

impl Respond for FakeBulwark {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        self.handle(request.method.as_str(), request.url.path(), &body)
    }
}

fn rejected(status: u16, detail: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "title": "Bad Request",
        "detail": detail,
        "type": "https://tools.ietf.org/html/rfc7231#section-6.5.1",
        "statusCode": status,
    }))
}

/// Guard pointed at `server` with short timeouts
pub fn guard_for(server: &MockServer) -> Guard {
    let config = GuardConfig {
        request_timeout_secs: 5,
        connect_timeout_secs: 2,
        ..GuardConfig::new(server.uri())
    };
    Guard::new(config).expect("valid test config")
}
