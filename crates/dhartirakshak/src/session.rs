//! Admin and user sessions.
//!
//! A session is a bearer token plus the user object the login endpoint
//! returned, persisted in a [`SessionStore`] under realm-specific keys:
//!
//! | Realm | Token key | User key |
//! |---|---|---|
//! | [`Realm::Admin`] | `admin_token` | `admin_user` |
//! | [`Realm::User`] | `user_token` | `user_profile` |
//!
//! Controllers never read the store directly. They ask a [`SessionProvider`]
//! for the current token, which [`AuthSession`] implements.

use std::future::Future;
use std::sync::Arc;

use serde_json::{Value, json};
use smol_str::SmolStr;
use tokio::sync::RwLock;

use dhartirakshak_common::error::AuthError;
use dhartirakshak_common::http_client::HttpClient;
use dhartirakshak_common::normalize::AuthPayload;
use dhartirakshak_common::session::SessionStore;
use dhartirakshak_common::{ApiResult, ClientError};

use crate::client::DhartiClient;
use crate::resource::IntoForm;
use crate::resource::drafts::SignupForm;

/// Which side of the site a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Realm {
    /// Admin panel
    Admin,
    /// Public site account
    User,
}

impl Realm {
    /// Store key for the bearer token.
    pub fn token_key(&self) -> &'static str {
        match self {
            Realm::Admin => "admin_token",
            Realm::User => "user_token",
        }
    }

    /// Store key for the user object.
    pub fn user_key(&self) -> &'static str {
        match self {
            Realm::Admin => "admin_user",
            Realm::User => "user_profile",
        }
    }

    fn login_path(&self) -> &'static str {
        match self {
            Realm::Admin => "api/admin/auth/login",
            Realm::User => "api/auth/login",
        }
    }
}

/// Result of a login, signup, profile load or logout.
///
/// Server refusals are reported here rather than as errors, with the
/// server's message when it sent one.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthOutcome {
    /// Whether the action took effect
    pub success: bool,
    /// Token issued, for login and signup
    pub token: Option<SmolStr>,
    /// User object returned
    pub user: Option<Value>,
    /// Message to show
    pub message: String,
}

impl AuthOutcome {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            token: None,
            user: None,
            message: message.into(),
        }
    }
}

/// Source of the bearer token for authenticated calls.
#[cfg_attr(not(target_arch = "wasm32"), trait_variant::make(Send))]
pub trait SessionProvider {
    /// Current token, if signed in.
    fn token(&self) -> impl Future<Output = Option<SmolStr>>;
}

impl<T: SessionProvider + Send + Sync> SessionProvider for Arc<T> {
    async fn token(&self) -> Option<SmolStr> {
        self.as_ref().token().await
    }
}

/// A fixed token, for scripts and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(pub Option<SmolStr>);

impl StaticToken {
    /// Provider that always answers `token`.
    pub fn new(token: impl Into<SmolStr>) -> Self {
        Self(Some(token.into()))
    }
}

impl SessionProvider for StaticToken {
    async fn token(&self) -> Option<SmolStr> {
        self.0.clone()
    }
}

/// Message the server put in an error body, else `fallback`.
fn server_message(err: &ClientError, fallback: &str) -> String {
    match err {
        ClientError::Api(e) => e.message.clone().unwrap_or_else(|| fallback.to_owned()),
        ClientError::Auth(AuthError::Unauthorized(Some(m)))
        | ClientError::Auth(AuthError::Forbidden(Some(m))) => m.to_string(),
        _ => fallback.to_owned(),
    }
}

/// Token lifecycle for one realm.
pub struct AuthSession<S, C> {
    realm: Realm,
    store: Arc<S>,
    client: DhartiClient<C>,
    token: RwLock<Option<SmolStr>>,
    user: RwLock<Option<Value>>,
}

impl<S, C> AuthSession<S, C>
where
    S: SessionStore<SmolStr, Value>,
{
    /// New signed-out session. Call [`restore`](Self::restore) to pick up a
    /// persisted one.
    pub fn new(realm: Realm, store: Arc<S>, client: DhartiClient<C>) -> Self {
        Self {
            realm,
            store,
            client,
            token: RwLock::new(None),
            user: RwLock::new(None),
        }
    }

    /// The session's realm.
    pub fn realm(&self) -> Realm {
        self.realm
    }

    /// Load the persisted token and user. Returns whether a token was found.
    pub async fn restore(&self) -> bool {
        let token = self
            .store
            .get(&SmolStr::new_static(self.realm.token_key()))
            .await
            .and_then(|v| v.as_str().map(SmolStr::new))
            .filter(|t| !t.is_empty());
        let user = self
            .store
            .get(&SmolStr::new_static(self.realm.user_key()))
            .await
            .filter(|u| !u.is_null());
        let found = token.is_some();
        tracing::debug!(realm = ?self.realm, found, "restored session");
        *self.token.write().await = token;
        *self.user.write().await = user;
        found
    }

    /// Current token.
    pub async fn token(&self) -> Option<SmolStr> {
        self.token.read().await.clone()
    }

    /// Current user object.
    pub async fn user(&self) -> Option<Value> {
        self.user.read().await.clone()
    }

    /// True while a token is held.
    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    async fn persist(&self, token: SmolStr, user: Option<Value>) -> ApiResult<()> {
        self.store
            .set(
                SmolStr::new_static(self.realm.token_key()),
                Value::String(token.to_string()),
            )
            .await?;
        self.store
            .set(
                SmolStr::new_static(self.realm.user_key()),
                user.clone().unwrap_or(Value::Null),
            )
            .await?;
        *self.token.write().await = Some(token);
        *self.user.write().await = user;
        Ok(())
    }

    async fn persist_user(&self, user: Value) -> ApiResult<()> {
        self.store
            .set(SmolStr::new_static(self.realm.user_key()), user.clone())
            .await?;
        *self.user.write().await = Some(user);
        Ok(())
    }

    async fn clear(&self) -> ApiResult<()> {
        *self.token.write().await = None;
        *self.user.write().await = None;
        self.store
            .del(&SmolStr::new_static(self.realm.token_key()))
            .await?;
        self.store
            .del(&SmolStr::new_static(self.realm.user_key()))
            .await?;
        Ok(())
    }
}

impl<S, C> AuthSession<S, C>
where
    S: SessionStore<SmolStr, Value>,
    C: HttpClient,
{
    /// Sign in with email and password.
    ///
    /// A response without a token is a failed login. Admin logins that come
    /// back without a user object store `{"email": <email>}` instead.
    #[tracing::instrument(level = "debug", skip(self, password), fields(realm = ?self.realm))]
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<AuthOutcome> {
        let sent = self
            .client
            .call()
            .post_json(
                self.realm.login_path(),
                &json!({ "email": email, "password": password }),
            )
            .await;
        let body = match sent {
            Ok(resp) => resp.json()?,
            Err(err) => {
                tracing::debug!(error = %err, "login refused");
                return Ok(AuthOutcome::failed(server_message(&err, "Login failed")));
            }
        };

        let payload = AuthPayload::from_body(&body);
        let message = payload.message.unwrap_or_else(|| "Logged in".to_owned());
        let Some(token) = payload.token else {
            return Ok(AuthOutcome {
                success: false,
                token: None,
                user: payload.user,
                message,
            });
        };
        let user = match (self.realm, payload.user) {
            (_, Some(user)) => Some(user),
            (Realm::Admin, None) => Some(json!({ "email": email })),
            (Realm::User, None) => None,
        };
        self.persist(token.clone(), user.clone()).await?;
        Ok(AuthOutcome {
            success: true,
            token: Some(token),
            user,
            message,
        })
    }

    /// Create a public account. The session is stored when the response
    /// carries a token.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn signup(&self, form: SignupForm) -> ApiResult<AuthOutcome> {
        if self.realm != Realm::User {
            return Err(ClientError::invalid("Signup is only available to users"));
        }
        let sent = self
            .client
            .call()
            .post_form("api/auth/signup", form.into_form())
            .await;
        let body = match sent {
            Ok(resp) => resp.json()?,
            Err(err) => return Ok(AuthOutcome::failed(server_message(&err, "Signup failed"))),
        };

        let payload = AuthPayload::from_body(&body);
        if let Some(token) = &payload.token {
            self.persist(token.clone(), payload.user.clone()).await?;
        }
        Ok(AuthOutcome {
            success: true,
            token: payload.token,
            user: payload.user,
            message: payload
                .message
                .unwrap_or_else(|| "Signup successful".to_owned()),
        })
    }

    /// Refresh the stored user profile from the server.
    pub async fn load_profile(&self) -> ApiResult<AuthOutcome> {
        if self.realm != Realm::User {
            return Err(ClientError::invalid("Profiles are only available to users"));
        }
        let Some(token) = self.token().await else {
            return Ok(AuthOutcome::failed("Not authenticated"));
        };
        let sent = self
            .client
            .call()
            .auth(token)
            .get("api/auth/profile")
            .await;
        let body = match sent {
            Ok(resp) => resp.json()?,
            Err(err) => {
                return Ok(AuthOutcome::failed(server_message(
                    &err,
                    "Failed to load profile",
                )));
            }
        };

        let payload = AuthPayload::from_body(&body);
        if let Some(user) = &payload.user {
            self.persist_user(user.clone()).await?;
        }
        Ok(AuthOutcome {
            success: true,
            token: None,
            user: payload.user,
            message: payload.message.unwrap_or_else(|| "Profile loaded".to_owned()),
        })
    }

    /// Sign out.
    ///
    /// Admin sessions tell the server first when a token is held. The local
    /// session is cleared whatever the server says.
    #[tracing::instrument(level = "debug", skip(self), fields(realm = ?self.realm))]
    pub async fn logout(&self) -> ApiResult<AuthOutcome> {
        let mut outcome = AuthOutcome {
            success: true,
            token: None,
            user: None,
            message: "Logged out".to_owned(),
        };
        if self.realm == Realm::Admin {
            if let Some(token) = self.token().await {
                let sent = self
                    .client
                    .call()
                    .auth(token)
                    .post_empty("api/admin/auth/logout")
                    .await;
                if let Err(err) = sent {
                    tracing::warn!(error = %err, "server logout failed, clearing local session anyway");
                    outcome = AuthOutcome::failed(server_message(&err, "Logout failed"));
                }
            }
        }
        self.clear().await?;
        Ok(outcome)
    }
}

impl<S, C> SessionProvider for AuthSession<S, C>
where
    S: SessionStore<SmolStr, Value>,
    C: Send + Sync,
{
    async fn token(&self) -> Option<SmolStr> {
        self.token.read().await.clone()
    }
}
