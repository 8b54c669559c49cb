//! Authentication: bearer-token verification and account creation against the auth gateway.
//!
//! The gateway is a Supabase (GoTrue) project. Access tokens are HS256 JWTs signed with the
//! project's JWT secret; when that secret is configured tokens are verified locally, otherwise
//! each one is checked with `GET /auth/v1/user`.

use std::fmt;

use axum::extract::{FromRef, FromRequestParts};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use futures::future::{BoxFuture, FutureExt};
use hmac::Hmac;
use http::request::Parts;
use jwt::VerifyWithKey;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_with::serde_as;
use sha2::Sha256;
use url::Url;
use web_time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::Config;
use crate::error::ApiError;
use crate::local_future;
use crate::model::UserId;

/// Boxed [`AuthGateway`], as kept in the app state.
pub type DynAuth = Box<dyn AuthGateway>;

/// Issues and validates bearer tokens.
pub trait AuthGateway: Send + Sync {
    /// Creates a confirmed email/password account.
    fn sign_up<'a>(&'a self, account: NewAccount) -> BoxFuture<'a, Result<AuthUser, AuthError>>;

    /// Resolves an access token to its user.
    fn get_user<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<AuthUser, AuthError>>;
}

/// Account as returned by the gateway. Unknown fields are ignored.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AuthUser {
    /// Stable account ID; all stored data is scoped by it.
    pub id: UserId,
    /// Login email.
    #[serde(default)]
    pub email: Option<String>,
    /// Profile data.
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// `user_metadata` of an account.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UserMetadata {
    /// Display name chosen at signup.
    #[serde(default)]
    pub username: Option<String>,
}

/// `POST /signup` body. Every field is optional on the wire so missing ones can be reported.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct SignupRequest {
    /// Display name. Defaults to the local part of [`Self::email`].
    #[serde(default)]
    pub username: Option<String>,
    /// Login email.
    #[serde(default)]
    pub email: Option<String>,
    /// Password.
    #[serde(default)]
    pub password: Option<String>,
}

/// `POST /signup` response.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct SignupResponse {
    /// The created account.
    pub user: AuthUser,
}

/// Validated [`SignupRequest`].
#[derive(Debug)]
pub struct NewAccount {
    /// Display name.
    pub username: String,
    /// Login email.
    pub email: String,
    /// Password.
    pub password: SecretString,
}
impl NewAccount {
    /// `None` if the email or password is missing.
    pub fn from_request(request: SignupRequest) -> Option<Self> {
        let email = request.email.filter(|email| !email.trim().is_empty())?;
        let password = request.password.filter(|password| !password.is_empty())?;
        let username = request
            .username
            .filter(|username| !username.trim().is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_owned());
        Some(Self {
            username,
            email,
            password: password.into(),
        })
    }
}

/// Auth gateway failure.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    /// Token is malformed, expired, or unknown.
    InvalidToken(String),
    /// Gateway refused the request (4xx). Contains its message.
    Rejected(String),
    /// Gateway unreachable, misbehaving, or misconfigured.
    Gateway(String),
}
impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidToken(msg) => write!(f, "invalid token: {}", msg),
            AuthError::Rejected(msg) => write!(f, "rejected by auth gateway: {}", msg),
            AuthError::Gateway(msg) => write!(f, "auth gateway error: {}", msg),
        }
    }
}
impl std::error::Error for AuthError {}

/// Claims of a Supabase access token.
#[serde_as]
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct AccessClaims {
    /// User ID.
    pub sub: String,
    /// Login email.
    #[serde(default)]
    pub email: Option<String>,
    /// Postgres role, `"authenticated"` for signed-in users.
    #[serde(default)]
    pub role: Option<String>,
    /// Expiration time, since the unix epoch.
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub exp: Duration,
    /// Profile data.
    #[serde(default)]
    pub user_metadata: UserMetadata,
}
impl AccessClaims {
    /// Checks that the token is valid right now.
    pub fn check_now(&self) -> Result<(), AuthError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        if self.exp <= now {
            return Err(AuthError::InvalidToken("token is expired".into()));
        }
        if self.sub.is_empty() {
            return Err(AuthError::InvalidToken("token has no subject".into()));
        }
        Ok(())
    }
}
impl From<AccessClaims> for AuthUser {
    fn from(claims: AccessClaims) -> Self {
        Self {
            id: UserId(claims.sub),
            email: claims.email,
            user_metadata: claims.user_metadata,
        }
    }
}

/// Verifies an HS256 access token with the project's JWT secret.
pub fn verify_access_token(hmac: &Hmac<Sha256>, token: &str) -> Result<AuthUser, AuthError> {
    let claims: AccessClaims = token
        .verify_with_key(hmac)
        .map_err(|e| AuthError::InvalidToken(format!("failed to read/verify jwt: {}", e)))?;
    claims.check_now()?;
    Ok(claims.into())
}

/// Error body of the GoTrue REST API. Which field is set depends on the endpoint.
#[derive(Debug, Default, serde::Deserialize)]
struct GatewayErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}
impl GatewayErrorBody {
    fn into_message(self) -> Option<String> {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
    }
}

/// Sends the request, parsing a 2xx JSON body. 4xx become [`AuthError::Rejected`].
async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, AuthError> {
    let response = request
        .send()
        .await
        .map_err(|e| AuthError::Gateway(format!("request failed: {}", e)))?;
    let status = response.status();
    if status.is_client_error() {
        let body: GatewayErrorBody = response.json().await.unwrap_or_default();
        return Err(AuthError::Rejected(
            body.into_message().unwrap_or_else(|| status.to_string()),
        ));
    }
    response
        .error_for_status()
        .map_err(|e| AuthError::Gateway(e.to_string()))?
        .json()
        .await
        .map_err(|e| AuthError::Gateway(format!("failed to parse response: {}", e)))
}

/// `POST /auth/v1/admin/users` body.
#[derive(Debug, serde::Serialize)]
struct AdminCreateUser<'a> {
    email: &'a str,
    password: &'a str,
    user_metadata: UserMetadata,
    email_confirm: bool,
}

/// [`AuthGateway`] for a Supabase project.
pub struct SupabaseAuth {
    client: Client,
    base_url: Url,
    service_role_key: SecretString,
    jwt_hmac: Option<Hmac<Sha256>>,
}
impl SupabaseAuth {
    /// Gateway for the configured project.
    pub fn new(config: &Config) -> Result<Self, AuthError> {
        let jwt_hmac = config
            .jwt_secret
            .as_ref()
            .map(|secret| {
                hmac::Mac::new_from_slice(secret.expose_secret().as_bytes())
                    .map_err(|e| AuthError::Gateway(format!("failed to create hmac: {}", e)))
            })
            .transpose()?;
        Ok(Self {
            client: Client::new(),
            base_url: config.supabase_url.clone(),
            service_role_key: config.service_role_key.expose_secret().clone().into(),
            jwt_hmac,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        self.base_url
            .join(path)
            .map_err(|e| AuthError::Gateway(format!("invalid gateway url: {}", e)))
    }
}
impl AuthGateway for SupabaseAuth {
    fn sign_up<'a>(&'a self, account: NewAccount) -> BoxFuture<'a, Result<AuthUser, AuthError>> {
        let client = self.client.clone();
        let endpoint = self.endpoint("auth/v1/admin/users");
        let key = self.service_role_key.expose_secret().clone();
        local_future!(async move {
            let body = AdminCreateUser {
                email: &account.email,
                password: account.password.expose_secret(),
                user_metadata: UserMetadata {
                    username: Some(account.username.clone()),
                },
                email_confirm: true,
            };
            let request = client
                .post(endpoint?)
                .bearer_auth(&key)
                .header("apikey", &key)
                .json(&body);
            send_json(request).await
        })
        .boxed()
    }

    fn get_user<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<AuthUser, AuthError>> {
        if let Some(hmac) = &self.jwt_hmac {
            return futures::future::ready(verify_access_token(hmac, token)).boxed();
        }
        let client = self.client.clone();
        let endpoint = self.endpoint("auth/v1/user");
        let key = self.service_role_key.expose_secret().clone();
        let token = token.to_owned();
        local_future!(async move {
            let request = client
                .get(endpoint?)
                .bearer_auth(&token)
                .header("apikey", &key);
            send_json(request).await.map_err(|e| match e {
                AuthError::Rejected(msg) => AuthError::InvalidToken(msg),
                other => other,
            })
        })
        .boxed()
    }
}

/// Extractor for the user of the request's `Authorization: Bearer ...` token.
#[derive(Debug)]
pub struct Authenticated(pub AuthUser);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
    &'static DynAuth: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|rejection| {
                    if rejection.is_missing() {
                        ApiError::MissingAuthorization
                    } else {
                        ApiError::Unauthorized(rejection.to_string())
                    }
                })?;
        let auth = <&'static DynAuth>::from_ref(state);
        match auth.get_user(bearer.token()).await {
            Ok(user) => Ok(Self(user)),
            Err(AuthError::Gateway(detail)) => Err(ApiError::Internal {
                message: "Failed to verify token",
                detail,
            }),
            Err(e) => Err(ApiError::Unauthorized(e.to_string())),
        }
    }
}

/// Maps a signup failure to the response: gateway rejections are shown to the caller.
pub fn signup_error(error: AuthError) -> ApiError {
    match error {
        AuthError::Rejected(msg) => ApiError::SignupRejected(msg),
        other => ApiError::Internal {
            message: "Failed to create user",
            detail: other.to_string(),
        },
    }
}

#[cfg(test)]
mod test {
    use hmac::Mac;
    use jwt::SignWithKey;

    use super::*;

    fn hmac() -> Hmac<Sha256> {
        Hmac::new_from_slice(b"super-secret-jwt-token-with-at-least-32-characters").unwrap()
    }

    fn claims(sub: &str, exp: Duration) -> AccessClaims {
        AccessClaims {
            sub: sub.into(),
            email: Some("zico@example.com".into()),
            role: Some("authenticated".into()),
            exp,
            user_metadata: UserMetadata {
                username: Some("zico".into()),
            },
        }
    }

    fn in_an_hour() -> Duration {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap() + Duration::from_secs(3600)
    }

    #[test]
    fn test_verify_valid_token() {
        let token = claims("user-1", in_an_hour()).sign_with_key(&hmac()).unwrap();
        let user = verify_access_token(&hmac(), &token).unwrap();
        assert_eq!(UserId::from("user-1"), user.id);
        assert_eq!(Some("zico".into()), user.user_metadata.username);
    }

    #[test]
    fn test_verify_expired_token() {
        let token = claims("user-1", Duration::from_secs(1_000))
            .sign_with_key(&hmac())
            .unwrap();
        assert!(matches!(
            verify_access_token(&hmac(), &token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_verify_wrong_key() {
        let other = Hmac::<Sha256>::new_from_slice(b"another-secret").unwrap();
        let token = claims("user-1", in_an_hour()).sign_with_key(&other).unwrap();
        assert!(matches!(
            verify_access_token(&hmac(), &token),
            Err(AuthError::InvalidToken(_))
        ));
        assert!(matches!(
            verify_access_token(&hmac(), "not-a-jwt"),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_new_account_defaults_username() {
        let account = NewAccount::from_request(SignupRequest {
            username: None,
            email: Some("duda@example.com".into()),
            password: Some("hunter2".into()),
        })
        .unwrap();
        assert_eq!("duda", account.username);

        let missing_password = SignupRequest {
            username: Some("duda".into()),
            email: Some("duda@example.com".into()),
            password: None,
        };
        assert!(NewAccount::from_request(missing_password).is_none());
        assert!(NewAccount::from_request(SignupRequest::default()).is_none());
    }

    #[test]
    fn test_gateway_user_shape() {
        let user: AuthUser = serde_json::from_value(serde_json::json!({
            "id": "5c1f",
            "aud": "authenticated",
            "email": "duda@example.com",
            "user_metadata": { "username": "duda" },
            "app_metadata": { "provider": "email" },
        }))
        .unwrap();
        assert_eq!(UserId::from("5c1f"), user.id);
        assert_eq!(Some("duda".into()), user.user_metadata.username);
    }

    #[test]
    fn test_gateway_error_message() {
        let body: GatewayErrorBody =
            serde_json::from_str(r#"{"code":422,"msg":"Email address already registered"}"#)
                .unwrap();
        assert_eq!(
            Some("Email address already registered".into()),
            body.into_message()
        );
    }
}
