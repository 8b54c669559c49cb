//! Typed client for the HTTP API.
//!
//! Every authenticated call takes the caller's [`AccessToken`] explicitly. Battles are exchanged
//! in their persisted [`BattleRecord`] shape; [`CypherClient::load_battles`] and
//! [`CypherClient::save_battles`] convert to and from matchup-centric [`Battle`]s.

use std::fmt;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use crate::auth::{AuthUser, SignupRequest, SignupResponse};
use crate::matchup::{decode_battle, encode_battle};
use crate::model::{
    Battle, BattleRecord, BattlesBody, ErrorBody, Health, Mc, McsBody, Success, ValidationError,
};
use crate::stats::Stats;

/// Bearer token of a signed-in user.
#[derive(Debug)]
pub struct AccessToken(SecretString);
impl AccessToken {
    /// Wraps the token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::new(token.into()))
    }
}

/// Client failure.
#[derive(Debug)]
pub enum ClientError {
    /// Transport or decoding failure.
    Http(reqwest::Error),
    /// Server returned an error response.
    Api {
        /// Response status.
        status: StatusCode,
        /// Server's `error` message.
        message: String,
    },
    /// Battle failed validation before saving.
    Invalid {
        /// [`Battle::id`].
        battle: String,
        /// Reason.
        error: ValidationError,
    },
    /// Base URL cannot have paths appended.
    Url(String),
}
impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Http(e) => write!(f, "request failed: {}", e),
            ClientError::Api { status, message } => write!(f, "{}: {}", status, message),
            ClientError::Invalid { battle, error } => {
                write!(f, "battle `{}` is invalid: {}", battle, error)
            }
            ClientError::Url(base) => write!(f, "`{}` cannot be a base url", base),
        }
    }
}
impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Http(e) => Some(e),
            ClientError::Invalid { error, .. } => Some(error),
            _ => None,
        }
    }
}
impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

/// Client for one deployment, e.g. `https://<project>.supabase.co/functions/v1/make-server-f2b5fafa`.
#[derive(Clone, Debug)]
pub struct CypherClient {
    http: Client,
    base: Url,
}
impl CypherClient {
    /// Client for the API at `base` (including any route prefix).
    pub fn new(base: Url) -> Self {
        Self::with_client(Client::new(), base)
    }

    /// Client reusing an existing [`reqwest::Client`].
    pub fn with_client(http: Client, base: Url) -> Self {
        Self { http, base }
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::Url(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authed(&self, request: RequestBuilder, token: &AccessToken) -> RequestBuilder {
        request.bearer_auth(token.0.expose_secret())
    }

    /// `GET /health`
    pub async fn health(&self) -> Result<Health, ClientError> {
        parse(self.http.get(self.url(&["health"])?).send().await?).await
    }

    /// `POST /signup`
    pub async fn sign_up(&self, request: &SignupRequest) -> Result<AuthUser, ClientError> {
        let response = self
            .http
            .post(self.url(&["signup"])?)
            .json(request)
            .send()
            .await?;
        let SignupResponse { user } = parse(response).await?;
        Ok(user)
    }

    /// `GET /mcs`
    pub async fn list_mcs(&self, token: &AccessToken) -> Result<Vec<Mc>, ClientError> {
        let request = self.authed(self.http.get(self.url(&["mcs"])?), token);
        let McsBody { mcs } = parse(request.send().await?).await?;
        Ok(mcs)
    }

    /// `POST /mcs`, replacing all of the user's MCs.
    pub async fn save_mcs(&self, token: &AccessToken, mcs: &[Mc]) -> Result<(), ClientError> {
        let request = self
            .authed(self.http.post(self.url(&["mcs"])?), token)
            .json(&json!({ "mcs": mcs }));
        let _: Success = parse(request.send().await?).await?;
        Ok(())
    }

    /// `DELETE /mcs/:id`
    pub async fn delete_mc(&self, token: &AccessToken, id: &str) -> Result<(), ClientError> {
        let request = self.authed(self.http.delete(self.url(&["mcs", id])?), token);
        let _: Success = parse(request.send().await?).await?;
        Ok(())
    }

    /// `GET /battles`, as persisted.
    pub async fn list_battle_records(
        &self,
        token: &AccessToken,
    ) -> Result<Vec<BattleRecord>, ClientError> {
        let request = self.authed(self.http.get(self.url(&["battles"])?), token);
        let BattlesBody { battles } = parse(request.send().await?).await?;
        Ok(battles)
    }

    /// `GET /battles`, decoded into matchups using `mcs` to resolve names.
    pub async fn load_battles(
        &self,
        token: &AccessToken,
        mcs: &[Mc],
    ) -> Result<Vec<Battle>, ClientError> {
        let records = self.list_battle_records(token).await?;
        Ok(records
            .iter()
            .map(|record| decode_battle(record, mcs))
            .collect())
    }

    /// Validates and encodes the battles, then `POST /battles`, replacing all of the user's
    /// battles. Nothing is sent if any battle is invalid.
    pub async fn save_battles(
        &self,
        token: &AccessToken,
        battles: &[Battle],
        mcs: &[Mc],
    ) -> Result<(), ClientError> {
        let records = battles
            .iter()
            .map(|battle| {
                battle.validate().map_err(|error| ClientError::Invalid {
                    battle: battle.id.clone(),
                    error,
                })?;
                Ok(encode_battle(battle, mcs))
            })
            .collect::<Result<Vec<_>, ClientError>>()?;
        let request = self
            .authed(self.http.post(self.url(&["battles"])?), token)
            .json(&BattlesBody { battles: records });
        let _: Success = parse(request.send().await?).await?;
        Ok(())
    }

    /// `DELETE /battles/:id`
    pub async fn delete_battle(&self, token: &AccessToken, id: &str) -> Result<(), ClientError> {
        let request = self.authed(self.http.delete(self.url(&["battles", id])?), token);
        let _: Success = parse(request.send().await?).await?;
        Ok(())
    }

    /// `GET /stats`
    pub async fn stats(&self, token: &AccessToken) -> Result<Stats, ClientError> {
        let request = self.authed(self.http.get(self.url(&["stats"])?), token);
        parse(request.send().await?).await
    }
}

/// Parses a 2xx JSON body, or the `{ "error" }` body of anything else.
async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| status.to_string());
        return Err(ClientError::Api { status, message });
    }
    Ok(response.json().await?)
}
