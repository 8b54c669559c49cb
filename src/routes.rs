//! HTTP routes.
//!
//! | Route | Auth | |
//! |---|---|---|
//! | `GET /health` | no | `{ status, timestamp }` |
//! | `POST /signup` | no | creates an account, `201 { user }` |
//! | `GET /mcs`, `POST /mcs` | yes | list or replace all MCs |
//! | `DELETE /mcs/:id` | yes | delete one MC |
//! | `GET /battles`, `POST /battles` | yes | list or replace all battles |
//! | `DELETE /battles/:id` | yes | delete one battle |
//! | `GET /stats` | yes | `{ topMcs, upcomingBattles }` |
//!
//! All routes are nested under [`Config::route_prefix`]. Errors are `{ "error": "..." }`.

use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};

use crate::auth::{signup_error, Authenticated, DynAuth, NewAccount, SignupRequest, SignupResponse};
use crate::config::Config;
use crate::error::ApiError;
use crate::model::{BattleRecord, BattlesBody, Health, Mc, McsBody, Success};
use crate::state::AppState;
use crate::stats::{self, Stats};
use crate::store::DynStore;
use crate::util::{now_rfc3339, today_utc};

/// Builds the app router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/signup", post(signup))
        .route("/mcs", get(mcs_get).post(mcs_post))
        .route("/mcs/:id", delete(mc_delete))
        .route("/battles", get(battles_get).post(battles_post))
        .route("/battles/:id", delete(battle_delete))
        .route("/stats", get(stats_get));
    let prefix = &state.config.route_prefix;
    let app = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(prefix, api)
    };
    app.fallback(not_found)
        .layer(middleware::from_fn(log_request))
        .layer(cors())
        .with_state(state)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .expose_headers([CONTENT_LENGTH])
        .max_age(Duration::from_secs(600))
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let response = next.run(request).await;
    log::info!("{} {} -> {}", method, path, response.status().as_u16());
    response
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// `GET /health`
async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_owned(),
        timestamp: Some(now_rfc3339()),
    })
}

/// `POST /signup`
async fn signup(
    State(auth): State<&'static DynAuth>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let account = NewAccount::from_request(request)
        .ok_or_else(|| ApiError::BadRequest("Email and password are required".to_owned()))?;
    log::info!("Creating account for `{}`.", account.email);
    let user = auth.sign_up(account).await.map_err(signup_error)?;
    Ok((StatusCode::CREATED, Json(SignupResponse { user })))
}

/// Takes the array at `body[field]`. Anything but an array is a 400 with `not_array`, an element
/// that fails to parse is a 400 with `invalid`.
fn take_array<T: DeserializeOwned>(
    body: Result<Json<Value>, JsonRejection>,
    field: &str,
    not_array: &'static str,
    invalid: &'static str,
) -> Result<Vec<T>, ApiError> {
    let Ok(Json(mut body)) = body else {
        return Err(ApiError::BadRequest(not_array.to_owned()));
    };
    match body.get_mut(field).map(Value::take) {
        Some(items @ Value::Array(_)) => serde_json::from_value(items).map_err(|e| {
            log::warn!("Rejecting `{}`: {}", field, e);
            ApiError::BadRequest(invalid.to_owned())
        }),
        _ => Err(ApiError::BadRequest(not_array.to_owned())),
    }
}

/// `GET /mcs`
async fn mcs_get(
    State(store): State<&'static DynStore>,
    Authenticated(user): Authenticated,
) -> Result<Json<McsBody>, ApiError> {
    let mcs = store
        .list_mcs(&user.id)
        .await
        .map_err(ApiError::store("Failed to fetch MCs"))?;
    Ok(Json(McsBody { mcs }))
}

/// `POST /mcs`
async fn mcs_post(
    State(store): State<&'static DynStore>,
    Authenticated(user): Authenticated,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Success>, ApiError> {
    let mut mcs: Vec<Mc> = take_array(body, "mcs", "MCs must be an array", "Invalid MCs")?;
    mcs.iter_mut().for_each(Mc::recount);
    log::debug!("Saving {} MCs for `{}`.", mcs.len(), user.id);
    store
        .replace_mcs(&user.id, mcs)
        .await
        .map_err(ApiError::store("Failed to save MCs"))?;
    Ok(Json(Success::OK))
}

/// `DELETE /mcs/:id`
async fn mc_delete(
    State(store): State<&'static DynStore>,
    Authenticated(user): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Success>, ApiError> {
    let existed = store
        .delete_mc(&user.id, &id)
        .await
        .map_err(ApiError::store("Failed to delete MC"))?;
    if !existed {
        log::debug!("MC `{}` of `{}` did not exist.", id, user.id);
    }
    Ok(Json(Success::OK))
}

/// `GET /battles`
async fn battles_get(
    State(store): State<&'static DynStore>,
    Authenticated(user): Authenticated,
) -> Result<Json<BattlesBody>, ApiError> {
    let mut battles = store
        .list_battles(&user.id)
        .await
        .map_err(ApiError::store("Failed to fetch battles"))?;
    battles.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(Json(BattlesBody { battles }))
}

/// `POST /battles`
async fn battles_post(
    State(store): State<&'static DynStore>,
    Authenticated(user): Authenticated,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Success>, ApiError> {
    let battles: Vec<BattleRecord> = take_array(
        body,
        "battles",
        "Battles must be an array",
        "Invalid battles",
    )?;
    log::debug!("Saving {} battles for `{}`.", battles.len(), user.id);
    store
        .replace_battles(&user.id, battles)
        .await
        .map_err(ApiError::store("Failed to save battles"))?;
    Ok(Json(Success::OK))
}

/// `DELETE /battles/:id`
async fn battle_delete(
    State(store): State<&'static DynStore>,
    Authenticated(user): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Success>, ApiError> {
    let existed = store
        .delete_battle(&user.id, &id)
        .await
        .map_err(ApiError::store("Failed to delete battle"))?;
    if !existed {
        log::debug!("Battle `{}` of `{}` did not exist.", id, user.id);
    }
    Ok(Json(Success::OK))
}

/// `GET /stats`. A list that fails to load is logged and left empty.
async fn stats_get(
    State(store): State<&'static DynStore>,
    State(config): State<&'static Config>,
    Authenticated(user): Authenticated,
) -> Json<Stats> {
    let limits = config.stats;
    let top_mcs = match store.list_mcs(&user.id).await {
        Ok(mcs) => stats::top_mcs(mcs, limits.top_mcs),
        Err(e) => {
            log::error!("Error fetching top MCs: {}", e);
            Vec::new()
        }
    };
    let upcoming_battles = match store.list_battles(&user.id).await {
        Ok(battles) => stats::upcoming_battles(&battles, today_utc(), limits.upcoming_battles),
        Err(e) => {
            log::error!("Error fetching upcoming battles: {}", e);
            Vec::new()
        }
    };
    Json(Stats {
        top_mcs,
        upcoming_battles,
    })
}
