//! Cloudflare worker entry point.

use std::sync::OnceLock;

use tower::Service;
use worker::send::SendWrapper;
use worker::{event, Context, Env, Error, HttpRequest, Result};

use crate::auth::SupabaseAuth;
use crate::config::Config;
use crate::routes::router;
use crate::state::{AppState, AppStateOwned};
use crate::store::d1::D1Store;
use crate::store::kv::WorkerKv;
use crate::store::{DynStore, KvStore};
use crate::util;

/// Cloudflare fetch request handler.
#[event(fetch)]
pub async fn fetch(
    req: HttpRequest,
    env: Env,
    _ctx: Context,
) -> Result<http::Response<axum::body::Body>> {
    let state = get_appstate(&env)?;
    Ok(router(state).call(req).await?)
}

/// Get the AppState, initializing it if needed.
pub fn get_appstate(env: &Env) -> Result<AppState> {
    static ONCE: OnceLock<AppStateOwned> = OnceLock::new();
    if let Some(state) = ONCE.get() {
        return Ok(state);
    }
    let state = init_appstate(env)?;
    Ok(ONCE.get_or_init(|| state))
}

fn init_appstate(env: &Env) -> Result<AppStateOwned> {
    let config = Config::from_lookup(|name| lookup(env, name)).map_err(|e| {
        util::init_logging(log::LevelFilter::Info);
        log::error!("Invalid configuration: {}", e);
        Error::RustError(e.to_string())
    })?;
    util::init_logging(config.log_level);

    let store: DynStore = match lookup(env, "STORAGE").as_deref().unwrap_or("d1") {
        "d1" => {
            let db = Box::leak(Box::new(SendWrapper(env.d1("BINDING_D1_DB")?)));
            Box::new(D1Store::new(db))
        }
        "kv" => {
            let kv = Box::leak(Box::new(SendWrapper(env.kv("BINDING_KV_STORE")?)));
            Box::new(KvStore::new(WorkerKv(kv)))
        }
        other => {
            return Result::Err(Error::RustError(format!(
                "Env var `STORAGE` should be `d1` or `kv`, got: {:?}",
                other
            )))
        }
    };
    let auth = SupabaseAuth::new(&config).map_err(|e| Error::RustError(e.to_string()))?;
    log::info!(
        "Initialized app state, gateway: {}, route prefix: {:?}",
        config.supabase_url,
        config.route_prefix
    );

    Ok(AppStateOwned {
        store,
        auth: Box::new(auth),
        config,
    })
}

/// Get an env secret, falling back to a plain var.
fn lookup(env: &Env, name: &str) -> Option<String> {
    env.secret(name)
        .map(|secret| secret.to_string())
        .or_else(|_| env.var(name).map(|var| var.to_string()))
        .ok()
}
