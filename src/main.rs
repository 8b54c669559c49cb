//! Local development server: the same routes as the worker, with in-memory storage.

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::net::{Ipv4Addr, SocketAddr};

    use cypher_arena::auth::SupabaseAuth;
    use cypher_arena::config::Config;
    use cypher_arena::state::AppStateOwned;
    use cypher_arena::store::MemoryStore;
    use cypher_arena::util::init_logging;

    let config = Config::from_env()?;
    init_logging(config.log_level);

    let port = match std::env::var("PORT") {
        Ok(port) => port
            .parse()
            .map_err(|e| format!("Env var `PORT` should be a port number: {}", e))?,
        Err(_) => 3001,
    };
    let auth = SupabaseAuth::new(&config)?;
    if config.jwt_secret.is_none() {
        log::warn!("`SUPABASE_JWT_SECRET` not set, every token will be checked remotely.");
    }
    let state = AppStateOwned {
        store: Box::new(MemoryStore::new()),
        auth: Box::new(auth),
        config,
    }
    .leak();

    cypher_arena::serve(state, SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))).await?;
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {}
