//! Router state.

use cypher_macro::FromRefStatic;

use crate::auth::DynAuth;
use crate::config::Config;
use crate::store::DynStore;

/// `AppState`. Static reference to [`AppStateOwned`] to avoid cloning in Axum.
pub type AppState = &'static AppStateOwned;

/// State for the application, used as the Axum router state.
#[derive(FromRefStatic)]
pub struct AppStateOwned {
    /// Persistence.
    pub store: DynStore,
    /// Auth gateway.
    pub auth: DynAuth,
    /// Configuration.
    pub config: Config,
}
impl AppStateOwned {
    /// Leaks the state to get the `'static` reference the router needs. Called once per process
    /// (or once per test).
    pub fn leak(self) -> AppState {
        Box::leak(Box::new(self))
    }
}
