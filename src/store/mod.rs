//! Pluggable persistence, scoped by [`UserId`].
//!
//! Every write replaces a user's whole collection. Implementations make each replace atomic, so
//! a failed save leaves the previous collection in place.

use std::fmt;

use futures::future::BoxFuture;

use crate::model::{BattleRecord, Mc, UserId};

#[cfg(target_arch = "wasm32")]
pub mod d1;
pub mod kv;
pub mod memory;

pub use kv::{KvBackend, KvStore};
pub use memory::MemoryStore;

/// Boxed [`Store`], as kept in the app state.
pub type DynStore = Box<dyn Store>;

/// Storage backend for MCs and battles.
pub trait Store: Send + Sync {
    /// All of the user's MCs.
    fn list_mcs<'a>(&'a self, user: &'a UserId) -> BoxFuture<'a, Result<Vec<Mc>, StoreError>>;

    /// Replaces all of the user's MCs.
    fn replace_mcs<'a>(
        &'a self,
        user: &'a UserId,
        mcs: Vec<Mc>,
    ) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Deletes one of the user's MCs. Returns if it existed.
    fn delete_mc<'a>(
        &'a self,
        user: &'a UserId,
        id: &'a str,
    ) -> BoxFuture<'a, Result<bool, StoreError>>;

    /// All of the user's battles, with participants.
    fn list_battles<'a>(
        &'a self,
        user: &'a UserId,
    ) -> BoxFuture<'a, Result<Vec<BattleRecord>, StoreError>>;

    /// Replaces all of the user's battles and their participants.
    fn replace_battles<'a>(
        &'a self,
        user: &'a UserId,
        battles: Vec<BattleRecord>,
    ) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Deletes one of the user's battles and its participants. Returns if it existed.
    fn delete_battle<'a>(
        &'a self,
        user: &'a UserId,
        id: &'a str,
    ) -> BoxFuture<'a, Result<bool, StoreError>>;
}

/// Storage failure. Never shown to API callers.
#[derive(Debug)]
pub enum StoreError {
    /// Backend failed (database, KV namespace, lock).
    Backend(String),
    /// Stored data could not be (de)serialized.
    Serde(serde_json::Error),
}
impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Backend(msg) => write!(f, "storage backend error: {}", msg),
            StoreError::Serde(e) => write!(f, "stored data is malformed: {}", e),
        }
    }
}
impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Backend(_) => None,
            StoreError::Serde(e) => Some(e),
        }
    }
}
impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}
#[cfg(target_arch = "wasm32")]
impl From<worker::Error> for StoreError {
    fn from(value: worker::Error) -> Self {
        Self::Backend(value.to_string())
    }
}
