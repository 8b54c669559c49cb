//! Key-value [`Store`]: one JSON blob per user per collection.
//!
//! Keys are `user:<user_id>:mcs` and `user:<user_id>:battles`. Replacing a collection is a single
//! put; deleting one item rewrites the blob.

use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Store, StoreError};
use crate::model::{BattleRecord, Mc, UserId};

/// Raw string key-value storage.
pub trait KvBackend: Send + Sync {
    /// Value for `key`, if any.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>>;

    /// Sets `key` to `value`.
    fn put<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), StoreError>>;
}

const MCS: &str = "mcs";
const BATTLES: &str = "battles";

fn key(user: &UserId, collection: &str) -> String {
    format!("user:{}:{}", user, collection)
}

/// [`Store`] over any [`KvBackend`].
pub struct KvStore<B> {
    backend: B,
}
impl<B: KvBackend> KvStore<B> {
    /// Wraps the backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    async fn load<T: DeserializeOwned>(
        &self,
        user: &UserId,
        collection: &str,
    ) -> Result<Vec<T>, StoreError> {
        match self.backend.get(&key(user, collection)).await? {
            // Stored `null` reads as empty, same as a missing key.
            Some(blob) => Ok(serde_json::from_str::<Option<Vec<T>>>(&blob)?.unwrap_or_default()),
            None => Ok(Vec::new()),
        }
    }

    async fn save<T: Serialize>(
        &self,
        user: &UserId,
        collection: &str,
        items: &[T],
    ) -> Result<(), StoreError> {
        let blob = serde_json::to_string(items)?;
        self.backend.put(&key(user, collection), blob).await
    }

    async fn remove<T: Serialize + DeserializeOwned>(
        &self,
        user: &UserId,
        collection: &str,
        matches: impl Fn(&T) -> bool,
    ) -> Result<bool, StoreError> {
        let mut items = self.load::<T>(user, collection).await?;
        let before = items.len();
        items.retain(|item| !matches(item));
        if items.len() == before {
            return Ok(false);
        }
        self.save(user, collection, &items).await?;
        Ok(true)
    }
}

impl<B: KvBackend> Store for KvStore<B> {
    fn list_mcs<'a>(&'a self, user: &'a UserId) -> BoxFuture<'a, Result<Vec<Mc>, StoreError>> {
        self.load(user, MCS).boxed()
    }

    fn replace_mcs<'a>(
        &'a self,
        user: &'a UserId,
        mcs: Vec<Mc>,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        async move { self.save(user, MCS, &mcs).await }.boxed()
    }

    fn delete_mc<'a>(
        &'a self,
        user: &'a UserId,
        id: &'a str,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        self.remove(user, MCS, move |mc: &Mc| mc.id == id).boxed()
    }

    fn list_battles<'a>(
        &'a self,
        user: &'a UserId,
    ) -> BoxFuture<'a, Result<Vec<BattleRecord>, StoreError>> {
        self.load(user, BATTLES).boxed()
    }

    fn replace_battles<'a>(
        &'a self,
        user: &'a UserId,
        battles: Vec<BattleRecord>,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        async move { self.save(user, BATTLES, &battles).await }.boxed()
    }

    fn delete_battle<'a>(
        &'a self,
        user: &'a UserId,
        id: &'a str,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        self.remove(user, BATTLES, move |battle: &BattleRecord| battle.id == id)
            .boxed()
    }
}

#[cfg(target_arch = "wasm32")]
pub use worker_kv::WorkerKv;

#[cfg(target_arch = "wasm32")]
mod worker_kv {
    use futures::future::{BoxFuture, FutureExt};
    use worker::send::SendWrapper;

    use super::KvBackend;
    use crate::store::StoreError;

    /// Cloudflare Workers KV namespace.
    pub struct WorkerKv(pub &'static SendWrapper<worker::kv::KvStore>);

    impl KvBackend for WorkerKv {
        fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
            let kv = self.0;
            let key = key.to_owned();
            crate::local_future!(async move {
                kv.0.get(&key)
                    .text()
                    .await
                    .map_err(|e| StoreError::Backend(format!("KV get `{}`: {:?}", key, e)))
            })
            .boxed()
        }

        fn put<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), StoreError>> {
            let kv = self.0;
            let key = key.to_owned();
            crate::local_future!(async move {
                kv.0.put(&key, value)
                    .map_err(|e| StoreError::Backend(format!("KV put `{}`: {:?}", key, e)))?
                    .execute()
                    .await
                    .map_err(|e| StoreError::Backend(format!("KV put `{}`: {:?}", key, e)))
            })
            .boxed()
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use futures::executor::block_on;
    use futures::future;

    use super::*;
    use crate::model::DEFAULT_BATTLE_TYPE;

    #[derive(Default)]
    struct MapKv(Mutex<HashMap<String, String>>);
    impl KvBackend for MapKv {
        fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
            future::ready(Ok(self.0.lock().unwrap().get(key).cloned())).boxed()
        }

        fn put<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), StoreError>> {
            self.0.lock().unwrap().insert(key.to_owned(), value);
            future::ready(Ok(())).boxed()
        }
    }

    #[test]
    fn test_missing_and_null_keys_are_empty() {
        let store = KvStore::new(MapKv::default());
        let user = UserId::from("alice");
        assert!(block_on(store.list_mcs(&user)).unwrap().is_empty());

        store
            .backend
            .0
            .lock()
            .unwrap()
            .insert("user:alice:battles".into(), "null".into());
        assert!(block_on(store.list_battles(&user)).unwrap().is_empty());
    }

    #[test]
    fn test_blob_layout() {
        let store = KvStore::new(MapKv::default());
        let user = UserId::from("alice");
        block_on(store.replace_mcs(&user, vec![Mc::new("1", "Zico")])).unwrap();

        let blob = store.backend.0.lock().unwrap()["user:alice:mcs"].clone();
        let value: serde_json::Value = serde_json::from_str(&blob).unwrap();
        assert_eq!("Zico", value[0]["name"]);
    }

    #[test]
    fn test_delete_rewrites_blob() {
        let store = KvStore::new(MapKv::default());
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");
        let battle = |id: &str| BattleRecord {
            id: id.into(),
            date: "2025-03-01".into(),
            location: None,
            kind: DEFAULT_BATTLE_TYPE.into(),
            participants: vec![],
        };
        block_on(store.replace_battles(&alice, vec![battle("b1"), battle("b2")])).unwrap();

        assert!(!block_on(store.delete_battle(&bob, "b1")).unwrap());
        assert!(block_on(store.delete_battle(&alice, "b1")).unwrap());
        assert_eq!(vec![battle("b2")], block_on(store.list_battles(&alice)).unwrap());
    }

    #[test]
    fn test_corrupt_blob_is_an_error() {
        let store = KvStore::new(MapKv::default());
        store
            .backend
            .0
            .lock()
            .unwrap()
            .insert("user:alice:mcs".into(), "{not json".into());
        assert!(matches!(
            block_on(store.list_mcs(&UserId::from("alice"))),
            Err(StoreError::Serde(_))
        ));
    }
}
