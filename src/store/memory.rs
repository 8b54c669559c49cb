//! In-memory [`Store`], for tests and the local development server.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::{self, BoxFuture, FutureExt};

use super::{Store, StoreError};
use crate::model::{BattleRecord, Mc, UserId};

#[derive(Default)]
struct Collections {
    mcs: Vec<Mc>,
    battles: Vec<BattleRecord>,
}

/// HashMap-backed store. Each replace swaps a whole collection under one write lock.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<UserId, Collections>>,
}
impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<UserId, Collections>>, StoreError> {
        self.users
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<UserId, Collections>>, StoreError> {
        self.users
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".into()))
    }

    fn list<T: Clone>(
        &self,
        user: &UserId,
        pick: impl FnOnce(&Collections) -> &Vec<T>,
    ) -> Result<Vec<T>, StoreError> {
        Ok(self.read()?.get(user).map(pick).cloned().unwrap_or_default())
    }

    fn delete<T>(
        &self,
        user: &UserId,
        pick: impl FnOnce(&mut Collections) -> &mut Vec<T>,
        matches: impl Fn(&T) -> bool,
    ) -> Result<bool, StoreError> {
        let mut users = self.write()?;
        let Some(collections) = users.get_mut(user) else {
            return Ok(false);
        };
        let items = pick(collections);
        let before = items.len();
        items.retain(|item| !matches(item));
        Ok(items.len() != before)
    }
}

impl Store for MemoryStore {
    fn list_mcs<'a>(&'a self, user: &'a UserId) -> BoxFuture<'a, Result<Vec<Mc>, StoreError>> {
        future::ready(self.list(user, |c| &c.mcs)).boxed()
    }

    fn replace_mcs<'a>(
        &'a self,
        user: &'a UserId,
        mcs: Vec<Mc>,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        let result = self
            .write()
            .map(|mut users| users.entry(user.clone()).or_default().mcs = mcs);
        future::ready(result).boxed()
    }

    fn delete_mc<'a>(
        &'a self,
        user: &'a UserId,
        id: &'a str,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        future::ready(self.delete(user, |c| &mut c.mcs, |mc: &Mc| mc.id == id)).boxed()
    }

    fn list_battles<'a>(
        &'a self,
        user: &'a UserId,
    ) -> BoxFuture<'a, Result<Vec<BattleRecord>, StoreError>> {
        future::ready(self.list(user, |c| &c.battles)).boxed()
    }

    fn replace_battles<'a>(
        &'a self,
        user: &'a UserId,
        battles: Vec<BattleRecord>,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        let result = self
            .write()
            .map(|mut users| users.entry(user.clone()).or_default().battles = battles);
        future::ready(result).boxed()
    }

    fn delete_battle<'a>(
        &'a self,
        user: &'a UserId,
        id: &'a str,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        future::ready(self.delete(
            user,
            |c| &mut c.battles,
            |battle: &BattleRecord| battle.id == id,
        ))
        .boxed()
    }
}

#[cfg(test)]
mod test {
    use futures::executor::block_on;

    use super::*;
    use crate::model::DEFAULT_BATTLE_TYPE;

    fn battle(id: &str) -> BattleRecord {
        BattleRecord {
            id: id.into(),
            date: "2025-03-01".into(),
            location: Some("Lapa".into()),
            kind: DEFAULT_BATTLE_TYPE.into(),
            participants: vec![],
        }
    }

    #[test]
    fn test_replace_overwrites_collection() {
        let store = MemoryStore::new();
        let user = UserId::from("alice");
        block_on(store.replace_mcs(&user, vec![Mc::new("1", "Zico"), Mc::new("2", "Duda")]))
            .unwrap();
        block_on(store.replace_mcs(&user, vec![Mc::new("3", "Kant")])).unwrap();
        assert_eq!(vec![Mc::new("3", "Kant")], block_on(store.list_mcs(&user)).unwrap());
    }

    #[test]
    fn test_users_are_isolated() {
        let store = MemoryStore::new();
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");
        block_on(store.replace_mcs(&alice, vec![Mc::new("1", "Zico")])).unwrap();
        block_on(store.replace_battles(&alice, vec![battle("b1")])).unwrap();

        assert!(block_on(store.list_mcs(&bob)).unwrap().is_empty());
        assert!(!block_on(store.delete_mc(&bob, "1")).unwrap());
        assert!(!block_on(store.delete_battle(&bob, "b1")).unwrap());
        assert_eq!(1, block_on(store.list_mcs(&alice)).unwrap().len());
        assert_eq!(1, block_on(store.list_battles(&alice)).unwrap().len());
    }

    #[test]
    fn test_delete_by_id() {
        let store = MemoryStore::new();
        let user = UserId::from("alice");
        block_on(store.replace_battles(&user, vec![battle("b1"), battle("b2")])).unwrap();
        assert!(block_on(store.delete_battle(&user, "b1")).unwrap());
        assert!(!block_on(store.delete_battle(&user, "b1")).unwrap());
        assert_eq!(vec![battle("b2")], block_on(store.list_battles(&user)).unwrap());
    }
}
