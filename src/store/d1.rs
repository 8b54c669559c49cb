//! Relational [`Store`] on Cloudflare D1. Schema in `migrations/`.
//!
//! Each replace or delete runs as one D1 batch, which D1 executes as a single transaction.

use futures::future::{BoxFuture, FutureExt};
use worker::send::SendWrapper;
use worker::{query, D1Database, D1PreparedStatement, D1Result};

use super::{Store, StoreError};
use crate::db::{fold_battles, flatten_battles, BattleRow, McRow, ParticipantRow};
use crate::local_future;
use crate::model::{BattleRecord, Mc, UserId};

/// D1-backed store.
pub struct D1Store {
    db: &'static SendWrapper<D1Database>,
}
impl D1Store {
    /// Wraps the database binding.
    pub fn new(db: &'static SendWrapper<D1Database>) -> Self {
        Self { db }
    }
}

/// Rows changed by the first statement of a batch.
fn changes(results: &[D1Result]) -> Result<usize, StoreError> {
    let Some(result) = results.first() else {
        return Ok(0);
    };
    Ok(result.meta()?.and_then(|meta| meta.changes).unwrap_or(0))
}

fn insert_mc(db: &D1Database, row: &McRow) -> Result<D1PreparedStatement, StoreError> {
    let statement = query!(
        db,
        "INSERT INTO mcs (id, user_id, name, wins, losses, draws, total_battles)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        row.id,
        row.user_id,
        row.name,
        row.wins,
        row.losses,
        row.draws,
        row.total_battles,
    )?;
    Ok(statement)
}

fn insert_battle(db: &D1Database, row: &BattleRow) -> Result<D1PreparedStatement, StoreError> {
    // Empty string stands in for NULL: D1 cannot bind `undefined`.
    let statement = query!(
        db,
        "INSERT INTO battles (id, user_id, date, location, type)
        VALUES (?1, ?2, ?3, NULLIF(?4, ''), ?5)",
        row.id,
        row.user_id,
        row.date,
        row.location.as_deref().unwrap_or(""),
        row.kind,
    )?;
    Ok(statement)
}

fn insert_participant(
    db: &D1Database,
    row: &ParticipantRow,
) -> Result<D1PreparedStatement, StoreError> {
    let statement = query!(
        db,
        "INSERT INTO battle_participants (user_id, battle_id, position, mc_id, opponent, result)
        VALUES (?1, ?2, ?3, ?4, ?5, NULLIF(?6, ''))",
        row.user_id,
        row.battle_id,
        row.position,
        row.mc_id,
        row.opponent,
        row.result.map(|result| result.as_str()).unwrap_or(""),
    )?;
    Ok(statement)
}

impl Store for D1Store {
    fn list_mcs<'a>(&'a self, user: &'a UserId) -> BoxFuture<'a, Result<Vec<Mc>, StoreError>> {
        let db = self.db;
        let user_id = user.0.clone();
        local_future!(async move {
            let query = query!(
                &db.0,
                "SELECT * FROM mcs WHERE user_id = ?1 ORDER BY rowid ASC",
                user_id
            )?;
            let rows: Vec<McRow> = query.all().await?.results()?;
            Ok::<_, StoreError>(rows.into_iter().map(Mc::from).collect())
        })
        .boxed()
    }

    fn replace_mcs<'a>(
        &'a self,
        user: &'a UserId,
        mcs: Vec<Mc>,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        let db = self.db;
        let user = user.clone();
        local_future!(async move {
            let mut statements = vec![query!(
                &db.0,
                "DELETE FROM mcs WHERE user_id = ?1",
                user.0
            )?];
            for mc in mcs {
                statements.push(insert_mc(&db.0, &McRow::new(&user, mc))?);
            }
            db.0.batch(statements).await?;
            Ok::<_, StoreError>(())
        })
        .boxed()
    }

    fn delete_mc<'a>(
        &'a self,
        user: &'a UserId,
        id: &'a str,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        let db = self.db;
        let user_id = user.0.clone();
        let id = id.to_owned();
        local_future!(async move {
            let statement = query!(
                &db.0,
                "DELETE FROM mcs WHERE id = ?1 AND user_id = ?2",
                id,
                user_id
            )?;
            let results = db.0.batch(vec![statement]).await?;
            Ok::<_, StoreError>(changes(&results)? > 0)
        })
        .boxed()
    }

    fn list_battles<'a>(
        &'a self,
        user: &'a UserId,
    ) -> BoxFuture<'a, Result<Vec<BattleRecord>, StoreError>> {
        let db = self.db;
        let user_id = user.0.clone();
        local_future!(async move {
            let battles = query!(
                &db.0,
                "SELECT * FROM battles WHERE user_id = ?1 ORDER BY date ASC",
                user_id
            )?;
            let participants = query!(
                &db.0,
                "SELECT * FROM battle_participants WHERE user_id = ?1",
                user_id
            )?;
            let battles: Vec<BattleRow> = battles.all().await?.results()?;
            let participants: Vec<ParticipantRow> = participants.all().await?.results()?;
            Ok::<_, StoreError>(fold_battles(battles, participants))
        })
        .boxed()
    }

    fn replace_battles<'a>(
        &'a self,
        user: &'a UserId,
        battles: Vec<BattleRecord>,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        let db = self.db;
        let user = user.clone();
        local_future!(async move {
            let (battles, participants) = flatten_battles(&user, battles);
            let mut statements = vec![
                query!(
                    &db.0,
                    "DELETE FROM battle_participants WHERE user_id = ?1",
                    user.0
                )?,
                query!(&db.0, "DELETE FROM battles WHERE user_id = ?1", user.0)?,
            ];
            for battle in &battles {
                statements.push(insert_battle(&db.0, battle)?);
            }
            for participant in &participants {
                statements.push(insert_participant(&db.0, participant)?);
            }
            db.0.batch(statements).await?;
            Ok::<_, StoreError>(())
        })
        .boxed()
    }

    fn delete_battle<'a>(
        &'a self,
        user: &'a UserId,
        id: &'a str,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        let db = self.db;
        let user_id = user.0.clone();
        let id = id.to_owned();
        local_future!(async move {
            let statements = vec![
                query!(
                    &db.0,
                    "DELETE FROM battles WHERE id = ?1 AND user_id = ?2",
                    id,
                    user_id
                )?,
                query!(
                    &db.0,
                    "DELETE FROM battle_participants WHERE battle_id = ?1 AND user_id = ?2",
                    id,
                    user_id
                )?,
            ];
            let results = db.0.batch(statements).await?;
            Ok::<_, StoreError>(changes(&results)? > 0)
        })
        .boxed()
    }
}
