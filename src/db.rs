//! Model structs corresponding to relational tables. Must be kept in sync with `migrations/`.

use std::collections::HashMap;

use serde_with::{serde_as, DefaultOnNull};

use crate::model::{BattleRecord, Mc, Outcome, Participant, UserId};

/// Row of `mcs`.
#[serde_as]
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct McRow {
    /// PK ID (with [`Self::user_id`]).
    pub id: String,
    /// Owning account.
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// Battles won.
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub wins: u32,
    /// Battles lost.
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub losses: u32,
    /// Battles drawn.
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub draws: u32,
    /// Total battles.
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub total_battles: u32,
}
impl McRow {
    /// Row for the given owner.
    pub fn new(user: &UserId, mc: Mc) -> Self {
        Self {
            id: mc.id,
            user_id: user.0.clone(),
            name: mc.name,
            wins: mc.wins,
            losses: mc.losses,
            draws: mc.draws,
            total_battles: mc.total_battles,
        }
    }
}
impl From<McRow> for Mc {
    fn from(row: McRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            wins: row.wins,
            losses: row.losses,
            draws: row.draws,
            total_battles: row.total_battles,
        }
    }
}

/// Row of `battles`.
#[derive(Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BattleRow {
    /// PK ID (with [`Self::user_id`]).
    pub id: String,
    /// Owning account.
    pub user_id: String,
    /// ISO date.
    pub date: String,
    /// Venue.
    pub location: Option<String>,
    /// Battle format.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Row of `battle_participants`.
#[derive(Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ParticipantRow {
    /// Owning account.
    pub user_id: String,
    /// FK [`BattleRow::id`].
    pub battle_id: String,
    /// Position within the battle, to keep matchup order.
    pub position: u32,
    /// FK [`McRow::id`]. Not enforced: MCs may be deleted independently.
    pub mc_id: String,
    /// Opponent's name.
    pub opponent: String,
    /// `"win"`, `"loss"` or `NULL`.
    pub result: Option<Outcome>,
}

/// Splits battles into `battles` and `battle_participants` rows.
pub fn flatten_battles(
    user: &UserId,
    battles: Vec<BattleRecord>,
) -> (Vec<BattleRow>, Vec<ParticipantRow>) {
    let mut battle_rows = Vec::with_capacity(battles.len());
    let mut participant_rows = Vec::new();
    for battle in battles {
        participant_rows.extend(battle.participants.into_iter().enumerate().map(
            |(position, participant)| ParticipantRow {
                user_id: user.0.clone(),
                battle_id: battle.id.clone(),
                position: position as u32,
                mc_id: participant.mc_id,
                opponent: participant.opponent,
                result: participant.result,
            },
        ));
        battle_rows.push(BattleRow {
            id: battle.id,
            user_id: user.0.clone(),
            date: battle.date,
            location: battle.location,
            kind: battle.kind,
        });
    }
    (battle_rows, participant_rows)
}

/// Folds participant rows into their battles, keeping battle order and ordering participants by
/// [`ParticipantRow::position`]. Rows of unknown battles are dropped.
pub fn fold_battles(
    battles: Vec<BattleRow>,
    participants: Vec<ParticipantRow>,
) -> Vec<BattleRecord> {
    let mut by_battle: HashMap<String, Vec<ParticipantRow>> = HashMap::new();
    for row in participants {
        by_battle.entry(row.battle_id.clone()).or_default().push(row);
    }
    battles
        .into_iter()
        .map(|battle| {
            let mut rows = by_battle.remove(&battle.id).unwrap_or_default();
            rows.sort_by_key(|row| row.position);
            BattleRecord {
                id: battle.id,
                date: battle.date,
                location: battle.location,
                kind: battle.kind,
                participants: rows
                    .into_iter()
                    .map(|row| Participant {
                        mc_id: row.mc_id,
                        opponent: row.opponent,
                        result: row.result,
                    })
                    .collect(),
            }
        })
        .collect()
}
