//! API data types, shared by the server, the stores and [`crate::client`].
//!
//! Two battle shapes exist: [`Battle`] is matchup-centric (what an organizer edits), while
//! [`BattleRecord`] is participant-centric (what the backend persists). See [`crate::matchup`]
//! for the conversion between them.

use std::fmt;

use serde_with::{serde_as, DefaultOnNull};

/// Battle `type` used when none is given.
pub const DEFAULT_BATTLE_TYPE: &str = "beat";

/// ID of an authenticated account. All stored data is scoped by it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);
impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// A registered performer and their cumulative record.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mc {
    /// Client-generated opaque ID.
    pub id: String,
    /// Display name. Matchups refer to MCs by this name.
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
    /// `wins + losses + draws`, see [`Self::recount`].
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default, alias = "total_battles")]
    pub total_battles: u32,
}
impl Mc {
    /// New MC with an empty record.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            wins: 0,
            losses: 0,
            draws: 0,
            total_battles: 0,
        }
    }

    /// Sets the record and recomputes [`Self::total_battles`].
    pub fn with_record(mut self, wins: u32, losses: u32, draws: u32) -> Self {
        self.wins = wins;
        self.losses = losses;
        self.draws = draws;
        self.recount();
        self
    }

    /// Recomputes the derived [`Self::total_battles`].
    pub fn recount(&mut self) {
        self.total_battles = self
            .wins
            .saturating_add(self.losses)
            .saturating_add(self.draws);
    }
}

/// One head-to-head pairing within a [`Battle`].
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Matchup {
    /// First MC's name.
    pub mc1: String,
    /// Second MC's name.
    pub mc2: String,
    /// Winner's name, one of [`Self::mc1`] or [`Self::mc2`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
}
impl Matchup {
    /// Matchup without a result.
    pub fn new(mc1: impl Into<String>, mc2: impl Into<String>) -> Self {
        Self {
            mc1: mc1.into(),
            mc2: mc2.into(),
            winner: None,
        }
    }

    /// Sets the winner.
    pub fn won_by(mut self, winner: impl Into<String>) -> Self {
        self.winner = Some(winner.into());
        self
    }

    /// If both sides name an MC.
    pub fn is_complete(&self) -> bool {
        !self.mc1.is_empty() && !self.mc2.is_empty()
    }

    /// Checks both sides are named and the winner, if any, is one of them.
    pub fn validate(&self) -> Result<(), MatchupError> {
        if !self.is_complete() {
            return Err(MatchupError::MissingMc);
        }
        match &self.winner {
            Some(winner) if winner != &self.mc1 && winner != &self.mc2 => {
                Err(MatchupError::WinnerNotInMatchup(winner.clone()))
            }
            _ => Ok(()),
        }
    }
}

/// Whether a battle already has results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleStatus {
    /// No matchup has a winner yet.
    Scheduled,
    /// At least one matchup has a winner.
    Completed,
}
impl BattleStatus {
    /// Derives the status from the matchups.
    pub fn of(matchups: &[Matchup]) -> Self {
        if matchups.iter().any(|m| m.winner.is_some()) {
            Self::Completed
        } else {
            Self::Scheduled
        }
    }
}

/// Matchup-centric battle, as organizers edit it.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Battle {
    /// Client-generated opaque ID.
    pub id: String,
    /// Display name. Not persisted, see [`crate::matchup::decode_battle`].
    pub name: String,
    /// ISO `YYYY-MM-DD` date.
    pub date: String,
    /// Venue.
    pub location: String,
    /// Ordered matchups.
    pub matchups: Vec<Matchup>,
    /// Derived from [`Self::matchups`].
    pub status: BattleStatus,
}
impl Battle {
    /// Checks the battle is ready to be saved: name, date and location are set, at least one
    /// matchup is complete and every winner belongs to its matchup. Incomplete matchups are
    /// tolerated (they are dropped when encoding).
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("name", &self.name),
            ("date", &self.date),
            ("location", &self.location),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField(field));
            }
        }
        if !self.matchups.iter().any(Matchup::is_complete) {
            return Err(ValidationError::NoMatchups);
        }
        for (index, matchup) in self.matchups.iter().enumerate() {
            if let Err(MatchupError::WinnerNotInMatchup(winner)) = matchup.validate() {
                return Err(ValidationError::Matchup {
                    index,
                    error: MatchupError::WinnerNotInMatchup(winner),
                });
            }
        }
        Ok(())
    }
}

/// Result of one side of a matchup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// This side won.
    Win,
    /// The opponent won.
    Loss,
}
impl Outcome {
    /// Wire/database representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Win => "win",
            Outcome::Loss => "loss",
        }
    }
}

/// One side of a matchup, as persisted.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// FK [`Mc::id`].
    pub mc_id: String,
    /// Opponent's name.
    pub opponent: String,
    /// This side's result. Not checked against the opposite row.
    #[serde(default)]
    pub result: Option<Outcome>,
}

/// Participant-centric battle, as persisted.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleRecord {
    /// Client-generated opaque ID.
    pub id: String,
    /// ISO `YYYY-MM-DD` date.
    pub date: String,
    /// Venue.
    #[serde(default)]
    pub location: Option<String>,
    /// Battle format, [`DEFAULT_BATTLE_TYPE`] if not given.
    #[serde(rename = "type", default = "default_battle_type")]
    pub kind: String,
    /// Two rows per matchup, one per side.
    #[serde(default)]
    pub participants: Vec<Participant>,
}
impl BattleRecord {
    /// Summary without participants.
    pub fn summary(&self) -> BattleSummary {
        BattleSummary {
            id: self.id.clone(),
            date: self.date.clone(),
            location: self.location.clone(),
            kind: self.kind.clone(),
        }
    }
}

fn default_battle_type() -> String {
    DEFAULT_BATTLE_TYPE.to_owned()
}

/// Battle without participants, see [`crate::stats`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BattleSummary {
    /// [`BattleRecord::id`].
    pub id: String,
    /// [`BattleRecord::date`].
    pub date: String,
    /// [`BattleRecord::location`].
    pub location: Option<String>,
    /// [`BattleRecord::kind`].
    #[serde(rename = "type")]
    pub kind: String,
}

/// `{ "mcs": [...] }` request and response body.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct McsBody {
    /// All of the user's MCs.
    pub mcs: Vec<Mc>,
}

/// `{ "battles": [...] }` request and response body.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct BattlesBody {
    /// All of the user's battles.
    pub battles: Vec<BattleRecord>,
}

/// `{ "success": true }`.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Success {
    /// Always `true`; failures use [`ErrorBody`].
    pub success: bool,
}
impl Success {
    /// `{ "success": true }`.
    pub const OK: Self = Self { success: true };
}

/// `{ "error": "..." }`.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorBody {
    /// Caller-facing message.
    pub error: String,
}

/// `GET /health` response.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Health {
    /// `"ok"`.
    pub status: String,
    /// RFC 3339 server time.
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Problem with a single [`Matchup`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchupError {
    /// One of the sides is empty.
    MissingMc,
    /// The winner is neither side.
    WinnerNotInMatchup(String),
}
impl fmt::Display for MatchupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchupError::MissingMc => f.write_str("matchup needs two MCs"),
            MatchupError::WinnerNotInMatchup(winner) => {
                write!(f, "winner `{}` is not part of the matchup", winner)
            }
        }
    }
}
impl std::error::Error for MatchupError {}

/// Reason a [`Battle`] cannot be saved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field is blank.
    MissingField(&'static str),
    /// No matchup has both MCs set.
    NoMatchups,
    /// A matchup is invalid.
    Matchup {
        /// Position in [`Battle::matchups`].
        index: usize,
        /// What is wrong with it.
        error: MatchupError,
    },
}
impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingField(field) => write!(f, "battle `{}` is required", field),
            ValidationError::NoMatchups => f.write_str("battle needs at least one complete matchup"),
            ValidationError::Matchup { index, error } => write!(f, "matchup {}: {}", index, error),
        }
    }
}
impl std::error::Error for ValidationError {}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_mc_null_counters_default_to_zero() {
        let mc: Mc = serde_json::from_value(json!({
            "id": "1",
            "name": "Zico",
            "wins": null,
            "losses": 2,
            "total_battles": 2,
        }))
        .unwrap();
        assert_eq!(0, mc.wins);
        assert_eq!(2, mc.losses);
        assert_eq!(0, mc.draws);
        assert_eq!(2, mc.total_battles);
    }

    #[test]
    fn test_mc_serializes_camel_case() {
        let value = serde_json::to_value(Mc::new("1", "Duda").with_record(3, 1, 1)).unwrap();
        assert_eq!(
            json!({ "id": "1", "name": "Duda", "wins": 3, "losses": 1, "draws": 1, "totalBattles": 5 }),
            value
        );
    }

    #[test]
    fn test_battle_record_defaults() {
        let record: BattleRecord = serde_json::from_value(json!({
            "id": "b1",
            "date": "2025-03-01",
            "participants": [{ "mcId": "1", "opponent": "Duda" }],
        }))
        .unwrap();
        assert_eq!(DEFAULT_BATTLE_TYPE, record.kind);
        assert_eq!(None, record.location);
        assert_eq!(None, record.participants[0].result);
    }

    #[test]
    fn test_unknown_outcome_is_rejected() {
        let result = serde_json::from_value::<Participant>(json!({
            "mcId": "1",
            "opponent": "Duda",
            "result": "draw",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_matchup_validate() {
        assert_eq!(Ok(()), Matchup::new("Zico", "Duda").validate());
        assert_eq!(Ok(()), Matchup::new("Zico", "Duda").won_by("Duda").validate());
        assert_eq!(Err(MatchupError::MissingMc), Matchup::new("Zico", "").validate());
        assert_eq!(
            Err(MatchupError::WinnerNotInMatchup("Kant".into())),
            Matchup::new("Zico", "Duda").won_by("Kant").validate()
        );
    }

    #[test]
    fn test_battle_validate() {
        let mut battle = Battle {
            id: "b1".into(),
            name: "Final".into(),
            date: "2025-03-01".into(),
            location: "Lapa".into(),
            matchups: vec![Matchup::new("Zico", "Duda"), Matchup::default()],
            status: BattleStatus::Scheduled,
        };
        assert_eq!(Ok(()), battle.validate());

        battle.matchups[0].winner = Some("Kant".into());
        assert!(matches!(
            battle.validate(),
            Err(ValidationError::Matchup { index: 0, .. })
        ));

        battle.matchups = vec![Matchup::default()];
        assert_eq!(Err(ValidationError::NoMatchups), battle.validate());

        battle.location = " ".into();
        assert_eq!(Err(ValidationError::MissingField("location")), battle.validate());
    }

    #[test]
    fn test_status_of() {
        assert_eq!(BattleStatus::Scheduled, BattleStatus::of(&[]));
        assert_eq!(
            BattleStatus::Completed,
            BattleStatus::of(&[Matchup::new("a", "b"), Matchup::new("c", "d").won_by("c")])
        );
    }
}
