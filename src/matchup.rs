//! Conversion between matchup-centric [`Battle`]s and participant-centric [`BattleRecord`]s.
//!
//! Each [`Matchup`] is persisted as up to two [`Participant`] rows, one per side. Decoding folds
//! those symmetric rows back into a single matchup per unordered pair of names.

use std::collections::{HashMap, HashSet};

use crate::model::{
    Battle, BattleRecord, BattleStatus, Matchup, Mc, Outcome, Participant, DEFAULT_BATTLE_TYPE,
};

/// Name shown for a participant whose MC no longer exists.
pub const UNKNOWN_MC: &str = "Unknown MC";

/// Lookup of MC names by ID and IDs by name. First match wins for duplicates.
pub struct Roster<'a> {
    names: HashMap<&'a str, &'a str>,
    ids: HashMap<&'a str, &'a str>,
}
impl<'a> Roster<'a> {
    /// Indexes the MCs.
    pub fn new(mcs: &'a [Mc]) -> Self {
        let mut names = HashMap::with_capacity(mcs.len());
        let mut ids = HashMap::with_capacity(mcs.len());
        for mc in mcs {
            names.entry(mc.id.as_str()).or_insert(mc.name.as_str());
            ids.entry(mc.name.as_str()).or_insert(mc.id.as_str());
        }
        Self { names, ids }
    }

    /// Name of the MC with the given ID. A blank name counts as unknown.
    pub fn name(&self, id: &str) -> Option<&'a str> {
        self.names.get(id).copied().filter(|name| !name.is_empty())
    }

    /// ID of the (first) MC with the given name.
    pub fn id(&self, name: &str) -> Option<&'a str> {
        self.ids.get(name).copied()
    }
}

fn outcome(side: &str, other: &str, winner: Option<&str>) -> Option<Outcome> {
    match winner {
        Some(winner) if winner == side => Some(Outcome::Win),
        Some(winner) if winner == other => Some(Outcome::Loss),
        _ => None,
    }
}

/// Encodes one matchup as participant rows, skipping any side whose name is not in the roster.
pub fn encode_matchup(matchup: &Matchup, roster: &Roster<'_>) -> Vec<Participant> {
    let winner = matchup.winner.as_deref();
    [(&matchup.mc1, &matchup.mc2), (&matchup.mc2, &matchup.mc1)]
        .into_iter()
        .filter_map(|(side, other)| {
            Some(Participant {
                mc_id: roster.id(side)?.to_owned(),
                opponent: other.clone(),
                result: outcome(side, other, winner),
            })
        })
        .collect()
}

/// Encodes a battle for persistence. Incomplete matchups are dropped; the name and status are
/// not persisted.
pub fn encode_battle(battle: &Battle, mcs: &[Mc]) -> BattleRecord {
    let roster = Roster::new(mcs);
    BattleRecord {
        id: battle.id.clone(),
        date: battle.date.clone(),
        location: Some(battle.location.clone()).filter(|location| !location.is_empty()),
        kind: DEFAULT_BATTLE_TYPE.to_owned(),
        participants: battle
            .matchups
            .iter()
            .filter(|matchup| matchup.is_complete())
            .flat_map(|matchup| encode_matchup(matchup, &roster))
            .collect(),
    }
}

/// Order-independent key for a pair of names.
fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_owned(), b.to_owned())
    } else {
        (b.to_owned(), a.to_owned())
    }
}

/// Folds participant rows back into matchups, one per unordered pair of names. The first row
/// of a pair decides the orientation; its winner comes from its own result or, failing that,
/// from a `win` on the complementary row.
pub fn decode_participants(participants: &[Participant], roster: &Roster<'_>) -> Vec<Matchup> {
    let mut seen = HashSet::new();
    let mut matchups = Vec::new();
    for row in participants {
        let mc1 = roster.name(&row.mc_id).unwrap_or(UNKNOWN_MC);
        let mc2 = row.opponent.as_str();
        if !seen.insert(pair_key(mc1, mc2)) {
            continue;
        }

        let winner = match row.result {
            Some(Outcome::Win) => Some(mc1),
            Some(Outcome::Loss) => Some(mc2),
            None => participants
                .iter()
                .find(|other| roster.name(&other.mc_id) == Some(mc2) && other.opponent == mc1)
                .filter(|other| other.result == Some(Outcome::Win))
                .map(|_| mc2),
        };
        matchups.push(Matchup {
            mc1: mc1.to_owned(),
            mc2: mc2.to_owned(),
            winner: winner.map(str::to_owned),
        });
    }
    matchups
}

/// Decodes a persisted battle. A battle without any matchup gets one empty placeholder so there
/// is always a row to edit.
pub fn decode_battle(record: &BattleRecord, mcs: &[Mc]) -> Battle {
    let roster = Roster::new(mcs);
    let mut matchups = decode_participants(&record.participants, &roster);
    let status = BattleStatus::of(&matchups);
    if matchups.is_empty() {
        matchups.push(Matchup::default());
    }
    let location = record.location.clone().unwrap_or_default();
    Battle {
        id: record.id.clone(),
        name: format!("Battle - {}", location),
        date: record.date.clone(),
        location,
        matchups,
        status,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn roster() -> Vec<Mc> {
        vec![
            Mc::new("1", "Zico"),
            Mc::new("2", "Duda"),
            Mc::new("3", "Kant"),
            Mc::new("4", "Jhony"),
        ]
    }

    fn row(mc_id: &str, opponent: &str, result: Option<Outcome>) -> Participant {
        Participant {
            mc_id: mc_id.into(),
            opponent: opponent.into(),
            result,
        }
    }

    fn battle(matchups: Vec<Matchup>) -> Battle {
        Battle {
            id: "b1".into(),
            name: "Battle - Lapa".into(),
            date: "2025-03-01".into(),
            location: "Lapa".into(),
            status: BattleStatus::of(&matchups),
            matchups,
        }
    }

    /// Sorted pair plus winner, so matchups compare regardless of orientation.
    fn canonical(matchups: &[Matchup]) -> Vec<(String, String, Option<String>)> {
        let mut out = matchups
            .iter()
            .map(|m| {
                let (a, b) = pair_key(&m.mc1, &m.mc2);
                (a, b, m.winner.clone())
            })
            .collect::<Vec<_>>();
        out.sort();
        out
    }

    #[test]
    fn test_encode_worked_example() {
        let mcs = roster();
        let rows = encode_matchup(
            &Matchup::new("Zico", "Duda").won_by("Zico"),
            &Roster::new(&mcs),
        );
        assert_eq!(
            vec![
                row("1", "Duda", Some(Outcome::Win)),
                row("2", "Zico", Some(Outcome::Loss)),
            ],
            rows
        );
    }

    #[test]
    fn test_decode_worked_example() {
        let mcs = roster();
        let rows = [
            row("1", "Duda", Some(Outcome::Win)),
            row("2", "Zico", Some(Outcome::Loss)),
        ];
        assert_eq!(
            vec![Matchup::new("Zico", "Duda").won_by("Zico")],
            decode_participants(&rows, &Roster::new(&mcs))
        );
    }

    #[test]
    fn test_round_trip_with_winner() {
        let mcs = roster();
        for winner in ["Zico", "Duda"] {
            let original = battle(vec![Matchup::new("Zico", "Duda").won_by(winner)]);
            let decoded = decode_battle(&encode_battle(&original, &mcs), &mcs);
            assert_eq!(original.matchups, decoded.matchups);
            assert_eq!(BattleStatus::Completed, decoded.status);
        }
    }

    #[test]
    fn test_no_winner() {
        let mcs = roster();
        let record = encode_battle(&battle(vec![Matchup::new("Kant", "Jhony")]), &mcs);
        assert!(record.participants.iter().all(|p| p.result.is_none()));
        assert_eq!(2, record.participants.len());

        let decoded = decode_battle(&record, &mcs);
        assert_eq!(vec![Matchup::new("Kant", "Jhony")], decoded.matchups);
        assert_eq!(BattleStatus::Scheduled, decoded.status);
    }

    #[test]
    fn test_decode_is_order_independent() {
        let mcs = roster();
        let record = encode_battle(
            &battle(vec![
                Matchup::new("Zico", "Duda").won_by("Duda"),
                Matchup::new("Kant", "Jhony"),
                Matchup::new("Zico", "Kant").won_by("Zico"),
            ]),
            &mcs,
        );
        let roster = Roster::new(&mcs);
        let expected = canonical(&decode_participants(&record.participants, &roster));
        assert_eq!(3, expected.len());

        let mut rows = record.participants.clone();
        rows.reverse();
        assert_eq!(expected, canonical(&decode_participants(&rows, &roster)));
        rows.rotate_left(2);
        assert_eq!(expected, canonical(&decode_participants(&rows, &roster)));
    }

    #[test]
    fn test_winner_from_complementary_row() {
        let mcs = roster();
        let rows = [
            row("1", "Duda", None),
            row("2", "Zico", Some(Outcome::Win)),
        ];
        assert_eq!(
            vec![Matchup::new("Zico", "Duda").won_by("Duda")],
            decode_participants(&rows, &Roster::new(&mcs))
        );
    }

    #[test]
    fn test_complementary_loss_is_not_consulted() {
        let mcs = roster();
        let rows = [
            row("1", "Duda", None),
            row("2", "Zico", Some(Outcome::Loss)),
        ];
        assert_eq!(
            vec![Matchup::new("Zico", "Duda")],
            decode_participants(&rows, &Roster::new(&mcs))
        );
    }

    #[test]
    fn test_unknown_mc_falls_back_to_sentinel() {
        let mcs = roster();
        let rows = [row("99", "Duda", Some(Outcome::Loss))];
        assert_eq!(
            vec![Matchup::new(UNKNOWN_MC, "Duda").won_by("Duda")],
            decode_participants(&rows, &Roster::new(&mcs))
        );
    }

    #[test]
    fn test_blank_name_falls_back_to_sentinel() {
        let mcs = vec![Mc::new("1", ""), Mc::new("2", "Duda")];
        let rows = [row("1", "Duda", Some(Outcome::Win))];
        assert_eq!(
            vec![Matchup::new(UNKNOWN_MC, "Duda").won_by(UNKNOWN_MC)],
            decode_participants(&rows, &Roster::new(&mcs))
        );
    }

    #[test]
    fn test_encode_skips_unresolved_side() {
        let mcs = roster();
        let rows = encode_matchup(
            &Matchup::new("Zico", "Ghost").won_by("Ghost"),
            &Roster::new(&mcs),
        );
        assert_eq!(vec![row("1", "Ghost", Some(Outcome::Loss))], rows);
    }

    #[test]
    fn test_encode_drops_incomplete_matchups() {
        let mcs = roster();
        let record = encode_battle(
            &battle(vec![Matchup::new("Zico", ""), Matchup::new("Kant", "Duda")]),
            &mcs,
        );
        assert_eq!(
            vec![row("3", "Duda", None), row("2", "Kant", None)],
            record.participants
        );
    }

    #[test]
    fn test_empty_battle_gets_placeholder() {
        let record = BattleRecord {
            id: "b2".into(),
            date: "2025-04-01".into(),
            location: None,
            kind: DEFAULT_BATTLE_TYPE.into(),
            participants: vec![],
        };
        let decoded = decode_battle(&record, &roster());
        assert_eq!(vec![Matchup::default()], decoded.matchups);
        assert_eq!(BattleStatus::Scheduled, decoded.status);
        assert_eq!("", decoded.location);
    }

    #[test]
    fn test_status_completed_if_any_winner() {
        let mcs = roster();
        let record = encode_battle(
            &battle(vec![
                Matchup::new("Zico", "Duda"),
                Matchup::new("Kant", "Jhony").won_by("Jhony"),
            ]),
            &mcs,
        );
        let decoded = decode_battle(&record, &mcs);
        assert_eq!(BattleStatus::Completed, decoded.status);
        assert_eq!("Battle - Lapa", decoded.name);
    }
}
