//! Dashboard aggregates for `GET /stats`.

use chrono::NaiveDate;

use crate::model::{BattleRecord, BattleSummary, Mc};

/// Result sizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatsLimits {
    /// Max entries in [`Stats::top_mcs`].
    pub top_mcs: usize,
    /// Max entries in [`Stats::upcoming_battles`].
    pub upcoming_battles: usize,
}
impl Default for StatsLimits {
    fn default() -> Self {
        Self {
            top_mcs: 10,
            upcoming_battles: 5,
        }
    }
}

/// `GET /stats` response.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// MCs with the most wins first.
    pub top_mcs: Vec<Mc>,
    /// Battles today or later, soonest first.
    pub upcoming_battles: Vec<BattleSummary>,
}

/// MCs ordered by wins, descending. Ties keep their stored order.
pub fn top_mcs(mut mcs: Vec<Mc>, limit: usize) -> Vec<Mc> {
    mcs.sort_by(|a, b| b.wins.cmp(&a.wins));
    mcs.truncate(limit);
    mcs
}

/// Battles dated `today` or later, ascending. Battles with unparseable dates are skipped.
pub fn upcoming_battles(
    battles: &[BattleRecord],
    today: NaiveDate,
    limit: usize,
) -> Vec<BattleSummary> {
    let mut upcoming = battles
        .iter()
        .filter_map(|battle| Some((parse_date(&battle.date)?, battle)))
        .filter(|&(date, _)| date >= today)
        .collect::<Vec<_>>();
    upcoming.sort_by_key(|&(date, _)| date);
    upcoming
        .into_iter()
        .take(limit)
        .map(|(_, battle)| battle.summary())
        .collect()
}

/// Parses the `YYYY-MM-DD` prefix, so full timestamps are accepted too.
fn parse_date(date: &str) -> Option<NaiveDate> {
    let prefix = date.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::DEFAULT_BATTLE_TYPE;

    fn battle(id: &str, date: &str) -> BattleRecord {
        BattleRecord {
            id: id.into(),
            date: date.into(),
            location: Some("Lapa".into()),
            kind: DEFAULT_BATTLE_TYPE.into(),
            participants: vec![],
        }
    }

    #[test]
    fn test_top_mcs_stable() {
        let mcs = vec![
            Mc::new("1", "Zico").with_record(2, 0, 0),
            Mc::new("2", "Duda").with_record(5, 1, 0),
            Mc::new("3", "Kant").with_record(2, 3, 0),
        ];
        let top = top_mcs(mcs, 2);
        assert_eq!(
            vec!["Duda", "Zico"],
            top.iter().map(|mc| mc.name.as_str()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_upcoming_battles() {
        let battles = vec![
            battle("past", "2025-02-28"),
            battle("later", "2025-04-10"),
            battle("today", "2025-03-01"),
            battle("stamp", "2025-03-05T20:00:00Z"),
            battle("bad", "soon"),
        ];
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let upcoming = upcoming_battles(&battles, today, 5);
        assert_eq!(
            vec!["today", "stamp", "later"],
            upcoming.iter().map(|b| b.id.as_str()).collect::<Vec<_>>()
        );

        let limited = upcoming_battles(&battles, today, 1);
        assert_eq!(1, limited.len());
    }

    #[test]
    fn test_stats_wire_format() {
        let stats = Stats {
            top_mcs: vec![],
            upcoming_battles: vec![battle("b1", "2025-03-01").summary()],
        };
        let value = serde_json::to_value(stats).unwrap();
        assert_eq!("beat", value["upcomingBattles"][0]["type"]);
        assert!(value["topMcs"].as_array().unwrap().is_empty());
    }
}
