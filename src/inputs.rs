//! Line-delimited JSON inputs for a slate run.
//!
//! Input directory layout:
//!
//! | File              | Record             | Required |
//! |-------------------|--------------------|----------|
//! | `games.jsonl`     | [`GameContext`]    | yes      |
//! | `markets.jsonl`   | [`MarketLine`]     | yes      |
//! | `ratings.jsonl`   | [`TeamRating`]     | no       |
//! | `weather.jsonl`   | [`WeatherObservation`] | no   |
//! | `injuries.jsonl`  | [`InjuryRecord`]   | no       |

use crate::adjustments::{select_observation, InjuryHistory, InjuryRecord, WeatherObservation};
use crate::domain::{GameContext, MarketHistory, MarketLine, TeamRating};
use crate::edge::GameInputs;
use crate::error::{LinesmithError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

/// What to do with a line that does not parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnMalformed {
    /// Abort with [`LinesmithError::MalformedRecord`]
    Fail,
    /// Log and continue
    Skip,
}

/// Parse line-delimited JSON. Blank lines are ignored; line numbers are 1-based.
pub fn parse_jsonl<T: DeserializeOwned>(reader: impl BufRead, policy: OnMalformed) -> Result<Vec<T>> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(trimmed) {
            Ok(record) => records.push(record),
            Err(e) => match policy {
                OnMalformed::Fail => {
                    return Err(LinesmithError::MalformedRecord {
                        line: idx + 1,
                        reason: e.to_string(),
                    })
                }
                OnMalformed::Skip => {
                    warn!(line = idx + 1, error = %e, "Skipping malformed record");
                }
            },
        }
    }
    Ok(records)
}

/// Read a JSONL file
pub fn read_jsonl<T: DeserializeOwned>(path: &Path, policy: OnMalformed) -> Result<Vec<T>> {
    let file = File::open(path)?;
    let records = parse_jsonl(BufReader::new(file), policy)?;
    debug!("Read {} records from {:?}", records.len(), path);
    Ok(records)
}

fn read_optional<T: DeserializeOwned>(path: &Path, policy: OnMalformed) -> Result<Vec<T>> {
    if !path.exists() {
        debug!("No {:?}, continuing without it", path);
        return Ok(Vec::new());
    }
    read_jsonl(path, policy)
}

/// Raw records for one slate, before they are matched up per game
#[derive(Debug, Default)]
pub struct SlateInputs {
    pub games: Vec<GameContext>,
    pub markets: HashMap<String, MarketHistory>,
    pub ratings: Vec<TeamRating>,
    pub weather: Vec<WeatherObservation>,
    pub injuries: InjuryHistory,
}

impl SlateInputs {
    /// Load every input file from `dir`. Malformed injury lines are skipped;
    /// any other malformed line fails the load.
    pub fn load(dir: &Path) -> Result<Self> {
        let games: Vec<GameContext> = read_jsonl(&dir.join("games.jsonl"), OnMalformed::Fail)?;
        let lines: Vec<MarketLine> = read_jsonl(&dir.join("markets.jsonl"), OnMalformed::Fail)?;
        let ratings = read_optional(&dir.join("ratings.jsonl"), OnMalformed::Fail)?;
        let weather = read_optional(&dir.join("weather.jsonl"), OnMalformed::Fail)?;
        let injury_records: Vec<InjuryRecord> =
            read_optional(&dir.join("injuries.jsonl"), OnMalformed::Skip)?;

        let mut slate = Self {
            games,
            ratings,
            weather,
            ..Default::default()
        };
        for line in lines {
            slate.add_market(line);
        }
        slate.injuries.extend(injury_records);

        info!(
            games = slate.games.len(),
            markets = slate.markets.len(),
            observations = slate.weather.len(),
            "Loaded slate inputs from {:?}",
            dir
        );
        Ok(slate)
    }

    pub fn add_market(&mut self, line: MarketLine) {
        self.markets.entry(line.game_id.clone()).or_default().push(line);
    }

    /// Posted line for a game: the latest capture at or before `as_of`.
    ///
    /// This is the line a bet opens at, and becomes its `opening_line`.
    pub fn posted_line(&self, game_id: &str, as_of: DateTime<Utc>) -> Result<&MarketLine> {
        self.markets
            .get(game_id)
            .and_then(|history| history.closing(as_of))
            .ok_or_else(|| LinesmithError::NotFound {
                entity: "Market line",
                id: game_id.to_string(),
            })
    }

    /// Closing line for a game: the last capture at or before kickoff
    pub fn closing_line(&self, game: &GameContext) -> Option<&MarketLine> {
        self.markets.get(&game.game_id)?.closing(game.kickoff)
    }

    /// Match markets, weather and injuries to each game, in input order
    pub fn assemble(&self, as_of: DateTime<Utc>) -> Vec<(String, Result<GameInputs>)> {
        self.games
            .iter()
            .map(|game| {
                let inputs = self.posted_line(&game.game_id, as_of).map(|market| GameInputs {
                    context: game.clone(),
                    market: market.clone(),
                    weather: select_observation(&self.weather, &game.venue.id, game.kickoff).cloned(),
                    home_injuries: self.injuries.team_records(&game.home, as_of.date_naive()),
                    away_injuries: self.injuries.team_records(&game.away, as_of.date_naive()),
                });
                (game.game_id.clone(), inputs)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjustments::{InjuryStatus, Tier};
    use crate::domain::{Period, Surface, TeamId, TeamSchedule, Venue};
    use chrono::Duration;
    use std::io::Cursor;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_760_000_000, 0).unwrap()
    }

    fn game(id: &str, home: &str, away: &str) -> GameContext {
        GameContext {
            game_id: id.to_string(),
            period: Period::new(2025, 7),
            home: TeamId::new(home),
            away: TeamId::new(away),
            kickoff: t0() + Duration::hours(48),
            venue: Venue {
                id: format!("{home}-field"),
                surface: Surface::Grass,
                indoor: false,
            },
            neutral_site: false,
            home_schedule: TeamSchedule {
                rest_days: 7,
                ..Default::default()
            },
            away_schedule: TeamSchedule {
                rest_days: 7,
                ..Default::default()
            },
            divisional: false,
            conference: false,
            primetime: false,
            postseason: false,
        }
    }

    #[test]
    fn test_blank_lines_ignored() {
        let input = "{\"team\":\"KC\",\"rating\":6.5,\"period\":{\"season\":2025,\"week\":1}}\n\n   \n";
        let ratings: Vec<TeamRating> = parse_jsonl(Cursor::new(input), OnMalformed::Fail).unwrap();
        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings[0].version, 0);
    }

    #[test]
    fn test_fail_reports_line_number() {
        let input = "{\"team\":\"KC\",\"rating\":6.5,\"period\":{\"season\":2025,\"week\":1}}\n\nnot json\n";
        let err = parse_jsonl::<TeamRating>(Cursor::new(input), OnMalformed::Fail).unwrap_err();
        match err {
            LinesmithError::MalformedRecord { line, .. } => assert_eq!(line, 3),
            other => panic!("expected malformed record, got {other:?}"),
        }
    }

    #[test]
    fn test_skip_keeps_good_lines() {
        let good = InjuryRecord {
            player_id: "p1".to_string(),
            player_name: "Starter".to_string(),
            team: TeamId::new("KC"),
            position: "WR".to_string(),
            tier: Tier::Starter,
            status: InjuryStatus::Questionable,
            injury_type: Default::default(),
            injury_date: t0().date_naive(),
            report_date: t0().date_naive(),
        };
        let input = format!(
            "{}\n{{\"player_id\": 7}}\n{}\n",
            serde_json::to_string(&good).unwrap(),
            serde_json::to_string(&good).unwrap()
        );
        let records: Vec<InjuryRecord> = parse_jsonl(Cursor::new(input), OnMalformed::Skip).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_posted_line_ignores_future_captures() {
        let mut slate = SlateInputs::default();
        slate.games.push(game("g1", "KC", "BUF"));
        slate.add_market(MarketLine::from_book_home_line("g1", "book", -3.0, Some(48.5), t0()));
        slate.add_market(MarketLine::from_book_home_line(
            "g1",
            "book",
            -4.5,
            Some(48.5),
            t0() + Duration::hours(30),
        ));

        assert_eq!(slate.posted_line("g1", t0() + Duration::hours(1)).unwrap().spread, 3.0);
        assert_eq!(slate.closing_line(&slate.games[0]).unwrap().spread, 4.5);
        assert!(matches!(
            slate.posted_line("g2", t0()),
            Err(LinesmithError::NotFound { .. })
        ));
    }

    #[test]
    fn test_assemble_matches_inputs_per_game() {
        let mut slate = SlateInputs::default();
        slate.games.push(game("g1", "KC", "BUF"));
        slate.games.push(game("g2", "DAL", "NYG"));
        slate.add_market(MarketLine::from_book_home_line("g1", "book", -2.5, None, t0()));
        slate.weather.push(WeatherObservation {
            venue_id: "KC-field".to_string(),
            temperature_f: 30.0,
            wind_mph: 5.0,
            precipitation: Default::default(),
            observed_at: t0() + Duration::hours(45),
        });
        slate.injuries.extend([
            InjuryRecord {
                player_id: "kc-1".to_string(),
                player_name: "Home Guard".to_string(),
                team: TeamId::new("KC"),
                position: "OG".to_string(),
                tier: Tier::Starter,
                status: InjuryStatus::Out,
                injury_type: Default::default(),
                injury_date: t0().date_naive(),
                report_date: t0().date_naive(),
            },
            InjuryRecord {
                player_id: "buf-1".to_string(),
                player_name: "Road Corner".to_string(),
                team: TeamId::new("BUF"),
                position: "CB".to_string(),
                tier: Tier::Elite,
                status: InjuryStatus::Doubtful,
                injury_type: Default::default(),
                injury_date: t0().date_naive(),
                report_date: t0().date_naive(),
            },
            // Published after the evaluation time
            InjuryRecord {
                player_id: "buf-2".to_string(),
                player_name: "Road Tackle".to_string(),
                team: TeamId::new("BUF"),
                position: "OT".to_string(),
                tier: Tier::Starter,
                status: InjuryStatus::Out,
                injury_type: Default::default(),
                injury_date: t0().date_naive(),
                report_date: (t0() + Duration::days(3)).date_naive(),
            },
        ]);

        let assembled = slate.assemble(t0() + Duration::hours(1));
        assert_eq!(assembled.len(), 2);

        let (id, inputs) = &assembled[0];
        assert_eq!(id, "g1");
        let inputs = inputs.as_ref().unwrap();
        assert_eq!(inputs.weather.as_ref().map(|w| w.temperature_f), Some(30.0));
        assert_eq!(inputs.home_injuries.len(), 1);
        assert_eq!(inputs.away_injuries.len(), 1);
        assert_eq!(inputs.away_injuries[0].player_id, "buf-1");

        let (id, missing) = &assembled[1];
        assert_eq!(id, "g2");
        assert_eq!(missing.as_ref().unwrap_err().failing_id(), Some("g2"));
    }

    #[test]
    fn test_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        let g = game("g1", "KC", "BUF");
        std::fs::write(
            dir.path().join("games.jsonl"),
            format!("{}\n", serde_json::to_string(&g).unwrap()),
        )
        .unwrap();
        let line = MarketLine::from_book_home_line("g1", "book", -1.5, None, t0());
        std::fs::write(
            dir.path().join("markets.jsonl"),
            format!("{}\n", serde_json::to_string(&line).unwrap()),
        )
        .unwrap();
        std::fs::write(dir.path().join("injuries.jsonl"), "garbage\n").unwrap();

        let slate = SlateInputs::load(dir.path()).unwrap();
        assert_eq!(slate.games.len(), 1);
        assert!(slate.ratings.is_empty());
        assert!(slate.weather.is_empty());
        assert_eq!(slate.markets["g1"].captures().len(), 1);

        std::fs::write(dir.path().join("weather.jsonl"), "{}\n").unwrap();
        assert!(matches!(
            SlateInputs::load(dir.path()),
            Err(LinesmithError::MalformedRecord { line: 1, .. })
        ));
    }
}
