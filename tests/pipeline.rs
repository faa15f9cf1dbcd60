use chrono::{DateTime, Duration, NaiveDate, Utc};
use linesmith::adjustments::{
    injury_impact, InjuryConfig, InjuryRecord, InjuryStatus, InjuryType, Tier,
};
use linesmith::domain::{GameContext, MarketLine, Period, Surface, TeamId, TeamSchedule, Venue};
use linesmith::edge::{EdgeTier, GameInputs, Staker, Stability};
use linesmith::inputs::SlateInputs;
use linesmith::ratings::PowerRatingStore;
use linesmith::AppConfig;

fn as_of() -> DateTime<Utc> {
    DateTime::from_timestamp(1_760_000_000, 0).unwrap()
}

fn context(home: &str, away: &str) -> GameContext {
    GameContext {
        game_id: format!("2025-07-{away}-{home}"),
        period: Period::new(2025, 7),
        home: TeamId::new(home),
        away: TeamId::new(away),
        kickoff: as_of() + Duration::days(2),
        venue: Venue {
            id: format!("{home}-dome"),
            surface: Surface::Grass,
            indoor: true,
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

/// Game with the market quoting the home side at `home_line` (book notation)
fn game(home: &str, away: &str, home_line: f64) -> GameInputs {
    let context = context(home, away);
    GameInputs {
        market: MarketLine::from_book_home_line(
            context.game_id.clone(),
            "consensus",
            home_line,
            Some(44.5),
            as_of() - Duration::hours(12),
        ),
        context,
        weather: None,
        home_injuries: vec![],
        away_injuries: vec![],
    }
}

fn store(ratings: &[(&str, f64)]) -> PowerRatingStore {
    let store = PowerRatingStore::new(Default::default());
    for (team, rating) in ratings {
        store
            .register(TeamId::new(*team), *rating, Period::new(2025, 6))
            .unwrap();
    }
    store
}

fn out_quarterback(team: &str, injured: NaiveDate) -> InjuryRecord {
    InjuryRecord {
        player_id: format!("{team}-qb1"),
        player_name: "Starting QB".to_string(),
        team: TeamId::new(team),
        position: "QB".to_string(),
        tier: Tier::Starter,
        status: InjuryStatus::Out,
        injury_type: InjuryType::Ankle,
        injury_date: injured,
        report_date: as_of().date_naive(),
    }
}

#[test]
fn rating_gap_plus_home_field_predicts_seven_and_a_half() {
    let config = AppConfig::default();
    let evaluator = config.evaluator().unwrap();
    let store = store(&[("HOM", 90.0), ("AWY", 85.0)]);

    let eval = evaluator
        .evaluate(&store.snapshot(), &game("HOM", "AWY", -3.0), as_of())
        .unwrap();

    assert!((eval.edge.predicted.spread() - 7.5).abs() < 1e-9);
    assert_eq!(eval.situational.spread_delta, 0.0);
    assert_eq!(eval.weather.spread_delta, 0.0);
    assert_eq!(eval.edge.predicted.total(), 44.5);
    assert!(!eval.edge.confidence.is_low());
}

#[test]
fn out_player_costs_full_value_regardless_of_elapsed_days() {
    let team = TeamId::new("HOM");
    let config = InjuryConfig::default();
    for injured in [
        as_of().date_naive(),
        as_of().date_naive() - Duration::days(40),
    ] {
        let impact = injury_impact(&team, &[out_quarterback("HOM", injured)], as_of(), &config);
        assert!((impact.total - 4.5).abs() < 1e-9);
        assert!((impact.offensive - 4.5).abs() < 1e-9);
    }

    // The same loss flows through the full prediction
    let evaluator = AppConfig::default().evaluator().unwrap();
    let store = store(&[("HOM", 90.0), ("AWY", 85.0)]);
    let mut inputs = game("HOM", "AWY", -3.0);
    inputs.home_injuries = vec![out_quarterback("HOM", as_of().date_naive() - Duration::days(3))];

    let eval = evaluator.evaluate(&store.snapshot(), &inputs, as_of()).unwrap();
    assert!((eval.edge.predicted.spread() - 3.0).abs() < 1e-9);
    assert!((eval.edge.predicted.total() - 42.25).abs() < 1e-9);
}

#[test]
fn crossing_three_earns_a_higher_tier_than_an_equal_gap() {
    let evaluator = AppConfig::default().evaluator().unwrap();
    let store = store(&[("KEY", 81.5), ("OFF", 80.0), ("BIG", 91.0)]);
    let snapshot = store.snapshot();

    // Predicted 4.0 vs HOME -1: gap 3.0 across 3
    let across = evaluator
        .evaluate(&snapshot, &game("KEY", "OFF", -1.0), as_of())
        .unwrap()
        .edge;
    // Predicted 13.5 vs HOME -10.5: gap 3.0, no key number in between
    let between = evaluator
        .evaluate(&snapshot, &game("BIG", "OFF", -10.5), as_of())
        .unwrap()
        .edge;

    assert!((across.raw_gap - 3.0).abs() < 1e-9);
    assert!((between.raw_gap - 3.0).abs() < 1e-9);
    assert_eq!(across.key_numbers_crossed, vec![3.0]);
    assert!(between.key_numbers_crossed.is_empty());
    assert_eq!(across.tier, EdgeTier::Moderate);
    assert_eq!(between.tier, EdgeTier::Lean);
    assert!(across.tier > between.tier);
    assert_eq!(across.stability, Stability::Stable);
}

#[test]
fn slate_from_jsonl_directory() {
    let dir = tempfile::tempdir().unwrap();
    let games = [game("KEY", "OFF", -1.0), game("BIG", "NEW", -10.5)];

    let contexts: Vec<String> = games
        .iter()
        .map(|g| serde_json::to_string(&g.context).unwrap())
        .collect();
    let markets: Vec<String> = games
        .iter()
        .map(|g| serde_json::to_string(&g.market).unwrap())
        .collect();
    std::fs::write(dir.path().join("games.jsonl"), contexts.join("\n")).unwrap();
    std::fs::write(dir.path().join("markets.jsonl"), markets.join("\n")).unwrap();
    std::fs::write(
        dir.path().join("ratings.jsonl"),
        [
            r#"{"team":"KEY","rating":81.5,"period":{"season":2025,"week":6}}"#,
            r#"{"team":"OFF","rating":80.0,"period":{"season":2025,"week":6}}"#,
            r#"{"team":"BIG","rating":91.0,"period":{"season":2025,"week":6}}"#,
        ]
        .join("\n"),
    )
    .unwrap();
    // One unreadable injury line is skipped, not fatal
    std::fs::write(dir.path().join("injuries.jsonl"), "{\"player_id\":\n").unwrap();

    let slate = SlateInputs::load(dir.path()).unwrap();
    let store = PowerRatingStore::new(Default::default());
    store.seed(slate.ratings.clone()).unwrap();

    let assembled: Vec<GameInputs> = slate
        .assemble(as_of())
        .into_iter()
        .map(|(_, inputs)| inputs.unwrap())
        .collect();

    let config = AppConfig::default();
    let evaluator = config.evaluator().unwrap();
    let result = evaluator.evaluate_slate(&store, &assembled, as_of());

    // NEW has no rating
    let failures: Vec<_> = result.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].1.failing_id(), Some("NEW"));

    let mut staker = Staker::new(config.staking.clone());
    let recs = evaluator.recommend_slate(&mut staker, result.evaluations(), as_of());
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].tier, EdgeTier::Moderate);
    assert_eq!(recs[0].line_taken, -1.0);
    assert!(recs[0].stake_fraction <= config.staking.max_bet_fraction);
}
