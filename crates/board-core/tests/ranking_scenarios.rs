// crates/board-core/tests/ranking_scenarios.rs
use board_core::{RankingSnapshot, Scoreboard, DEFAULT_TOP_K};
use board_protocol::json_codec::{decode_snapshot, parse_update};

const KEY: &str = "leaderboard";

struct Scenario {
    name: String,
    submissions: Vec<String>,
    expected: String,
}

fn load_scenarios() -> Vec<Scenario> {
    const INPUT: &str = include_str!("data/scenarios.txt");

    let mut scenarios = Vec::new();
    let mut current: Option<Scenario> = None;

    for line in INPUT.lines() {
        let line = line.trim();
        if let Some(name) = line.strip_prefix("#name:") {
            if let Some(done) = current.take() {
                scenarios.push(done);
            }
            current = Some(Scenario {
                name: name.trim().to_string(),
                submissions: Vec::new(),
                expected: String::new(),
            });
        } else if let Some(expected) = line.strip_prefix("expect:") {
            let scenario = current.as_mut().expect("expect before #name");
            scenario.expected = expected.trim().to_string();
        } else if !line.is_empty() {
            let scenario = current.as_mut().expect("submission before #name");
            scenario.submissions.push(line.to_string());
        }
    }
    if let Some(done) = current.take() {
        scenarios.push(done);
    }
    scenarios
}

#[test]
fn scenarios_match_expected_rankings() {
    let scenarios = load_scenarios();
    assert!(scenarios.len() >= 5, "scenario file not parsed");

    for scenario in scenarios {
        let mut board = Scoreboard::new();
        for body in &scenario.submissions {
            if let Ok(entry) = parse_update(body.as_bytes()) {
                board.upsert(KEY, &entry);
            }
        }

        let snapshot = RankingSnapshot::from_unsorted(1, board.top(KEY, DEFAULT_TOP_K), DEFAULT_TOP_K);
        let expected = decode_snapshot(&scenario.expected).expect("bad expectation");

        assert_eq!(snapshot.entries, expected, "scenario: {}", scenario.name);
    }
}

#[test]
fn snapshot_length_is_min_of_k_and_distinct_names() {
    let mut board = Scoreboard::new();

    for i in 0..20_i64 {
        let name = format!("player{}", i % 9);
        let entry = parse_update(format!(r#"{{"name":"{name}","score":{i}}}"#).as_bytes()).unwrap();
        board.upsert(KEY, &entry);

        let distinct = board.get_board(KEY).map(|b| b.len()).unwrap_or(0);
        let top = board.top(KEY, DEFAULT_TOP_K);

        assert_eq!(top.len(), distinct.min(DEFAULT_TOP_K));
        assert!(top.windows(2).all(|w| w[0].score >= w[1].score));
    }

    assert_eq!(board.get_board(KEY).unwrap().len(), 9);
}

#[test]
fn never_two_entries_for_one_name() {
    let mut board = Scoreboard::new();
    for score in [5, 50, 3, 3, 500, -1] {
        board.upsert(KEY, &board_core::ScoreEntry::new("same", score).unwrap());
    }

    let top = board.top(KEY, DEFAULT_TOP_K);
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].score, -1);
}
