use std::collections::HashSet;

use simple_fantasy::domain::{Candidate, Position, TeamId};
use simple_fantasy::fake_data::{demo_dataset, sample_candidate};
use simple_fantasy::ranking::{ordinal, rank, sort_by_score};
use simple_fantasy::score::{DifficultyPolicy, ScoreFormula, Scorer};

fn with_form(id: u32, position: Position, form: f64) -> Candidate {
    let mut c = sample_candidate(id, position, TeamId(id), 0.0);
    c.player.form = form;
    c
}

#[test]
fn ordinals_cover_the_awkward_numbers() {
    let cases = [
        (1, "1st"),
        (2, "2nd"),
        (3, "3rd"),
        (4, "4th"),
        (11, "11th"),
        (12, "12th"),
        (13, "13th"),
        (21, "21st"),
        (101, "101st"),
        (113, "113th"),
    ];
    for (n, expected) in cases {
        assert_eq!(ordinal(n), expected);
    }
}

#[test]
fn equal_scores_keep_input_order() {
    let mut candidates = vec![
        sample_candidate(1, Position::Defender, TeamId(1), 4.0),
        sample_candidate(2, Position::Forward, TeamId(2), 4.0),
        sample_candidate(3, Position::Midfielder, TeamId(3), 9.0),
        sample_candidate(4, Position::Defender, TeamId(4), 4.0),
    ];
    sort_by_score(&mut candidates);
    let ids: Vec<u32> = candidates.iter().map(|c| c.id().0).collect();
    assert_eq!(ids, vec![3, 1, 2, 4]);
}

#[test]
fn rank_assigns_overall_and_position_ranks() {
    let candidates = vec![
        with_form(1, Position::Defender, 3.0),
        with_form(2, Position::Forward, 8.0),
        with_form(3, Position::Defender, 6.0),
        with_form(4, Position::Goalkeeper, 1.0),
    ];
    let ranked = rank(candidates, &Scorer::canonical());

    let labels: Vec<(u32, String)> = ranked.iter().map(|c| (c.id().0, c.rank_label())).collect();
    assert_eq!(
        labels,
        vec![
            (2, "1st (1st)".to_string()),
            (3, "2nd (1st)".to_string()),
            (1, "3rd (2nd)".to_string()),
            (4, "4th (1st)".to_string()),
        ]
    );
    assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn unranked_candidate_has_placeholder_label() {
    let c = sample_candidate(1, Position::Forward, TeamId(1), 1.0);
    assert_eq!(c.rank_label(), "-");
}

#[test]
fn demo_ranks_are_permutations() {
    let dataset = demo_dataset(3).unwrap();
    let gw = dataset.default_gameweek().unwrap().id;
    let ranked = rank(dataset.gameweek_candidates(gw), &Scorer::canonical());
    assert!(!ranked.is_empty());

    let overall: HashSet<usize> = ranked.iter().filter_map(|c| c.ranks).map(|r| r.overall).collect();
    assert_eq!(overall, (1..=ranked.len()).collect());

    for position in Position::ALL {
        let ranks: Vec<usize> = ranked
            .iter()
            .filter(|c| c.position() == position)
            .filter_map(|c| c.ranks)
            .map(|r| r.position)
            .collect();
        let expected: Vec<usize> = (1..=ranks.len()).collect();
        assert_eq!(ranks, expected, "{position:?}");
    }
}

#[test]
fn raw_policy_can_reorder_the_table() {
    let mut balanced = with_form(1, Position::Midfielder, 6.0);
    balanced.fixture.home_difficulty = 3;
    balanced.fixture.away_difficulty = 3;
    let lopsided = with_form(2, Position::Midfielder, 4.0);

    let floor = rank(vec![balanced.clone(), lopsided.clone()], &Scorer::canonical());
    assert_eq!(floor[0].id().0, 2, "4 x 3 beats 6 x 1");

    let raw = Scorer::new(ScoreFormula::CANONICAL.with_difficulty(DifficultyPolicy::Raw));
    let ranked = rank(vec![balanced, lopsided], &raw);
    assert_eq!(ranked[1].score, 0.0);
}
