use simple_fantasy::domain::{Candidate, Position, TeamId};
use simple_fantasy::fake_data::{demo_dataset, sample_candidate};
use simple_fantasy::ranking::{rank, sort_by_score};
use simple_fantasy::score::{ScoreFormula, ScoreStrategy, Scorer};
use simple_fantasy::squad::{
    FORMATIONS, Formation, MAX_PLAYERS_PER_CLUB, Squad, SquadBuilder, build_best_squad,
    differentials, filter_candidates, intersect,
};

fn scored(id: u32, position: Position, club: u32, form: f64, ict: f64, starts: f64) -> Candidate {
    let mut c = sample_candidate(id, position, TeamId(club), 0.0);
    c.player.form = form;
    c.player.stats.ict_index = ict;
    c.player.stats.starts_per_90 = starts;
    c.fixture.home_difficulty = 2;
    c.fixture.away_difficulty = 3;
    c.score = ScoreFormula::CANONICAL.score(&c);
    c
}

#[test]
fn keeper_and_three_defenders_are_all_selected() {
    let mut ranked = vec![
        scored(1, Position::Goalkeeper, 1, 5.0, 2.0, 0.9),
        scored(2, Position::Defender, 2, 4.0, 3.0, 1.0),
        scored(3, Position::Defender, 3, 3.0, 2.5, 0.8),
        scored(4, Position::Defender, 4, 2.0, 4.0, 1.0),
    ];
    assert!((ranked[0].score - 5.0 * 2.0 * 2.0 * 0.9).abs() < 1e-9);
    sort_by_score(&mut ranked);

    let squad = SquadBuilder::new(vec![Formation::new(1, 3, 0, 0)]).build(&ranked);
    assert_eq!(squad.len(), 4);
    assert!(squad.is_complete());
    let expected: f64 = ranked.iter().map(|c| c.score).sum();
    assert!((squad.total_score() - expected).abs() < 1e-9);
}

#[test]
fn fourth_player_from_one_club_is_skipped() {
    let ranked = vec![
        sample_candidate(1, Position::Midfielder, TeamId(1), 10.0),
        sample_candidate(2, Position::Midfielder, TeamId(1), 9.0),
        sample_candidate(3, Position::Midfielder, TeamId(1), 8.0),
        sample_candidate(4, Position::Midfielder, TeamId(1), 7.0),
        sample_candidate(5, Position::Midfielder, TeamId(2), 1.0),
    ];
    let squad = SquadBuilder::new(vec![Formation::new(0, 0, 4, 0)]).build(&ranked);
    let ids: Vec<u32> = squad.iter().map(|c| c.id().0).collect();
    assert_eq!(ids, vec![1, 2, 3, 5]);
    assert_eq!(squad.club_counts()[&TeamId(1)], MAX_PLAYERS_PER_CLUB);
}

#[test]
fn club_cap_is_configurable() {
    let ranked = vec![
        sample_candidate(1, Position::Forward, TeamId(1), 10.0),
        sample_candidate(2, Position::Forward, TeamId(1), 9.0),
        sample_candidate(3, Position::Forward, TeamId(2), 1.0),
    ];
    let squad = SquadBuilder::new(vec![Formation::new(0, 0, 0, 2)])
        .with_club_cap(1)
        .build(&ranked);
    let ids: Vec<u32> = squad.iter().map(|c| c.id().0).collect();
    assert_eq!(ids, vec![1, 3]);
}

#[test]
fn balanced_fixture_does_not_zero_the_score() {
    let mut c = scored(1, Position::Forward, 1, 6.0, 5.0, 1.0);
    c.fixture.home_difficulty = 3;
    c.fixture.away_difficulty = 3;
    assert_eq!(c.difficulty_majority(), 0);
    assert!((ScoreFormula::CANONICAL.score(&c) - 30.0).abs() < 1e-9);
}

#[test]
fn picks_the_best_shape_from_the_catalogue() {
    // Strong forwards favour a three-up shape.
    let mut ranked = Vec::new();
    let mut id = 1;
    let mut club = 1;
    let mut push = |position: Position, count: usize, score: f64| {
        for _ in 0..count {
            ranked.push(sample_candidate(id, position, TeamId(club), score));
            id += 1;
            club += 1;
        }
    };
    push(Position::Forward, 3, 20.0);
    push(Position::Goalkeeper, 1, 5.0);
    push(Position::Defender, 5, 4.0);
    push(Position::Midfielder, 5, 3.0);
    push(Position::Defender, 1, 1.0);
    sort_by_score(&mut ranked);

    let squad = build_best_squad(&ranked);
    assert_eq!(squad.formation, Some(Formation::new(1, 5, 2, 3)));
    for shape in FORMATIONS {
        let other = SquadBuilder::new(vec![shape]).fill(&ranked, shape);
        assert!(squad.total_score() >= other.total_score());
    }
}

#[test]
fn thin_pool_yields_incomplete_squad() {
    let ranked = vec![
        sample_candidate(1, Position::Goalkeeper, TeamId(1), 3.0),
        sample_candidate(2, Position::Forward, TeamId(2), 2.0),
    ];
    let squad = build_best_squad(&ranked);
    assert_eq!(squad.len(), 2);
    assert!(!squad.is_complete());
}

#[test]
fn demo_squads_respect_every_constraint() {
    let dataset = demo_dataset(11).unwrap();
    let gw = dataset.default_gameweek().unwrap().id;
    let ranked = rank(dataset.likely_winner_candidates(gw), &Scorer::canonical());
    let builder = SquadBuilder::standard().restricted_to(dataset.rules());
    let squad = builder.build(&ranked);

    let shape = squad.formation.expect("a shape is chosen");
    assert!(shape.within(dataset.rules()));
    for position in Position::ALL {
        assert!(squad.players(position).len() <= shape.quota(position));
    }
    assert!(squad.club_counts().values().all(|n| *n <= MAX_PLAYERS_PER_CLUB));
    for other in builder.shapes() {
        assert!(squad.total_score() >= builder.fill(&ranked, *other).total_score());
    }
}

#[test]
fn differential_squad_only_holds_low_ownership_players() {
    let dataset = demo_dataset(5).unwrap();
    let gw = dataset.default_gameweek().unwrap().id;
    let ranked = rank(dataset.likely_winner_candidates(gw), &Scorer::canonical());
    let low = differentials(&ranked, 15.0);
    assert!(low.len() < ranked.len());
    let squad = build_best_squad(&low);
    assert!(!squad.is_empty());
    assert!(squad.iter().all(|c| c.player.selected_by_percent < 15.0));
}

#[test]
fn filter_keeps_ranked_order() {
    let ranked = vec![
        sample_candidate(1, Position::Defender, TeamId(1), 9.0),
        sample_candidate(2, Position::Forward, TeamId(2), 8.0),
        sample_candidate(3, Position::Defender, TeamId(3), 7.0),
    ];
    let defenders = filter_candidates(&ranked, |c| c.position() == Position::Defender);
    let ids: Vec<u32> = defenders.iter().map(|c| c.id().0).collect();
    assert_eq!(ids, vec![1, 3]);
}

#[test]
fn intersect_matches_by_identity_per_position() {
    let mut a = Squad::new(None);
    a.push(sample_candidate(1, Position::Defender, TeamId(1), 5.0));
    a.push(sample_candidate(2, Position::Midfielder, TeamId(2), 4.0));
    a.push(sample_candidate(3, Position::Forward, TeamId(3), 3.0));
    let mut b = Squad::new(None);
    b.push(sample_candidate(2, Position::Midfielder, TeamId(2), 4.0));
    b.push(sample_candidate(3, Position::Forward, TeamId(3), 3.0));
    b.push(sample_candidate(9, Position::Defender, TeamId(9), 1.0));

    let both = intersect(&a, &b);
    let ids: Vec<u32> = both.iter().map(|c| c.id().0).collect();
    assert_eq!(ids, vec![2, 3]);
    assert!(intersect(&a, &Squad::default()).is_empty());
}
