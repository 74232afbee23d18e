use simple_fantasy::domain::{GameweekId, PlayerId, Position, TeamId};
use simple_fantasy::fake_data::{demo_dataset, demo_position_rules, sample_candidate};
use simple_fantasy::persist::SnapshotStore;
use simple_fantasy::ranking::rank;
use simple_fantasy::score::Scorer;

#[test]
fn stores_and_loads_one_gameweek() {
    let mut store = SnapshotStore::open_in_memory().unwrap();
    store.store_position_rules(&demo_position_rules()).unwrap();

    let mut low = sample_candidate(1, Position::Defender, TeamId(1), 2.0);
    low.most_captained = true;
    let high = sample_candidate(2, Position::Forward, TeamId(2), 7.5);
    let mut elsewhere = sample_candidate(3, Position::Forward, TeamId(3), 9.0);
    elsewhere.fixture.gameweek = GameweekId(2);

    let written = store
        .store_candidates(GameweekId(1), &[low, high, elsewhere])
        .unwrap();
    assert_eq!(written, 2, "other gameweeks are skipped");

    let rows = store.load_snapshot(GameweekId(1)).unwrap();
    let ids: Vec<PlayerId> = rows.iter().map(|r| r.player_id).collect();
    assert_eq!(ids, vec![PlayerId(2), PlayerId(1)]);
    assert!(rows[1].most_captained);
    assert_eq!(rows[1].position, "DEF");
    assert_eq!(rows[0].difficulty_majority, 2);
    assert_eq!(rows[0].cost, 50);
    assert!(store.load_snapshot(GameweekId(2)).unwrap().is_empty());
}

#[test]
fn rerunning_a_gameweek_overwrites_rows() {
    let mut store = SnapshotStore::open_in_memory().unwrap();
    let first = sample_candidate(1, Position::Midfielder, TeamId(1), 3.0);
    store.store_candidates(GameweekId(1), &[first]).unwrap();

    let mut second = sample_candidate(1, Position::Midfielder, TeamId(1), 6.0);
    second.player.form = 7.0;
    store.store_candidates(GameweekId(1), &[second]).unwrap();

    let rows = store.load_snapshot(GameweekId(1)).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].score, 6.0);
    assert_eq!(rows[0].form, 7.0);
    assert_eq!(store.run_count().unwrap(), 2);
}

#[test]
fn player_history_spans_gameweeks() {
    let mut store = SnapshotStore::open_in_memory().unwrap();
    for gw in [3, 1, 2] {
        let mut c = sample_candidate(5, Position::Goalkeeper, TeamId(1), gw as f64);
        c.fixture.gameweek = GameweekId(gw);
        store.store_candidates(GameweekId(gw), &[c]).unwrap();
    }
    let history = store.player_snapshots(PlayerId(5)).unwrap();
    let gameweeks: Vec<u32> = history.iter().map(|s| s.gameweek_id.0).collect();
    assert_eq!(gameweeks, vec![1, 2, 3]);
    assert!(store.player_snapshots(PlayerId(6)).unwrap().is_empty());
}

#[test]
fn demo_gameweek_round_trips_through_sqlite() {
    let dataset = demo_dataset(9).unwrap();
    let gw = dataset.default_gameweek().unwrap().id;
    let ranked = rank(dataset.gameweek_candidates(gw), &Scorer::canonical());

    let mut store = SnapshotStore::open_in_memory().unwrap();
    store.store_position_rules(dataset.rules()).unwrap();
    let written = store.store_candidates(gw, &ranked).unwrap();
    assert_eq!(written, ranked.len());

    let rows = store.load_snapshot(gw).unwrap();
    assert_eq!(rows.len(), ranked.len());
    assert!(rows.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(rows[0].player_id, ranked[0].id());
}
