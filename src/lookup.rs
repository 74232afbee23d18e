use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::domain::{Candidate, PlayerId};
use crate::error::{PickerError, PickerResult};

pub const MAX_EDIT_DISTANCE: usize = 2;
const MIN_CONTAINS_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Contains,
    Approximate(usize),
}

/// Lowercase with diacritics stripped, so "Ødegaard" and "odegaard" compare equal.
pub fn fold_name(raw: &str) -> String {
    raw.trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'ø' => 'o',
            'ł' => 'l',
            'đ' => 'd',
            'ß' => 's',
            other => other,
        })
        .collect()
}

/// Finds the best match for `query` in `candidates`, walking them in order.
pub fn find_player<'a>(
    query: &str,
    candidates: &'a [Candidate],
) -> PickerResult<(&'a Candidate, MatchKind)> {
    let folded = fold_name(query);
    if folded.is_empty() {
        return Err(not_found(query));
    }
    let names: Vec<String> = candidates.iter().map(|c| fold_name(&c.player.name)).collect();

    if let Some(idx) = names.iter().position(|n| *n == folded) {
        return Ok((&candidates[idx], MatchKind::Exact));
    }
    if folded.chars().count() >= MIN_CONTAINS_LEN
        && let Some(idx) = names.iter().position(|n| n.contains(&folded))
    {
        return Ok((&candidates[idx], MatchKind::Contains));
    }

    let budget = MAX_EDIT_DISTANCE.min(folded.chars().count() / 2);
    let mut best: Option<(usize, usize)> = None;
    for (idx, name) in names.iter().enumerate() {
        let distance = strsim::levenshtein(&folded, name);
        if distance > budget {
            continue;
        }
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((idx, distance));
        }
    }
    match best {
        Some((idx, distance)) => Ok((&candidates[idx], MatchKind::Approximate(distance))),
        None => Err(not_found(query)),
    }
}

/// Resolves every name, keeping misses as errors. A player matched twice is listed once.
pub fn resolve_names(
    names: &[String],
    candidates: &[Candidate],
) -> (Vec<Candidate>, Vec<PickerError>) {
    let mut found = Vec::new();
    let mut missing = Vec::new();
    let mut seen: HashSet<PlayerId> = HashSet::new();
    for name in names {
        match find_player(name, candidates) {
            Ok((candidate, _)) => {
                if seen.insert(candidate.id()) {
                    found.push(candidate.clone());
                }
            }
            Err(err) => missing.push(err),
        }
    }
    (found, missing)
}

fn not_found(query: &str) -> PickerError {
    PickerError::NotFound(format!("player '{}' not found", query.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Position, TeamId};
    use crate::fake_data::sample_candidate;

    fn named(id: u32, name: &str) -> Candidate {
        let mut c = sample_candidate(id, Position::Midfielder, TeamId(1), 0.0);
        c.player.name = name.to_string();
        c
    }

    #[test]
    fn folds_diacritics_and_case() {
        assert_eq!(fold_name("Fernández"), "fernandez");
        assert_eq!(fold_name("  Ødegaard "), "odegaard");
        assert_eq!(fold_name("GUÉHI"), "guehi");
    }

    #[test]
    fn exact_beats_contains() {
        let pool = vec![named(1, "Son Heung-min"), named(2, "Son")];
        let (hit, kind) = find_player("son", &pool).unwrap();
        assert_eq!(hit.id(), PlayerId(2));
        assert_eq!(kind, MatchKind::Exact);
    }

    #[test]
    fn contains_and_typo_fallbacks() {
        let pool = vec![named(1, "Bruno Borges Fernandes"), named(2, "Saka")];
        let (hit, kind) = find_player("fernandes", &pool).unwrap();
        assert_eq!((hit.id(), kind), (PlayerId(1), MatchKind::Contains));
        let (hit, kind) = find_player("Sakka", &pool).unwrap();
        assert_eq!((hit.id(), kind), (PlayerId(2), MatchKind::Approximate(1)));
    }

    #[test]
    fn unknown_name_is_not_found() {
        let pool = vec![named(1, "Saka")];
        let err = find_player("Haaland", &pool).unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "player 'Haaland' not found");
    }

    #[test]
    fn resolve_collects_misses() {
        let pool = vec![named(1, "Saka"), named(2, "Rice")];
        let names = vec!["saka".to_string(), "Saka".to_string(), "Nobody".to_string()];
        let (found, missing) = resolve_names(&names, &pool);
        assert_eq!(found.len(), 1);
        assert_eq!(missing.len(), 1);
    }
}
