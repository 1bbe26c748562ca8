//! Nearest-ancestor folder zone resolution (§4.11).
//!
//! Kept free of any store or I/O dependency so both the server's Zone
//! Service and the Dedup Engine can call it without a database round trip.

use crate::model::Zone;
use std::collections::HashMap;

/// Resolve the effective zone for `path` given the set of explicitly
/// assigned folder zones for a source.
///
/// Walks from `path` up to the root, returning the zone of the first
/// ancestor (inclusive of `path` itself) that has an explicit assignment.
/// Falls back to [`Zone::Unknown`] when no ancestor is assigned.
pub fn resolve(assignments: &HashMap<String, Zone>, path: &str) -> Zone {
    let mut candidate = normalize(path);
    loop {
        if let Some(zone) = assignments.get(&candidate) {
            return *zone;
        }
        match parent(&candidate) {
            Some(p) => candidate = p,
            None => return Zone::Unknown,
        }
    }
}

fn normalize(path: &str) -> String {
    path.trim_end_matches('/').to_string()
}

/// Returns the parent of a normalized, `/`-separated path, or `None` once
/// `path` is already the root (`""` or `"/"`).
fn parent(path: &str) -> Option<String> {
    if path.is_empty() || path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(String::from("/")),
        Some(idx) => Some(path[..idx].to_string()),
        None => Some(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignments() -> HashMap<String, Zone> {
        let mut m = HashMap::new();
        m.insert("/data".to_string(), Zone::Media);
        m.insert("/data/code".to_string(), Zone::Code);
        m
    }

    #[test]
    fn exact_match_wins() {
        let a = assignments();
        assert_eq!(resolve(&a, "/data/code"), Zone::Code);
    }

    #[test]
    fn inherits_from_nearest_ancestor() {
        let a = assignments();
        assert_eq!(resolve(&a, "/data/code/src/main.rs"), Zone::Code);
        assert_eq!(resolve(&a, "/data/photos/vacation"), Zone::Media);
    }

    #[test]
    fn unknown_when_unassigned() {
        let a = assignments();
        assert_eq!(resolve(&a, "/other/path"), Zone::Unknown);
    }

    #[test]
    fn trailing_slash_is_normalized() {
        let a = assignments();
        assert_eq!(resolve(&a, "/data/code/"), Zone::Code);
    }
}
