//! Personalized playlist generation from weighted listening history.
//!
//! The generator is stateless: it ranks the caller's history by accumulated
//! weight, greedily picks admissible tracks under the configured limits, and
//! then runs a backfill pass that pads the result with other tracks by the
//! same artists, in the same ranked order, until the limits saturate.

use std::collections::HashSet;

use log::{debug, info};

use crate::catalog::{Catalog, Track};
use crate::playlist::Playlist;

/// Name given to every freshly generated playlist.
pub const GENERATED_PLAYLIST_NAME: &str = "Generated Playlist";

/// Hard limits on the generated result. Non-positive values make generation
/// a no-op that yields nothing.
#[derive(Debug, Clone, Copy)]
pub struct GenerationLimits {
    pub max_tracks: i64,
    /// Cap on the summed track durations, in seconds.
    pub max_seconds: i64,
}

impl Default for GenerationLimits {
    fn default() -> Self {
        Self {
            max_tracks: 20,
            max_seconds: 3600,
        }
    }
}

/// Builds a premium playlist for `owner` out of `history`.
///
/// Tracks are considered in descending weight order. A track is admissible
/// when it passes the explicit filter, keeps the count under
/// `limits.max_tracks` and keeps the summed duration within
/// `limits.max_seconds`; admissible tracks not already picked are appended.
/// Once the ranked history is exhausted and the limits still have room, a
/// second pass walks the same ranking and offers every other catalogued
/// track by the same artists to the same admissibility test.
///
/// Returns `None` when the history is empty, the limits are non-positive, or
/// nothing admissible was found.
pub fn generate(
    owner: &str,
    history: &[(Track, f64)],
    limits: GenerationLimits,
    explicit_only: bool,
    catalog: &Catalog,
) -> Option<Playlist> {
    if history.is_empty() {
        debug!("no listening history for `{owner}', nothing to generate");
        return None;
    }

    let mut ranked: Vec<&(Track, f64)> = history.iter().collect();
    ranked.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    if let Some((track, weight)) = ranked.iter().map(|r| &**r).find(|(_, w)| *w < 0.0) {
        debug!("negative weight {weight} for `{}' kept as a sort key", track.name);
    }

    let mut playlist = Playlist::premium(GENERATED_PLAYLIST_NAME, owner);
    let mut total_seconds: i64 = 0;
    let mut added: i64 = 0;

    for (track, _) in ranked.iter().map(|r| &**r) {
        if admissible(track, explicit_only, added, total_seconds, limits) && !playlist.contains(track)
        {
            total_seconds += i64::from(track.duration);
            added += 1;
            playlist.add_track(track.clone());
        }
        if saturated(added, total_seconds, limits) {
            break;
        }
    }

    // Backfill with other tracks by the already-ranked artists.
    if added < limits.max_tracks || total_seconds < limits.max_seconds {
        let mut visited_artists: HashSet<&str> = HashSet::new();
        'ranked: for (track, _) in ranked.iter().map(|r| &**r) {
            if !visited_artists.insert(track.artist.as_str()) {
                continue;
            }
            for candidate in catalog.tracks_by_artist(&track.artist) {
                if admissible(candidate, explicit_only, added, total_seconds, limits)
                    && !playlist.contains(candidate)
                {
                    total_seconds += i64::from(candidate.duration);
                    added += 1;
                    playlist.add_track(candidate.clone());
                }
                if saturated(added, total_seconds, limits) {
                    break 'ranked;
                }
            }
        }
    }

    if playlist.is_empty() {
        debug!("generation for `{owner}' produced nothing under the given limits");
        return None;
    }

    info!(
        "generated {} tracks ({total_seconds}s) for `{owner}'",
        playlist.len()
    );
    Some(playlist)
}

fn admissible(
    track: &Track,
    explicit_only: bool,
    added: i64,
    total_seconds: i64,
    limits: GenerationLimits,
) -> bool {
    (!explicit_only || track.explicit)
        && added < limits.max_tracks
        && total_seconds + i64::from(track.duration) <= limits.max_seconds
}

fn saturated(added: i64, total_seconds: i64, limits: GenerationLimits) -> bool {
    added >= limits.max_tracks || total_seconds >= limits.max_seconds
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(name: &str, artist: &str, duration: u32) -> Track {
        Track::new(name, artist, "Label", "...", "pop", duration)
    }

    fn limits(max_tracks: i64, max_seconds: i64) -> GenerationLimits {
        GenerationLimits {
            max_tracks,
            max_seconds,
        }
    }

    #[test]
    fn higher_weight_wins_under_count_cap() {
        let a = track("A", "X", 100);
        let b = track("B", "Y", 100);
        let history = vec![(a.clone(), 10.0), (b, 5.0)];

        let playlist = generate("alice", &history, limits(1, 10_000), false, &Catalog::new())
            .expect("one track fits");
        assert_eq!(playlist.len(), 1);
        assert_eq!(playlist.tracks()[0], a);
    }

    #[test]
    fn nothing_fits_under_tiny_duration_cap() {
        let history = vec![(track("A", "X", 300), 10.0)];
        assert!(generate("alice", &history, limits(5, 100), false, &Catalog::new()).is_none());
    }

    #[test]
    fn empty_history_generates_nothing() {
        assert!(generate("alice", &[], GenerationLimits::default(), false, &Catalog::new()).is_none());
    }

    #[test]
    fn non_positive_limits_generate_nothing() {
        let history = vec![(track("A", "X", 100), 1.0)];
        assert!(generate("alice", &history, limits(0, 1000), false, &Catalog::new()).is_none());
        assert!(generate("alice", &history, limits(5, 0), false, &Catalog::new()).is_none());
        assert!(generate("alice", &history, limits(-3, -1), false, &Catalog::new()).is_none());
    }

    #[test]
    fn explicit_filter_drops_clean_tracks() {
        let clean = track("Clean", "X", 100);
        let marked = track("Marked", "X", 100).explicit();
        let history = vec![(clean, 10.0), (marked.clone(), 1.0)];

        let playlist = generate("alice", &history, limits(5, 10_000), true, &Catalog::new())
            .expect("the explicit track fits");
        assert_eq!(playlist.len(), 1);
        assert_eq!(playlist.tracks()[0], marked);
    }

    #[test]
    fn duration_cap_limits_the_greedy_pass() {
        let history = vec![
            (track("A", "X", 120), 9.0),
            (track("B", "Y", 120), 8.0),
            (track("C", "Z", 120), 7.0),
        ];

        let playlist = generate("alice", &history, limits(10, 250), false, &Catalog::new())
            .expect("two tracks fit");
        assert_eq!(playlist.len(), 2);
        assert_eq!(playlist.total_duration(), 240);
    }

    #[test]
    fn backfill_pulls_same_artist_tracks_from_catalog() {
        let listened = track("Hit", "X", 100);
        let unheard = track("Deep Cut", "X", 100);
        let mut catalog = Catalog::new();
        catalog.add_track(listened.clone());
        catalog.add_track(unheard.clone());
        catalog.add_track(track("Other", "Y", 100));

        let history = vec![(listened.clone(), 5.0)];
        let playlist =
            generate("alice", &history, limits(5, 10_000), false, &catalog).expect("backfill runs");

        assert_eq!(playlist.len(), 2);
        assert_eq!(playlist.tracks()[0], listened, "history track ranks first");
        assert!(playlist.contains(&unheard));
    }

    #[test]
    fn backfill_respects_the_count_cap() {
        let listened = track("Hit", "X", 100);
        let mut catalog = Catalog::new();
        catalog.add_track(listened.clone());
        for i in 0..6 {
            catalog.add_track(track(&format!("Cut {i}"), "X", 100));
        }

        let history = vec![(listened, 5.0)];
        let playlist =
            generate("alice", &history, limits(3, 10_000), false, &catalog).expect("cap at three");
        assert_eq!(playlist.len(), 3);
    }

    #[test]
    fn field_equal_duplicates_are_suppressed() {
        let original = track("Same", "X", 100);
        let twin = track("Same", "X", 100); // fresh id, equal fields
        let history = vec![(original, 5.0), (twin, 4.0)];

        let playlist = generate("alice", &history, limits(10, 10_000), false, &Catalog::new())
            .expect("one copy survives");
        assert_eq!(playlist.len(), 1);
    }

    #[test]
    fn negative_weights_are_valid_sort_keys() {
        let a = track("A", "X", 100);
        let b = track("B", "Y", 100);
        let history = vec![(a.clone(), -5.0), (b.clone(), -1.0)];

        let playlist = generate("alice", &history, limits(2, 10_000), false, &Catalog::new())
            .expect("both admissible");
        assert_eq!(playlist.tracks()[0], b, "less negative weight ranks first");
        assert_eq!(playlist.tracks()[1], a);
    }

    #[test]
    fn result_is_premium_sequenced_and_named() {
        let history = vec![(track("A", "X", 100), 1.0)];
        let playlist =
            generate("alice", &history, limits(5, 10_000), false, &Catalog::new()).unwrap();

        assert_eq!(playlist.name, GENERATED_PLAYLIST_NAME);
        assert_eq!(playlist.owner, "alice");
        assert!(playlist.can_skip());
    }
}
