//! Playback tally aggregators.
//!
//! Each aggregator answers one ranking question: most-played track, artist
//! or genre, and which listener racked up the most plays. They are plain
//! counters fed by the engine's play fan-out. The whole set is bundled in a
//! [`StatsRegistry`] that is constructed explicitly and handed to the
//! engine, so tests can assert on each tally in isolation.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::Track;

/// Play counts per track. Entries are matched with full track equality, so
/// the tally is a list scanned linearly rather than a map keyed by id.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TrackPlays {
    tally: Vec<(Track, u64)>,
}

impl TrackPlays {
    pub fn record(&mut self, track: &Track) {
        match self.tally.iter_mut().find(|(t, _)| t == track) {
            Some(entry) => entry.1 += 1,
            None => self.tally.push((track.clone(), 1)),
        }
    }

    /// The most played track and its count.
    #[must_use]
    pub fn top(&self) -> Option<(&Track, u64)> {
        self.tally
            .iter()
            .max_by_key(|(_, count)| *count)
            .map(|(track, count)| (track, *count))
    }

    #[must_use]
    pub fn count(&self, track: &Track) -> u64 {
        self.tally
            .iter()
            .find(|(t, _)| t == track)
            .map_or(0, |(_, count)| *count)
    }
}

/// Play counts per artist name.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ArtistPlays {
    tally: HashMap<String, u64>,
}

impl ArtistPlays {
    pub fn record(&mut self, artist: &str) {
        *self.tally.entry(artist.to_string()).or_insert(0) += 1;
    }

    #[must_use]
    pub fn top(&self) -> Option<(&str, u64)> {
        self.tally
            .iter()
            .max_by_key(|(_, count)| *count)
            .map(|(artist, count)| (artist.as_str(), *count))
    }

    #[must_use]
    pub fn count(&self, artist: &str) -> u64 {
        self.tally.get(artist).copied().unwrap_or(0)
    }
}

/// Play counts per genre string.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct GenrePlays {
    tally: HashMap<String, u64>,
}

impl GenrePlays {
    pub fn record(&mut self, genre: &str) {
        *self.tally.entry(genre.to_string()).or_insert(0) += 1;
    }

    #[must_use]
    pub fn top(&self) -> Option<(&str, u64)> {
        self.tally
            .iter()
            .max_by_key(|(_, count)| *count)
            .map(|(genre, count)| (genre.as_str(), *count))
    }

    #[must_use]
    pub fn count(&self, genre: &str) -> u64 {
        self.tally.get(genre).copied().unwrap_or(0)
    }
}

/// Plays per listener per calendar date, keyed by the listener's email.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ListeningActivity {
    by_user: HashMap<String, HashMap<NaiveDate, u32>>,
}

impl ListeningActivity {
    pub fn record(&mut self, email: &str, date: NaiveDate) {
        *self
            .by_user
            .entry(email.to_string())
            .or_default()
            .entry(date)
            .or_insert(0) += 1;
    }

    /// The listener with the most plays, optionally restricted to an
    /// inclusive date range.
    #[must_use]
    pub fn top(&self, range: Option<(NaiveDate, NaiveDate)>) -> Option<(&str, u32)> {
        self.by_user
            .iter()
            .map(|(email, days)| {
                let plays = days
                    .iter()
                    .filter(|(date, _)| match range {
                        Some((from, to)) => **date >= from && **date <= to,
                        None => true,
                    })
                    .map(|(_, count)| count)
                    .sum::<u32>();
                (email.as_str(), plays)
            })
            .filter(|(_, plays)| *plays > 0)
            .max_by_key(|(_, plays)| *plays)
    }

    #[must_use]
    pub fn plays_on(&self, email: &str, date: NaiveDate) -> u32 {
        self.by_user
            .get(email)
            .and_then(|days| days.get(&date))
            .copied()
            .unwrap_or(0)
    }

    pub fn remove_user(&mut self, email: &str) {
        self.by_user.retain(|key, _| key != email);
    }
}

/// The full aggregator set the engine reports plays into.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StatsRegistry {
    pub track_plays: TrackPlays,
    pub artist_plays: ArtistPlays,
    pub genre_plays: GenrePlays,
    pub listening: ListeningActivity,
}

impl StatsRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tap for the track side of a play: bumps the track and genre tallies.
    pub fn record_track_play(&mut self, track: &Track) {
        self.track_plays.record(track);
        self.genre_plays.record(&track.genre);
    }

    /// Tap for the artist side of a play.
    pub fn record_artist_play(&mut self, artist: &str) {
        self.artist_plays.record(artist);
    }

    /// Tap for the listener side of a play.
    pub fn record_session(&mut self, email: &str, date: NaiveDate) {
        self.listening.record(email, date);
    }

    /// Forgets a listener. Track/artist/genre tallies are platform-wide and
    /// keep their counts.
    pub fn remove_user(&mut self, email: &str) {
        self.listening.remove_user(email);
    }
}
