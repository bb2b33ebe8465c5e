//! Track and album records plus the in-memory catalog they live in.
//!
//! The catalog is the read side consumed by playlists, the generator and the
//! statistics layer. Editing a track's metadata is the owning artist's
//! business and happens through whatever front end drives this crate; the
//! engine only ever resolves and clones records out of here.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single catalogued track.
///
/// Identity is the `id`. Equality is deliberately wider than identity: two
/// tracks are equal when their ids match, or when every descriptive field
/// (name, artist, genre, label, lyrics, duration) matches. The second arm
/// exists because older seed data carried duplicate entries under fresh ids
/// and the rest of the system must treat them as the same song. Because of
/// that second arm this type implements neither `Eq` nor `Hash`; maps key by
/// `Track::id` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: Uuid,
    pub name: String,
    pub artist: String,
    pub label: String,
    pub lyrics: String,
    pub genre: String,
    /// Duration in seconds.
    pub duration: u32,
    pub explicit: bool,
    pub multimedia: bool,
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            || (self.duration == other.duration
                && self.name == other.name
                && self.artist == other.artist
                && self.genre == other.genre
                && self.label == other.label
                && self.lyrics == other.lyrics)
    }
}

impl Track {
    /// Creates a track with a fresh id.
    pub fn new(
        name: impl Into<String>,
        artist: impl Into<String>,
        label: impl Into<String>,
        lyrics: impl Into<String>,
        genre: impl Into<String>,
        duration: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            artist: artist.into(),
            label: label.into(),
            lyrics: lyrics.into(),
            genre: genre.into(),
            duration,
            explicit: false,
            multimedia: false,
        }
    }

    /// Marks the track as carrying explicit content.
    #[must_use]
    pub fn explicit(mut self) -> Self {
        self.explicit = true;
        self
    }

    /// Marks the track as carrying an attached video.
    #[must_use]
    pub fn multimedia(mut self) -> Self {
        self.multimedia = true;
        self
    }

    /// Formats the duration as MM:SS for display.
    #[must_use]
    pub fn formatted_duration(&self) -> String {
        format!("{:02}:{:02}", self.duration / 60, self.duration % 60)
    }
}

/// An artist's album: an ordered run of tracks released together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub id: Uuid,
    pub name: String,
    pub artist: String,
    pub tracks: Vec<Track>,
}

impl Album {
    pub fn new(name: impl Into<String>, artist: impl Into<String>, tracks: Vec<Track>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            artist: artist.into(),
            tracks,
        }
    }

    /// Sum of the album's track durations in seconds.
    #[must_use]
    pub fn total_duration(&self) -> u32 {
        self.tracks.iter().map(|t| t.duration).sum()
    }
}

/// In-memory catalog of every known track and album, keyed by id.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Catalog {
    tracks: HashMap<Uuid, Track>,
    albums: HashMap<Uuid, Album>,
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a track. Replaces any previous record under the same id.
    pub fn add_track(&mut self, track: Track) {
        debug!("cataloguing track `{}' by `{}'", track.name, track.artist);
        self.tracks.insert(track.id, track);
    }

    /// Registers an album and every track on it.
    pub fn add_album(&mut self, album: Album) {
        for track in &album.tracks {
            self.tracks.insert(track.id, track.clone());
        }
        debug!(
            "cataloguing album `{}' with {} tracks",
            album.name,
            album.tracks.len()
        );
        self.albums.insert(album.id, album);
    }

    #[must_use]
    pub fn find_track(&self, id: &Uuid) -> Option<&Track> {
        self.tracks.get(id)
    }

    #[must_use]
    pub fn find_album(&self, id: &Uuid) -> Option<&Album> {
        self.albums.get(id)
    }

    /// All tracks credited to `artist` (exact name match).
    pub fn tracks_by_artist(&self, artist: &str) -> Vec<&Track> {
        self.tracks
            .values()
            .filter(|t| t.artist == artist)
            .collect()
    }

    /// Case-insensitive substring search over track names.
    pub fn search_tracks(&self, needle: &str) -> Vec<&Track> {
        let needle = needle.to_lowercase();
        self.tracks
            .values()
            .filter(|t| t.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// First track whose name matches `name` exactly, if any.
    #[must_use]
    pub fn track_by_name(&self, name: &str) -> Option<&Track> {
        self.tracks.values().find(|t| t.name == name)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn albums(&self) -> impl Iterator<Item = &Album> {
        self.albums.values()
    }

    #[must_use]
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
