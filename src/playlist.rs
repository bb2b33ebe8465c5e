//! Ordered track sequences with a cursor and a pluggable sequencing policy.
//!
//! Every playlist is the same container: an ordered list of tracks plus a
//! zero-based cursor pointing at the current one. What differs between the
//! free and premium experience is how the cursor is allowed to move, so that
//! behavior lives in a closed [`Sequencing`] variant rather than a class
//! hierarchy:
//!
//! - [`Sequencing::Free`]: a frozen random sample of the catalog. No forward
//!   or backward navigation at all; the caller re-rolls the cursor externally
//!   before each play.
//! - [`Sequencing::Premium`]: full skip control, optional shuffle, and a
//!   back-navigation stack of previously visited cursor positions.
//!
//! Navigation never panics and never errors. Empty playlists, exhausted
//! history and feature gaps all come back as [`Playback`] sentinels which
//! callers must inspect.

use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};
use uuid::Uuid;

use crate::catalog::{Album, Track};

/// Free playlists freeze at most this many sampled tracks.
pub const FREE_SAMPLE_CAP: usize = 10;

/// Outcome of a playback or navigation request.
///
/// `Empty` doubles as the "no track there" answer for out-of-range jumps;
/// `Unavailable` is the answer free playlists give to skip requests.
#[derive(Debug, Clone, PartialEq)]
pub enum Playback {
    Track(Track),
    Empty,
    Unavailable,
}

impl Playback {
    /// The played track, if one was produced.
    #[must_use]
    pub fn track(&self) -> Option<&Track> {
        match self {
            Playback::Track(t) => Some(t),
            _ => None,
        }
    }
}

/// Cursor-movement policy. See the module docs for the two behaviors.
#[derive(Debug, Clone, PartialEq)]
pub enum Sequencing {
    Free,
    Premium {
        shuffle: bool,
        /// Stack of prior cursor positions, most recent last. Grows on
        /// `next_track`/`jump_to_track`, shrinks only on `previous_track`.
        history: Vec<usize>,
    },
}

impl Sequencing {
    #[must_use]
    pub fn premium() -> Self {
        Sequencing::Premium {
            shuffle: false,
            history: Vec::new(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Sequencing::Free => "free",
            Sequencing::Premium { .. } => "premium",
        }
    }
}

/// An ordered track sequence owned by a user.
#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    pub id: Uuid,
    pub name: String,
    pub owner: String,
    pub public: bool,
    tracks: Vec<Track>,
    cursor: usize,
    sequencing: Sequencing,
}

impl Playlist {
    /// Creates an empty premium playlist.
    #[must_use]
    pub fn premium(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            owner: owner.into(),
            public: true,
            tracks: Vec::new(),
            cursor: 0,
            sequencing: Sequencing::premium(),
        }
    }

    /// Creates a free playlist from a uniformly shuffled, size-capped sample
    /// of `pool`. The sample is frozen for the playlist's lifetime.
    #[must_use]
    pub fn free(name: impl Into<String>, owner: impl Into<String>, mut pool: Vec<Track>) -> Self {
        pool.shuffle(&mut thread_rng());
        pool.truncate(FREE_SAMPLE_CAP);
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            owner: owner.into(),
            public: true,
            tracks: pool,
            cursor: 0,
            sequencing: Sequencing::Free,
        }
    }

    /// Rebuilds a playlist from persisted parts. The cursor is clamped back
    /// into range in case the stored value no longer fits the track list.
    #[must_use]
    pub fn restore(
        id: Uuid,
        name: String,
        owner: String,
        public: bool,
        tracks: Vec<Track>,
        cursor: usize,
        sequencing: Sequencing,
    ) -> Self {
        let mut playlist = Self {
            id,
            name,
            owner,
            public,
            tracks,
            cursor: 0,
            sequencing,
        };
        playlist.set_cursor(cursor);
        playlist
    }

    /// Copies this playlist under a new owner and a fresh identity. Tracks,
    /// cursor, shuffle state and history all carry over; mutations on the
    /// copy never touch the original.
    #[must_use]
    pub fn clone_for(&self, owner: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            ..self.clone()
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn sequencing(&self) -> &Sequencing {
        &self.sequencing
    }

    #[must_use]
    pub fn contains(&self, track: &Track) -> bool {
        self.tracks.iter().any(|t| t == track)
    }

    /// Appends a track. Duplicate checking is the caller's call.
    pub fn add_track(&mut self, track: Track) {
        self.tracks.push(track);
    }

    /// Inserts a track at `index`, shifting later tracks right. Returns false
    /// without mutating when `index` is past the end.
    pub fn insert_track_at(&mut self, track: Track, index: usize) -> bool {
        if index > self.tracks.len() {
            warn!(
                "insert at {index} rejected, playlist `{}' has {} tracks",
                self.name,
                self.tracks.len()
            );
            return false;
        }
        self.tracks.insert(index, track);
        true
    }

    /// Appends every album track, preserving album order.
    pub fn add_album(&mut self, album: &Album) {
        self.tracks.extend(album.tracks.iter().cloned());
    }

    /// Removes the first track equal to `track` (per track equality).
    /// Returns whether anything was removed; on success the cursor is clamped
    /// back into range.
    pub fn remove_track(&mut self, track: &Track) -> bool {
        let Some(position) = self.tracks.iter().position(|t| t == track) else {
            return false;
        };
        self.tracks.remove(position);
        self.clamp_cursor();
        true
    }

    /// The track under the cursor, or [`Playback::Empty`] when there is none.
    #[must_use]
    pub fn play_current(&self) -> Playback {
        match self.tracks.get(self.cursor) {
            Some(track) => Playback::Track(track.clone()),
            None => Playback::Empty,
        }
    }

    /// Sum of all track durations in seconds.
    #[must_use]
    pub fn total_duration(&self) -> u32 {
        self.tracks.iter().map(|t| t.duration).sum()
    }

    /// Whether this playlist's policy allows `next`/`previous` at all.
    #[must_use]
    pub fn can_skip(&self) -> bool {
        matches!(self.sequencing, Sequencing::Premium { .. })
    }

    /// Advances the cursor under the premium policy and plays the new track.
    ///
    /// The pre-move cursor is pushed onto the history first, even when the
    /// playlist holds a single track. With shuffle off the cursor wraps
    /// cyclically; with shuffle on a uniformly random index different from
    /// the current one is drawn by rejection sampling.
    pub fn next_track(&mut self) -> Playback {
        if !self.can_skip() {
            return Playback::Unavailable;
        }
        if self.tracks.is_empty() {
            return Playback::Empty;
        }

        self.record_navigation();
        if self.tracks.len() == 1 {
            return self.play_current();
        }

        self.cursor = if self.shuffle_active() {
            let mut rng = thread_rng();
            loop {
                let candidate = rng.gen_range(0..self.tracks.len());
                if candidate != self.cursor {
                    break candidate;
                }
            }
        } else {
            (self.cursor + 1) % self.tracks.len()
        };
        self.play_current()
    }

    /// Pops the most recent history entry back into the cursor and plays the
    /// track there. With no history this is a no-op returning the current
    /// track. Restored positions are clamped into range, since track removal
    /// can leave stale indices behind.
    pub fn previous_track(&mut self) -> Playback {
        if !self.can_skip() {
            return Playback::Unavailable;
        }
        if self.tracks.is_empty() {
            return Playback::Empty;
        }
        let restored = match &mut self.sequencing {
            Sequencing::Premium { history, .. } => history.pop(),
            Sequencing::Free => None,
        };
        if let Some(position) = restored {
            self.cursor = position.min(self.tracks.len() - 1);
        }
        self.play_current()
    }

    /// Moves the cursor straight to `index`, recording the jump in history.
    /// Out-of-range indices answer [`Playback::Empty`] without mutating.
    pub fn jump_to_track(&mut self, index: usize) -> Playback {
        if !self.can_skip() {
            return Playback::Unavailable;
        }
        if index >= self.tracks.len() {
            debug!("jump to {index} rejected, playlist `{}' has {} tracks", self.name, self.tracks.len());
            return Playback::Empty;
        }
        self.record_navigation();
        self.cursor = index;
        self.play_current()
    }

    /// Toggles shuffle on a premium playlist. History is left untouched.
    /// Returns whether the policy accepted the change.
    pub fn set_shuffle(&mut self, on: bool) -> bool {
        match &mut self.sequencing {
            Sequencing::Premium { shuffle, .. } => {
                *shuffle = on;
                true
            }
            Sequencing::Free => false,
        }
    }

    #[must_use]
    pub fn shuffle_active(&self) -> bool {
        matches!(self.sequencing, Sequencing::Premium { shuffle: true, .. })
    }

    /// The back-navigation stack, oldest first. Empty for free playlists.
    #[must_use]
    pub fn history(&self) -> &[usize] {
        match &self.sequencing {
            Sequencing::Premium { history, .. } => history,
            Sequencing::Free => &[],
        }
    }

    pub fn clear_history(&mut self) {
        if let Sequencing::Premium { history, .. } = &mut self.sequencing {
            history.clear();
        }
    }

    /// Clamps `position` into range and moves the cursor there. Used by the
    /// free-playlist play flow, which rolls a random position externally, and
    /// by state restoration.
    pub fn set_cursor(&mut self, position: usize) {
        self.cursor = if self.tracks.is_empty() {
            0
        } else {
            position.min(self.tracks.len() - 1)
        };
    }

    fn record_navigation(&mut self) {
        let cursor = self.cursor;
        if let Sequencing::Premium { history, .. } = &mut self.sequencing {
            history.push(cursor);
        }
    }

    fn clamp_cursor(&mut self) {
        if self.tracks.is_empty() {
            self.cursor = 0;
        } else {
            self.cursor = self.cursor.min(self.tracks.len() - 1);
        }
    }
}
