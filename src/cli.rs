//! Command-line interface definitions.
//!
//! Built on Clap derive macros: one subcommand per engine operation, with
//! the acting user resolved from `--user` or the `ENCORE_USER` environment
//! variable. Every command loads the persisted state, performs one
//! operation, and saves it back.
//!
//! ## Examples
//!
//! ```bash
//! encore seed library.json
//! ENCORE_USER=alice@example.com encore next "Road Trip"
//! encore generate --max-tracks 15 --explicit-only
//! encore stats top-artist
//! ```

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::leaderboard::Tier;

/// Shell types supported for completion generation.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Subscription plans as they appear on the command line.
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum TierArg {
    /// Ad-supported listening, random playlists only
    Free,
    /// Playlist curation and navigation
    PremiumBase,
    /// Curation plus the highest leaderboard payout
    PremiumTop,
}

impl From<TierArg> for Tier {
    fn from(arg: TierArg) -> Self {
        match arg {
            TierArg::Free => Tier::Free,
            TierArg::PremiumBase => Tier::PremiumBase,
            TierArg::PremiumTop => Tier::PremiumTop,
        }
    }
}

/// On/off switch for toggle-style commands.
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    #[must_use]
    pub fn is_on(self) -> bool {
        matches!(self, Switch::On)
    }
}

/// Main application arguments structure.
#[derive(Parser)]
#[command(name = "encore")]
#[command(about = "Encore: media catalog, playlists & listening statistics")]
#[command(version)]
pub struct Args {
    /// Email of the acting user
    ///
    /// Required by every command that plays, curates or generates. Can also
    /// be supplied through the ENCORE_USER environment variable.
    #[arg(long, global = true, env = "ENCORE_USER")]
    pub user: Option<String>,

    /// Database file to use instead of the platform default
    #[arg(long, global = true, value_name = "FILE")]
    pub db_path: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Import a catalog seed file (users, artists, albums, singles)
    ///
    /// The seed file is JSON. Imported entries are added on top of whatever
    /// the database already holds unless --replace is given.
    Seed {
        /// Path to the JSON seed file
        path: PathBuf,

        /// Discard the existing state before importing
        #[arg(long)]
        replace: bool,
    },

    /// List every catalogued track
    List,

    /// List registered users
    Users,

    /// Register a new user
    RegisterUser {
        /// Display name, also used as playlist owner label
        username: String,

        /// Email address, the user's identity key
        email: String,

        /// Subscription plan
        #[arg(value_enum, default_value_t = TierArg::Free)]
        tier: TierArg,
    },

    /// Delete a user along with their playlists and statistics entries
    RemoveUser {
        /// Email of the user to delete
        email: String,
    },

    /// Create an empty playlist (premium plans only)
    CreatePlaylist {
        /// Name of the new playlist
        name: String,
    },

    /// List the acting user's playlists
    Playlists,

    /// Append a catalogued track to one of your playlists
    AddTrack {
        /// Playlist name
        playlist: String,

        /// Track name as catalogued
        track: String,
    },

    /// Remove the first matching track from one of your playlists
    RemoveTrack {
        /// Playlist name
        playlist: String,

        /// Track name as catalogued
        track: String,
    },

    /// Play the current track of a playlist
    Play {
        /// Playlist name
        playlist: String,
    },

    /// Skip to the next track (premium playlists)
    ///
    /// With shuffle off the cursor wraps around the playlist; with shuffle
    /// on a random different track is drawn. Either way the previous
    /// position is remembered for `previous`.
    Next {
        /// Playlist name
        playlist: String,
    },

    /// Return to the previously played track (premium playlists)
    Previous {
        /// Playlist name
        playlist: String,
    },

    /// Jump straight to a track position (premium playlists)
    Jump {
        /// Playlist name
        playlist: String,

        /// Zero-based track position
        index: usize,
    },

    /// Toggle shuffle on a playlist
    ///
    /// Turning shuffle on for someone else's playlist first copies it into
    /// your own collection; the original is never touched.
    Shuffle {
        /// Playlist name
        playlist: String,

        /// Desired shuffle state
        #[arg(value_enum)]
        mode: Switch,
    },

    /// Play a random track from one of the free playlists
    PlayRandom {
        /// Which of the five free playlists to draw from
        #[arg(default_value_t = 0)]
        slot: usize,
    },

    /// Stop playback
    ///
    /// Clears the "now playing" marker and reports what was playing.
    Stop,

    /// Set the engine's clock
    ///
    /// Listening statistics are tallied per calendar date; new plays are
    /// recorded under whatever date is set here.
    SetDate {
        /// New current date (YYYY-MM-DD)
        date: NaiveDate,
    },

    /// Generate a personalized playlist from your listening history
    ///
    /// Tracks you scored highest on the leaderboard are picked first, then
    /// other tracks by the same artists fill the remaining room.
    Generate {
        /// Maximum number of tracks
        #[arg(long, default_value_t = 20)]
        max_tracks: i64,

        /// Maximum total duration in seconds
        #[arg(long, default_value_t = 3600)]
        max_seconds: i64,

        /// Only include tracks flagged as explicit
        #[arg(long)]
        explicit_only: bool,
    },

    /// Engagement statistics reports
    Stats {
        #[command(subcommand)]
        report: StatsReport,
    },

    /// Generate shell completions
    ///
    /// Usage: encore completion bash > ~/.local/share/bash-completion/completions/encore
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Available statistics reports.
#[derive(Subcommand, Debug)]
pub enum StatsReport {
    /// The most played track
    TopTrack,

    /// The most played artist
    TopArtist,

    /// The most played genre
    TopGenre,

    /// The listener with the most plays, optionally within a date range
    TopListener {
        /// Inclusive start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Inclusive end date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Total leaderboard points per listener
    Leaderboard,

    /// Playlist counts: public playlists and the busiest curator
    Playlists,
}
