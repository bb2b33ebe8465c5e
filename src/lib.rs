//! Media catalog engine with playlist navigation, personalized generation
//! and listening statistics.
//!
//! Core modules:
//! - [`playlist`] - Track sequencing: cursor, shuffle, back-navigation history
//! - [`generator`] - Greedy playlist generation from weighted history
//! - [`leaderboard`] - Per-user, per-track engagement points
//! - [`stats`] - Most-played track/artist/genre and listener activity tallies
//! - [`engine`] - The session layer wiring users, playlists and the play fan-out
//!
//! ### Supporting Modules
//!
//! - [`catalog`] - Track and album records plus lookup
//! - [`store`] - SQLite persistence of the whole engine state
//! - [`config`] - Configuration and data directory management
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use encore::catalog::Track;
//! use encore::engine::Engine;
//! use encore::generator::GenerationLimits;
//! use encore::leaderboard::Tier;
//! use encore::stats::StatsRegistry;
//!
//! // An engine reports into an explicitly constructed statistics registry.
//! let mut engine = Engine::new(StatsRegistry::new());
//! engine.register_user("alice", "alice@example.com", Tier::PremiumBase)?;
//! engine.add_track(Track::new(
//!     "Golden Hour", "The Lanterns", "Nightjar", "...", "indie", 217,
//! ));
//!
//! // Curate and play.
//! let playlist = engine.create_playlist("alice@example.com", "Road Trip")?;
//! let track_id = engine.catalog().tracks().next().unwrap().id;
//! engine.add_track_to_playlist("alice@example.com", &playlist, &track_id)?;
//! engine.play_current("alice@example.com", &playlist)?;
//!
//! // Generate a playlist from the accumulated history.
//! let generated =
//!     engine.generate_playlist("alice@example.com", GenerationLimits::default(), false)?;
//! println!("generated playlist id: {generated:?}");
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Sequencing Model
//!
//! Every playlist carries a zero-based cursor. Premium playlists move it
//! with `next`/`previous`/`jump`: forward moves push the old position onto a
//! history stack, `previous` pops it back. Shuffle replaces the cyclic step
//! with a uniform draw that avoids repeating the current track. Free
//! playlists are frozen random samples of the catalog and refuse navigation
//! altogether; each play picks an independent random position.
//!
//! ## Leaderboard Model
//!
//! The first play of a track pays the listener's tier base (5 / 10 / 100
//! points); every repeat pays 2.5% of the points already accrued on that
//! pair. Growth is fast at the start and flattens into a plateau, and the
//! per-track point map doubles as the weighted history the generator ranks.
//!
//! ## Error Handling
//!
//! Fallible I/O paths return `Result<T, anyhow::Error>` with context
//! attached. Navigation and empty-state queries never error: they answer
//! with [`playlist::Playback`] sentinels (`Empty`, `Unavailable`) the caller
//! inspects.
//!
//! ## Logging
//!
//! The library logs through the `log` facade; the binary installs
//! `env_logger`, so `RUST_LOG=encore=debug encore next "Road Trip"` traces
//! engine decisions.

pub mod catalog;
pub mod cli;
pub mod completion;
pub mod config;
pub mod engine;
pub mod generator;
pub mod leaderboard;
pub mod playlist;
pub mod stats;
pub mod store;
