//! # Encore
//!
//! Command-line front end for the catalog engine. Every invocation loads the
//! persisted state, performs one operation, and saves the state back, so the
//! binary can be driven like a stateful player from the shell.
//!
//! ## Usage
//!
//! ```bash
//! # Import a catalog and some users
//! encore seed library.json
//!
//! # Curate and listen
//! export ENCORE_USER=alice@example.com
//! encore create-playlist "Road Trip"
//! encore add-track "Road Trip" "Golden Hour"
//! encore play "Road Trip"
//! encore next "Road Trip"
//!
//! # Let the engine build one for you
//! encore generate --max-tracks 15
//!
//! # See who listens the most
//! encore stats top-listener
//! ```
//!
//! Logging is controlled via `RUST_LOG`, e.g.
//! `RUST_LOG=encore=debug encore next "Road Trip"`.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::info;

use encore::cli;
use encore::completion;
use encore::config::RuntimeConfig;
use encore::engine::Engine;
use encore::generator::GenerationLimits;
use encore::playlist::Playback;
use encore::stats::StatsRegistry;
use encore::store;

fn main() -> Result<()> {
    // Environment logger, controlled via RUST_LOG.
    env_logger::init();

    let args = cli::Args::parse();

    // Completion generation needs no database at all.
    if let cli::Command::Completion { shell } = &args.command {
        let mut cmd = cli::Args::command();
        completion::generate_completions(completion::shell_to_completion_shell(shell), &mut cmd);
        return Ok(());
    }

    let config = RuntimeConfig::resolve(args.db_path.clone())?;
    let mut conn = store::open(&config.db_path)?;
    let mut engine = store::load(&conn)?;
    let acting_user = args.user.clone();

    match args.command {
        cli::Command::Seed { path, replace } => {
            if replace {
                info!("discarding existing state before seeding");
                engine = Engine::new(StatsRegistry::new());
            }
            let (users, tracks) = store::import_seed(&mut engine, &path)?;
            println!("imported {users} users and {tracks} tracks from {}", path.display());
        }
        cli::Command::List => {
            let mut tracks: Vec<_> = engine.catalog().tracks().collect();
            tracks.sort_by(|a, b| (&a.artist, &a.name).cmp(&(&b.artist, &b.name)));
            if tracks.is_empty() {
                println!("the catalog is empty, run `encore seed` first");
            }
            for track in tracks {
                let mut flags = String::new();
                if track.explicit {
                    flags.push_str(" [explicit]");
                }
                if track.multimedia {
                    flags.push_str(" [video]");
                }
                println!(
                    "{} - {} ({}, {}){flags}",
                    track.artist,
                    track.name,
                    track.genre,
                    track.formatted_duration(),
                );
            }
        }
        cli::Command::Users => {
            for user in engine.users() {
                println!(
                    "{} <{}> on {} ({:.2}/month)",
                    user.username,
                    user.email,
                    user.tier.as_str(),
                    user.tier.monthly_price(),
                );
            }
        }
        cli::Command::RegisterUser {
            username,
            email,
            tier,
        } => {
            engine.register_user(&username, &email, tier.into())?;
            println!("registered {username} <{email}>");
        }
        cli::Command::RemoveUser { email } => {
            engine.remove_user(&email)?;
            println!("removed {email}");
        }
        cli::Command::CreatePlaylist { name } => {
            let email = require_user(&acting_user)?;
            engine.create_playlist(&email, &name)?;
            println!("created playlist `{name}'");
        }
        cli::Command::Playlists => {
            let email = require_user(&acting_user)?;
            let user = engine
                .user(&email)
                .with_context(|| format!("no user with email `{email}'"))?;
            let username = user.username.clone();
            for playlist in engine.playlists_owned_by(&username) {
                println!(
                    "{} ({} tracks, {}{})",
                    playlist.name,
                    playlist.len(),
                    playlist.sequencing().kind(),
                    if playlist.shuffle_active() { ", shuffle" } else { "" },
                );
            }
        }
        cli::Command::AddTrack { playlist, track } => {
            let email = require_user(&acting_user)?;
            let playlist_id = resolve_playlist(&engine, &email, &playlist)?;
            let track_id = engine
                .catalog()
                .track_by_name(&track)
                .with_context(|| format!("no track named `{track}' in the catalog"))?
                .id;
            engine.add_track_to_playlist(&email, &playlist_id, &track_id)?;
            println!("added `{track}' to `{playlist}'");
        }
        cli::Command::RemoveTrack { playlist, track } => {
            let email = require_user(&acting_user)?;
            let playlist_id = resolve_playlist(&engine, &email, &playlist)?;
            let target = engine
                .catalog()
                .track_by_name(&track)
                .with_context(|| format!("no track named `{track}' in the catalog"))?
                .clone();
            if engine.remove_track_from_playlist(&email, &playlist_id, &target)? {
                println!("removed `{track}' from `{playlist}'");
            } else {
                println!("`{track}' is not on `{playlist}'");
            }
        }
        cli::Command::Play { playlist } => {
            let email = require_user(&acting_user)?;
            let playlist_id = resolve_playlist(&engine, &email, &playlist)?;
            let playback = engine.play_current(&email, &playlist_id)?;
            print_playback(&playback);
        }
        cli::Command::Next { playlist } => {
            let email = require_user(&acting_user)?;
            let playlist_id = resolve_playlist(&engine, &email, &playlist)?;
            let playback = engine.play_next(&email, &playlist_id)?;
            print_playback(&playback);
        }
        cli::Command::Previous { playlist } => {
            let email = require_user(&acting_user)?;
            let playlist_id = resolve_playlist(&engine, &email, &playlist)?;
            let playback = engine.play_previous(&email, &playlist_id)?;
            print_playback(&playback);
        }
        cli::Command::Jump { playlist, index } => {
            let email = require_user(&acting_user)?;
            let playlist_id = resolve_playlist(&engine, &email, &playlist)?;
            let playback = engine.play_jump(&email, &playlist_id, index)?;
            print_playback(&playback);
        }
        cli::Command::Shuffle { playlist, mode } => {
            let email = require_user(&acting_user)?;
            let playlist_id = resolve_playlist(&engine, &email, &playlist)?;
            let target = engine.set_shuffle(&email, &playlist_id, mode.is_on())?;
            if target == playlist_id {
                println!("shuffle {:?} for `{playlist}'", mode);
            } else {
                println!("copied `{playlist}' into your collection with shuffle {mode:?}");
            }
        }
        cli::Command::PlayRandom { slot } => {
            let email = require_user(&acting_user)?;
            let playback = engine.play_free(&email, slot)?;
            print_playback(&playback);
        }
        cli::Command::Stop => match engine.stop_playing() {
            Some(track) => println!("stopped `{}' by `{}'", track.name, track.artist),
            None => println!("nothing is playing"),
        },
        cli::Command::SetDate { date } => {
            engine.set_date(date);
            println!("engine date set to {date}");
        }
        cli::Command::Generate {
            max_tracks,
            max_seconds,
            explicit_only,
        } => {
            let email = require_user(&acting_user)?;
            let limits = GenerationLimits {
                max_tracks,
                max_seconds,
            };
            match engine.generate_playlist(&email, limits, explicit_only)? {
                Some(id) => {
                    let playlist = engine.playlist(&id).expect("just stored");
                    println!(
                        "generated `{}' with {} tracks ({} seconds)",
                        playlist.name,
                        playlist.len(),
                        playlist.total_duration(),
                    );
                }
                None => println!("not enough listening history to generate a playlist"),
            }
        }
        cli::Command::Stats { report } => print_stats(&engine, &report),
        cli::Command::Completion { .. } => unreachable!("handled before loading the store"),
    }

    store::save(&engine, &mut conn)?;
    Ok(())
}

/// The acting user's email, from `--user` or `ENCORE_USER`.
fn require_user(user: &Option<String>) -> Result<String> {
    user.clone()
        .context("this command needs a user: pass --user or set ENCORE_USER")
}

/// Resolves one of the acting user's playlists by name.
fn resolve_playlist(engine: &Engine, email: &str, name: &str) -> Result<uuid::Uuid> {
    engine
        .playlist_by_name(email, name)
        .with_context(|| format!("you have no playlist named `{name}'"))
}

fn print_playback(playback: &Playback) {
    match playback {
        Playback::Track(track) => println!(
            "now playing: {} - {} ({})",
            track.artist,
            track.name,
            track.formatted_duration(),
        ),
        Playback::Empty => println!("nothing to play there"),
        Playback::Unavailable => println!("skipping is not available on a free playlist"),
    }
}

fn print_stats(engine: &Engine, report: &cli::StatsReport) {
    match report {
        cli::StatsReport::TopTrack => match engine.stats().track_plays.top() {
            Some((track, count)) => {
                println!("{} - {} with {count} plays", track.artist, track.name);
            }
            None => println!("no plays recorded yet"),
        },
        cli::StatsReport::TopArtist => match engine.stats().artist_plays.top() {
            Some((artist, count)) => println!("{artist} with {count} plays"),
            None => println!("no plays recorded yet"),
        },
        cli::StatsReport::TopGenre => match engine.stats().genre_plays.top() {
            Some((genre, count)) => println!("{genre} with {count} plays"),
            None => println!("no plays recorded yet"),
        },
        cli::StatsReport::TopListener { from, to } => {
            let range = match (from, to) {
                (Some(from), Some(to)) => Some((*from, *to)),
                _ => None,
            };
            match engine.stats().listening.top(range) {
                Some((email, plays)) => println!("{email} with {plays} plays"),
                None => println!("no plays recorded in that range"),
            }
        }
        cli::StatsReport::Leaderboard => {
            println!("{} listeners on the board", engine.leaderboard().user_count());
            for (rank, (email, points)) in engine.leaderboard().standings().iter().enumerate() {
                println!("{}. {email} with {points:.3} points", rank + 1);
            }
        }
        cli::StatsReport::Playlists => {
            println!("{} public playlists", engine.public_playlist_count());
            match engine.top_curator() {
                Some((owner, count)) => println!("busiest curator: {owner} with {count}"),
                None => println!("no curated playlists yet"),
            }
        }
    }
}
