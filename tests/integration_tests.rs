//! # Integration Tests for Encore
//!
//! End-to-end tests driving the engine the way the CLI does: seed a catalog,
//! curate playlists, navigate, generate, and round-trip everything through
//! the SQLite store.

use anyhow::Result;
use std::process::Command;
use tempfile::TempDir;

use encore::catalog::Track;
use encore::engine::Engine;
use encore::generator::GenerationLimits;
use encore::leaderboard::Tier;
use encore::playlist::Playback;
use encore::stats::StatsRegistry;
use encore::store;

/// Test helper: an engine with three users and a small two-artist catalog.
fn seeded_engine() -> Engine {
    let mut engine = Engine::new(StatsRegistry::new());
    engine
        .register_user("alice", "alice@example.com", Tier::PremiumBase)
        .unwrap();
    engine
        .register_user("bob", "bob@example.com", Tier::PremiumTop)
        .unwrap();
    engine
        .register_user("carol", "carol@example.com", Tier::Free)
        .unwrap();

    let catalog: [(&str, &str, &str, u32); 6] = [
        ("Golden Hour", "The Lanterns", "indie", 217),
        ("Night Drive", "The Lanterns", "indie", 198),
        ("Paper Maps", "The Lanterns", "indie", 242),
        ("Static", "Volt Choir", "electronic", 185),
        ("Overload", "Volt Choir", "electronic", 171),
        ("Undertow", "Volt Choir", "electronic", 203),
    ];
    for (name, artist, genre, duration) in catalog {
        engine.add_track(Track::new(name, artist, "Nightjar", "...", genre, duration));
    }
    engine.regenerate_free_pool();
    engine
}

fn track_id(engine: &Engine, name: &str) -> uuid::Uuid {
    engine.catalog().track_by_name(name).expect("seeded").id
}

mod cli_tests {
    use super::*;

    #[test]
    fn help_displays_the_commands() {
        let output = Command::new("cargo")
            .args(["run", "--quiet", "--", "--help"])
            .output()
            .expect("failed to run help command");

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("encore"));
        assert!(stdout.contains("seed"));
        assert!(stdout.contains("generate"));
        assert!(stdout.contains("play-random"));
        assert!(stdout.contains("stats"));
    }

    #[test]
    fn completion_generation_works() {
        let output = Command::new("cargo")
            .args(["run", "--quiet", "--", "completion", "bash"])
            .output()
            .expect("failed to run completion command");

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("_encore"));
        assert!(stdout.contains("complete"));
    }
}

mod navigation_flow_tests {
    use super::*;

    #[test]
    fn curate_navigate_and_backtrack() -> Result<()> {
        let mut engine = seeded_engine();
        let playlist = engine.create_playlist("alice@example.com", "Road Trip")?;
        for name in ["Golden Hour", "Night Drive", "Paper Maps"] {
            let id = track_id(&engine, name);
            engine.add_track_to_playlist("alice@example.com", &playlist, &id)?;
        }

        // Forward through the whole playlist, wrapping back to the start.
        let names: Vec<String> = (0..3)
            .map(|_| {
                engine
                    .play_next("alice@example.com", &playlist)
                    .unwrap()
                    .track()
                    .unwrap()
                    .name
                    .clone()
            })
            .collect();
        assert_eq!(names, ["Night Drive", "Paper Maps", "Golden Hour"]);

        // Backtrack pops the recorded positions in reverse.
        let back = engine.play_previous("alice@example.com", &playlist)?;
        assert_eq!(back.track().unwrap().name, "Paper Maps");
        let back = engine.play_previous("alice@example.com", &playlist)?;
        assert_eq!(back.track().unwrap().name, "Night Drive");

        // Every successful play above hit the leaderboard.
        assert_eq!(
            engine.leaderboard().user_history("alice@example.com").len(),
            3
        );
        Ok(())
    }

    #[test]
    fn free_user_keeps_to_the_free_pool() -> Result<()> {
        let mut engine = seeded_engine();

        assert!(engine.create_playlist("carol@example.com", "Nope").is_err());

        let playback = engine.play_free("carol@example.com", 2)?;
        assert!(playback.track().is_some());
        assert_eq!(
            engine.leaderboard().user_history("carol@example.com")[0].1,
            5.0
        );
        Ok(())
    }

    #[test]
    fn shared_playlist_shuffle_clones_for_the_listener() -> Result<()> {
        let mut engine = seeded_engine();
        let original = engine.create_playlist("alice@example.com", "Shared")?;
        let id = track_id(&engine, "Static");
        engine.add_track_to_playlist("alice@example.com", &original, &id)?;

        let copy = engine.set_shuffle("bob@example.com", &original, true)?;
        assert_ne!(copy, original);
        assert!(!engine.playlist(&original).unwrap().shuffle_active());
        assert_eq!(engine.playlist(&copy).unwrap().owner, "bob");

        // Bob navigates his copy without touching Alice's playlist.
        engine.play_next("bob@example.com", &copy)?;
        assert!(engine.playlist(&original).unwrap().history().is_empty());
        Ok(())
    }
}

mod generation_flow_tests {
    use super::*;

    #[test]
    fn listening_history_drives_generation() -> Result<()> {
        let mut engine = seeded_engine();
        let playlist = engine.create_playlist("alice@example.com", "Seed")?;
        let favourite = track_id(&engine, "Golden Hour");
        engine.add_track_to_playlist("alice@example.com", &playlist, &favourite)?;

        // Three plays build up weight on one Lanterns track.
        for _ in 0..3 {
            engine.play_current("alice@example.com", &playlist)?;
        }

        let generated = engine
            .generate_playlist("alice@example.com", GenerationLimits::default(), false)?
            .expect("history exists");
        let result = engine.playlist(&generated).unwrap();

        assert_eq!(result.name, "Generated Playlist");
        assert_eq!(result.tracks()[0].name, "Golden Hour");
        // Backfill pads with the other Lanterns tracks.
        assert!(result.tracks().iter().any(|t| t.name == "Night Drive"));
        assert!(result.tracks().iter().any(|t| t.name == "Paper Maps"));
        Ok(())
    }

    #[test]
    fn generated_playlist_is_navigable() -> Result<()> {
        let mut engine = seeded_engine();
        let playlist = engine.create_playlist("bob@example.com", "Seed")?;
        let id = track_id(&engine, "Overload");
        engine.add_track_to_playlist("bob@example.com", &playlist, &id)?;
        engine.play_current("bob@example.com", &playlist)?;

        let generated = engine
            .generate_playlist("bob@example.com", GenerationLimits::default(), false)?
            .expect("history exists");

        let playback = engine.play_next("bob@example.com", &generated)?;
        assert!(matches!(playback, Playback::Track(_)));
        Ok(())
    }

    #[test]
    fn impossible_limits_generate_nothing() -> Result<()> {
        let mut engine = seeded_engine();
        let playlist = engine.create_playlist("alice@example.com", "Seed")?;
        let id = track_id(&engine, "Golden Hour");
        engine.add_track_to_playlist("alice@example.com", &playlist, &id)?;
        engine.play_current("alice@example.com", &playlist)?;

        let limits = GenerationLimits {
            max_tracks: 10,
            max_seconds: 60, // shorter than any seeded track
        };
        assert!(engine
            .generate_playlist("alice@example.com", limits, false)?
            .is_none());
        Ok(())
    }
}

mod persistence_tests {
    use super::*;

    #[test]
    fn full_state_survives_a_restart() -> Result<()> {
        let dir = TempDir::new()?;
        let db_path = dir.path().join("encore.db");

        let mut engine = seeded_engine();
        let playlist = engine.create_playlist("alice@example.com", "Road Trip")?;
        for name in ["Golden Hour", "Night Drive", "Paper Maps"] {
            let id = track_id(&engine, name);
            engine.add_track_to_playlist("alice@example.com", &playlist, &id)?;
        }
        engine.play_next("alice@example.com", &playlist)?;
        engine.play_next("alice@example.com", &playlist)?;
        let before = engine.playlist(&playlist).unwrap().play_current();

        let mut conn = store::open(&db_path)?;
        store::save(&engine, &mut conn)?;
        drop(conn);

        // A second "process" opens the same file.
        let conn = store::open(&db_path)?;
        let mut restored = store::load(&conn)?;

        let survivor = restored.playlist(&playlist).expect("playlist survives");
        assert_eq!(survivor.play_current(), before);
        assert_eq!(survivor.history().len(), 2);

        // Navigation carries on from the persisted cursor and history.
        let back = restored.play_previous("alice@example.com", &playlist)?;
        assert_eq!(back.track().unwrap().name, "Night Drive");

        // Leaderboard and tallies made it across too.
        assert_eq!(
            restored.leaderboard().user_history("alice@example.com").len(),
            2
        );
        assert!(restored.stats().artist_plays.count("The Lanterns") >= 2);
        Ok(())
    }

    #[test]
    fn user_removal_persists() -> Result<()> {
        let dir = TempDir::new()?;
        let db_path = dir.path().join("encore.db");

        let mut engine = seeded_engine();
        let playlist = engine.create_playlist("alice@example.com", "Road Trip")?;
        let id = track_id(&engine, "Golden Hour");
        engine.add_track_to_playlist("alice@example.com", &playlist, &id)?;
        engine.play_current("alice@example.com", &playlist)?;
        engine.remove_user("alice@example.com")?;

        let mut conn = store::open(&db_path)?;
        store::save(&engine, &mut conn)?;
        let restored = store::load(&conn)?;

        assert!(restored.user("alice@example.com").is_none());
        assert!(restored.playlist(&playlist).is_none());
        assert!(restored
            .leaderboard()
            .user_history("alice@example.com")
            .is_empty());
        Ok(())
    }
}
