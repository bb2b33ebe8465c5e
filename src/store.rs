//! SQLite persistence for the engine state.
//!
//! The whole platform state round-trips through one database file: scalar
//! columns for the obvious fields, JSON blobs for the ordered parts (track
//! id lists, navigation history, the statistics registry). Saving rewrites
//! everything in one transaction; loading rebuilds the engine and re-samples
//! the free playlist pool from the restored catalog.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{trace, warn};
use rusqlite::{Connection, OptionalExtension};
use serde::Deserialize;
use uuid::Uuid;

use crate::catalog::{Album, Catalog, Track};
use crate::engine::{Engine, NowPlaying, User};
use crate::leaderboard::{Leaderboard, Tier};
use crate::playlist::{Playlist, Sequencing};
use crate::stats::StatsRegistry;

/// Connect to the database file, creating it if needed.
pub fn connect(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("cannot open database at {}", db_path.display()))?;
    Ok(conn)
}

/// Create every table this crate persists into. Safe to call repeatedly.
pub fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS track (
            id         TEXT PRIMARY KEY,
            name       TEXT    NOT NULL,
            artist     TEXT    NOT NULL,
            label      TEXT    NOT NULL,
            lyrics     TEXT    NOT NULL,
            genre      TEXT    NOT NULL,
            duration   INTEGER NOT NULL,
            explicit   INTEGER NOT NULL,
            multimedia INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS album (
            id        TEXT PRIMARY KEY,
            name      TEXT NOT NULL,
            artist    TEXT NOT NULL,
            track_ids TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS user (
            email    TEXT PRIMARY KEY,
            username TEXT NOT NULL,
            tier     TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS playlist (
            id        TEXT PRIMARY KEY,
            name      TEXT    NOT NULL,
            owner     TEXT    NOT NULL,
            public    INTEGER NOT NULL,
            kind      TEXT    NOT NULL,
            shuffle   INTEGER NOT NULL,
            cursor    INTEGER NOT NULL,
            track_ids TEXT    NOT NULL,
            history   TEXT    NOT NULL
        );
        CREATE TABLE IF NOT EXISTS leaderboard (
            email    TEXT NOT NULL,
            track_id TEXT NOT NULL,
            points   REAL NOT NULL,
            PRIMARY KEY (email, track_id)
        );
        CREATE TABLE IF NOT EXISTS snapshot (
            id          INTEGER PRIMARY KEY CHECK (id = 1),
            stats       TEXT NOT NULL,
            date        TEXT NOT NULL,
            np_playlist TEXT,
            np_track    TEXT
        );",
    )
    .context("cannot create schema")?;
    Ok(())
}

/// Convenience: connect and ensure the schema exists.
pub fn open(db_path: &Path) -> Result<Connection> {
    let conn = connect(db_path)?;
    init(&conn)?;
    Ok(conn)
}

/// Rewrite the whole engine state in one transaction.
pub fn save(engine: &Engine, conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute_batch(
        "DELETE FROM track;
         DELETE FROM album;
         DELETE FROM user;
         DELETE FROM playlist;
         DELETE FROM leaderboard;
         DELETE FROM snapshot;",
    )
    .context("cannot clear previous snapshot")?;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO track (id, name, artist, label, lyrics, genre, duration, explicit, multimedia)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        for track in engine.catalog().tracks() {
            stmt.execute((
                track.id.to_string(),
                &track.name,
                &track.artist,
                &track.label,
                &track.lyrics,
                &track.genre,
                track.duration,
                track.explicit,
                track.multimedia,
            ))
            .with_context(|| format!("cannot insert track `{}'", track.name))?;
        }
    }

    {
        let mut stmt =
            tx.prepare("INSERT INTO album (id, name, artist, track_ids) VALUES (?1, ?2, ?3, ?4)")?;
        for album in engine.catalog().albums() {
            let ids: Vec<Uuid> = album.tracks.iter().map(|t| t.id).collect();
            stmt.execute((
                album.id.to_string(),
                &album.name,
                &album.artist,
                serde_json::to_string(&ids)?,
            ))
            .with_context(|| format!("cannot insert album `{}'", album.name))?;
        }
    }

    {
        let mut stmt =
            tx.prepare("INSERT INTO user (email, username, tier) VALUES (?1, ?2, ?3)")?;
        for user in engine.users() {
            stmt.execute((&user.email, &user.username, user.tier.as_str()))
                .with_context(|| format!("cannot insert user `{}'", user.email))?;
        }
    }

    {
        let mut stmt = tx.prepare(
            "INSERT INTO playlist (id, name, owner, public, kind, shuffle, cursor, track_ids, history)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        for playlist in engine.playlists() {
            let ids: Vec<Uuid> = playlist.tracks().iter().map(|t| t.id).collect();
            stmt.execute((
                playlist.id.to_string(),
                &playlist.name,
                &playlist.owner,
                playlist.public,
                playlist.sequencing().kind(),
                playlist.shuffle_active(),
                playlist.cursor(),
                serde_json::to_string(&ids)?,
                serde_json::to_string(playlist.history())?,
            ))
            .with_context(|| format!("cannot insert playlist `{}'", playlist.name))?;
        }
    }

    {
        let mut stmt = tx
            .prepare("INSERT INTO leaderboard (email, track_id, points) VALUES (?1, ?2, ?3)")?;
        for (email, track, points) in engine.leaderboard().entries() {
            stmt.execute((email, track.id.to_string(), points))
                .with_context(|| format!("cannot insert leaderboard row for `{email}'"))?;
        }
    }

    let now_playing = engine.now_playing();
    tx.execute(
        "INSERT INTO snapshot (id, stats, date, np_playlist, np_track) VALUES (1, ?1, ?2, ?3, ?4)",
        (
            serde_json::to_string(engine.stats())?,
            engine.date().to_string(),
            now_playing.map(|np| np.playlist.to_string()),
            now_playing.map(|np| np.track.id.to_string()),
        ),
    )
    .context("cannot insert statistics snapshot")?;

    tx.commit().context("commit failed while saving state")?;
    trace!("engine state saved");
    Ok(())
}

/// Rebuild an engine from the database. Rows referencing tracks that no
/// longer exist are skipped with a warning rather than failing the load.
pub fn load(conn: &Connection) -> Result<Engine> {
    let mut catalog = Catalog::new();

    let mut stmt = conn
        .prepare("SELECT id, name, artist, label, lyrics, genre, duration, explicit, multimedia FROM track")
        .context("cannot query tracks")?;
    let tracks = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            Track {
                id: Uuid::nil(), // patched below once the id column parses
                name: row.get(1)?,
                artist: row.get(2)?,
                label: row.get(3)?,
                lyrics: row.get(4)?,
                genre: row.get(5)?,
                duration: row.get(6)?,
                explicit: row.get(7)?,
                multimedia: row.get(8)?,
            },
        ))
    })?;
    for entry in tracks {
        let (id, mut track) = entry.context("cannot read track row")?;
        track.id = parse_uuid(&id)?;
        catalog.add_track(track);
    }

    let mut stmt = conn
        .prepare("SELECT id, name, artist, track_ids FROM album")
        .context("cannot query albums")?;
    let albums = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;
    for entry in albums {
        let (id, name, artist, ids) = entry.context("cannot read album row")?;
        let tracks = resolve_tracks(&catalog, &ids, &name)?;
        catalog.add_album(Album {
            id: parse_uuid(&id)?,
            name,
            artist,
            tracks,
        });
    }

    let mut stmt = conn
        .prepare("SELECT email, username, tier FROM user")
        .context("cannot query users")?;
    let users = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()
        .context("cannot read user rows")?
        .into_iter()
        .map(|(email, username, tier)| {
            let tier = Tier::parse(&tier)
                .with_context(|| format!("unknown tier `{tier}' for `{email}'"))?;
            Ok(User {
                username,
                email,
                tier,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut stmt = conn
        .prepare("SELECT id, name, owner, public, kind, shuffle, cursor, track_ids, history FROM playlist")
        .context("cannot query playlists")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, bool>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, bool>(5)?,
                row.get::<_, usize>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()
        .context("cannot read playlist rows")?;
    let mut playlists = Vec::with_capacity(rows.len());
    for (id, name, owner, public, kind, shuffle, cursor, ids, history) in rows {
        let tracks = resolve_tracks(&catalog, &ids, &name)?;
        let sequencing = match kind.as_str() {
            "free" => Sequencing::Free,
            _ => Sequencing::Premium {
                shuffle,
                history: serde_json::from_str(&history)
                    .with_context(|| format!("corrupt history for playlist `{name}'"))?,
            },
        };
        playlists.push(Playlist::restore(
            parse_uuid(&id)?,
            name,
            owner,
            public,
            tracks,
            cursor,
            sequencing,
        ));
    }

    let mut leaderboard = Leaderboard::new();
    let mut stmt = conn
        .prepare("SELECT email, track_id, points FROM leaderboard")
        .context("cannot query leaderboard")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, f64>(2)?,
        ))
    })?;
    for entry in rows {
        let (email, track_id, points) = entry.context("cannot read leaderboard row")?;
        match catalog.find_track(&parse_uuid(&track_id)?) {
            Some(track) => leaderboard.restore_entry(&email, track.clone(), points),
            None => warn!("dropping leaderboard row for vanished track {track_id}"),
        }
    }

    let snapshot = conn
        .query_row(
            "SELECT stats, date, np_playlist, np_track FROM snapshot WHERE id = 1",
            [],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            },
        )
        .optional()
        .context("cannot query statistics snapshot")?;
    let (stats, date, now_playing) = match snapshot {
        Some((stats, date, np_playlist, np_track)) => {
            let now_playing = match (np_playlist, np_track) {
                (Some(playlist), Some(track_id)) => {
                    let playlist = parse_uuid(&playlist)?;
                    match catalog.find_track(&parse_uuid(&track_id)?) {
                        Some(track) => Some(NowPlaying {
                            playlist,
                            track: track.clone(),
                        }),
                        None => {
                            warn!("dropping now-playing marker for vanished track {track_id}");
                            None
                        }
                    }
                }
                _ => None,
            };
            (
                serde_json::from_str::<StatsRegistry>(&stats)
                    .context("corrupt statistics snapshot")?,
                date.parse::<NaiveDate>()
                    .with_context(|| format!("corrupt snapshot date `{date}'"))?,
                now_playing,
            )
        }
        None => (StatsRegistry::new(), chrono::Local::now().date_naive(), None),
    };

    trace!("engine state loaded");
    Ok(Engine::restore(
        catalog,
        users,
        playlists,
        leaderboard,
        stats,
        date,
        now_playing,
    ))
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).with_context(|| format!("corrupt id `{s}'"))
}

fn resolve_tracks(catalog: &Catalog, ids_json: &str, owner_name: &str) -> Result<Vec<Track>> {
    let ids: Vec<Uuid> = serde_json::from_str(ids_json)
        .with_context(|| format!("corrupt track list for `{owner_name}'"))?;
    let mut tracks = Vec::with_capacity(ids.len());
    for id in ids {
        match catalog.find_track(&id) {
            Some(track) => tracks.push(track.clone()),
            None => warn!("dropping vanished track {id} from `{owner_name}'"),
        }
    }
    Ok(tracks)
}

// ---- seeding ---------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    users: Vec<SeedUser>,
    #[serde(default)]
    artists: Vec<SeedArtist>,
}

#[derive(Debug, Deserialize)]
struct SeedUser {
    username: String,
    email: String,
    tier: String,
}

#[derive(Debug, Deserialize)]
struct SeedArtist {
    name: String,
    #[serde(default)]
    albums: Vec<SeedAlbum>,
    #[serde(default)]
    singles: Vec<SeedTrack>,
}

#[derive(Debug, Deserialize)]
struct SeedAlbum {
    name: String,
    tracks: Vec<SeedTrack>,
}

#[derive(Debug, Deserialize)]
struct SeedTrack {
    name: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    lyrics: String,
    genre: String,
    duration: u32,
    #[serde(default)]
    explicit: bool,
    #[serde(default)]
    multimedia: bool,
}

impl SeedTrack {
    fn into_track(self, artist: &str) -> Track {
        let mut track = Track::new(
            self.name,
            artist,
            self.label,
            self.lyrics,
            self.genre,
            self.duration,
        );
        if self.explicit {
            track = track.explicit();
        }
        if self.multimedia {
            track = track.multimedia();
        }
        track
    }
}

/// Populate `engine` from a JSON seed file of users, artists, albums and
/// singles. Returns `(users, tracks)` counts.
pub fn import_seed(engine: &mut Engine, path: &Path) -> Result<(usize, usize)> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("cannot read seed file {}", path.display()))?;
    let seed: SeedFile = serde_json::from_str(&raw)
        .with_context(|| format!("cannot parse seed file {}", path.display()))?;

    let mut users = 0;
    for user in seed.users {
        let tier = Tier::parse(&user.tier)
            .with_context(|| format!("unknown tier `{}' for `{}'", user.tier, user.email))?;
        engine.register_user(user.username, user.email, tier)?;
        users += 1;
    }

    let mut tracks = 0;
    for artist in seed.artists {
        for album in artist.albums {
            let album_tracks: Vec<Track> = album
                .tracks
                .into_iter()
                .map(|t| t.into_track(&artist.name))
                .collect();
            tracks += album_tracks.len();
            engine.add_album(Album::new(album.name, &artist.name, album_tracks));
        }
        for single in artist.singles {
            engine.add_track(single.into_track(&artist.name));
            tracks += 1;
        }
    }

    engine.regenerate_free_pool();
    Ok((users, tracks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GenerationLimits;
    use std::io::Write;
    use tempfile::TempDir;

    fn temp_db() -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("encore-test.db");
        (dir, path)
    }

    fn seeded_engine() -> Engine {
        let mut engine = Engine::new(StatsRegistry::new());
        engine
            .register_user("alice", "alice@x.com", Tier::PremiumTop)
            .unwrap();
        for i in 0..4 {
            engine.add_track(Track::new(
                format!("Track {i}"),
                "Band",
                "Label",
                "...",
                "rock",
                200,
            ));
        }
        engine.regenerate_free_pool();
        engine
    }

    #[test]
    fn round_trip_preserves_play_current() -> Result<()> {
        let (_dir, path) = temp_db();
        let mut engine = seeded_engine();
        let id = engine.create_playlist("alice@x.com", "Mix")?;
        for track_id in engine
            .catalog()
            .tracks()
            .map(|t| t.id)
            .collect::<Vec<_>>()
        {
            engine.add_track_to_playlist("alice@x.com", &id, &track_id)?;
        }
        engine.play_next("alice@x.com", &id)?;
        engine.play_next("alice@x.com", &id)?;
        let before = engine.playlist(&id).unwrap().play_current();

        let mut conn = open(&path)?;
        save(&engine, &mut conn)?;
        let restored = load(&conn)?;

        let playlist = restored.playlist(&id).expect("playlist survives");
        assert_eq!(playlist.play_current(), before);
        assert_eq!(playlist.cursor(), engine.playlist(&id).unwrap().cursor());
        assert_eq!(playlist.history(), engine.playlist(&id).unwrap().history());
        Ok(())
    }

    #[test]
    fn round_trip_preserves_leaderboard_and_stats() -> Result<()> {
        let (_dir, path) = temp_db();
        let mut engine = seeded_engine();
        let id = engine.create_playlist("alice@x.com", "Mix")?;
        let track_id = engine.catalog().tracks().next().unwrap().id;
        engine.add_track_to_playlist("alice@x.com", &id, &track_id)?;
        engine.play_current("alice@x.com", &id)?;
        engine.play_current("alice@x.com", &id)?;

        let mut conn = open(&path)?;
        save(&engine, &mut conn)?;
        let restored = load(&conn)?;

        assert_eq!(
            restored.leaderboard().user_history("alice@x.com")[0].1,
            102.5
        );
        let track = restored.catalog().find_track(&track_id).unwrap().clone();
        assert_eq!(restored.stats().track_plays.count(&track), 2);
        assert_eq!(restored.date(), engine.date());
        Ok(())
    }

    #[test]
    fn generated_playlist_survives_restart() -> Result<()> {
        let (_dir, path) = temp_db();
        let mut engine = seeded_engine();
        let id = engine.create_playlist("alice@x.com", "Mix")?;
        let track_id = engine.catalog().tracks().next().unwrap().id;
        engine.add_track_to_playlist("alice@x.com", &id, &track_id)?;
        engine.play_current("alice@x.com", &id)?;
        let generated = engine
            .generate_playlist("alice@x.com", GenerationLimits::default(), false)?
            .expect("history exists");

        let mut conn = open(&path)?;
        save(&engine, &mut conn)?;
        let restored = load(&conn)?;

        let playlist = restored.playlist(&generated).expect("generated survives");
        assert_eq!(playlist.name, "Generated Playlist");
        assert!(playlist.can_skip());
        Ok(())
    }

    #[test]
    fn now_playing_marker_round_trips() -> Result<()> {
        let (_dir, path) = temp_db();
        let mut engine = seeded_engine();
        let id = engine.create_playlist("alice@x.com", "Mix")?;
        let track_id = engine.catalog().tracks().next().unwrap().id;
        engine.add_track_to_playlist("alice@x.com", &id, &track_id)?;
        engine.play_current("alice@x.com", &id)?;

        let mut conn = open(&path)?;
        save(&engine, &mut conn)?;
        let mut restored = load(&conn)?;

        let marker = restored.now_playing().expect("marker survives");
        assert_eq!(marker.playlist, id);
        assert_eq!(marker.track.id, track_id);

        // Stopping clears it for the next save.
        assert!(restored.stop_playing().is_some());
        save(&restored, &mut conn)?;
        let stopped = load(&conn)?;
        assert!(stopped.now_playing().is_none());
        Ok(())
    }

    #[test]
    fn load_regenerates_the_free_pool() -> Result<()> {
        let (_dir, path) = temp_db();
        let engine = seeded_engine();

        let mut conn = open(&path)?;
        save(&engine, &mut conn)?;
        let restored = load(&conn)?;

        assert_eq!(restored.free_playlists().len(), 5);
        for playlist in restored.free_playlists() {
            assert!(playlist.len() <= 10);
        }
        Ok(())
    }

    #[test]
    fn seed_file_imports_users_albums_and_singles() -> Result<()> {
        let dir = TempDir::new()?;
        let seed_path = dir.path().join("seed.json");
        let mut file = fs::File::create(&seed_path)?;
        write!(
            file,
            r#"{{
                "users": [
                    {{"username": "alice", "email": "alice@x.com", "tier": "premium-base"}}
                ],
                "artists": [
                    {{
                        "name": "Band",
                        "albums": [
                            {{"name": "Debut", "tracks": [
                                {{"name": "One", "genre": "rock", "duration": 180}},
                                {{"name": "Two", "genre": "rock", "duration": 200, "explicit": true}}
                            ]}}
                        ],
                        "singles": [
                            {{"name": "Loose", "genre": "pop", "duration": 150, "multimedia": true}}
                        ]
                    }}
                ]
            }}"#
        )?;

        let mut engine = Engine::new(StatsRegistry::new());
        let (users, tracks) = import_seed(&mut engine, &seed_path)?;

        assert_eq!(users, 1);
        assert_eq!(tracks, 3);
        assert_eq!(engine.catalog().track_count(), 3);
        assert!(engine.user("alice@x.com").is_some());
        assert!(engine.catalog().track_by_name("Two").unwrap().explicit);
        assert!(engine.catalog().track_by_name("Loose").unwrap().multimedia);
        assert_eq!(engine.catalog().tracks_by_artist("Band").len(), 3);
        Ok(())
    }
}
