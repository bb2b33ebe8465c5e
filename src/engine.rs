//! The session layer: users, their playlists, and the play fan-out.
//!
//! One [`Engine`] owns the whole in-memory state of the platform: the
//! catalog, the user registry, every curated playlist, the rotating pool of
//! free playlists, the leaderboard and the statistics registry. The
//! statistics registry is injected at construction so tests can hand in a
//! fresh one and inspect it afterwards.
//!
//! Every successful play, whatever flow produced it, is fanned out to the
//! same four taps: the leaderboard, the track/genre tallies, the artist
//! tally and the per-listener activity log. Playlists are owned by this map
//! alone; the "now playing" marker holds an id plus a snapshot of the track,
//! never a second mutable handle.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use log::{debug, info};
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{Album, Catalog, Track};
use crate::generator::{self, GenerationLimits};
use crate::leaderboard::{Leaderboard, Tier};
use crate::playlist::{Playback, Playlist};
use crate::stats::StatsRegistry;

/// How many free playlists are kept in rotation.
pub const FREE_POOL_SIZE: usize = 5;

/// Default owner label for platform-curated playlists.
const PLATFORM_OWNER: &str = "encore";

/// A registered listener. The email is the identity key everywhere; the
/// username labels playlist ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub email: String,
    pub tier: Tier,
}

/// Lightweight marker for the track currently playing: the source playlist's
/// id plus a snapshot of the track at play time.
#[derive(Debug, Clone)]
pub struct NowPlaying {
    pub playlist: Uuid,
    pub track: Track,
}

/// The whole platform state for one process.
pub struct Engine {
    catalog: Catalog,
    users: HashMap<String, User>,
    playlists: HashMap<Uuid, Playlist>,
    free_pool: Vec<Playlist>,
    leaderboard: Leaderboard,
    stats: StatsRegistry,
    date: NaiveDate,
    now_playing: Option<NowPlaying>,
}

impl Engine {
    /// Creates an empty engine reporting into `stats`, dated today.
    #[must_use]
    pub fn new(stats: StatsRegistry) -> Self {
        let mut engine = Self {
            catalog: Catalog::new(),
            users: HashMap::new(),
            playlists: HashMap::new(),
            free_pool: Vec::new(),
            leaderboard: Leaderboard::new(),
            stats,
            date: chrono::Local::now().date_naive(),
            now_playing: None,
        };
        engine.regenerate_free_pool();
        engine
    }

    /// Rebuilds an engine from persisted parts. The free pool is sampled
    /// fresh from the restored catalog rather than persisted.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        catalog: Catalog,
        users: Vec<User>,
        playlists: Vec<Playlist>,
        leaderboard: Leaderboard,
        stats: StatsRegistry,
        date: NaiveDate,
        now_playing: Option<NowPlaying>,
    ) -> Self {
        let mut engine = Self {
            catalog,
            users: users.into_iter().map(|u| (u.email.clone(), u)).collect(),
            playlists: playlists.into_iter().map(|p| (p.id, p)).collect(),
            free_pool: Vec::new(),
            leaderboard,
            stats,
            date,
            now_playing,
        };
        engine.regenerate_free_pool();
        engine
    }

    // ---- catalog -----------------------------------------------------

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn add_track(&mut self, track: Track) {
        self.catalog.add_track(track);
    }

    pub fn add_album(&mut self, album: Album) {
        self.catalog.add_album(album);
    }

    // ---- users -------------------------------------------------------

    pub fn register_user(
        &mut self,
        username: impl Into<String>,
        email: impl Into<String>,
        tier: Tier,
    ) -> Result<()> {
        let email = email.into();
        if email.is_empty() {
            bail!("an email address is required");
        }
        if self.users.contains_key(&email) {
            bail!("a user with email `{email}' already exists");
        }
        let username = username.into();
        info!("registering {} <{email}> on the {} plan", username, tier.as_str());
        self.users.insert(
            email.clone(),
            User {
                username,
                email,
                tier,
            },
        );
        Ok(())
    }

    #[must_use]
    pub fn user(&self, email: &str) -> Option<&User> {
        self.users.get(email)
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn change_tier(&mut self, email: &str, tier: Tier) -> Result<()> {
        let user = self
            .users
            .get_mut(email)
            .with_context(|| format!("no user with email `{email}'"))?;
        user.tier = tier;
        Ok(())
    }

    /// Deletes a user and everything keyed to them: owned playlists,
    /// leaderboard entries and listening activity.
    pub fn remove_user(&mut self, email: &str) -> Result<()> {
        let user = self
            .users
            .remove(email)
            .with_context(|| format!("no user with email `{email}'"))?;
        self.playlists.retain(|_, p| p.owner != user.username);
        self.leaderboard.remove_user(email);
        self.stats.remove_user(email);
        info!("removed {} <{email}> and their playlists", user.username);
        Ok(())
    }

    // ---- playlists ---------------------------------------------------

    /// Creates an empty premium playlist for `email`. Curation is a premium
    /// feature, so free-tier users are turned away.
    pub fn create_playlist(&mut self, email: &str, name: impl Into<String>) -> Result<Uuid> {
        let user = self.require_user(email)?.clone();
        if !user.tier.is_premium() {
            bail!("free-tier users cannot create playlists");
        }
        let playlist = Playlist::premium(name, &user.username);
        let id = playlist.id;
        self.playlists.insert(id, playlist);
        Ok(id)
    }

    /// Adopts an already-built playlist (a generated one, or a restored one).
    pub fn store_playlist(&mut self, playlist: Playlist) -> Uuid {
        let id = playlist.id;
        self.playlists.insert(id, playlist);
        id
    }

    #[must_use]
    pub fn playlist(&self, id: &Uuid) -> Option<&Playlist> {
        self.playlists.get(id)
    }

    pub fn playlists(&self) -> impl Iterator<Item = &Playlist> {
        self.playlists.values()
    }

    pub fn playlists_owned_by<'a>(&'a self, username: &'a str) -> impl Iterator<Item = &'a Playlist> {
        self.playlists.values().filter(move |p| p.owner == username)
    }

    /// Resolves a playlist by owner email and playlist name.
    #[must_use]
    pub fn playlist_by_name(&self, email: &str, name: &str) -> Option<Uuid> {
        let user = self.users.get(email)?;
        self.playlists
            .values()
            .find(|p| p.owner == user.username && p.name == name)
            .map(|p| p.id)
    }

    pub fn delete_playlist(&mut self, email: &str, id: &Uuid) -> Result<()> {
        let user = self.require_user(email)?.clone();
        let playlist = self
            .playlists
            .get(id)
            .with_context(|| format!("no playlist {id}"))?;
        if playlist.owner != user.username {
            bail!("only the owner can delete a playlist");
        }
        self.playlists.remove(id);
        Ok(())
    }

    pub fn add_track_to_playlist(
        &mut self,
        email: &str,
        playlist_id: &Uuid,
        track_id: &Uuid,
    ) -> Result<()> {
        let user = self.require_user(email)?.clone();
        let track = self
            .catalog
            .find_track(track_id)
            .with_context(|| format!("no track {track_id} in the catalog"))?
            .clone();
        let playlist = self
            .playlists
            .get_mut(playlist_id)
            .with_context(|| format!("no playlist {playlist_id}"))?;
        if playlist.owner != user.username {
            bail!("only the owner can edit a playlist");
        }
        if playlist.contains(&track) {
            debug!("`{}' already on `{}', adding anyway", track.name, playlist.name);
        }
        playlist.add_track(track);
        Ok(())
    }

    pub fn add_album_to_playlist(
        &mut self,
        email: &str,
        playlist_id: &Uuid,
        album_id: &Uuid,
    ) -> Result<()> {
        let user = self.require_user(email)?.clone();
        let album = self
            .catalog
            .find_album(album_id)
            .with_context(|| format!("no album {album_id} in the catalog"))?
            .clone();
        let playlist = self
            .playlists
            .get_mut(playlist_id)
            .with_context(|| format!("no playlist {playlist_id}"))?;
        if playlist.owner != user.username {
            bail!("only the owner can edit a playlist");
        }
        playlist.add_album(&album);
        Ok(())
    }

    pub fn remove_track_from_playlist(
        &mut self,
        email: &str,
        playlist_id: &Uuid,
        track: &Track,
    ) -> Result<bool> {
        let user = self.require_user(email)?.clone();
        let playlist = self
            .playlists
            .get_mut(playlist_id)
            .with_context(|| format!("no playlist {playlist_id}"))?;
        if playlist.owner != user.username {
            bail!("only the owner can edit a playlist");
        }
        Ok(playlist.remove_track(track))
    }

    /// Applies a shuffle setting for `email`. Owners mutate their playlist
    /// in place; anyone else gets a personal copy under a fresh identity and
    /// the original is left untouched. Returns the id the setting landed on.
    pub fn set_shuffle(&mut self, email: &str, playlist_id: &Uuid, on: bool) -> Result<Uuid> {
        let user = self.require_user(email)?.clone();
        let playlist = self
            .playlists
            .get(playlist_id)
            .with_context(|| format!("no playlist {playlist_id}"))?;
        if !playlist.can_skip() {
            bail!("free playlists have no shuffle mode");
        }

        let target_id = if playlist.owner == user.username {
            *playlist_id
        } else {
            let copy = playlist.clone_for(&user.username);
            info!(
                "cloning `{}' for {} before changing shuffle",
                copy.name, user.username
            );
            self.store_playlist(copy)
        };

        let target = self
            .playlists
            .get_mut(&target_id)
            .expect("target playlist was just resolved or inserted");
        target.set_shuffle(on);
        Ok(target_id)
    }

    // ---- free pool ---------------------------------------------------

    /// Re-samples the five free playlists from the current catalog.
    pub fn regenerate_free_pool(&mut self) {
        self.free_pool = (0..FREE_POOL_SIZE)
            .map(|i| {
                Playlist::free(
                    format!("random playlist #{i}"),
                    PLATFORM_OWNER,
                    self.catalog.tracks().cloned().collect(),
                )
            })
            .collect();
    }

    #[must_use]
    pub fn free_playlists(&self) -> &[Playlist] {
        &self.free_pool
    }

    /// Plays a random track from free-pool slot `slot`. The free policy has
    /// no cursor progression of its own, so each play rolls a fresh position
    /// before asking the playlist for its current track.
    pub fn play_free(&mut self, email: &str, slot: usize) -> Result<Playback> {
        let user = self.require_user(email)?.clone();
        let playlist = self
            .free_pool
            .get_mut(slot)
            .with_context(|| format!("no free playlist in slot {slot}"))?;
        if playlist.is_empty() {
            return Ok(Playback::Empty);
        }
        let position = thread_rng().gen_range(0..playlist.len());
        playlist.set_cursor(position);
        let playback = playlist.play_current();
        let id = playlist.id;
        self.report(&user, id, &playback);
        Ok(playback)
    }

    // ---- play flows --------------------------------------------------

    pub fn play_current(&mut self, email: &str, playlist_id: &Uuid) -> Result<Playback> {
        self.navigate(email, playlist_id, |p| p.play_current())
    }

    pub fn play_next(&mut self, email: &str, playlist_id: &Uuid) -> Result<Playback> {
        self.navigate(email, playlist_id, Playlist::next_track)
    }

    pub fn play_previous(&mut self, email: &str, playlist_id: &Uuid) -> Result<Playback> {
        self.navigate(email, playlist_id, Playlist::previous_track)
    }

    pub fn play_jump(&mut self, email: &str, playlist_id: &Uuid, index: usize) -> Result<Playback> {
        self.navigate(email, playlist_id, move |p| p.jump_to_track(index))
    }

    fn navigate(
        &mut self,
        email: &str,
        playlist_id: &Uuid,
        step: impl FnOnce(&mut Playlist) -> Playback,
    ) -> Result<Playback> {
        let user = self.require_user(email)?.clone();
        let playlist = self
            .playlists
            .get_mut(playlist_id)
            .with_context(|| format!("no playlist {playlist_id}"))?;
        let playback = step(playlist);
        self.report(&user, *playlist_id, &playback);
        Ok(playback)
    }

    /// Stops playback. Returns the track that was playing, if any.
    pub fn stop_playing(&mut self) -> Option<Track> {
        self.now_playing.take().map(|np| np.track)
    }

    #[must_use]
    pub fn now_playing(&self) -> Option<&NowPlaying> {
        self.now_playing.as_ref()
    }

    fn report(&mut self, user: &User, playlist: Uuid, playback: &Playback) {
        if let Playback::Track(track) = playback {
            self.leaderboard.record_play(&user.email, user.tier, track);
            self.stats.record_track_play(track);
            self.stats.record_artist_play(&track.artist);
            self.stats.record_session(&user.email, self.date);
            self.now_playing = Some(NowPlaying {
                playlist,
                track: track.clone(),
            });
            info!("{} is playing `{}' by `{}'", user.username, track.name, track.artist);
        }
    }

    // ---- generation --------------------------------------------------

    /// Runs the generator over `email`'s weighted history and stores the
    /// result in their collection. Returns the new playlist's id, or `None`
    /// when nothing could be generated.
    pub fn generate_playlist(
        &mut self,
        email: &str,
        limits: GenerationLimits,
        explicit_only: bool,
    ) -> Result<Option<Uuid>> {
        let user = self.require_user(email)?.clone();
        let history = self.leaderboard.user_history(email);
        let Some(playlist) =
            generator::generate(&user.username, history, limits, explicit_only, &self.catalog)
        else {
            return Ok(None);
        };
        Ok(Some(self.store_playlist(playlist)))
    }

    // ---- statistics --------------------------------------------------

    #[must_use]
    pub fn stats(&self) -> &StatsRegistry {
        &self.stats
    }

    #[must_use]
    pub fn leaderboard(&self) -> &Leaderboard {
        &self.leaderboard
    }

    /// Count of public playlists, curated and free-pool alike.
    #[must_use]
    pub fn public_playlist_count(&self) -> usize {
        self.playlists.values().filter(|p| p.public).count()
            + self.free_pool.iter().filter(|p| p.public).count()
    }

    /// The username owning the most playlists.
    #[must_use]
    pub fn top_curator(&self) -> Option<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for playlist in self.playlists.values() {
            *counts.entry(playlist.owner.as_str()).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .max_by_key(|(_, count)| *count)
            .map(|(owner, count)| (owner.to_string(), count))
    }

    // ---- clock -------------------------------------------------------

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = date;
    }

    fn require_user(&self, email: &str) -> Result<&User> {
        self.users
            .get(email)
            .with_context(|| format!("no user with email `{email}'"))
    }
}
