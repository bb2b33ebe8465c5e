//! Per-user, per-track engagement points.
//!
//! Every successful play credits the listener with points for that track.
//! The first play of a track pays out the listener's tier base; every later
//! play pays 2.5% of the points already accrued on that pair, which gives
//! fast initial growth that flattens into a plateau. Points never decrease.

use std::collections::HashMap;

use log::trace;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::catalog::Track;

/// Fraction of the accrued points paid out on each repeat play.
pub const GROWTH_RATE: f64 = 0.025;

/// Subscription level. Controls the monthly price and the first-play payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Free,
    PremiumBase,
    PremiumTop,
}

impl Tier {
    /// Points credited the first time a user plays a given track.
    #[must_use]
    pub fn base_points(self) -> f64 {
        match self {
            Tier::Free => 5.0,
            Tier::PremiumBase => 10.0,
            Tier::PremiumTop => 100.0,
        }
    }

    #[must_use]
    pub fn monthly_price(self) -> f64 {
        match self {
            Tier::Free => 0.0,
            Tier::PremiumBase => 5.0,
            Tier::PremiumTop => 10.0,
        }
    }

    /// Whether this tier unlocks playlist curation and navigation.
    #[must_use]
    pub fn is_premium(self) -> bool {
        !matches!(self, Tier::Free)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::PremiumBase => "premium-base",
            Tier::PremiumTop => "premium-top",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(Tier::Free),
            "premium-base" => Some(Tier::PremiumBase),
            "premium-top" => Some(Tier::PremiumTop),
            _ => None,
        }
    }
}

/// Accrued points per listener, keyed by the listener's email.
///
/// Track entries are matched with full track equality, so a reissued record
/// with a fresh id but identical fields accrues onto the existing entry.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Leaderboard {
    points: HashMap<String, Vec<(Track, f64)>>,
}

impl Leaderboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `email` for one play of `track` under `tier`.
    pub fn record_play(&mut self, email: &str, tier: Tier, track: &Track) {
        let entries = self.points.entry(email.to_string()).or_default();
        let current = entries
            .iter()
            .find(|(t, _)| t == track)
            .map_or(0.0, |(_, p)| *p);

        let increment = if current == 0.0 {
            tier.base_points()
        } else {
            current * GROWTH_RATE
        };

        trace!("{email} +{increment:.3} points on `{}'", track.name);
        match entries.iter_mut().find(|(t, _)| t == track) {
            Some(entry) => entry.1 = current + increment,
            None => entries.push((track.clone(), increment)),
        }
    }

    /// The full per-track point map for `email`. This is the weighted
    /// history the playlist generator consumes.
    #[must_use]
    pub fn user_history(&self, email: &str) -> &[(Track, f64)] {
        self.points.get(email).map_or(&[], Vec::as_slice)
    }

    /// Sum of all points `email` has accrued.
    #[must_use]
    pub fn total_points(&self, email: &str) -> f64 {
        self.user_history(email).iter().map(|(_, p)| p).sum()
    }

    /// Drops every entry belonging to `email`.
    pub fn remove_user(&mut self, email: &str) {
        self.points.retain(|key, _| key != email);
    }

    /// Total points per listener, highest first.
    #[must_use]
    pub fn standings(&self) -> Vec<(String, f64)> {
        let mut rows: Vec<(String, f64)> = self
            .points
            .par_iter()
            .map(|(email, entries)| (email.clone(), entries.iter().map(|(_, p)| p).sum()))
            .collect();
        rows.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        rows
    }

    #[must_use]
    pub fn user_count(&self) -> usize {
        self.points.len()
    }

    /// Iterates `(email, track, points)` rows, for persistence.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Track, f64)> {
        self.points.iter().flat_map(|(email, entries)| {
            entries
                .iter()
                .map(move |(track, points)| (email.as_str(), track, *points))
        })
    }

    /// Reinserts a persisted row without applying the increment rule.
    pub fn restore_entry(&mut self, email: &str, track: Track, points: f64) {
        self.points
            .entry(email.to_string())
            .or_default()
            .push((track, points));
    }
}
