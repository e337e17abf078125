//! Scheduler configuration.
//!
//! All knobs the scheduler consults live here so tests and embedding
//! applications can override them per deck. Defaults mirror the stock
//! values users know from Anki.

use serde::{Deserialize, Serialize};

/// Policy controlling when new cards are interleaved with due reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NewSpread {
    /// Spread new cards evenly through the reviews.
    Distribute,
    /// Show new cards only once reviews are exhausted.
    Last,
    /// Show new cards before reviews.
    First,
}

impl Default for NewSpread {
    fn default() -> Self {
        Self::Distribute
    }
}

/// Per-deck scheduling options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerConfig {
    #[serde(default)]
    pub new_spread: NewSpread,
    /// Daily cap on new cards entering the session.
    #[serde(default = "default_new_cards_per_day")]
    pub new_cards_per_day: usize,
    /// Daily cap on due review cards.
    #[serde(default = "default_review_cards_per_day")]
    pub review_cards_per_day: usize,
    /// Hard cap on the learning queue per refill.
    #[serde(default = "default_report_limit")]
    pub report_limit: usize,
    /// How far ahead (seconds) an almost-due learning card may be shown.
    #[serde(default = "default_collapse_time_secs")]
    pub collapse_time_secs: i64,
    /// Learning steps for new cards, in minutes.
    #[serde(default = "default_new_steps")]
    pub new_steps: Vec<u32>,
    /// Relearning steps after a lapse, in minutes.
    #[serde(default = "default_lapse_steps")]
    pub lapse_steps: Vec<u32>,
    /// Floor (days) for the interval of a lapsed card.
    #[serde(default = "default_lapse_min_ivl")]
    pub lapse_min_ivl: i32,
    /// Multiplier applied to the old interval when a lapsed card fails again.
    #[serde(default)]
    pub lapse_mult: f64,
    /// Lapses after which a card is suspended as a leech.
    #[serde(default = "default_leech_fails")]
    pub leech_fails: u32,
    /// Ease factor (permille) given to a card on first graduation.
    #[serde(default = "default_initial_factor")]
    pub initial_factor: i32,
    /// Interval (days) for a card graduating via Good.
    #[serde(default = "default_graduating_ivl")]
    pub graduating_ivl: i32,
    /// Interval (days) for a card graduating early via Easy.
    #[serde(default = "default_easy_ivl")]
    pub easy_ivl: i32,
    /// Day-boundary shift in seconds east of UTC. 0 keeps UTC midnights.
    #[serde(default)]
    pub tz_offset_secs: i64,
}

fn default_new_cards_per_day() -> usize {
    20
}

fn default_review_cards_per_day() -> usize {
    200
}

fn default_report_limit() -> usize {
    1000
}

fn default_collapse_time_secs() -> i64 {
    1200
}

fn default_new_steps() -> Vec<u32> {
    vec![1, 10]
}

fn default_lapse_steps() -> Vec<u32> {
    vec![10]
}

fn default_lapse_min_ivl() -> i32 {
    1
}

fn default_leech_fails() -> u32 {
    8
}

fn default_initial_factor() -> i32 {
    2500
}

fn default_graduating_ivl() -> i32 {
    1
}

fn default_easy_ivl() -> i32 {
    4
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            new_spread: NewSpread::default(),
            new_cards_per_day: default_new_cards_per_day(),
            review_cards_per_day: default_review_cards_per_day(),
            report_limit: default_report_limit(),
            collapse_time_secs: default_collapse_time_secs(),
            new_steps: default_new_steps(),
            lapse_steps: default_lapse_steps(),
            lapse_min_ivl: default_lapse_min_ivl(),
            lapse_mult: 0.0,
            leech_fails: default_leech_fails(),
            initial_factor: default_initial_factor(),
            graduating_ivl: default_graduating_ivl(),
            easy_ivl: default_easy_ivl(),
            tz_offset_secs: 0,
        }
    }
}
