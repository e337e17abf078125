//! The scheduler state machine.
//!
//! Decides which card to show next and how to reschedule a card after the
//! user grades their own recall, following the SM-2 family of algorithms
//! as popularised by Anki. Cards move New → Learning → Review, fall back
//! into a relearning pass when a review is failed, and are suspended once
//! they leech.
//!
//! One scheduler serves one deck. It holds no reference to the deck;
//! operations take it explicitly, and the collection's creation day is
//! captured at construction as the anchor for review day offsets.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::{days_since, next_day_cutoff, Clock};
use crate::config::{NewSpread, SchedulerConfig};
use crate::models::{Card, CardId, CardQueue, CardType, Collection, Deck, Due, DueCounts};
use crate::queues::QueueManager;

/// Ease factors never drop below this (permille).
const MIN_FACTOR: i32 = 1300;

/// Tag added to a card's note when it is suspended as a leech.
pub const LEECH_TAG: &str = "leech";

/// How the user graded their recall of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Grade {
    Again,
    Hard,
    Good,
    Easy,
}

impl TryFrom<u8> for Grade {
    type Error = SchedulerError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::Again),
            2 => Ok(Self::Hard),
            3 => Ok(Self::Good),
            4 => Ok(Self::Easy),
            _ => Err(SchedulerError::InvalidGrade(value)),
        }
    }
}

impl From<Grade> for u8 {
    fn from(grade: Grade) -> Self {
        match grade {
            Grade::Again => 1,
            Grade::Hard => 2,
            Grade::Good => 3,
            Grade::Easy => 4,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("invalid grade {0}, expected 1-4")]
    InvalidGrade(u8),

    #[error("card in queue {0:?} cannot be answered")]
    UnexpectedQueue(CardQueue),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Per-deck scheduler.
///
/// Day fields and queues are transient: they start cold and the first
/// `next_card` call rebuilds them, so a freshly constructed scheduler over
/// persisted cards resumes exactly where the previous process left off.
pub struct Scheduler {
    clock: Box<dyn Clock>,
    config: SchedulerConfig,
    /// Creation day anchor of the parent collection. `None` for a detached
    /// deck; day offsets then clamp to zero.
    col_crt: Option<i64>,
    today: i64,
    day_cutoff: i64,
    lrn_cutoff: i64,
    /// Cards handed out this session. Drives new-card interleaving.
    session_reps: u32,
    new_card_modulus: u32,
    queues: QueueManager,
}

impl Scheduler {
    pub fn new(clock: Box<dyn Clock>, config: SchedulerConfig, col_crt: Option<i64>) -> Self {
        Self {
            clock,
            config,
            col_crt,
            today: 0,
            day_cutoff: 0,
            lrn_cutoff: 0,
            session_reps: 0,
            new_card_modulus: 0,
            queues: QueueManager::default(),
        }
    }

    /// Scheduler anchored on the collection's creation day.
    pub fn for_collection(
        clock: Box<dyn Clock>,
        config: SchedulerConfig,
        collection: &Collection,
    ) -> Self {
        Self::new(clock, config, Some(collection.crt))
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Day offset of the current day since the collection was created.
    pub fn today(&self) -> i64 {
        self.today
    }

    /// Epoch second at which the current scheduling day ends.
    pub fn day_cutoff(&self) -> i64 {
        self.day_cutoff
    }

    /// Cards handed out since this scheduler was constructed.
    pub fn session_reps(&self) -> u32 {
        self.session_reps
    }

    pub fn new_card_modulus(&self) -> u32 {
        self.new_card_modulus
    }

    // ==================== Selection ====================

    /// Next card to study, or `None` when nothing is currently available.
    ///
    /// A returned card may be answered once via [`Scheduler::answer`] or
    /// skipped outright; a skipped card stays in the deck untouched and
    /// resurfaces on a later refill.
    pub fn next_card<'a>(&mut self, deck: &'a mut Deck) -> Option<&'a mut Card> {
        self.check_day(deck);
        let id = self.pick_card(deck)?;
        self.session_reps += 1;
        deck.card_mut(id)
    }

    fn pick_card(&mut self, deck: &Deck) -> Option<CardId> {
        if let Some(id) = self.get_lrn_card(deck) {
            return Some(id);
        }
        if self.time_for_new_card(deck) {
            if let Some(id) = self.get_new_card(deck) {
                return Some(id);
            }
        }
        if let Some(id) = self.get_rev_card(deck) {
            return Some(id);
        }
        if let Some(id) = self.get_new_card(deck) {
            return Some(id);
        }
        // A learning card just outside the collapse window may have come
        // due while the rest of the session drained.
        self.get_lrn_card(deck)
    }

    fn get_lrn_card(&mut self, deck: &Deck) -> Option<CardId> {
        self.fill_lrn(deck);
        self.queues.pop_lrn()
    }

    fn get_new_card(&mut self, deck: &Deck) -> Option<CardId> {
        self.fill_new(deck);
        self.queues.pop_new()
    }

    fn get_rev_card(&mut self, deck: &Deck) -> Option<CardId> {
        self.fill_rev(deck);
        self.queues.pop_rev()
    }

    fn fill_new(&mut self, deck: &Deck) {
        self.queues.fill_new(&deck.cards, self.config.new_cards_per_day);
    }

    fn fill_lrn(&mut self, deck: &Deck) {
        self.update_lrn_cutoff(false);
        self.queues
            .fill_lrn(&deck.cards, self.lrn_cutoff, self.config.report_limit);
    }

    fn fill_rev(&mut self, deck: &Deck) {
        self.queues
            .fill_rev(&deck.cards, self.today, self.config.review_cards_per_day);
    }

    /// Whether the interleaving policy wants a new card in this slot.
    fn time_for_new_card(&mut self, deck: &Deck) -> bool {
        self.fill_new(deck);
        if self.queues.new_len() == 0 {
            return false;
        }
        match self.config.new_spread {
            NewSpread::Last => false,
            NewSpread::First => true,
            NewSpread::Distribute => {
                self.session_reps > 0
                    && self.new_card_modulus != 0
                    && self.session_reps % self.new_card_modulus == 0
            }
        }
    }

    // ==================== Day rollover ====================

    fn check_day(&mut self, deck: &Deck) {
        if self.clock.now_s() > self.day_cutoff {
            log::debug!("day cutoff {} passed, rebuilding queues", self.day_cutoff);
            self.reset(deck);
        }
    }

    /// Rebuilds all queues and recomputes the day fields. Session reps are
    /// left alone; they count the session, not the day.
    pub fn reset(&mut self, deck: &Deck) {
        self.update_cutoff();
        self.reset_lrn();
        self.reset_rev();
        self.reset_new(deck);
    }

    fn update_cutoff(&mut self) {
        let now = self.clock.now_s();
        self.today = self.col_crt.map_or(0, |crt| days_since(now, crt));
        self.day_cutoff = next_day_cutoff(now, self.config.tz_offset_secs);
    }

    fn reset_lrn(&mut self) {
        self.update_lrn_cutoff(true);
        self.queues.clear_lrn();
    }

    fn reset_rev(&mut self) {
        self.queues.clear_rev();
    }

    fn reset_new(&mut self, deck: &Deck) {
        self.queues.clear_new();
        self.update_new_card_ratio(deck);
    }

    /// Slides the learn-ahead window forward. Debounced to once a minute
    /// unless forced, so answering a burst of cards stays cheap.
    pub fn update_lrn_cutoff(&mut self, force: bool) -> bool {
        let candidate = self.clock.now_s() + self.config.collapse_time_secs;
        if candidate - self.lrn_cutoff > 60 || force {
            self.lrn_cutoff = candidate;
            true
        } else {
            false
        }
    }

    /// Recomputes how often a new card is interleaved between reviews.
    /// Refills the new and review queues first so the ratio reads their
    /// real sizes.
    fn update_new_card_ratio(&mut self, deck: &Deck) {
        self.fill_new(deck);
        self.fill_rev(deck);
        self.new_card_modulus = if self.config.new_spread == NewSpread::Distribute
            && self.queues.new_len() > 0
        {
            let new_len = self.queues.new_len() as u32;
            let rev_len = self.queues.rev_len() as u32;
            let ratio = (new_len + rev_len) / new_len;
            if rev_len > 0 {
                ratio.max(2)
            } else {
                ratio
            }
        } else {
            0
        };
    }

    // ==================== Answering ====================

    /// Applies the user's grade to a card handed out by `next_card`.
    pub fn answer(&mut self, card: &mut Card, grade: Grade) -> Result<()> {
        card.reps += 1;
        match card.queue {
            CardQueue::New => {
                self.answer_new_card(card, grade);
                Ok(())
            }
            CardQueue::Learning => {
                self.answer_lrn_card(card, grade);
                Ok(())
            }
            CardQueue::Review => {
                self.answer_rev_card(card, grade);
                Ok(())
            }
            CardQueue::Suspended => Err(SchedulerError::UnexpectedQueue(card.queue)),
        }
    }

    /// Converts a new card into its first learning pass, then lets the
    /// learning handler apply the grade, so Easy on a never-seen card
    /// still graduates it early.
    fn answer_new_card(&self, card: &mut Card, grade: Grade) {
        card.queue = CardQueue::Learning;
        card.card_type = CardType::Learning;
        card.left = self.starting_left(card);
        self.answer_lrn_card(card, grade);
    }

    fn answer_lrn_card(&self, card: &mut Card, grade: Grade) {
        match grade {
            Grade::Easy => self.reschedule_as_rev(card, true),
            Grade::Good => {
                let steps_left = card.left % 1000;
                if steps_left <= 1 {
                    self.reschedule_as_rev(card, false);
                } else {
                    self.move_to_next_step(card);
                }
            }
            Grade::Hard => self.repeat_step(card),
            Grade::Again => self.move_to_first_step(card),
        }
    }

    fn answer_rev_card(&self, card: &mut Card, grade: Grade) {
        match grade {
            Grade::Again => self.reschedule_lapse(card),
            _ => self.reschedule_rev(card, grade),
        }
    }

    // ==================== Learning steps ====================

    /// The step delays that apply to this card: relearning cards use the
    /// lapse steps, everything else the new-card steps.
    fn lrn_conf(&self, card: &Card) -> &[u32] {
        match card.card_type {
            CardType::Review | CardType::Relearning => &self.config.lapse_steps,
            _ => &self.config.new_steps,
        }
    }

    /// Packed `left` value for a card entering its first step.
    fn starting_left(&self, card: &Card) -> u32 {
        let conf = self.lrn_conf(card);
        let total = conf.len() as u32;
        self.left_today(conf, conf.len()) * 1000 + total
    }

    /// How many of the last `remaining` steps still fit before the day
    /// ends. At least one step is always permitted, even if it overflows
    /// into tomorrow.
    fn left_today(&self, delays: &[u32], remaining: usize) -> u32 {
        let remaining = remaining.min(delays.len());
        let start = delays.len() - remaining;
        let mut due = self.clock.now_s();
        let mut fitting = 0;
        for minutes in &delays[start..] {
            due += i64::from(*minutes) * 60;
            if due <= self.day_cutoff {
                fitting += 1;
            }
        }
        fitting.max(1)
    }

    fn move_to_next_step(&self, card: &mut Card) {
        let conf = self.lrn_conf(card);
        let remaining = card.left % 1000 - 1;
        card.left = self.left_today(conf, remaining as usize) * 1000 + remaining;
        self.reschedule_lrn_card(card, None);
    }

    fn move_to_first_step(&self, card: &mut Card) {
        card.left = self.starting_left(card);
        if card.card_type == CardType::Relearning {
            self.update_rev_ivl_on_fail(card);
        }
        self.reschedule_lrn_card(card, None);
    }

    /// Repeats the current step, averaging its delay with the next one so
    /// Hard sits between Again and Good.
    fn repeat_step(&self, card: &mut Card) {
        let conf = self.lrn_conf(card);
        let delay = delay_for_repeating_grade(conf, card.left);
        self.reschedule_lrn_card(card, Some(delay));
    }

    fn reschedule_lrn_card(&self, card: &mut Card, delay: Option<i64>) {
        let delay = delay.unwrap_or_else(|| delay_for_grade(self.lrn_conf(card), card.left));
        card.due = Due::Learning(self.clock.now_s() + delay);
        card.queue = CardQueue::Learning;
    }

    // ==================== Graduation ====================

    fn reschedule_as_rev(&self, card: &mut Card, early: bool) {
        if card.card_type == CardType::Review {
            self.reschedule_graduating_lapse(card);
        } else {
            self.reschedule_new(card, early);
        }
    }

    /// A lapsed card finishing its relearning pass goes back to review
    /// with the interval it already carries.
    fn reschedule_graduating_lapse(&self, card: &mut Card) {
        card.due = Due::Review(self.today + i64::from(card.ivl));
        card.card_type = CardType::Review;
        card.queue = CardQueue::Review;
    }

    /// First graduation of a genuinely new card.
    fn reschedule_new(&self, card: &mut Card, early: bool) {
        card.ivl = self.graduating_ivl(card, early);
        card.due = Due::Review(self.today + i64::from(card.ivl));
        card.factor = self.config.initial_factor;
        card.card_type = CardType::Review;
        card.queue = CardQueue::Review;
        log::debug!("card {} graduated with interval {}d", card.id, card.ivl);
    }

    fn graduating_ivl(&self, card: &Card, early: bool) -> i32 {
        match card.card_type {
            CardType::Review | CardType::Relearning => card.ivl,
            _ if early => self.config.easy_ivl,
            _ => self.config.graduating_ivl,
        }
    }

    // ==================== Lapses ====================

    fn reschedule_lapse(&self, card: &mut Card) {
        card.lapses += 1;
        card.factor = (card.factor - 200).max(MIN_FACTOR);
        let suspended = self.check_leech(card);
        if suspended {
            self.update_rev_ivl_on_fail(card);
        } else {
            // Keep the card on the lapse steps for the relearning pass.
            // The interval is intentionally not reduced here; see
            // `update_rev_ivl_on_fail`.
            card.card_type = CardType::Review;
            self.move_to_first_step(card);
        }
    }

    /// Suspends the card and tags its note once the lapse count reaches
    /// the leech threshold.
    fn check_leech(&self, card: &mut Card) -> bool {
        if card.lapses >= self.config.leech_fails {
            card.note.add_tag(LEECH_TAG);
            card.queue = CardQueue::Suspended;
            log::info!(
                "card {} suspended as a leech after {} lapses",
                card.id,
                card.lapses
            );
            true
        } else {
            false
        }
    }

    fn update_rev_ivl_on_fail(&self, card: &mut Card) {
        card.ivl = self.lapse_ivl(card);
    }

    fn lapse_ivl(&self, card: &Card) -> i32 {
        let scaled = (f64::from(card.ivl) * self.config.lapse_mult).floor() as i32;
        scaled.max(self.config.lapse_min_ivl).max(1)
    }

    // ==================== Review rescheduling ====================

    // TODO: grow the interval via the ease factor (with Hard/Easy
    // modifiers and the 1300 floor) once the review dynamics are settled.
    // Until then a graded review is pushed out by its current interval
    // unchanged.
    fn reschedule_rev(&self, card: &mut Card, _grade: Grade) {
        card.due = Due::Review(self.today + i64::from(card.ivl));
        card.card_type = CardType::Review;
        card.queue = CardQueue::Review;
    }

    // ==================== Summaries ====================

    /// Counts of cards currently eligible in each queue, with the daily
    /// caps applied. Reads the deck directly and leaves the scheduler's
    /// day state untouched.
    pub fn due_counts(&self, deck: &Deck) -> DueCounts {
        let now = self.clock.now_s();
        let today = self.col_crt.map_or(0, |crt| days_since(now, crt));
        let cutoff = now + self.config.collapse_time_secs;

        let mut counts = DueCounts {
            new: 0,
            learning: 0,
            review: 0,
        };
        for card in &deck.cards {
            match (card.queue, card.due) {
                (CardQueue::New, _) => counts.new += 1,
                (CardQueue::Learning, Due::Learning(at)) if at < cutoff => counts.learning += 1,
                (CardQueue::Review, Due::Review(day)) if day <= today => counts.review += 1,
                _ => {}
            }
        }
        counts.new = counts.new.min(self.config.new_cards_per_day);
        counts.review = counts.review.min(self.config.review_cards_per_day);
        counts
    }
}

/// Delay in seconds of the step `left` currently points at. An empty step
/// list falls back to one minute.
fn delay_for_grade(conf: &[u32], left: u32) -> i64 {
    let remaining = (left % 1000) as usize;
    let idx = conf.len().saturating_sub(remaining);
    let minutes = conf.get(idx).copied().unwrap_or(1);
    i64::from(minutes) * 60
}

/// Delay for repeating the current step: the average of the current and
/// next step delays, never shorter than the current step.
fn delay_for_repeating_grade(conf: &[u32], left: u32) -> i64 {
    let delay1 = delay_for_grade(conf, left);
    let delay2 = if (left - 1) % 1000 == 0 {
        delay1
    } else {
        delay_for_grade(conf, left - 1)
    };
    (delay1 + delay1.max(delay2)) / 2
}
