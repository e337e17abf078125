//! Spaced-repetition scheduling core.
//!
//! This crate implements the scheduling engine behind a flashcard
//! application: the SM-2-family state machine that decides which card to
//! study next and when a graded card should be shown again.
//!
//! It provides:
//! - the `Collection → Deck → Card` data model with per-card scheduling
//!   state
//! - three lazily rebuilt card queues (new, learning, review) with daily
//!   limits and a deterministic per-day review shuffle
//! - learning steps, graduation, lapse and leech handling
//! - a day-rollover model anchored on the collection's creation day
//!
//! Everything else (users, persistence, HTTP, card content generation)
//! belongs to the embedding application. The scheduler consumes a deck, a
//! clock and a configuration, and exposes [`Scheduler::next_card`] and
//! [`Scheduler::answer`].
//!
//! ```no_run
//! use reflash_core::{Collection, Deck, Grade, IdGen, Note, Scheduler, SchedulerConfig, SystemClock};
//!
//! let mut ids = IdGen::system();
//! let mut collection = Collection::new(&mut ids, "Biology 101");
//! let mut deck = Deck::new(&mut ids, "Chapter 5");
//! let note_id = ids.next_id();
//! deck.add_note(&mut ids, Note::new(note_id));
//!
//! let mut sched = Scheduler::for_collection(
//!     Box::new(SystemClock),
//!     SchedulerConfig::default(),
//!     &collection,
//! );
//! while let Some(card) = sched.next_card(&mut deck) {
//!     sched.answer(card, Grade::Good).unwrap();
//! }
//! collection.add_deck(deck);
//! ```

pub mod algorithm;
pub mod clock;
pub mod config;
pub mod models;
pub mod queues;

pub use algorithm::{Grade, Result, Scheduler, SchedulerError, LEECH_TAG};
pub use clock::{Clock, IdGen, MockClock, SystemClock, SECS_PER_DAY};
pub use config::{NewSpread, SchedulerConfig};
pub use models::{
    Card, CardId, CardQueue, CardType, Collection, CollectionId, Deck, DeckId, Due, DueCounts,
    Note, NoteId,
};
