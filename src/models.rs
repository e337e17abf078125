//! Data models for the scheduling core.
//!
//! The hierarchy is `Collection → Deck → Card`, with each card generated
//! from one `Note`. Cards carry all mutable scheduling state; decks and
//! collections are plain containers with no scheduling logic of their own.

use serde::{Deserialize, Serialize};

use crate::clock::{start_of_day, IdGen};

pub type CardId = i64;
pub type NoteId = i64;
pub type DeckId = i64;
pub type CollectionId = i64;

/// Learning stage of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardType {
    /// Never shown to the user.
    New,
    /// Being learnt for the first time.
    Learning,
    /// Graduated into the long-term review cycle.
    Review,
    /// Forgotten during review and being re-learnt.
    Relearning,
}

impl Default for CardType {
    fn default() -> Self {
        Self::New
    }
}

/// Queue a card currently sits in.
///
/// The queue decides *when* a card is eligible to be shown, while
/// [`CardType`] tracks *what stage* it is at. Suspension is only ever
/// automatic (leeches); manual suspension is not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardQueue {
    Suspended,
    New,
    Learning,
    Review,
}

impl Default for CardQueue {
    fn default() -> Self {
        Self::New
    }
}

/// When a card is due. The unit depends on the queue the card sits in, so
/// the variants make it explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Due {
    /// New cards are ordered by the id of their note (creation order).
    New(NoteId),
    /// Learning cards come due at an absolute epoch-second timestamp.
    Learning(i64),
    /// Review cards come due on a day offset from the collection's
    /// creation day.
    Review(i64),
}

/// A record of source content. One card is generated per note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    /// Free-form tags. Unique per note; duplicate adds are silently ignored.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Note {
    pub fn new(id: NoteId) -> Self {
        Self {
            id,
            tags: Vec::new(),
        }
    }

    /// Adds a tag unless it is already present.
    pub fn add_tag(&mut self, tag: &str) {
        if !self.has_tag(tag) {
            self.tags.push(tag.to_string());
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// The scheduled unit. Owns the note it was generated from and carries all
/// mutable scheduling state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Unique card id (epoch milliseconds at creation).
    pub id: CardId,
    pub note: Note,
    /// Creation timestamp in epoch seconds.
    pub crt: i64,
    pub card_type: CardType,
    pub queue: CardQueue,
    /// Current interval. Positive values are days (review stage); negative
    /// values would be seconds (learning stage). 0 for new cards.
    pub ivl: i32,
    /// Ease factor in permille (2500 = ×2.5). 0 until first graduation,
    /// floored at 1300 afterwards.
    pub factor: i32,
    /// Lifetime number of reviews.
    pub reps: u32,
    /// Lifetime number of lapses (Again on a review-stage card).
    pub lapses: u32,
    /// Remaining learning steps, packed as
    /// `steps_today * 1000 + steps_until_graduation`.
    pub left: u32,
    pub due: Due,
}

impl Card {
    /// A brand-new card for the given note. All scheduling fields start in
    /// the new state; `due` mirrors the note id so new cards surface in
    /// creation order.
    pub fn new(id: CardId, crt: i64, note: Note) -> Self {
        let due = Due::New(note.id);
        Self {
            id,
            note,
            crt,
            card_type: CardType::New,
            queue: CardQueue::New,
            ivl: 0,
            factor: 0,
            reps: 0,
            lapses: 0,
            left: 0,
            due,
        }
    }
}

/// A deck of cards studied together. Scheduling is per-deck.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: DeckId,
    pub name: String,
    #[serde(default)]
    pub cards: Vec<Card>,
}

impl Deck {
    pub fn new(ids: &mut IdGen, name: impl Into<String>) -> Self {
        Self {
            id: ids.next_id(),
            name: name.into(),
            cards: Vec::new(),
        }
    }

    /// Creates a new card from the note and adds it to this deck.
    pub fn add_note(&mut self, ids: &mut IdGen, note: Note) -> CardId {
        let id = ids.next_id();
        let crt = ids.now_s();
        self.cards.push(Card::new(id, crt, note));
        id
    }

    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn card_mut(&mut self, id: CardId) -> Option<&mut Card> {
        self.cards.iter_mut().find(|c| c.id == id)
    }
}

/// Top-level container owning decks. Its creation day anchors the day
/// offsets used for review due dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    /// Creation timestamp, truncated to the start of the creation day
    /// (midnight UTC), in epoch seconds. Day zero for review scheduling.
    pub crt: i64,
    #[serde(default)]
    pub decks: Vec<Deck>,
}

impl Collection {
    pub fn new(ids: &mut IdGen, name: impl Into<String>) -> Self {
        let id = ids.next_id();
        let crt = start_of_day(ids.now_s());
        Self {
            id,
            name: name.into(),
            crt,
            decks: Vec::new(),
        }
    }

    pub fn add_deck(&mut self, deck: Deck) {
        self.decks.push(deck);
    }
}

/// Counts of currently eligible cards, for deck badges and summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueCounts {
    pub new: usize,
    pub learning: usize,
    pub review: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;

    #[test]
    fn test_new_card_starts_in_new_state() {
        let card = Card::new(17, 1000, Note::new(42));
        assert_eq!(card.card_type, CardType::New);
        assert_eq!(card.queue, CardQueue::New);
        assert_eq!(card.ivl, 0);
        assert_eq!(card.factor, 0);
        assert_eq!(card.reps, 0);
        assert_eq!(card.lapses, 0);
        assert_eq!(card.left, 0);
        assert_eq!(card.due, Due::New(42));
    }

    #[test]
    fn test_note_tags_deduplicate() {
        let mut note = Note::new(1);
        note.add_tag("leech");
        note.add_tag("biology");
        note.add_tag("leech");
        assert_eq!(note.tags, vec!["leech", "biology"]);
        assert!(note.has_tag("leech"));
        assert!(!note.has_tag("chemistry"));
    }

    #[test]
    fn test_deck_add_note_creates_new_card() {
        let mut ids = IdGen::new(Box::new(MockClock::ticking(500)));
        let mut deck = Deck::new(&mut ids, "Chapter 5");
        let note_id = ids.next_id();
        let card_id = deck.add_note(&mut ids, Note::new(note_id));

        assert!(card_id > note_id);
        let card = deck.card(card_id).unwrap();
        assert_eq!(card.due, Due::New(note_id));
        assert_eq!(card.queue, CardQueue::New);
        assert!(deck.card_mut(card_id).is_some());
        assert!(deck.card(card_id + 1).is_none());
    }

    #[test]
    fn test_collection_crt_is_start_of_day() {
        let mut ids = IdGen::new(Box::new(MockClock::ticking(86_400 + 3600)));
        let col = Collection::new(&mut ids, "Biology 101");
        assert_eq!(col.crt, 86_400);
    }

    #[test]
    fn test_card_serde_round_trip() {
        let mut card = Card::new(5, 60, Note::new(3));
        card.card_type = CardType::Review;
        card.queue = CardQueue::Review;
        card.ivl = 12;
        card.factor = 2300;
        card.reps = 9;
        card.lapses = 2;
        card.due = Due::Review(34);
        card.note.add_tag("biology");

        let json = serde_json::to_string(&card).unwrap();
        let back: Card = serde_json::from_str(&json).unwrap();
        assert_eq!(back, card);
    }
}
