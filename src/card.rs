use std::sync::RwLock;

use crate::api::BeatMap;
use crate::config::SiteConfig;

/// Upvote side of a card, driven by the account's upvoted set and the
/// user's own presses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteState {
    Neutral,
    Upvoted,
}

/// One-click side of a card: whether the map is already synced to the
/// local companion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Available,
    Downloaded,
}

/// The rendered state of one item card.
///
/// The browser build inferred all of this back out of CSS classes;
/// here it is explicit and the embedding renderer derives classes from
/// it instead.
#[derive(Clone, Debug)]
pub struct Card {
    pub map_id: String,
    pub song: String,
    pub artist: String,
    pub charter: String,
    pub difficulty: String,
    pub image: String,
    pub download: String,
    pub upvotes: u64,
    pub vote: VoteState,
    pub sync: SyncState,
    /// Identity-dependent buttons start out disabled and are released
    /// once enrichment has caught up.
    pub interactive: bool,
    pub delete_visible: bool,
}

impl Card {
    pub fn from_map(map: &BeatMap, config: &SiteConfig) -> Card {
        let difficulty = if map.difficulties.is_empty() {
            "N/A".to_string()
        } else {
            map.difficulties
                .iter()
                .map(|d| d.display.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        Card {
            map_id: map.id.as_str().to_string(),
            song: map.song.clone(),
            artist: map.artist.clone(),
            charter: map.charter.clone(),
            difficulty,
            image: match &map.image {
                Some(image) => format!("{}{}", config.output_prefix, image),
                None => config.placeholder_image.clone(),
            },
            download: format!("{}{}", config.output_prefix, map.download),
            upvotes: map.upvotes,
            vote: VoteState::Neutral,
            sync: SyncState::Available,
            // identity-dependent buttons wake up with enrichment
            interactive: false,
            delete_visible: false,
        }
    }
}

/// The rendered list of cards for one page, shared between the page
/// controller and the per-card actions.
///
/// Lookups before the page's rendered signal has resolved would come
/// back empty, which is exactly the race the readiness signals exist
/// to rule out.
#[derive(Default)]
pub struct CardList {
    cards: RwLock<Vec<Card>>,
}

impl CardList {
    pub fn new() -> Self {
        CardList::default()
    }

    pub fn replace(&self, cards: Vec<Card>) {
        *self.cards.write().unwrap() = cards;
    }

    pub fn clear(&self) {
        self.cards.write().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.cards.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.read().unwrap().is_empty()
    }

    pub fn get(&self, map_id: &str) -> Option<Card> {
        self.cards
            .read()
            .unwrap()
            .iter()
            .find(|card| card.map_id == map_id)
            .cloned()
    }

    /// Mutate the matching card in place; `false` when no card with
    /// that id has been rendered.
    pub fn update(&self, map_id: &str, mutate: impl FnOnce(&mut Card)) -> bool {
        let mut cards = self.cards.write().unwrap();
        match cards.iter_mut().find(|card| card.map_id == map_id) {
            Some(card) => {
                mutate(card);
                true
            }
            None => false,
        }
    }

    /// Mutate every card, e.g. releasing the slow-loading buttons once
    /// enrichment finishes.
    pub fn update_all(&self, mut mutate: impl FnMut(&mut Card)) {
        for card in self.cards.write().unwrap().iter_mut() {
            mutate(card);
        }
    }

    pub fn remove(&self, map_id: &str) -> bool {
        let mut cards = self.cards.write().unwrap();
        let before = cards.len();
        cards.retain(|card| card.map_id != map_id);
        cards.len() != before
    }

    pub fn snapshot(&self) -> Vec<Card> {
        self.cards.read().unwrap().clone()
    }
}
