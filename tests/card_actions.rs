mod fixtures;

use std::sync::Arc;

use beatmap_client::actions::CardActions;
use beatmap_client::auth::SIGN_IN_REQUIRED;
use beatmap_client::card::{Card, CardList, SyncState, VoteState};
use beatmap_client::notice::Notice;
use fixtures::{song, Call, FakeCompanion, HandOff, Harness, Scripted};

fn rendered_list(h: &Harness, ids: &[&str]) -> Arc<CardList> {
    let cards = Arc::new(CardList::new());
    cards.replace(
        ids.iter()
            .map(|id| {
                let mut card = Card::from_map(&song(id, "Song", 4), &h.config);
                card.interactive = true;
                card
            })
            .collect(),
    );
    cards
}

#[tokio::test]
async fn upvote_confirms_and_flips_the_card() {
    let h = Harness::new().signed_in("u1");
    let cards = rendered_list(&h, &["m1"]);
    let actions = CardActions::new(h.ctx(), cards.clone());

    actions.press_upvote("m1").await;

    let card = cards.get("m1").unwrap();
    assert_eq!(card.upvotes, 5);
    assert_eq!(card.vote, VoteState::Upvoted);
    assert!(card.interactive);
    assert_eq!(h.backend.calls(), vec![Call::Upvote("m1".into())]);
}

#[tokio::test]
async fn failed_upvote_keeps_the_bump_and_shows_the_body() {
    let h = Harness::new().signed_in("u1");
    *h.backend.action.lock().unwrap() = Scripted::Status(400, "No duplicate votes!".into());
    let cards = rendered_list(&h, &["m1"]);
    let actions = CardActions::new(h.ctx(), cards.clone());

    actions.press_upvote("m1").await;

    let card = cards.get("m1").unwrap();
    assert_eq!(card.upvotes, 5);
    assert_eq!(card.vote, VoteState::Neutral);
    assert!(!card.interactive);
    assert_eq!(h.notices.errors(), vec!["No duplicate votes!".to_string()]);
}

#[tokio::test]
async fn signed_out_upvote_posts_nothing() {
    let h = Harness::new().signed_out();
    let cards = rendered_list(&h, &["m1"]);
    let actions = CardActions::new(h.ctx(), cards.clone());

    actions.press_upvote("m1").await;

    assert!(h.backend.calls().is_empty());
    assert_eq!(h.notices.errors(), vec![SIGN_IN_REQUIRED.to_string()]);
    assert_eq!(h.tokens.fetches(), 0);
}

#[tokio::test]
async fn unvote_takes_the_vote_back() {
    let h = Harness::new().signed_in("u1");
    let cards = rendered_list(&h, &["m1"]);
    cards.update("m1", |card| card.vote = VoteState::Upvoted);
    let actions = CardActions::new(h.ctx(), cards.clone());

    actions.press_unvote("m1").await;

    let card = cards.get("m1").unwrap();
    assert_eq!(card.upvotes, 3);
    assert_eq!(card.vote, VoteState::Neutral);
    assert_eq!(h.backend.calls(), vec![Call::Unvote("m1".into())]);
}

#[tokio::test]
async fn oneclick_syncs_then_hands_off_to_the_companion() {
    let h = Harness::new().signed_in("u1");
    let companion = FakeCompanion::replying("Downloaded m1!");
    let cards = rendered_list(&h, &["m1"]);
    let actions = CardActions::new(h.ctx_with_companion(companion.clone()), cards.clone());

    actions.press_oneclick("m1").await;

    let card = cards.get("m1").unwrap();
    assert_eq!(card.sync, SyncState::Downloaded);
    assert!(card.interactive);
    assert_eq!(h.backend.calls(), vec![Call::Download("m1".into())]);
    assert_eq!(companion.hand_offs(), vec![HandOff::Download("m1".into())]);
    assert!(h
        .notices
        .messages()
        .contains(&Notice::Alert("Downloaded m1!".into())));
}

#[tokio::test]
async fn failed_sync_never_reaches_the_companion() {
    let h = Harness::new().signed_in("u1");
    *h.backend.action.lock().unwrap() = Scripted::Status(500, String::new());
    let companion = FakeCompanion::replying("Downloaded m1!");
    let cards = rendered_list(&h, &["m1"]);
    let actions = CardActions::new(h.ctx_with_companion(companion.clone()), cards.clone());

    actions.press_oneclick("m1").await;

    let card = cards.get("m1").unwrap();
    assert_eq!(card.sync, SyncState::Available);
    assert!(companion.hand_offs().is_empty());
    // an empty response body falls back to the stock message
    assert_eq!(
        h.notices.errors(),
        vec!["An error occurred when syncing downloading.".to_string()],
    );
}

#[tokio::test]
async fn remove_unsyncs_and_hands_off() {
    let h = Harness::new().signed_in("u1");
    let companion = FakeCompanion::replying("Removed m1!");
    let cards = rendered_list(&h, &["m1"]);
    cards.update("m1", |card| card.sync = SyncState::Downloaded);
    let actions = CardActions::new(h.ctx_with_companion(companion.clone()), cards.clone());

    actions.press_remove("m1").await;

    let card = cards.get("m1").unwrap();
    assert_eq!(card.sync, SyncState::Available);
    assert_eq!(h.backend.calls(), vec![Call::Remove("m1".into())]);
    assert_eq!(companion.hand_offs(), vec![HandOff::Remove("m1".into())]);
}

#[tokio::test]
async fn oneclick_without_a_companion_only_syncs() {
    let h = Harness::new().signed_in("u1");
    let cards = rendered_list(&h, &["m1"]);
    let actions = CardActions::new(h.ctx(), cards.clone());

    actions.press_oneclick("m1").await;

    assert_eq!(cards.get("m1").unwrap().sync, SyncState::Downloaded);
    assert!(h.nav.visited().is_empty());
}
