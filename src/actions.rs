use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::error;

use crate::card::{CardList, SyncState, VoteState};
use crate::page::PageContext;
use crate::signal::Signal;

/// Outcome of handing a map over to the local companion app.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompanionOutcome {
    /// The companion answered; its reply is shown to the user.
    Reply(String),
    /// The companion could not be reached in time; the user is sent
    /// to the help page instead.
    Fallback { page: String },
}

/// The one-click companion seam.
///
/// The `companion` feature provides the live WebSocket-backed
/// implementation; pages without a companion configured skip the
/// hand-off entirely.
#[async_trait]
pub trait CompanionPort: Send + Sync {
    async fn download(&self, map_id: &str) -> CompanionOutcome;
    async fn remove(&self, map_id: &str) -> CompanionOutcome;
}

/// A confirm/cancel dialog whose outcome is awaited through a
/// dedicated one-shot signal.
///
/// The destructive request is only sent once `confirm` resolved the
/// signal; `cancel` resolves it too, with nothing sent at all.
#[derive(Default)]
pub struct ConfirmDialog {
    decided: Signal,
    confirmed: AtomicBool,
}

impl ConfirmDialog {
    pub fn new() -> Self {
        ConfirmDialog::default()
    }

    pub fn confirm(&self) {
        self.confirmed.store(true, Ordering::SeqCst);
        self.decided.resolve();
    }

    pub fn cancel(&self) {
        self.decided.resolve();
    }

    /// Wait for the user's decision.
    pub async fn outcome(&self) -> bool {
        self.decided.subscribe().wait().await;
        self.confirmed.load(Ordering::SeqCst)
    }
}

/// The privileged per-card actions shared by the search and user
/// pages: voting, one-click sync, delete.
///
/// Every action gates on the shared auth-readiness signal, fetches a
/// fresh credential, and collapses any failure into a single banner
/// message.
#[derive(Clone)]
pub struct CardActions {
    ctx: PageContext,
    cards: Arc<CardList>,
}

impl CardActions {
    pub fn new(ctx: PageContext, cards: Arc<CardList>) -> Self {
        CardActions { ctx, cards }
    }

    /// Press on a neutral upvote button.
    ///
    /// The count bumps optimistically and the button goes dead while
    /// the request runs; only a confirmed upvote flips the state and
    /// revives it.
    pub async fn press_upvote(&self, map_id: &str) {
        self.cards.update(map_id, |card| {
            card.upvotes += 1;
            card.interactive = false;
        });
        let ctx = &self.ctx;
        let cards = &self.cards;
        ctx.auth
            .run_signed_in(move |token| async move {
                match ctx.backend.upvote(&token, map_id).await {
                    Ok(()) => {
                        cards.update(map_id, |card| {
                            card.vote = VoteState::Upvoted;
                            card.interactive = true;
                        });
                    }
                    Err(err) => {
                        error!(%err, map_id, "error upvoting");
                        ctx.notices
                            .error(&err.user_message("An error occurred when upvoting."));
                    }
                }
            })
            .await;
    }

    /// Press on an already-upvoted button, taking the vote back.
    pub async fn press_unvote(&self, map_id: &str) {
        self.cards.update(map_id, |card| {
            card.upvotes = card.upvotes.saturating_sub(1);
            card.interactive = false;
        });
        let ctx = &self.ctx;
        let cards = &self.cards;
        ctx.auth
            .run_signed_in(move |token| async move {
                match ctx.backend.unvote(&token, map_id).await {
                    Ok(()) => {
                        cards.update(map_id, |card| {
                            card.vote = VoteState::Neutral;
                            card.interactive = true;
                        });
                    }
                    Err(err) => {
                        error!(%err, map_id, "error unvoting");
                        ctx.notices.error(
                            &err.user_message("An error occurred when removing your upvote."),
                        );
                    }
                }
            })
            .await;
    }

    /// Press on a one-click button for a map not yet synced: record
    /// the download with the backend, then hand the map to the
    /// companion app.
    pub async fn press_oneclick(&self, map_id: &str) {
        self.cards.update(map_id, |card| card.interactive = false);
        let ctx = &self.ctx;
        let cards = &self.cards;
        let synced = AtomicBool::new(false);
        ctx.auth
            .run_signed_in({
                let synced = &synced;
                move |token| async move {
                    match ctx.backend.download(&token, map_id).await {
                        Ok(()) => {
                            cards.update(map_id, |card| {
                                card.sync = SyncState::Downloaded;
                                card.interactive = true;
                            });
                            synced.store(true, Ordering::SeqCst);
                        }
                        Err(err) => {
                            error!(%err, map_id, "error syncing download");
                            ctx.notices.error(
                                &err.user_message("An error occurred when syncing downloading."),
                            );
                        }
                    }
                }
            })
            .await;
        if synced.load(Ordering::SeqCst) {
            if let Some(companion) = &self.ctx.companion {
                self.hand_off(companion.download(map_id).await);
            }
        }
    }

    /// Press on a one-click button for a synced map, removing it.
    pub async fn press_remove(&self, map_id: &str) {
        self.cards.update(map_id, |card| card.interactive = false);
        let ctx = &self.ctx;
        let cards = &self.cards;
        let synced = AtomicBool::new(false);
        ctx.auth
            .run_signed_in({
                let synced = &synced;
                move |token| async move {
                    match ctx.backend.remove(&token, map_id).await {
                        Ok(()) => {
                            cards.update(map_id, |card| {
                                card.sync = SyncState::Available;
                                card.interactive = true;
                            });
                            synced.store(true, Ordering::SeqCst);
                        }
                        Err(err) => {
                            error!(%err, map_id, "error syncing removal");
                            ctx.notices.error(
                                &err.user_message("An error occurred when syncing removing."),
                            );
                        }
                    }
                }
            })
            .await;
        if synced.load(Ordering::SeqCst) {
            if let Some(companion) = &self.ctx.companion {
                self.hand_off(companion.remove(map_id).await);
            }
        }
    }

    /// Delete a map after an explicit confirmation.
    ///
    /// Cancelling issues no request at all; confirming issues exactly
    /// one delete, and only a confirmed deletion drops the card.
    pub async fn delete(&self, map_id: &str, dialog: &ConfirmDialog) {
        if !dialog.outcome().await {
            return;
        }
        let ctx = &self.ctx;
        let cards = &self.cards;
        ctx.auth
            .run_signed_in(move |token| async move {
                match ctx.backend.delete(&token, map_id).await {
                    Ok(()) => {
                        cards.remove(map_id);
                    }
                    Err(err) => {
                        error!(%err, map_id, "error deleting map");
                        ctx.notices
                            .error(&err.user_message("An error occurred when deleting the map."));
                    }
                }
            })
            .await;
    }

    fn hand_off(&self, outcome: CompanionOutcome) {
        match outcome {
            CompanionOutcome::Reply(text) => self.ctx.notices.alert(&text),
            CompanionOutcome::Fallback { page } => self.ctx.navigator.navigate(&page),
        }
    }
}
