//! This crate is the coordination core of a beatmap-sharing site's
//! browser client: the pages for search, upload, one-click download
//! and user profiles all assemble themselves from independently
//! resolving asynchronous events, and this crate provides the latch
//! primitive and the controllers that sequence them.  Identity
//! becomes known at some point after load, shared page fragments are
//! injected at another, the primary item list arrives at a third, and
//! anything touching an item card must run strictly after all of its
//! prerequisites.
//!
//! ## Use case
//!
//! Three one-shot events dominate the pages' lives.  The identity
//! provider reports the sign-in state once (and may report again on
//! token refreshes); the fragment inliner finishes injecting the
//! shared partials, in particular the item-card template the list
//! pages clone per result; and the page's own primary fetch resolves
//! and renders.  Privileged work (voting, syncing, deleting,
//! uploading) needs a fresh credential and therefore gates on the
//! first of these; rendering gates on the second; and the enrichment
//! pass that marks already-upvoted and already-downloaded cards gates
//! on the third, because the cards it adjusts do not exist earlier.
//!
//! Rather than one hand-rolled promise latch per file, everything
//! waits on the same [`Signal`] primitive: resolve-once, idempotent,
//! and safe to await both before and after resolution.  On top of it
//! sit the [`auth`] readiness gate, the [`fragment`] inliner, and the
//! [`page`] controllers with their per-load rendered signal.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use beatmap_client::auth::{AuthError, AuthStatus, Authenticator, IdToken, TokenSource};
//! use beatmap_client::notice::BufferedNotices;
//! use beatmap_client::Signal;
//!
//! struct StaticTokens;
//!
//! #[async_trait::async_trait]
//! impl TokenSource for StaticTokens {
//!     async fn fresh_token(&self) -> Result<IdToken, AuthError> {
//!         Ok(IdToken::new("fresh"))
//!     }
//! }
//!
//! futures::executor::block_on(async {
//!     let notices = Arc::new(BufferedNotices::new());
//!     let auth = Authenticator::new(Arc::new(StaticTokens), notices.clone());
//!
//!     // A waiter that arrives before the provider has reported
//!     // simply suspends until it does.
//!     let ready = auth.ready();
//!     let early = ready.subscribe();
//!
//!     // The identity provider reports in; repeat notifications only
//!     // refresh the cached status.
//!     auth.state_changed(AuthStatus::SignedIn { user: "u1".into() });
//!     auth.state_changed(AuthStatus::SignedIn { user: "u1".into() });
//!
//!     early.wait().await;
//!     assert!(ready.is_resolved());
//!
//!     // Privileged work gets a force-refreshed credential.
//!     auth.run_signed_in(|token| async move {
//!         assert_eq!(token.as_str(), "fresh");
//!     })
//!     .await;
//!
//!     // Page-local latches compose the same way.
//!     let rendered = Signal::new();
//!     rendered.resolve();
//!     rendered.resolve(); // no-op
//!     Signal::all([rendered, auth.ready()]).wait().await;
//!
//!     assert!(notices.errors().is_empty());
//! });
//! ```
//!
//! The list-page controllers in [`page`] run their primary fetch and
//! the credential-gated enrichment branch concurrently, never
//! sequentially; the enrichment side then parks on the page's
//! rendered signal so its card lookups cannot race ahead of the cards
//! existing.  All failures collapse into the transient banner in
//! [`notice`]; nothing retries and nothing is fatal to the page.
//!
//! # Feature Flags
#![cfg_attr(
    feature = "document-features",
    cfg_attr(doc, doc = ::document_features::document_features!())
)]

pub mod account;
pub mod actions;
pub mod api;
pub mod auth;
pub mod card;
#[cfg(feature = "companion")]
pub mod companion;
pub mod config;
pub mod fragment;
#[cfg(feature = "net")]
pub mod http;
pub mod notice;
pub mod page;
pub mod signal;

#[cfg(test)]
mod tests;

pub use signal::{Signal, SignalSet, SignalSubscription};
