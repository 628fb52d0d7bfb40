use std::future::Future;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error};

use crate::notice::NoticeSink;
use crate::signal::Signal;

/// Banner message for privileged actions attempted while signed out.
pub const SIGN_IN_REQUIRED: &str = "This action requires being signed in!";

const REAUTH_FAILED: &str =
    "Error authenticating, please sign in again or ask for help in the discord.";

/// An opaque short-lived bearer token from the identity provider.
///
/// Tokens are fetched fresh for every privileged call and attached to
/// that one request; nothing in the client caches or persists them.
#[derive(Clone)]
pub struct IdToken(String);

impl IdToken {
    pub fn new(token: impl Into<String>) -> Self {
        IdToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for IdToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("IdToken(..)")
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("credential refresh failed: {0}")]
    Refresh(String),
}

/// The identity provider's force-refresh operation.
///
/// Implementations wrap whatever SDK actually holds the session; the
/// contract is a fresh token per call or an error, never a cached one.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fresh_token(&self) -> Result<IdToken, AuthError>;
}

/// The sign-in status carried by an identity-provider notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthStatus {
    SignedIn { user: String },
    SignedOut,
}

/// Visibility of the navigation links that depend on sign-in status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NavLinks {
    pub login: bool,
    pub upload: bool,
    pub account: bool,
}

impl Default for NavLinks {
    fn default() -> Self {
        // the markup ships with only the log-in link showing
        NavLinks {
            login: true,
            upload: false,
            account: false,
        }
    }
}

/// Bridges the identity provider's state notifications to a one-shot
/// readiness signal plus the current cached status.
///
/// The provider may notify any number of times (token refreshes fire
/// repeat events); only the first notification resolves the readiness
/// signal, while every notification updates the cached status and the
/// dependent navigation links.  Any number of callers gate on the one
/// shared signal through [`run_with_credentials`](Self::run_with_credentials).
pub struct Authenticator {
    ready: Signal,
    status: RwLock<Option<AuthStatus>>,
    nav: RwLock<NavLinks>,
    tokens: Arc<dyn TokenSource>,
    notices: Arc<dyn NoticeSink>,
}

impl Authenticator {
    pub fn new(tokens: Arc<dyn TokenSource>, notices: Arc<dyn NoticeSink>) -> Self {
        Authenticator {
            ready: Signal::new(),
            status: RwLock::new(None),
            nav: RwLock::new(NavLinks::default()),
            tokens,
            notices,
        }
    }

    /// Feed one identity-provider notification in.
    ///
    /// The embedding glue calls this from the provider's state-changed
    /// callback.  Resolution of the readiness signal is idempotent, so
    /// repeat notifications only refresh the cached status.
    pub fn state_changed(&self, status: AuthStatus) {
        match &status {
            AuthStatus::SignedIn { user } => debug!(%user, "identity provider: signed in"),
            AuthStatus::SignedOut => debug!("identity provider: signed out"),
        }
        *self.nav.write().unwrap() = match status {
            AuthStatus::SignedIn { .. } => NavLinks {
                login: false,
                upload: true,
                account: true,
            },
            AuthStatus::SignedOut => NavLinks::default(),
        };
        *self.status.write().unwrap() = Some(status);
        self.ready.resolve();
    }

    /// The readiness signal, resolved by the first notification.
    pub fn ready(&self) -> Signal {
        self.ready.clone()
    }

    /// Cached status, `None` until the first notification lands.
    pub fn status(&self) -> Option<AuthStatus> {
        self.status.read().unwrap().clone()
    }

    pub fn nav_links(&self) -> NavLinks {
        *self.nav.read().unwrap()
    }

    /// Wait for the sign-in status to become known, then run exactly
    /// one of the two branches.
    ///
    /// Signed in: force-refresh a credential and hand it to
    /// `on_signed_in`; a refresh failure runs neither branch and
    /// surfaces a single banner error.  Signed out: run
    /// `on_signed_out`, with no credential fetch attempted.
    pub async fn run_with_credentials<SI, SIFut, SO, SOFut>(
        &self,
        on_signed_in: SI,
        on_signed_out: SO,
    ) where
        SI: FnOnce(IdToken) -> SIFut,
        SIFut: Future<Output = ()>,
        SO: FnOnce() -> SOFut,
        SOFut: Future<Output = ()>,
    {
        self.ready.subscribe().wait().await;
        let signed_in = matches!(self.status(), Some(AuthStatus::SignedIn { .. }));
        if signed_in {
            match self.tokens.fresh_token().await {
                Ok(token) => on_signed_in(token).await,
                Err(err) => {
                    error!(%err, "error fetching id token");
                    self.notices.error(REAUTH_FAILED);
                }
            }
        } else {
            on_signed_out().await;
        }
    }

    /// [`run_with_credentials`](Self::run_with_credentials) with the
    /// default signed-out branch: post the sign-in-required banner.
    pub async fn run_signed_in<SI, SIFut>(&self, on_signed_in: SI)
    where
        SI: FnOnce(IdToken) -> SIFut,
        SIFut: Future<Output = ()>,
    {
        let notices = self.notices.clone();
        self.run_with_credentials(on_signed_in, move || async move {
            notices.error(SIGN_IN_REQUIRED);
        })
        .await
    }

    /// Like [`run_signed_in`](Self::run_signed_in) but a signed-out
    /// status is ignored; used by enrichment passes that simply do not
    /// apply to anonymous visitors.
    pub async fn run_signed_in_silent<SI, SIFut>(&self, on_signed_in: SI)
    where
        SI: FnOnce(IdToken) -> SIFut,
        SIFut: Future<Output = ()>,
    {
        self.run_with_credentials(on_signed_in, || async {}).await
    }
}
