use std::sync::{Arc, Mutex};

use tracing::error;

use crate::api::{AccountData, Backend};
use crate::auth::Authenticator;
use crate::notice::NoticeSink;
use crate::signal::Signal;

const ACCOUNT_FETCH_FAILED: &str =
    "An error occurred while fetching user data. Please report this!";

/// Process-wide cache of the signed-in account's profile.
///
/// The profile is fetched at most once per page load, on first
/// privileged need.  The entry state is explicit so that two callers
/// racing to populate it cannot issue duplicate requests: the second
/// caller finds the attempt in flight and waits on its signal instead.
/// A failed attempt leaves the entry re-attemptable.
pub struct AccountCache {
    state: Mutex<CacheState>,
    notices: Arc<dyn NoticeSink>,
}

enum CacheState {
    Unpopulated,
    InFlight(Signal),
    Populated(AccountData),
    Failed,
}

impl AccountCache {
    pub fn new(notices: Arc<dyn NoticeSink>) -> Self {
        AccountCache {
            state: Mutex::new(CacheState::Unpopulated),
            notices,
        }
    }

    /// The cached profile, populating it first if needed.
    ///
    /// Returns `None` when the user is signed out or the populate
    /// attempt failed; either way the failure was already surfaced to
    /// the user, so callers just skip whatever needed the profile.
    pub async fn get(&self, auth: &Authenticator, backend: &dyn Backend) -> Option<AccountData> {
        let in_flight = {
            let mut state = self.state.lock().unwrap();
            match &*state {
                CacheState::Populated(data) => return Some(data.clone()),
                CacheState::InFlight(signal) => Some(signal.subscribe()),
                CacheState::Unpopulated | CacheState::Failed => {
                    *state = CacheState::InFlight(Signal::new());
                    None
                }
            }
        };

        if let Some(subscription) = in_flight {
            subscription.wait().await;
            return match &*self.state.lock().unwrap() {
                CacheState::Populated(data) => Some(data.clone()),
                _ => None,
            };
        }

        // this caller owns the populate attempt
        let fetched: Mutex<Option<AccountData>> = Mutex::new(None);
        auth.run_signed_in({
            let fetched = &fetched;
            let notices = &self.notices;
            move |token| async move {
                match backend.account_data(&token).await {
                    Ok(data) => *fetched.lock().unwrap() = Some(data),
                    Err(err) => {
                        error!(%err, "error fetching account data");
                        notices.error(ACCOUNT_FETCH_FAILED);
                    }
                }
            }
        })
        .await;

        let fetched = fetched.into_inner().unwrap();
        let mut state = self.state.lock().unwrap();
        let signal = match std::mem::replace(&mut *state, CacheState::Failed) {
            CacheState::InFlight(signal) => signal,
            // unreachable short of a logic error; keep the new state
            other => {
                *state = other;
                return fetched;
            }
        };
        *state = match &fetched {
            Some(data) => CacheState::Populated(data.clone()),
            None => CacheState::Failed,
        };
        drop(state);
        signal.resolve();
        fetched
    }

    /// Whether a profile is already cached, without populating.
    pub fn is_populated(&self) -> bool {
        matches!(&*self.state.lock().unwrap(), CacheState::Populated(_))
    }
}
