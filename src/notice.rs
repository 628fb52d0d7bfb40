use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Where user-visible messages go.
///
/// Every asynchronous failure in the client collapses to exactly one
/// `error` call on this sink; nothing propagates further out (a failed
/// action is never fatal to the page).  `alert` carries the companion
/// app's reply, which the browser build surfaced modally rather than
/// through the banner.
pub trait NoticeSink: Send + Sync {
    /// Show a transient, dismissible error message.
    fn error(&self, message: &str);

    /// Show a blocking informational message.
    fn alert(&self, message: &str);
}

/// The default error surface: a banner that shows the latest message
/// for a fixed window and then fades out.
///
/// The banner itself is stateless about history; a new error simply
/// restarts the window, matching the page behaviour where the error
/// element's text is overwritten and its fade classes reset.
pub struct TransientBanner {
    duration: Duration,
    fade: Duration,
    state: Mutex<BannerState>,
}

#[derive(Default)]
struct BannerState {
    message: Option<String>,
    shown_at: Option<Instant>,
    alert: Option<String>,
}

impl TransientBanner {
    pub fn new(duration: Duration, fade: Duration) -> Self {
        TransientBanner {
            duration,
            fade,
            state: Mutex::new(BannerState::default()),
        }
    }

    /// The currently displayed message, if the banner has not fully
    /// faded out yet.
    pub fn current(&self) -> Option<String> {
        let state = self.state.lock().unwrap();
        let shown_at = state.shown_at?;
        if shown_at.elapsed() < self.duration + self.fade {
            state.message.clone()
        } else {
            None
        }
    }

    /// Whether the banner is past its visible window and fading.
    pub fn is_fading(&self) -> bool {
        let state = self.state.lock().unwrap();
        match state.shown_at {
            Some(shown_at) => {
                let elapsed = shown_at.elapsed();
                elapsed >= self.duration && elapsed < self.duration + self.fade
            }
            None => false,
        }
    }

    /// The last alert handed over by the companion flow, consuming it.
    pub fn take_alert(&self) -> Option<String> {
        self.state.lock().unwrap().alert.take()
    }
}

impl NoticeSink for TransientBanner {
    fn error(&self, message: &str) {
        let mut state = self.state.lock().unwrap();
        state.message = Some(message.to_string());
        state.shown_at = Some(Instant::now());
    }

    fn alert(&self, message: &str) {
        self.state.lock().unwrap().alert = Some(message.to_string());
    }
}

/// A sink that records every message in arrival order.
///
/// Used by embedders that render notices themselves, and by the test
/// suite to assert on exact emission counts.
#[derive(Default)]
pub struct BufferedNotices {
    messages: Mutex<Vec<Notice>>,
}

/// A recorded message with the surface it was aimed at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Error(String),
    Alert(String),
}

impl BufferedNotices {
    pub fn new() -> Self {
        BufferedNotices::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn messages(&self) -> Vec<Notice> {
        self.messages.lock().unwrap().clone()
    }

    /// Only the error-banner messages, in order.
    pub fn errors(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter_map(|notice| match notice {
                Notice::Error(message) => Some(message.clone()),
                Notice::Alert(_) => None,
            })
            .collect()
    }
}

impl NoticeSink for BufferedNotices {
    fn error(&self, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push(Notice::Error(message.to_string()));
    }

    fn alert(&self, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push(Notice::Alert(message.to_string()));
    }
}
