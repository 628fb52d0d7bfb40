use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;
use tracing::warn;

use crate::signal::Signal;

/// The shared page fragments injected into placeholder slots.
///
/// Pages declare only the slots their markup actually carries; the
/// inliner fills whatever is declared and leaves the rest alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Fragment {
    Navbar,
    Searchbar,
    Footer,
    DeleteConfirm,
    ResultTemplate,
    ResultTemplateLong,
}

impl Fragment {
    /// The partial backing this fragment.
    pub fn file(self) -> &'static str {
        match self {
            Fragment::Navbar => "navbar.html",
            Fragment::Searchbar => "searchbar.html",
            Fragment::Footer => "footer.html",
            Fragment::DeleteConfirm => "delete_confirm.html",
            Fragment::ResultTemplate | Fragment::ResultTemplateLong => "search_result.html",
        }
    }
}

#[derive(Error, Debug)]
#[error("failed to load {file}: {reason}")]
pub struct FragmentError {
    pub file: &'static str,
    pub reason: String,
}

/// Fetches fragment partials, typically over HTTP relative to the
/// page.
#[async_trait]
pub trait FragmentSource: Send + Sync {
    async fn fetch(&self, fragment: Fragment) -> Result<String, FragmentError>;
}

/// A page's placeholder slots plus the readiness signal for the one
/// fragment that rendering depends on.
///
/// Of all the fragments only the item-card template gates anything:
/// list rendering clones it per result, so the template-ready signal
/// resolves once its injection completes.  A page without the template
/// slot resolves the signal immediately; navbar, footer and the
/// confirm dialog never gate it.
pub struct Document {
    slots: Mutex<HashMap<Fragment, Option<String>>>,
    template_ready: Signal,
}

impl Document {
    pub fn new(slots: impl IntoIterator<Item = Fragment>) -> Document {
        Document {
            slots: Mutex::new(slots.into_iter().map(|slot| (slot, None)).collect()),
            template_ready: Signal::new(),
        }
    }

    pub fn has_slot(&self, fragment: Fragment) -> bool {
        self.slots.lock().unwrap().contains_key(&fragment)
    }

    /// Injected content of a slot, `None` while empty or absent.
    pub fn content(&self, fragment: Fragment) -> Option<String> {
        self.slots.lock().unwrap().get(&fragment).cloned().flatten()
    }

    /// Resolves when the item-card template is usable (or was never
    /// going to arrive).
    pub fn template_ready(&self) -> Signal {
        self.template_ready.clone()
    }

    fn fill(&self, fragment: Fragment, content: String) {
        if let Some(slot) = self.slots.lock().unwrap().get_mut(&fragment) {
            *slot = Some(content);
        }
    }
}

/// Fill every declared slot concurrently and fire the template-ready
/// signal exactly once.
///
/// A load failure leaves that slot empty; the signal still resolves so
/// dependent rendering is never stuck waiting on a fragment that will
/// not come.
pub async fn inline_fragments(document: &Document, source: &dyn FragmentSource) {
    if !document.has_slot(Fragment::ResultTemplate) {
        document.template_ready.resolve();
    }
    let declared: Vec<Fragment> = document.slots.lock().unwrap().keys().copied().collect();
    join_all(declared.into_iter().map(|fragment| async move {
        match source.fetch(fragment).await {
            Ok(content) => {
                let content = match fragment {
                    // the long variant renders full-width cards
                    Fragment::ResultTemplateLong => content.replacen("col-md-6", "", 1),
                    _ => content,
                };
                document.fill(fragment, content);
            }
            Err(err) => warn!(%err, "fragment load failed"),
        }
        if fragment == Fragment::ResultTemplate {
            document.template_ready.resolve();
        }
    }))
    .await;
}
