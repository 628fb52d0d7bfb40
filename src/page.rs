use std::future::Future;
use std::sync::{Arc, RwLock};

use futures::future::{join, select, Either};
use tracing::{debug, error};

use crate::account::AccountCache;
use crate::actions::{CardActions, CompanionPort};
use crate::api::{ApiError, Backend, SearchResult, UploadForm};
use crate::auth::Authenticator;
use crate::card::{Card, CardList, SyncState, VoteState};
use crate::config::SiteConfig;
use crate::fragment::Document;
use crate::notice::NoticeSink;
use crate::signal::Signal;

const RATE_LIMITED: &str = "Please stop spamming page reloads!";
const SEARCH_FETCH_FAILED: &str =
    "An error occurred while fetching search results. Please try again later.";
const USER_FETCH_FAILED: &str = "Failed to find user songs, see console log";
const UPLOAD_SIGN_IN: &str = "You must sign in to upload a beatmap!";
const UPLOAD_OK: &str = "BeatMap uploaded successfully!";
const UPLOAD_FAILED: &str = "An error occurred during upload.";
const UPLOAD_UNREACHABLE: &str = "Failed to upload BeatMap. Please try again later.";

/// Page navigation, owned by the embedder.
pub trait Navigator: Send + Sync {
    fn navigate(&self, location: &str);
}

/// Everything a page controller needs handles to.
#[derive(Clone)]
pub struct PageContext {
    pub auth: Arc<Authenticator>,
    pub backend: Arc<dyn Backend>,
    pub notices: Arc<dyn NoticeSink>,
    pub account: Arc<AccountCache>,
    pub config: Arc<SiteConfig>,
    /// `None` skips the one-click hand-off after a sync.
    pub companion: Option<Arc<dyn CompanionPort>>,
    pub navigator: Arc<dyn Navigator>,
}

/// Where a page load currently stands.
///
/// `Enriching` is only reachable from `Rendered`, and no state is
/// revisited within one load; a navigation starts a fresh controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageState {
    Init,
    FetchingPrimary,
    Rendered,
    Enriching,
    Settled,
    Error,
}

/// Wait until either signal fires; `true` means `rendered` won.
async fn rendered_or_abandoned(rendered: &Signal, abandoned: &Signal) -> bool {
    let rendered = Box::pin(rendered.subscribe().wait());
    let abandoned = Box::pin(abandoned.subscribe().wait());
    matches!(select(rendered, abandoned).await, Either::Left(..))
}

/// The shared machinery of the two list pages.
///
/// The primary fetch and the credential-gated enrichment branch run
/// concurrently; rendering resolves the page-local `rendered` signal
/// and enrichment holds its card lookups behind it, because the cards
/// do not exist until the render has happened.
struct ListCore {
    ctx: PageContext,
    document: Arc<Document>,
    cards: Arc<CardList>,
    state: RwLock<PageState>,
    rendered: Signal,
    abandoned: Signal,
    query_echo: RwLock<Option<String>>,
    no_results: RwLock<bool>,
    page_user: RwLock<Option<String>>,
}

impl ListCore {
    fn new(ctx: PageContext, document: Arc<Document>) -> Self {
        ListCore {
            ctx,
            document,
            cards: Arc::new(CardList::new()),
            state: RwLock::new(PageState::Init),
            rendered: Signal::new(),
            abandoned: Signal::new(),
            query_echo: RwLock::new(None),
            no_results: RwLock::new(false),
            page_user: RwLock::new(None),
        }
    }

    fn set_state(&self, next: PageState) {
        debug!(?next, "page state");
        *self.state.write().unwrap() = next;
    }

    fn state(&self) -> PageState {
        *self.state.read().unwrap()
    }

    fn fail(&self) {
        self.set_state(PageState::Error);
        self.abandoned.resolve();
    }

    async fn run(
        &self,
        primary: impl Future<Output = Result<SearchResult, ApiError>>,
        fetch_failed: &str,
    ) {
        self.document.template_ready().subscribe().wait().await;
        self.set_state(PageState::FetchingPrimary);
        let render = async {
            match primary.await {
                Ok(result) => {
                    *self.query_echo.write().unwrap() = Some(result.query.clone());
                    let cards: Vec<Card> = result
                        .results
                        .iter()
                        .map(|map| Card::from_map(map, &self.ctx.config))
                        .collect();
                    *self.no_results.write().unwrap() = cards.is_empty();
                    self.cards.replace(cards);
                    self.set_state(PageState::Rendered);
                    self.rendered.resolve();
                }
                Err(ApiError::RateLimited) => {
                    self.cards.clear();
                    self.ctx.notices.error(RATE_LIMITED);
                    self.fail();
                }
                Err(err) => {
                    error!(%err, "primary fetch failed");
                    self.cards.clear();
                    self.ctx.notices.error(fetch_failed);
                    self.fail();
                }
            }
        };
        join(render, self.enrich()).await;
        // a signed-out visitor settles with neutral, non-interactive
        // cards; an abandoned load keeps its error state
        if self.state() == PageState::Rendered {
            self.set_state(PageState::Settled);
        }
    }

    /// The identity-dependent second pass: already-upvoted and
    /// already-downloaded markers, delete visibility, and finally the
    /// release of the slow-loading buttons.
    async fn enrich(&self) {
        let this = self;
        this.ctx
            .auth
            .run_signed_in_silent(move |_token| async move {
                if !rendered_or_abandoned(&this.rendered, &this.abandoned).await {
                    return;
                }
                this.set_state(PageState::Enriching);
                let account = this
                    .ctx
                    .account
                    .get(&this.ctx.auth, this.ctx.backend.as_ref())
                    .await;
                let Some(account) = account else {
                    // profile unavailable; the cards stay neutral
                    this.set_state(PageState::Settled);
                    return;
                };
                for id in &account.upvoted {
                    this.cards
                        .update(id.as_str(), |card| card.vote = VoteState::Upvoted);
                }
                for id in &account.downloaded {
                    this.cards
                        .update(id.as_str(), |card| card.sync = SyncState::Downloaded);
                }
                if let Some(page_user) = this.page_user.read().unwrap().clone() {
                    let viewer = account.id.as_str();
                    let admin = this.ctx.config.admins.iter().any(|id| id == viewer);
                    if admin || viewer == page_user {
                        this.cards.update_all(|card| card.delete_visible = true);
                    }
                }
                this.cards.update_all(|card| card.interactive = true);
                this.set_state(PageState::Settled);
            })
            .await;
    }

    fn actions(&self) -> CardActions {
        CardActions::new(self.ctx.clone(), self.cards.clone())
    }
}

/// Controller for the search page.
pub struct SearchPage {
    core: ListCore,
}

impl SearchPage {
    pub fn new(ctx: PageContext, document: Arc<Document>) -> Self {
        SearchPage {
            core: ListCore::new(ctx, document),
        }
    }

    /// Drive one page load for the given query string.
    pub async fn load(&self, query: &str) {
        let backend = self.core.ctx.backend.clone();
        self.core
            .run(async move { backend.search(query).await }, SEARCH_FETCH_FAILED)
            .await;
    }

    pub fn cards(&self) -> &CardList {
        &self.core.cards
    }

    pub fn actions(&self) -> CardActions {
        self.core.actions()
    }

    pub fn state(&self) -> PageState {
        self.core.state()
    }

    /// The query string echoed back by the backend.
    pub fn query_echo(&self) -> Option<String> {
        self.core.query_echo.read().unwrap().clone()
    }

    pub fn no_results(&self) -> bool {
        *self.core.no_results.read().unwrap()
    }

    /// Resolves the instant the primary list has been rendered.
    pub fn rendered(&self) -> Signal {
        self.core.rendered.clone()
    }
}

/// Controller for a user's songs page.
pub struct UserPage {
    core: ListCore,
}

impl UserPage {
    pub fn new(ctx: PageContext, document: Arc<Document>) -> Self {
        UserPage {
            core: ListCore::new(ctx, document),
        }
    }

    /// Drive one page load; with no explicit user the signed-in
    /// account's own page is shown.
    pub async fn load(&self, user: Option<&str>) {
        self.core.document.template_ready().subscribe().wait().await;
        let user_id = match user {
            Some(id) => id.to_string(),
            None => {
                let ctx = &self.core.ctx;
                match ctx.account.get(&ctx.auth, ctx.backend.as_ref()).await {
                    Some(account) => account.id.as_str().to_string(),
                    // the failed profile fetch already told the user
                    None => {
                        self.core.fail();
                        return;
                    }
                }
            }
        };
        *self.core.page_user.write().unwrap() = Some(user_id.clone());
        let backend = self.core.ctx.backend.clone();
        self.core
            .run(
                async move { backend.usersongs(&user_id).await },
                USER_FETCH_FAILED,
            )
            .await;
    }

    pub fn cards(&self) -> &CardList {
        &self.core.cards
    }

    pub fn actions(&self) -> CardActions {
        self.core.actions()
    }

    pub fn state(&self) -> PageState {
        self.core.state()
    }

    pub fn rendered(&self) -> Signal {
        self.core.rendered.clone()
    }
}

/// Feedback shown under the upload form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadFeedback {
    Idle,
    Uploading,
    Success(String),
    Failure(String),
}

/// Controller for the upload page.
pub struct UploadPage {
    ctx: PageContext,
    feedback: RwLock<UploadFeedback>,
    redirect: RwLock<Option<String>>,
}

impl UploadPage {
    pub fn new(ctx: PageContext) -> Self {
        UploadPage {
            ctx,
            feedback: RwLock::new(UploadFeedback::Idle),
            redirect: RwLock::new(None),
        }
    }

    /// Submit the form: enforce the client-side size ceiling, gate on
    /// a fresh credential, post the multipart upload.
    ///
    /// The submit control is dead while feedback reads `Uploading`.
    pub async fn submit(&self, form: UploadForm) {
        self.set_feedback(UploadFeedback::Uploading);
        let size = form.beatmap.len() as u64;
        let limit = self.ctx.config.max_upload_bytes;
        if size > limit {
            self.set_feedback(UploadFeedback::Failure(
                ApiError::TooLarge { size, limit }.to_string(),
            ));
            return;
        }
        let this = self;
        self.ctx
            .auth
            .run_with_credentials(
                move |token| async move {
                    match this.ctx.backend.upload(&token, form).await {
                        Ok(redirect) => {
                            *this.redirect.write().unwrap() = Some(redirect);
                            this.set_feedback(UploadFeedback::Success(UPLOAD_OK.into()));
                        }
                        Err(err) => {
                            error!(%err, "upload failed");
                            let message = match &err {
                                ApiError::Transport(_) => UPLOAD_UNREACHABLE.to_string(),
                                other => other.user_message(UPLOAD_FAILED),
                            };
                            this.set_feedback(UploadFeedback::Failure(message));
                        }
                    }
                },
                move || async move {
                    this.set_feedback(UploadFeedback::Failure(UPLOAD_SIGN_IN.into()));
                },
            )
            .await;
        // a credential-refresh failure surfaced on the banner instead;
        // release the form
        if *self.feedback.read().unwrap() == UploadFeedback::Uploading {
            self.set_feedback(UploadFeedback::Idle);
        }
    }

    fn set_feedback(&self, next: UploadFeedback) {
        *self.feedback.write().unwrap() = next;
    }

    pub fn feedback(&self) -> UploadFeedback {
        self.feedback.read().unwrap().clone()
    }

    /// The redirect query string a successful upload answered with.
    pub fn redirect(&self) -> Option<String> {
        self.redirect.read().unwrap().clone()
    }
}
