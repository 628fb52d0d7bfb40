#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use beatmap_client::account::AccountCache;
use beatmap_client::actions::{CompanionOutcome, CompanionPort};
use beatmap_client::api::{
    AccountData, ApiError, Backend, BeatMap, Difficulty, RecordId, SearchResult, UploadForm,
};
use beatmap_client::auth::{AuthError, AuthStatus, Authenticator, IdToken, TokenSource};
use beatmap_client::config::SiteConfig;
use beatmap_client::fragment::Document;
use beatmap_client::notice::BufferedNotices;
use beatmap_client::page::{Navigator, PageContext};
use beatmap_client::Signal;

pub struct FakeTokens {
    fetched: AtomicUsize,
    fail: bool,
}

impl FakeTokens {
    pub fn ok() -> Arc<FakeTokens> {
        Arc::new(FakeTokens {
            fetched: AtomicUsize::new(0),
            fail: false,
        })
    }

    pub fn failing() -> Arc<FakeTokens> {
        Arc::new(FakeTokens {
            fetched: AtomicUsize::new(0),
            fail: true,
        })
    }

    pub fn fetches(&self) -> usize {
        self.fetched.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenSource for FakeTokens {
    async fn fresh_token(&self) -> Result<IdToken, AuthError> {
        self.fetched.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(AuthError::Refresh("session expired".into()))
        } else {
            Ok(IdToken::new("id-token"))
        }
    }
}

/// A scripted response, producing a fresh result per call.
pub enum Scripted<T> {
    Ok(T),
    RateLimited,
    Status(u16, String),
    Unreachable,
}

impl<T: Clone> Scripted<T> {
    fn produce(&self) -> Result<T, ApiError> {
        match self {
            Scripted::Ok(value) => Ok(value.clone()),
            Scripted::RateLimited => Err(ApiError::RateLimited),
            Scripted::Status(status, message) => Err(ApiError::Status {
                status: *status,
                message: message.clone(),
            }),
            Scripted::Unreachable => Err(ApiError::Transport(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "offline",
            )))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Search(String),
    Usersongs(String),
    AccountData,
    Upvote(String),
    Unvote(String),
    Download(String),
    Remove(String),
    Delete(String),
    Upload(String),
}

/// A backend whose responses are scripted per endpoint and whose
/// calls are recorded in arrival order.
///
/// The optional gates let a test hold a response open to drive the
/// ordering properties.
pub struct FakeBackend {
    calls: Mutex<Vec<Call>>,
    pub songs: Mutex<Scripted<SearchResult>>,
    pub account: Mutex<Scripted<AccountData>>,
    pub action: Mutex<Scripted<()>>,
    pub upload: Mutex<Scripted<String>>,
    pub songs_gate: Mutex<Option<Signal>>,
    pub account_gate: Mutex<Option<Signal>>,
}

impl FakeBackend {
    pub fn new() -> Arc<FakeBackend> {
        Arc::new(FakeBackend {
            calls: Mutex::new(Vec::new()),
            songs: Mutex::new(Scripted::Ok(songs("", vec![]))),
            account: Mutex::new(Scripted::Ok(account_of("viewer", &[], &[]))),
            action: Mutex::new(Scripted::Ok(())),
            upload: Mutex::new(Scripted::Ok("query=charter song".into())),
            songs_gate: Mutex::new(None),
            account_gate: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn pass_gate(gate: &Mutex<Option<Signal>>) {
        let gate = gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.subscribe().wait().await;
        }
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn search(&self, query: &str) -> Result<SearchResult, ApiError> {
        self.log(Call::Search(query.to_string()));
        Self::pass_gate(&self.songs_gate).await;
        self.songs.lock().unwrap().produce()
    }

    async fn usersongs(&self, user: &str) -> Result<SearchResult, ApiError> {
        self.log(Call::Usersongs(user.to_string()));
        Self::pass_gate(&self.songs_gate).await;
        self.songs.lock().unwrap().produce()
    }

    async fn account_data(&self, _token: &IdToken) -> Result<AccountData, ApiError> {
        self.log(Call::AccountData);
        Self::pass_gate(&self.account_gate).await;
        self.account.lock().unwrap().produce()
    }

    async fn upvote(&self, _token: &IdToken, map_id: &str) -> Result<(), ApiError> {
        self.log(Call::Upvote(map_id.to_string()));
        self.action.lock().unwrap().produce()
    }

    async fn unvote(&self, _token: &IdToken, map_id: &str) -> Result<(), ApiError> {
        self.log(Call::Unvote(map_id.to_string()));
        self.action.lock().unwrap().produce()
    }

    async fn download(&self, _token: &IdToken, map_id: &str) -> Result<(), ApiError> {
        self.log(Call::Download(map_id.to_string()));
        self.action.lock().unwrap().produce()
    }

    async fn remove(&self, _token: &IdToken, map_id: &str) -> Result<(), ApiError> {
        self.log(Call::Remove(map_id.to_string()));
        self.action.lock().unwrap().produce()
    }

    async fn delete(&self, _token: &IdToken, map_id: &str) -> Result<(), ApiError> {
        self.log(Call::Delete(map_id.to_string()));
        self.action.lock().unwrap().produce()
    }

    async fn upload(&self, _token: &IdToken, form: UploadForm) -> Result<String, ApiError> {
        self.log(Call::Upload(form.file_name.clone()));
        self.upload.lock().unwrap().produce()
    }
}

#[derive(Default)]
pub struct FakeNav {
    locations: Mutex<Vec<String>>,
}

impl FakeNav {
    pub fn visited(&self) -> Vec<String> {
        self.locations.lock().unwrap().clone()
    }
}

impl Navigator for FakeNav {
    fn navigate(&self, location: &str) {
        self.locations.lock().unwrap().push(location.to_string());
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandOff {
    Download(String),
    Remove(String),
}

/// A companion that always answers with the configured reply.
pub struct FakeCompanion {
    hand_offs: Mutex<Vec<HandOff>>,
    reply: String,
}

impl FakeCompanion {
    pub fn replying(reply: &str) -> Arc<FakeCompanion> {
        Arc::new(FakeCompanion {
            hand_offs: Mutex::new(Vec::new()),
            reply: reply.to_string(),
        })
    }

    pub fn hand_offs(&self) -> Vec<HandOff> {
        self.hand_offs.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompanionPort for FakeCompanion {
    async fn download(&self, map_id: &str) -> CompanionOutcome {
        self.hand_offs
            .lock()
            .unwrap()
            .push(HandOff::Download(map_id.to_string()));
        CompanionOutcome::Reply(self.reply.clone())
    }

    async fn remove(&self, map_id: &str) -> CompanionOutcome {
        self.hand_offs
            .lock()
            .unwrap()
            .push(HandOff::Remove(map_id.to_string()));
        CompanionOutcome::Reply(self.reply.clone())
    }
}

/// Everything a page scenario needs, wired to fakes.
pub struct Harness {
    pub tokens: Arc<FakeTokens>,
    pub backend: Arc<FakeBackend>,
    pub notices: Arc<BufferedNotices>,
    pub nav: Arc<FakeNav>,
    pub auth: Arc<Authenticator>,
    pub account: Arc<AccountCache>,
    pub config: Arc<SiteConfig>,
    pub document: Arc<Document>,
}

impl Harness {
    pub fn new() -> Harness {
        Harness::with_tokens(FakeTokens::ok())
    }

    pub fn with_tokens(tokens: Arc<FakeTokens>) -> Harness {
        let backend = FakeBackend::new();
        let notices = Arc::new(BufferedNotices::new());
        let nav = Arc::new(FakeNav::default());
        let auth = Arc::new(Authenticator::new(tokens.clone(), notices.clone()));
        let account = Arc::new(AccountCache::new(notices.clone()));
        let config = Arc::new(SiteConfig::default());
        // page scenarios start with the fragments already inlined
        let document = Arc::new(Document::new([]));
        document.template_ready().resolve();
        Harness {
            tokens,
            backend,
            notices,
            nav,
            auth,
            account,
            config,
            document,
        }
    }

    pub fn signed_in(self, user: &str) -> Harness {
        self.auth.state_changed(AuthStatus::SignedIn { user: user.into() });
        self
    }

    pub fn signed_out(self) -> Harness {
        self.auth.state_changed(AuthStatus::SignedOut);
        self
    }

    pub fn ctx(&self) -> PageContext {
        PageContext {
            auth: self.auth.clone(),
            backend: self.backend.clone(),
            notices: self.notices.clone(),
            account: self.account.clone(),
            config: self.config.clone(),
            companion: None,
            navigator: self.nav.clone(),
        }
    }

    pub fn ctx_with_companion(&self, companion: Arc<dyn CompanionPort>) -> PageContext {
        let mut ctx = self.ctx();
        ctx.companion = Some(companion);
        ctx
    }
}

/// Poll until the condition holds, with a hard bound.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
    panic!("condition not reached in time");
}

pub fn song(id: &str, title: &str, upvotes: u64) -> BeatMap {
    BeatMap {
        id: RecordId::new(id),
        song: title.to_string(),
        artist: "Artist".into(),
        charter: "Charter".into(),
        difficulties: vec![Difficulty {
            display: "Normal".into(),
        }],
        image: None,
        download: format!("{id}.zip"),
        upvotes,
    }
}

pub fn songs(query: &str, results: Vec<BeatMap>) -> SearchResult {
    SearchResult {
        query: query.to_string(),
        results,
    }
}

pub fn account_of(id: &str, upvoted: &[&str], downloaded: &[&str]) -> AccountData {
    AccountData {
        id: RecordId::new(id),
        upvoted: upvoted.iter().map(|id| RecordId::new(*id)).collect(),
        downloaded: downloaded.iter().map(|id| RecordId::new(*id)).collect(),
    }
}
