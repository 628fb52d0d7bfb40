use std::time::Duration;

/// Site-wide constants the page controllers and collaborator
/// implementations read.
///
/// The browser build of the client scattered these through its page
/// scripts; here they live in one place so an embedder can override
/// them.  `Default` carries the deployed site's values.
#[derive(Clone, Debug)]
pub struct SiteConfig {
    /// Base URL the `/api/*` paths are resolved against.
    pub api_base: String,
    /// Prefix prepended to the `download` and `image` fields of a map
    /// to form a fetchable href.
    pub output_prefix: String,
    /// Card image used when a map carries no cover of its own.
    pub placeholder_image: String,
    /// Local port the companion app listens on.
    pub companion_port: u16,
    /// How long to wait for the companion's WebSocket before giving up
    /// and sending the user to the help page instead.
    pub companion_connect_timeout: Duration,
    /// Custom URI opened to nudge the companion app awake before the
    /// connection attempt.
    pub launch_uri: String,
    /// Page navigated to when the companion cannot be reached.
    pub fallback_page: String,
    /// Account ids allowed to delete any map, not just their own.
    pub admins: Vec<String>,
    /// Client-enforced ceiling on an uploaded beatmap archive.
    pub max_upload_bytes: u64,
    /// How long a transient error banner stays fully visible.
    pub notice_duration: Duration,
    /// Fade-out span appended to the visible window.
    pub notice_fade: Duration,
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            api_base: String::new(),
            output_prefix: "output/".into(),
            placeholder_image: "placeholder.jpg".into(),
            companion_port: 61523,
            companion_connect_timeout: Duration::from_secs(2),
            launch_uri: "beatmapbrowser://launch".into(),
            fallback_page: "oneclick.html".into(),
            admins: Vec::new(),
            max_upload_bytes: 20_000_000,
            notice_duration: Duration::from_millis(3000),
            notice_fade: Duration::from_millis(500),
        }
    }
}
