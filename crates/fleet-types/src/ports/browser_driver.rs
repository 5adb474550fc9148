//! Grounded on the teacher's `riptide-headless::pool::PooledBrowser` and its
//! `spider_chrome::Browser`/`Page` wrapping — generalized here into a trait so
//! `fleet-pool` can depend on the abstraction and `fleet-testutil` can supply a
//! fake for tests that never launch a real browser.

use crate::error::FleetError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub headless: bool,
    pub user_data_dir: Option<String>,
    pub launch_timeout: Duration,
    pub extra_args: Vec<String>,
}

impl Default for LaunchSpec {
    fn default() -> Self {
        Self {
            headless: true,
            user_data_dir: None,
            launch_timeout: Duration::from_secs(30),
            extra_args: Vec::new(),
        }
    }
}

/// Launches browser processes. One implementation wraps `spider_chrome`; the
/// fake in `fleet-testutil` launches nothing and returns canned handles.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn launch(&self, spec: &LaunchSpec) -> Result<Box<dyn BrowserHandle>, FleetError>;
}

/// A live browser process. Mirrors the teacher's `PooledBrowser` surface:
/// health checks at two tiers and a page-scoped handle per tab.
#[async_trait]
pub trait BrowserHandle: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>, FleetError>;

    async fn page_count(&self) -> usize;

    /// Cheap liveness probe: process alive, CDP socket responsive.
    async fn fast_health_check(&self) -> bool;

    /// Expensive probe: opens a throwaway page and navigates `about:blank`.
    async fn full_health_check(&self) -> bool;

    async fn close(&self) -> Result<(), FleetError>;

    fn id(&self) -> &str;
}

/// A browser cookie, shaped after CDP's `Network.Cookie`/`setCookie` params.
#[derive(Debug, Clone, Default)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub expires: Option<f64>,
}

/// The page capability set the action executor dispatches against. Beyond the
/// original navigate/evaluate/content/screenshot/pdf/close surface, this adds
/// one primitive per DOM/input/cookie operation in the action taxonomy; the
/// executor's handlers compose these rather than reaching for `evaluate`
/// directly, so every handler stays auditable and sanitizer-covered.
#[async_trait]
pub trait PageHandle: Send + Sync {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), FleetError>;

    async fn evaluate(&self, script: &str) -> Result<Value, FleetError>;

    async fn content_html(&self) -> Result<String, FleetError>;

    async fn screenshot_png(&self) -> Result<Vec<u8>, FleetError>;

    async fn pdf(&self) -> Result<Vec<u8>, FleetError>;

    async fn close(&self) -> Result<(), FleetError>;

    async fn click(&self, selector: &str) -> Result<(), FleetError>;

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), FleetError>;

    async fn select_option(&self, selector: &str, value: &str) -> Result<(), FleetError>;

    async fn hover(&self, selector: &str) -> Result<(), FleetError>;

    async fn focus(&self, selector: &str) -> Result<(), FleetError>;

    async fn blur(&self, selector: &str) -> Result<(), FleetError>;

    async fn screenshot_element_png(&self, selector: &str) -> Result<Vec<u8>, FleetError>;

    async fn element_text(&self, selector: &str) -> Result<String, FleetError>;

    async fn element_value(&self, selector: &str) -> Result<String, FleetError>;

    async fn mouse_move(&self, x: i64, y: i64) -> Result<(), FleetError>;

    async fn mouse_click(&self, x: i64, y: i64) -> Result<(), FleetError>;

    async fn mouse_drag(&self, from: (i64, i64), to: (i64, i64), steps: u32) -> Result<(), FleetError>;

    async fn mouse_wheel(&self, x: i64, y: i64, delta: i64) -> Result<(), FleetError>;

    async fn scroll_by(&self, selector: Option<&str>, dx: i64, dy: i64) -> Result<(), FleetError>;

    async fn key_press(&self, keys: &str) -> Result<(), FleetError>;

    async fn get_cookies(&self) -> Result<Vec<Cookie>, FleetError>;

    async fn set_cookie(&self, cookie: Cookie) -> Result<(), FleetError>;

    async fn delete_cookie(&self, name: &str) -> Result<(), FleetError>;

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), FleetError>;

    async fn wait_for_navigation(&self, timeout: Duration) -> Result<(), FleetError>;

    async fn upload_file(&self, selector: &str, paths: &[String]) -> Result<(), FleetError>;

    /// Resource-type blocking for the performance optimizer's hints (images,
    /// media, fonts, stylesheets); `None` clears any active block.
    async fn set_blocked_resource_types(&self, types: Option<&[String]>) -> Result<(), FleetError>;

    async fn set_javascript_enabled(&self, enabled: bool) -> Result<(), FleetError>;

    async fn set_cache_enabled(&self, enabled: bool) -> Result<(), FleetError>;
}
