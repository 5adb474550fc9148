//! An in-memory `BrowserDriver` that never spawns a real process. Grounded on
//! the teacher's preference for hand-written fakes over mocking frameworks
//! (no `mockall`/`wiremock` in its unit-test dev-dependencies for pool tests).

use async_trait::async_trait;
use fleet_types::error::Result;
use fleet_types::ports::{BrowserDriver, BrowserHandle, Cookie, LaunchSpec, PageHandle};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Controls the next `launch` call's outcome and every handle's health checks.
pub struct FakeDriver {
    pub fail_next_launch: AtomicBool,
    pub launches: AtomicUsize,
    pub healthy: Arc<AtomicBool>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self {
            fail_next_launch: AtomicBool::new(false),
            launches: AtomicUsize::new(0),
            healthy: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn fail_next(&self) {
        self.fail_next_launch.store(true, Ordering::SeqCst);
    }
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn launch(&self, _spec: &LaunchSpec) -> Result<Box<dyn BrowserHandle>> {
        if self.fail_next_launch.swap(false, Ordering::SeqCst) {
            return Err(fleet_types::error::FleetError::BrowserCrash(
                "fake driver: forced launch failure".into(),
            ));
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeBrowserHandle {
            id: uuid::Uuid::new_v4().to_string(),
            healthy: self.healthy.clone(),
            page_count: AtomicUsize::new(0),
        }))
    }
}

pub struct FakeBrowserHandle {
    id: String,
    healthy: Arc<AtomicBool>,
    page_count: AtomicUsize,
}

#[async_trait]
impl BrowserHandle for FakeBrowserHandle {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>> {
        self.page_count.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePageHandle::default()))
    }

    async fn page_count(&self) -> usize {
        self.page_count.load(Ordering::SeqCst)
    }

    async fn fast_health_check(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    async fn full_health_check(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn id(&self) -> &str {
        &self.id
    }
}

/// Records every call it receives so handler/executor tests can assert on
/// what was dispatched without a real page. Never errors unless told to.
#[derive(Default)]
pub struct FakePageHandle {
    pub calls: Mutex<Vec<String>>,
    pub cookies: Mutex<Vec<Cookie>>,
}

impl FakePageHandle {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }
}

#[async_trait]
impl PageHandle for FakePageHandle {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<()> {
        self.record(format!("navigate:{url}"));
        Ok(())
    }

    async fn evaluate(&self, _script: &str) -> Result<Value> {
        self.record("evaluate");
        Ok(Value::Null)
    }

    async fn content_html(&self) -> Result<String> {
        self.record("content_html");
        Ok("<html></html>".to_string())
    }

    async fn screenshot_png(&self) -> Result<Vec<u8>> {
        self.record("screenshot_png");
        Ok(Vec::new())
    }

    async fn pdf(&self) -> Result<Vec<u8>> {
        self.record("pdf");
        Ok(Vec::new())
    }

    async fn close(&self) -> Result<()> {
        self.record("close");
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.record(format!("click:{selector}"));
        Ok(())
    }

    async fn type_text(&self, selector: &str, _text: &str) -> Result<()> {
        self.record(format!("type:{selector}"));
        Ok(())
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<()> {
        self.record(format!("select:{selector}={value}"));
        Ok(())
    }

    async fn hover(&self, selector: &str) -> Result<()> {
        self.record(format!("hover:{selector}"));
        Ok(())
    }

    async fn focus(&self, selector: &str) -> Result<()> {
        self.record(format!("focus:{selector}"));
        Ok(())
    }

    async fn blur(&self, selector: &str) -> Result<()> {
        self.record(format!("blur:{selector}"));
        Ok(())
    }

    async fn screenshot_element_png(&self, selector: &str) -> Result<Vec<u8>> {
        self.record(format!("screenshot_element:{selector}"));
        Ok(Vec::new())
    }

    async fn element_text(&self, selector: &str) -> Result<String> {
        self.record(format!("element_text:{selector}"));
        Ok(String::new())
    }

    async fn element_value(&self, selector: &str) -> Result<String> {
        self.record(format!("element_value:{selector}"));
        Ok(String::new())
    }

    async fn mouse_move(&self, x: i64, y: i64) -> Result<()> {
        self.record(format!("mouse_move:{x},{y}"));
        Ok(())
    }

    async fn mouse_click(&self, x: i64, y: i64) -> Result<()> {
        self.record(format!("mouse_click:{x},{y}"));
        Ok(())
    }

    async fn mouse_drag(&self, from: (i64, i64), to: (i64, i64), steps: u32) -> Result<()> {
        self.record(format!("mouse_drag:{from:?}->{to:?}x{steps}"));
        Ok(())
    }

    async fn mouse_wheel(&self, x: i64, y: i64, delta: i64) -> Result<()> {
        self.record(format!("mouse_wheel:{x},{y},{delta}"));
        Ok(())
    }

    async fn scroll_by(&self, selector: Option<&str>, dx: i64, dy: i64) -> Result<()> {
        self.record(format!("scroll:{selector:?},{dx},{dy}"));
        Ok(())
    }

    async fn key_press(&self, keys: &str) -> Result<()> {
        self.record(format!("key_press:{keys}"));
        Ok(())
    }

    async fn get_cookies(&self) -> Result<Vec<Cookie>> {
        self.record("get_cookies");
        Ok(self.cookies.lock().clone())
    }

    async fn set_cookie(&self, cookie: Cookie) -> Result<()> {
        self.record(format!("set_cookie:{}", cookie.name));
        self.cookies.lock().push(cookie);
        Ok(())
    }

    async fn delete_cookie(&self, name: &str) -> Result<()> {
        self.record(format!("delete_cookie:{name}"));
        self.cookies.lock().retain(|c| c.name != name);
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> Result<()> {
        self.record(format!("wait_for_selector:{selector}"));
        Ok(())
    }

    async fn wait_for_navigation(&self, _timeout: Duration) -> Result<()> {
        self.record("wait_for_navigation");
        Ok(())
    }

    async fn upload_file(&self, selector: &str, paths: &[String]) -> Result<()> {
        self.record(format!("upload:{selector}:{}", paths.len()));
        Ok(())
    }

    async fn set_blocked_resource_types(&self, types: Option<&[String]>) -> Result<()> {
        self.record(format!("block_resources:{}", types.map(|t| t.len()).unwrap_or(0)));
        Ok(())
    }

    async fn set_javascript_enabled(&self, enabled: bool) -> Result<()> {
        self.record(format!("javascript_enabled:{enabled}"));
        Ok(())
    }

    async fn set_cache_enabled(&self, enabled: bool) -> Result<()> {
        self.record(format!("cache_enabled:{enabled}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn launch_fails_exactly_once_when_forced() {
        let driver = FakeDriver::new();
        driver.fail_next();
        let spec = LaunchSpec::default();
        assert!(driver.launch(&spec).await.is_err());
        assert!(driver.launch(&spec).await.is_ok());
    }

    #[tokio::test]
    async fn health_checks_follow_the_shared_flag() {
        let driver = FakeDriver::new();
        let handle = driver.launch(&LaunchSpec::default()).await.unwrap();
        assert!(handle.fast_health_check().await);
        driver.set_healthy(false);
        assert!(!handle.fast_health_check().await);
    }
}
