//! `BrowserDriver`/`BrowserHandle`/`PageHandle` backed by `spider_chrome`.
//!
//! Grounded on the teacher's `riptide-headless::pool::PooledBrowser::new` launch
//! sequence: a unique per-browser `TempDir` user-data-dir (spider_chrome does not
//! manage profiles or bypass Chrome's `SingletonLock`, so every launch needs its
//! own directory), the same hardened `--disable-*` argument set, and a spawned
//! task draining the CDP event handler for the browser's lifetime.

use async_trait::async_trait;
use fleet_types::error::{FleetError, Result};
use fleet_types::ports::{BrowserDriver, BrowserHandle, Cookie, LaunchSpec, PageHandle};
use futures::StreamExt;
use serde_json::Value;
use spider_chrome::{Browser, BrowserConfig, Page};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const HARDENING_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-web-security",
    "--disable-extensions",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-renderer-backgrounding",
    "--memory-pressure-off",
];

pub struct SpiderChromeDriver;

impl SpiderChromeDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SpiderChromeDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserDriver for SpiderChromeDriver {
    async fn launch(&self, spec: &LaunchSpec) -> Result<Box<dyn BrowserHandle>> {
        let id = uuid::Uuid::new_v4().to_string();

        let temp_dir = match &spec.user_data_dir {
            Some(base) => TempDir::new_in(base)
                .map_err(|e| FleetError::System(format!("creating browser profile dir: {e}")))?,
            None => TempDir::new()
                .map_err(|e| FleetError::System(format!("creating browser profile dir: {e}")))?,
        };
        let user_data_dir = temp_dir.path().to_path_buf();

        let mut builder = BrowserConfig::builder();
        if !spec.headless {
            builder = builder.with_head();
        }
        for arg in HARDENING_ARGS {
            builder = builder.arg(arg);
        }
        for arg in &spec.extra_args {
            builder = builder.arg(arg);
        }
        let mut browser_config = builder
            .build()
            .map_err(|e| FleetError::Configuration(format!("building browser config: {e}")))?;
        browser_config.user_data_dir = Some(user_data_dir);

        let launch = tokio::time::timeout(spec.launch_timeout, Browser::launch(browser_config))
            .await
            .map_err(|_| FleetError::BrowserTimeout(spec.launch_timeout))?;
        let (browser, mut handler) = launch.map_err(|e| FleetError::BrowserCrash(e.to_string()))?;

        let handler_id = id.clone();
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::warn!(browser_id = %handler_id, error = %e, "browser event error");
                }
            }
            tracing::debug!(browser_id = %handler_id, "browser event handler ended");
        });

        Ok(Box::new(SpiderChromeBrowserHandle {
            id,
            browser,
            _temp_dir: temp_dir,
            handler_task,
            page_count: AtomicUsize::new(0),
        }))
    }
}

pub struct SpiderChromeBrowserHandle {
    id: String,
    browser: Browser,
    _temp_dir: TempDir,
    handler_task: JoinHandle<()>,
    page_count: AtomicUsize,
}

#[async_trait]
impl BrowserHandle for SpiderChromeBrowserHandle {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| FleetError::BrowserCrash(format!("creating page: {e}")))?;
        self.page_count.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(SpiderChromePageHandle { page }))
    }

    async fn page_count(&self) -> usize {
        self.page_count.load(Ordering::Relaxed)
    }

    async fn fast_health_check(&self) -> bool {
        self.browser.version().await.is_ok()
    }

    async fn full_health_check(&self) -> bool {
        match tokio::time::timeout(Duration::from_secs(5), self.browser.new_page("about:blank")).await {
            Ok(Ok(page)) => {
                let ok = tokio::time::timeout(Duration::from_secs(2), page.content())
                    .await
                    .map(|r| r.is_ok())
                    .unwrap_or(false);
                let _ = page.close().await;
                ok
            }
            _ => false,
        }
    }

    async fn close(&self) -> Result<()> {
        self.handler_task.abort();
        Ok(())
    }

    fn id(&self) -> &str {
        &self.id
    }
}

pub struct SpiderChromePageHandle {
    page: Page,
}

#[async_trait]
impl PageHandle for SpiderChromePageHandle {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.page.goto(url))
            .await
            .map_err(|_| FleetError::BrowserTimeout(timeout))?
            .map_err(|e| FleetError::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| FleetError::Navigation(format!("evaluate failed: {e}")))?;
        result
            .into_value()
            .map_err(|e| FleetError::Navigation(format!("parsing evaluate result: {e}")))
    }

    async fn content_html(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| FleetError::Navigation(format!("content failed: {e}")))
    }

    async fn screenshot_png(&self) -> Result<Vec<u8>> {
        self.page
            .screenshot(Default::default())
            .await
            .map_err(|e| FleetError::Navigation(format!("screenshot failed: {e}")))
    }

    async fn pdf(&self) -> Result<Vec<u8>> {
        self.page
            .pdf(Default::default())
            .await
            .map_err(|e| FleetError::Navigation(format!("pdf export failed: {e}")))
    }

    async fn close(&self) -> Result<()> {
        self.page
            .close()
            .await
            .map_err(|e| FleetError::Navigation(format!("closing page: {e}")))
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self.find(selector).await?;
        element.click().await.map_err(|e| FleetError::Navigation(format!("click failed: {e}")))
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        let element = self.find(selector).await?;
        element
            .type_str(text)
            .await
            .map_err(|e| FleetError::Navigation(format!("type failed: {e}")))
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<()> {
        let script = format!(
            "(()=>{{const el=document.querySelector({sel});if(!el)throw new Error('no element');el.value={val};el.dispatchEvent(new Event('change',{{bubbles:true}}));}})()",
            sel = js_literal(selector),
            val = js_literal(value),
        );
        self.evaluate(&script).await.map(|_| ())
    }

    async fn hover(&self, selector: &str) -> Result<()> {
        let element = self.find(selector).await?;
        element.hover().await.map_err(|e| FleetError::Navigation(format!("hover failed: {e}")))
    }

    async fn focus(&self, selector: &str) -> Result<()> {
        let element = self.find(selector).await?;
        element.focus().await.map_err(|e| FleetError::Navigation(format!("focus failed: {e}")))
    }

    async fn blur(&self, selector: &str) -> Result<()> {
        let script = format!(
            "(()=>{{const el=document.querySelector({sel});if(el)el.blur();}})()",
            sel = js_literal(selector),
        );
        self.evaluate(&script).await.map(|_| ())
    }

    async fn screenshot_element_png(&self, selector: &str) -> Result<Vec<u8>> {
        let element = self.find(selector).await?;
        element
            .screenshot(Default::default())
            .await
            .map_err(|e| FleetError::Navigation(format!("element screenshot failed: {e}")))
    }

    async fn element_text(&self, selector: &str) -> Result<String> {
        let element = self.find(selector).await?;
        element
            .inner_text()
            .await
            .map_err(|e| FleetError::Navigation(format!("reading element text failed: {e}")))?
            .ok_or_else(|| FleetError::Navigation("element has no text".into()))
    }

    async fn element_value(&self, selector: &str) -> Result<String> {
        let script = format!(
            "(()=>{{const el=document.querySelector({sel});if(!el)throw new Error('no element');return el.value ?? '';}})()",
            sel = js_literal(selector),
        );
        let value = self.evaluate(&script).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn mouse_move(&self, x: i64, y: i64) -> Result<()> {
        self.page
            .move_mouse((x as f64, y as f64).into())
            .await
            .map_err(|e| FleetError::Navigation(format!("mouse move failed: {e}")))?;
        Ok(())
    }

    async fn mouse_click(&self, x: i64, y: i64) -> Result<()> {
        self.mouse_move(x, y).await?;
        self.page
            .click((x as f64, y as f64).into())
            .await
            .map_err(|e| FleetError::Navigation(format!("mouse click failed: {e}")))?;
        Ok(())
    }

    async fn mouse_drag(&self, from: (i64, i64), to: (i64, i64), steps: u32) -> Result<()> {
        let steps = steps.max(1);
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let x = from.0 as f64 + (to.0 - from.0) as f64 * t;
            let y = from.1 as f64 + (to.1 - from.1) as f64 * t;
            self.page
                .move_mouse((x, y).into())
                .await
                .map_err(|e| FleetError::Navigation(format!("mouse drag step failed: {e}")))?;
        }
        Ok(())
    }

    async fn mouse_wheel(&self, x: i64, y: i64, delta: i64) -> Result<()> {
        let script = format!(
            "(()=>{{const el=document.elementFromPoint({x},{y});if(el)el.dispatchEvent(new WheelEvent('wheel',{{deltaY:{delta},bubbles:true}}));}})()",
        );
        self.evaluate(&script).await.map(|_| ())
    }

    async fn scroll_by(&self, selector: Option<&str>, dx: i64, dy: i64) -> Result<()> {
        let script = match selector {
            Some(sel) => format!(
                "(()=>{{const el=document.querySelector({sel});if(!el)throw new Error('no element');el.scrollBy({dx},{dy});}})()",
                sel = js_literal(sel),
            ),
            None => format!("window.scrollBy({dx},{dy})"),
        };
        self.evaluate(&script).await.map(|_| ())
    }

    async fn key_press(&self, keys: &str) -> Result<()> {
        self.page
            .type_str(keys)
            .await
            .map_err(|e| FleetError::Navigation(format!("key press failed: {e}")))?;
        Ok(())
    }

    async fn get_cookies(&self) -> Result<Vec<Cookie>> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| FleetError::Navigation(format!("reading cookies failed: {e}")))?;
        Ok(cookies
            .into_iter()
            .map(|c| Cookie {
                name: c.name,
                value: c.value,
                domain: Some(c.domain),
                path: Some(c.path),
                expires: Some(c.expires),
            })
            .collect())
    }

    async fn set_cookie(&self, cookie: Cookie) -> Result<()> {
        self.page
            .set_cookie(spider_chrome::cdp::browser_protocol::network::CookieParam {
                name: cookie.name,
                value: cookie.value,
                domain: cookie.domain,
                path: cookie.path,
                ..Default::default()
            })
            .await
            .map_err(|e| FleetError::Navigation(format!("setting cookie failed: {e}")))?;
        Ok(())
    }

    async fn delete_cookie(&self, name: &str) -> Result<()> {
        self.page
            .delete_cookie(name.to_string())
            .await
            .map_err(|e| FleetError::Navigation(format!("deleting cookie failed: {e}")))?;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.find(selector))
            .await
            .map_err(|_| FleetError::BrowserTimeout(timeout))??;
        Ok(())
    }

    async fn wait_for_navigation(&self, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.page.wait_for_navigation())
            .await
            .map_err(|_| FleetError::BrowserTimeout(timeout))?
            .map_err(|e| FleetError::Navigation(format!("waiting for navigation failed: {e}")))?;
        Ok(())
    }

    async fn upload_file(&self, selector: &str, paths: &[String]) -> Result<()> {
        let element = self.find(selector).await?;
        element
            .set_input_files(paths.to_vec())
            .await
            .map_err(|e| FleetError::Navigation(format!("upload failed: {e}")))?;
        Ok(())
    }

    async fn set_blocked_resource_types(&self, _types: Option<&[String]>) -> Result<()> {
        // spider_chrome exposes request interception at the browser-config level,
        // not per-page; the optimizer's resource-blocking hint is honored by
        // fleet-core when launching, not here.
        Ok(())
    }

    async fn set_javascript_enabled(&self, enabled: bool) -> Result<()> {
        self.page
            .execute(spider_chrome::cdp::browser_protocol::emulation::SetScriptExecutionDisabledParams {
                value: !enabled,
            })
            .await
            .map_err(|e| FleetError::Navigation(format!("toggling javascript failed: {e}")))?;
        Ok(())
    }

    async fn set_cache_enabled(&self, enabled: bool) -> Result<()> {
        self.page
            .execute(spider_chrome::cdp::browser_protocol::network::SetCacheDisabledParams {
                cache_disabled: !enabled,
            })
            .await
            .map_err(|e| FleetError::Navigation(format!("toggling cache failed: {e}")))?;
        Ok(())
    }
}

impl SpiderChromePageHandle {
    async fn find(&self, selector: &str) -> Result<spider_chrome::Element> {
        self.page
            .find_element(selector)
            .await
            .map_err(|e| FleetError::NotFound(format!("selector {selector}: {e}")))
    }
}

/// Renders a Rust string as a JSON string literal for safe interpolation into
/// a JS expression built with `format!` — never raw string concatenation.
fn js_literal(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}
