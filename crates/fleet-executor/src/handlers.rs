//! Per-action dispatch. Handlers are thin: each composes a handful of
//! `PageHandle` primitives and returns domain data as JSON. Timing, error
//! classification, and the success/error `ActionResult` envelope live one
//! layer up in `executor.rs` — a handler only ever returns `Ok(Value)` or
//! propagates a `FleetError`.

use fleet_types::action::{Action, ContentScope, CookieOp, ImageFormat, MouseOp, ScreenshotScope, ScrollTarget, WaitFor};
use fleet_types::error::{FleetError, Result};
use fleet_types::ports::{Cookie, PageHandle};
use serde_json::json;

pub async fn dispatch(page: &dyn PageHandle, action: &Action) -> Result<serde_json::Value> {
    match action {
        Action::Navigate { url, timeout } => {
            page.navigate(url, timeout.unwrap_or(std::time::Duration::from_secs(30))).await?;
            Ok(json!({ "url": url }))
        }
        Action::Click { selector } => {
            page.click(selector).await?;
            Ok(json!({}))
        }
        Action::Type { selector, text } => {
            page.type_text(selector, text).await?;
            Ok(json!({ "length": text.len() }))
        }
        Action::Select { selector, value } => {
            page.select_option(selector, value).await?;
            Ok(json!({}))
        }
        Action::Keyboard { op: _, keys } => {
            page.key_press(keys).await?;
            Ok(json!({}))
        }
        Action::Mouse { op, from, to, steps, delta } => mouse(page, *op, *from, *to, *steps, *delta).await,
        Action::Hover { selector } => {
            page.hover(selector).await?;
            Ok(json!({}))
        }
        Action::Focus { selector } => {
            page.focus(selector).await?;
            Ok(json!({}))
        }
        Action::Blur { selector } => {
            page.blur(selector).await?;
            Ok(json!({}))
        }
        Action::Screenshot { scope, selector, format } => screenshot(page, *scope, selector.as_deref(), *format).await,
        Action::Pdf => {
            let bytes = page.pdf().await?;
            Ok(json!({ "bytes": bytes.len() }))
        }
        Action::Content { scope, selector } => content(page, *scope, selector.as_deref()).await,
        Action::Evaluate { script } => page.evaluate(script).await,
        Action::Upload { selector, paths } => {
            page.upload_file(selector, paths).await?;
            Ok(json!({ "count": paths.len() }))
        }
        Action::Download { trigger_selector, timeout } => {
            page.click(trigger_selector).await?;
            page.wait_for_navigation(*timeout).await.or_else(|e| match e {
                FleetError::BrowserTimeout(_) => Ok(()),
                other => Err(other),
            })?;
            Ok(json!({}))
        }
        Action::Cookie { op, name, value } => cookie(page, *op, name.as_deref(), value.as_deref()).await,
        Action::Wait { on, selector, timeout } => wait(page, *on, selector.as_deref(), *timeout).await,
        Action::Scroll { target, selector, delta } => scroll(page, *target, selector.as_deref(), delta.x, delta.y).await,
    }
}

async fn mouse(
    page: &dyn PageHandle,
    op: MouseOp,
    from: Option<fleet_types::action::Point>,
    to: fleet_types::action::Point,
    steps: Option<u32>,
    delta: Option<i64>,
) -> Result<serde_json::Value> {
    match op {
        MouseOp::Move => page.mouse_move(to.x, to.y).await?,
        MouseOp::Click => page.mouse_click(to.x, to.y).await?,
        MouseOp::Drag => {
            let origin = from.unwrap_or_default();
            page.mouse_drag((origin.x, origin.y), (to.x, to.y), steps.unwrap_or(10)).await?
        }
        MouseOp::Scroll => page.scroll_by(None, delta.unwrap_or(0), delta.unwrap_or(0)).await?,
        MouseOp::Wheel => page.mouse_wheel(to.x, to.y, delta.unwrap_or(0)).await?,
    }
    Ok(json!({}))
}

async fn screenshot(
    page: &dyn PageHandle,
    scope: ScreenshotScope,
    selector: Option<&str>,
    format: ImageFormat,
) -> Result<serde_json::Value> {
    let bytes = match scope {
        ScreenshotScope::FullPage | ScreenshotScope::Region => page.screenshot_png().await?,
        ScreenshotScope::Element => {
            let selector = selector.ok_or_else(|| FleetError::Validation("element screenshot requires a selector".into()))?;
            page.screenshot_element_png(selector).await?
        }
    };
    Ok(json!({ "bytes": bytes.len(), "format": format_name(format) }))
}

fn format_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "png",
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Webp => "webp",
    }
}

async fn content(page: &dyn PageHandle, scope: ContentScope, selector: Option<&str>) -> Result<serde_json::Value> {
    let data = match scope {
        ContentScope::FullPageHtml => page.content_html().await?,
        ContentScope::ElementHtml => {
            let selector = selector.ok_or_else(|| FleetError::Validation("element content requires a selector".into()))?;
            page.evaluate(&format!(
                "document.querySelector({}).outerHTML",
                serde_json::to_string(selector).unwrap_or_default()
            ))
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string()
        }
        ContentScope::ElementText => {
            let selector = selector.ok_or_else(|| FleetError::Validation("element text requires a selector".into()))?;
            page.element_text(selector).await?
        }
        ContentScope::ElementValue => {
            let selector = selector.ok_or_else(|| FleetError::Validation("element value requires a selector".into()))?;
            page.element_value(selector).await?
        }
    };
    Ok(json!({ "content": data }))
}

async fn cookie(
    page: &dyn PageHandle,
    op: CookieOp,
    name: Option<&str>,
    value: Option<&str>,
) -> Result<serde_json::Value> {
    match op {
        CookieOp::Get => {
            let cookies = page.get_cookies().await?;
            Ok(json!({ "count": cookies.len() }))
        }
        CookieOp::Set => {
            let name = name.ok_or_else(|| FleetError::Validation("cookie set requires a name".into()))?;
            page.set_cookie(Cookie {
                name: name.to_string(),
                value: value.unwrap_or_default().to_string(),
                ..Default::default()
            })
            .await?;
            Ok(json!({}))
        }
        CookieOp::Delete => {
            let name = name.ok_or_else(|| FleetError::Validation("cookie delete requires a name".into()))?;
            page.delete_cookie(name).await?;
            Ok(json!({}))
        }
    }
}

async fn wait(page: &dyn PageHandle, on: WaitFor, selector: Option<&str>, timeout: std::time::Duration) -> Result<serde_json::Value> {
    match on {
        WaitFor::Selector => {
            let selector = selector.ok_or_else(|| FleetError::Validation("wait-for-selector requires a selector".into()))?;
            page.wait_for_selector(selector, timeout).await?;
        }
        WaitFor::Timeout => {
            tokio::time::sleep(timeout).await;
        }
        WaitFor::Navigation => {
            page.wait_for_navigation(timeout).await?;
        }
    }
    Ok(json!({}))
}

async fn scroll(page: &dyn PageHandle, target: ScrollTarget, selector: Option<&str>, dx: i64, dy: i64) -> Result<serde_json::Value> {
    match target {
        ScrollTarget::Page => page.scroll_by(None, dx, dy).await?,
        ScrollTarget::Element => {
            let selector = selector.ok_or_else(|| FleetError::Validation("element scroll requires a selector".into()))?;
            page.scroll_by(Some(selector), dx, dy).await?
        }
    }
    Ok(json!({}))
}
