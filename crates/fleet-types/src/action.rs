//! The action taxonomy and its recorded outcome.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenshotScope {
    FullPage,
    Element,
    Region,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Webp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentScope {
    FullPageHtml,
    ElementHtml,
    ElementText,
    ElementValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CookieOp {
    Get,
    Set,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseOp {
    Move,
    Click,
    Drag,
    Scroll,
    Wheel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyboardOp {
    Keypress,
    Combination,
    Shortcut,
    Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitFor {
    Selector,
    Timeout,
    Navigation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrollTarget {
    Page,
    Element,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

/// A single automation action. Selectors here are the raw, unsanitized form —
/// sanitization happens in the validator before dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Navigate {
        url: String,
        timeout: Option<Duration>,
    },
    Click {
        selector: String,
    },
    Type {
        selector: String,
        text: String,
    },
    Select {
        selector: String,
        value: String,
    },
    Keyboard {
        op: KeyboardOp,
        keys: String,
    },
    Mouse {
        op: MouseOp,
        from: Option<Point>,
        to: Point,
        steps: Option<u32>,
        delta: Option<i64>,
    },
    Hover {
        selector: String,
    },
    Focus {
        selector: String,
    },
    Blur {
        selector: String,
    },
    Screenshot {
        scope: ScreenshotScope,
        selector: Option<String>,
        format: ImageFormat,
    },
    Pdf,
    Content {
        scope: ContentScope,
        selector: Option<String>,
    },
    Evaluate {
        script: String,
    },
    Upload {
        selector: String,
        paths: Vec<String>,
    },
    Download {
        trigger_selector: String,
        timeout: Duration,
    },
    Cookie {
        op: CookieOp,
        name: Option<String>,
        value: Option<String>,
    },
    Wait {
        on: WaitFor,
        selector: Option<String>,
        timeout: Duration,
    },
    Scroll {
        target: ScrollTarget,
        selector: Option<String>,
        delta: Point,
    },
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Navigate { .. } => "navigate",
            Action::Click { .. } => "click",
            Action::Type { .. } => "type",
            Action::Select { .. } => "select",
            Action::Keyboard { .. } => "keyboard",
            Action::Mouse { .. } => "mouse",
            Action::Hover { .. } => "hover",
            Action::Focus { .. } => "focus",
            Action::Blur { .. } => "blur",
            Action::Screenshot { .. } => "screenshot",
            Action::Pdf => "pdf",
            Action::Content { .. } => "content",
            Action::Evaluate { .. } => "evaluate",
            Action::Upload { .. } => "upload",
            Action::Download { .. } => "download",
            Action::Cookie { .. } => "cookie",
            Action::Wait { .. } => "wait",
            Action::Scroll { .. } => "scroll",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    Timeout,
    Network,
    Permission,
    Validation,
    NotFound,
    Other,
}

/// Recorded outcome of every action, per spec.md §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub action_type: &'static str,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub error_class: Option<ErrorClass>,
    pub duration: Duration,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Sanitized metadata only — never raw selectors or secrets.
    pub metadata: HashMap<String, String>,
    pub cancelled: bool,
}

impl ActionResult {
    pub fn ok(action_type: &'static str, data: serde_json::Value, duration: Duration, now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            success: true,
            action_type,
            data: Some(data),
            error: None,
            error_class: None,
            duration,
            timestamp: now,
            metadata: HashMap::new(),
            cancelled: false,
        }
    }

    pub fn err(
        action_type: &'static str,
        error: impl Into<String>,
        class: ErrorClass,
        duration: Duration,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            success: false,
            action_type,
            data: None,
            error: Some(error.into()),
            error_class: Some(class),
            duration,
            timestamp: now,
            metadata: HashMap::new(),
            cancelled: false,
        }
    }

    /// `success = true` implies `error = none`, a core invariant from spec.md §8.
    pub fn invariant_holds(&self) -> bool {
        !self.success || self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_implies_no_error() {
        let r = ActionResult::ok("navigate", serde_json::json!({}), Duration::from_millis(5), chrono::Utc::now());
        assert!(r.invariant_holds());
    }

    #[test]
    fn action_kind_matches_tag() {
        let a = Action::Click { selector: "#go".into() };
        assert_eq!(a.kind(), "click");
    }
}
