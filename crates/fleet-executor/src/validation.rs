//! Pre-dispatch validation and selector sanitization.
//!
//! Grounded on the teacher's input-validation layer for handler parameters
//! (bounds-checked numeric ranges, allow-listed URL schemes) generalized here
//! across the full action taxonomy per spec.md §4.5.

use crate::config::ExecutorConfig;
use fleet_types::action::{Action, MouseOp};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: &'static str,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(ValidationIssue::new(field, message));
    }

    fn warn(&mut self, field: &'static str, message: impl Into<String>) {
        self.warnings.push(ValidationIssue::new(field, message));
    }
}

/// A forbidden-content check, not a full HTML parser: looks for the
/// injection shapes a selector has no legitimate reason to contain.
fn selector_is_safe(selector: &str) -> bool {
    let lower = selector.to_ascii_lowercase();
    !lower.contains("<script") && !lower.contains("javascript:") && !lower.contains("</")
}

/// Allow-lists HTML-attribute selector syntax, rejects anything that looks
/// like embedded script. Returns the selector unchanged on success — fleet
/// does not rewrite selectors, only refuses unsafe ones — so callers can
/// store the same value in `ActionResult` for auditability.
pub fn sanitize_selector(selector: &str, cfg: &ExecutorConfig) -> Result<String, ValidationIssue> {
    if selector.trim().is_empty() {
        return Err(ValidationIssue::new("selector", "selector must not be empty"));
    }
    if selector.len() > cfg.max_selector_len {
        return Err(ValidationIssue::new(
            "selector",
            format!("selector exceeds {} characters", cfg.max_selector_len),
        ));
    }
    if !selector_is_safe(selector) {
        return Err(ValidationIssue::new("selector", "selector contains disallowed script-like content"));
    }
    Ok(selector.to_string())
}

fn validate_selector_field(result: &mut ValidationResult, field: &'static str, selector: &str, cfg: &ExecutorConfig) {
    if let Err(issue) = sanitize_selector(selector, cfg) {
        result.error(field, issue.message);
    }
}

fn validate_optional_selector(result: &mut ValidationResult, field: &'static str, selector: &Option<String>, cfg: &ExecutorConfig) {
    if let Some(sel) = selector {
        validate_selector_field(result, field, sel, cfg);
    }
}

fn validate_coordinate(result: &mut ValidationResult, field: &'static str, value: i64, cfg: &ExecutorConfig) {
    if value < 0 || value > cfg.coordinate_max {
        result.error(field, format!("coordinate {value} out of range [0, {}]", cfg.coordinate_max));
    }
}

fn validate_timeout(result: &mut ValidationResult, timeout: Duration, cfg: &ExecutorConfig) {
    if timeout < cfg.min_timeout || timeout > cfg.max_timeout {
        result.error("timeout", format!("timeout {timeout:?} outside [{:?}, {:?}]", cfg.min_timeout, cfg.max_timeout));
    }
}

fn validate_url(result: &mut ValidationResult, url: &str, cfg: &ExecutorConfig) {
    match url::Url::parse(url) {
        Ok(parsed) => {
            if !cfg.allowed_url_schemes.iter().any(|s| s == parsed.scheme()) {
                result.error("url", format!("scheme '{}' is not permitted", parsed.scheme()));
            }
        }
        Err(e) => result.error("url", format!("url is not absolute: {e}")),
    }
}

fn validate_upload_path(result: &mut ValidationResult, path: &str, cfg: &ExecutorConfig) {
    let p = Path::new(path);
    if !p.is_absolute() {
        result.error("paths", format!("upload path '{path}' must be absolute"));
        return;
    }
    match std::fs::metadata(p) {
        Ok(meta) => {
            if !meta.is_file() {
                result.error("paths", format!("upload path '{path}' is not a regular file"));
            } else if meta.len() > cfg.max_upload_bytes {
                result.error("paths", format!("upload path '{path}' exceeds {} bytes", cfg.max_upload_bytes));
            }
            if let Some(guess) = mime_guess_from_path(p) {
                if !cfg.allowed_upload_mime_types.iter().any(|m| m == &guess) {
                    result.warn("paths", format!("mime type '{guess}' for '{path}' is not in the allow-list"));
                }
            }
        }
        Err(e) => result.error("paths", format!("upload path '{path}' is not readable: {e}")),
    }
}

fn mime_guess_from_path(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "json" => "application/json",
        _ => return None,
    };
    Some(mime.to_string())
}

/// Validates one action against the configured bounds. Never panics, never
/// touches the page — everything here is checkable offline.
pub fn validate(action: &Action, cfg: &ExecutorConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    match action {
        Action::Navigate { url, timeout } => {
            validate_url(&mut result, url, cfg);
            if let Some(t) = timeout {
                validate_timeout(&mut result, *t, cfg);
            }
        }
        Action::Click { selector } | Action::Hover { selector } | Action::Focus { selector } | Action::Blur { selector } => {
            validate_selector_field(&mut result, "selector", selector, cfg);
        }
        Action::Type { selector, text } => {
            validate_selector_field(&mut result, "selector", selector, cfg);
            if text.len() > cfg.max_text_len {
                result.error("text", format!("text exceeds {} characters", cfg.max_text_len));
            }
        }
        Action::Select { selector, value } => {
            validate_selector_field(&mut result, "selector", selector, cfg);
            if value.is_empty() {
                result.error("value", "select value must not be empty");
            }
        }
        Action::Keyboard { keys, .. } => {
            if keys.is_empty() {
                result.error("keys", "keys must not be empty");
            } else if keys.len() > cfg.max_text_len {
                result.error("keys", format!("keys exceeds {} characters", cfg.max_text_len));
            }
        }
        Action::Mouse { op, to, steps, delta, .. } => {
            validate_coordinate(&mut result, "to.x", to.x, cfg);
            validate_coordinate(&mut result, "to.y", to.y, cfg);
            if matches!(op, MouseOp::Drag) {
                match steps {
                    Some(s) if *s >= 1 && *s <= cfg.max_drag_steps => {}
                    Some(s) => result.error("steps", format!("drag steps {s} out of range [1, {}]", cfg.max_drag_steps)),
                    None => result.error("steps", "drag requires a step count"),
                }
            }
            if matches!(op, MouseOp::Scroll | MouseOp::Wheel) {
                match delta {
                    Some(d) if d.unsigned_abs() <= cfg.max_scroll_delta as u64 => {}
                    Some(d) => result.error("delta", format!("scroll delta {d} exceeds magnitude {}", cfg.max_scroll_delta)),
                    None => result.error("delta", "scroll/wheel requires a delta"),
                }
            }
        }
        Action::Screenshot { selector, .. } => {
            validate_optional_selector(&mut result, "selector", selector, cfg);
        }
        Action::Pdf => {}
        Action::Content { selector, .. } => {
            validate_optional_selector(&mut result, "selector", selector, cfg);
        }
        Action::Evaluate { script } => {
            if script.trim().is_empty() {
                result.error("script", "script must not be empty");
            }
        }
        Action::Upload { selector, paths } => {
            validate_selector_field(&mut result, "selector", selector, cfg);
            if paths.is_empty() {
                result.error("paths", "upload requires at least one path");
            }
            for path in paths {
                validate_upload_path(&mut result, path, cfg);
            }
        }
        Action::Download { trigger_selector, timeout } => {
            validate_selector_field(&mut result, "trigger_selector", trigger_selector, cfg);
            validate_timeout(&mut result, *timeout, cfg);
        }
        Action::Cookie { op, name, .. } => {
            use fleet_types::action::CookieOp;
            if matches!(op, CookieOp::Set | CookieOp::Delete) && name.as_deref().unwrap_or("").is_empty() {
                result.error("name", "cookie name is required for set/delete");
            }
        }
        Action::Wait { selector, timeout, .. } => {
            validate_optional_selector(&mut result, "selector", selector, cfg);
            validate_timeout(&mut result, *timeout, cfg);
        }
        Action::Scroll { selector, delta, .. } => {
            validate_optional_selector(&mut result, "selector", selector, cfg);
            if delta.x.unsigned_abs() > cfg.max_scroll_delta as u64 || delta.y.unsigned_abs() > cfg.max_scroll_delta as u64 {
                result.error("delta", format!("scroll delta exceeds magnitude {}", cfg.max_scroll_delta));
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_types::action::Point;

    fn cfg() -> ExecutorConfig {
        ExecutorConfig::default()
    }

    #[test]
    fn empty_selector_is_rejected() {
        let result = validate(&Action::Click { selector: String::new() }, &cfg());
        assert!(!result.is_valid());
    }

    #[test]
    fn script_tag_in_selector_is_rejected() {
        let result = validate(&Action::Click { selector: "<script>alert(1)</script>".into() }, &cfg());
        assert!(!result.is_valid());
    }

    #[test]
    fn non_http_navigate_scheme_is_rejected() {
        let result = validate(&Action::Navigate { url: "file:///etc/passwd".into(), timeout: None }, &cfg());
        assert!(!result.is_valid());
    }

    #[test]
    fn data_url_navigate_is_accepted() {
        let result = validate(&Action::Navigate { url: "data:text/plain,hello".into(), timeout: None }, &cfg());
        assert!(result.is_valid());
    }

    #[test]
    fn drag_without_steps_is_rejected() {
        let action = Action::Mouse {
            op: MouseOp::Drag,
            from: Some(Point { x: 0, y: 0 }),
            to: Point { x: 10, y: 10 },
            steps: None,
            delta: None,
        };
        assert!(!validate(&action, &cfg()).is_valid());
    }

    #[test]
    fn scroll_delta_over_magnitude_is_rejected() {
        let action = Action::Mouse { op: MouseOp::Scroll, from: None, to: Point::default(), steps: None, delta: Some(5000) };
        assert!(!validate(&action, &cfg()).is_valid());
    }

    #[test]
    fn sanitized_selector_round_trips_unchanged() {
        let sanitized = sanitize_selector("#submit-button", &cfg()).unwrap();
        assert_eq!(sanitized, "#submit-button");
    }

    #[test]
    fn text_over_length_cap_is_rejected() {
        let action = Action::Type { selector: "#box".into(), text: "a".repeat(20_000) };
        assert!(!validate(&action, &cfg()).is_valid());
    }
}
