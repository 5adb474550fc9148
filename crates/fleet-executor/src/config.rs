//! Validation bounds and history sizing, per spec.md §4.5.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub max_selector_len: usize,
    pub max_text_len: usize,
    pub coordinate_max: i64,
    pub max_drag_steps: u32,
    pub max_scroll_delta: i64,
    pub max_upload_bytes: u64,
    pub allowed_upload_mime_types: Vec<String>,
    pub allowed_url_schemes: Vec<String>,
    pub min_timeout: Duration,
    pub max_timeout: Duration,
    pub default_timeout: Duration,
    pub history_capacity: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_selector_len: 1000,
            max_text_len: 10_000,
            coordinate_max: 10_000,
            max_drag_steps: 100,
            max_scroll_delta: 1000,
            max_upload_bytes: 50 * 1024 * 1024,
            allowed_upload_mime_types: vec![
                "image/png".into(),
                "image/jpeg".into(),
                "image/webp".into(),
                "application/pdf".into(),
                "text/plain".into(),
                "application/json".into(),
            ],
            allowed_url_schemes: vec!["http".into(), "https".into(), "about".into(), "data".into()],
            min_timeout: Duration::from_millis(100),
            max_timeout: Duration::from_secs(120),
            default_timeout: Duration::from_secs(30),
            history_capacity: 1000,
        }
    }
}
