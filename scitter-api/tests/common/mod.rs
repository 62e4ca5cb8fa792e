use std::sync::OnceLock;

use scitter_common::observability::{LogConfig, LogFormat, init_logging};
use serde_json::{Value, json};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "scitter-tests".to_string(),
            emit_stderr: true,
            format: if std::env::var("SCITTER_LOG_FORMAT")
                .map(|raw| raw.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false)
            {
                LogFormat::Json
            } else {
                LogFormat::Text
            },
            default_filter: "debug".to_string(),
            log_dir: Some(std::env::temp_dir().join("scitter-tests")),
        };

        init_logging(config).unwrap_or_default()
    });
}

/// A status payload shaped like the service's, extra fields included.
pub fn status_json(id: u64, screen_name: &str, text: &str) -> Value {
    json!({
        "id": id,
        "text": text,
        "created_at": "Wed Aug 27 13:08:45 +0000 2008",
        "source": "web",
        "truncated": false,
        "favorited": false,
        "in_reply_to_status_id": null,
        "geo": null,
        "user": {
            "id": id * 10,
            "screen_name": screen_name,
            "name": screen_name.to_uppercase(),
            "followers_count": 12,
            "profile_image_url": "http://example.com/a.png"
        }
    })
}

pub fn timeline_json(n: u64) -> Value {
    Value::Array(
        (0..n)
            .map(|i| status_json(100 - i, &format!("friend{i}"), &format!("status number {i}")))
            .collect(),
    )
}
