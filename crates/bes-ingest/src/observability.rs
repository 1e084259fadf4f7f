use once_cell::sync::OnceCell;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::config::parse_bool;

static INIT: OnceCell<()> = OnceCell::new();

fn observability_enabled(lookup: &impl Fn(&str) -> Option<String>) -> bool {
    lookup("BES_OBSERVABILITY_ENABLED")
        .map(|value| parse_bool(&value).unwrap_or(true))
        .unwrap_or(true)
}

fn resolve_env_filter(lookup: &impl Fn(&str) -> Option<String>) -> tracing_subscriber::EnvFilter {
    if let Some(level) = lookup("BES_LOG_LEVEL")
        && let Ok(filter) = tracing_subscriber::EnvFilter::try_new(level)
    {
        return filter;
    }
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

/// Initialize logging once per process.
///
/// Environment variables:
/// - `BES_OBSERVABILITY_ENABLED`: optional enable/disable flag (default enabled).
/// - `BES_LOG_LEVEL`: optional level/filter override (`info`, `debug`, `bes_ingest=trace`, ...).
/// - `BES_JSON_LOG_PATH`: optional log file path. If set, logs are JSONL in that file with
///   the session span attached to every line. If unset, logs go to stdout in compact form.
/// - `RUST_LOG`: filter used when `BES_LOG_LEVEL` is absent or invalid.
pub fn init_observability() {
    INIT.get_or_init(|| {
        let lookup = |key: &str| std::env::var(key).ok();
        if !observability_enabled(&lookup) {
            return;
        }

        let env_filter = resolve_env_filter(&lookup);
        if let Some(path_raw) = lookup("BES_JSON_LOG_PATH") {
            let path = std::path::PathBuf::from(path_raw);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                let _ = std::fs::create_dir_all(parent);
            }
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("bes.logs.jsonl");
            let writer = tracing_appender::rolling::never(dir, file_name);
            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_target(false)
                .with_writer(writer);
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(json_layer)
                .try_init();
        } else {
            let console_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stdout);
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .try_init();
        }
    });
}
