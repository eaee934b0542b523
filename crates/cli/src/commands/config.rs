use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use toml::Value;
use wattson_core::config::{AppConfig, LoadOptions};

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    let mut push = |key_path: &str, value: &str, env_key: &str| {
        lines.push(render_line(
            key_path,
            value,
            field_source(key_path, Some(env_key), config_file_doc.as_ref(), config_file_path.as_deref()),
        ));
    };

    push("database.url", &config.database.url, "WATTSON_DATABASE_URL");
    push(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        "WATTSON_DATABASE_MAX_CONNECTIONS",
    );
    push(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        "WATTSON_DATABASE_TIMEOUT_SECS",
    );

    push(
        "completion.provider",
        &format!("{:?}", config.completion.provider),
        "WATTSON_COMPLETION_PROVIDER",
    );
    push("completion.model", &config.completion.model, "WATTSON_COMPLETION_MODEL");
    push(
        "completion.base_url",
        config.completion.base_url.as_deref().unwrap_or("<unset>"),
        "WATTSON_COMPLETION_BASE_URL",
    );
    let api_key = if config.completion.api_key.is_some() { "<redacted>" } else { "<unset>" };
    push("completion.api_key", api_key, "WATTSON_COMPLETION_API_KEY");

    push(
        "session.idle_ttl_secs",
        &config.session.idle_ttl_secs.to_string(),
        "WATTSON_SESSION_IDLE_TTL_SECS",
    );
    push(
        "session.max_history_pairs",
        &config.session.max_history_pairs.to_string(),
        "WATTSON_SESSION_MAX_HISTORY_PAIRS",
    );
    push(
        "session.max_action_iterations",
        &config.session.max_action_iterations.to_string(),
        "WATTSON_SESSION_MAX_ACTION_ITERATIONS",
    );

    push("server.bind_address", &config.server.bind_address, "WATTSON_SERVER_BIND_ADDRESS");
    push("server.port", &config.server.port.to_string(), "WATTSON_SERVER_PORT");
    push(
        "server.health_check_port",
        &config.server.health_check_port.to_string(),
        "WATTSON_SERVER_HEALTH_CHECK_PORT",
    );

    push("logging.level", &config.logging.level, "WATTSON_LOGGING_LEVEL");
    push("logging.format", &format!("{:?}", config.logging.format), "WATTSON_LOGGING_FORMAT");

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("wattson.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/wattson.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
