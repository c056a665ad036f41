//! Textual environment-variable expansion for telemetry configuration files
//!
//! Expansion happens on the raw file contents before YAML parsing, so values
//! such as endpoints and headers can be supplied at deploy time:
//!
//! ```yaml
//! endpoint: ${OTEL_EXPORTER_OTLP_ENDPOINT:-http://localhost:4318}
//! ```
//!
//! Supported forms are `${NAME}`, `${NAME:-default}` and `$NAME`. Unset
//! variables expand to the empty string (or to the default). `$$` is a
//! literal dollar sign.

use std::sync::OnceLock;

use regex::{Captures, Regex};

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$(?:(\$)|\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}|([A-Za-z_][A-Za-z0-9_]*))")
            .expect("environment expansion pattern is valid")
    })
}

/// Expand environment variables using the process environment
pub fn expand_env(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

/// Expand variables using an arbitrary lookup
pub fn expand_with<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    pattern()
        .replace_all(input, |caps: &Captures<'_>| {
            if caps.get(1).is_some() {
                return "$".to_string();
            }

            if let Some(name) = caps.get(2) {
                let value = lookup(name.as_str()).filter(|v| !v.is_empty());
                return match (value, caps.get(3)) {
                    (Some(value), _) => value,
                    (None, Some(default)) => default.as_str().to_string(),
                    (None, None) => String::new(),
                };
            }

            caps.get(4)
                .and_then(|name| lookup(name.as_str()))
                .unwrap_or_default()
        })
        .into_owned()
}
