// Plain environment variables
// PORT, WEB_ROOT, APP_ROOT and NO_CACHE take priority over every other source

use std::collections::HashMap;

/// Values picked from the unprefixed deployment variables
#[derive(Debug, Default)]
pub(super) struct PlainOverrides {
    /// Kept as a string so an invalid port fails deserialization
    pub port: Option<String>,
    pub web_root: Option<String>,
    pub app_root: Option<String>,
    pub no_cache: Option<bool>,
}

impl PlainOverrides {
    pub(super) fn from_vars(vars: &HashMap<String, String>) -> Self {
        let non_empty = |name: &str| vars.get(name).filter(|v| !v.is_empty()).cloned();

        Self {
            port: non_empty("PORT"),
            web_root: non_empty("WEB_ROOT"),
            app_root: non_empty("APP_ROOT"),
            no_cache: non_empty("NO_CACHE").map(|raw| parse_env_bool(&raw, false)),
        }
    }
}

/// Parse a boolean flag, falling back to `default` on anything unrecognized
///
/// Accepts `1 t T TRUE true True` and `0 f F FALSE false False`.
pub fn parse_env_bool(raw: &str, default: bool) -> bool {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => true,
        "0" | "f" | "F" | "FALSE" | "false" | "False" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_bool() {
        for raw in ["1", "t", "T", "TRUE", "true", "True"] {
            assert!(parse_env_bool(raw, false), "{raw}");
        }
        for raw in ["0", "f", "F", "FALSE", "false", "False"] {
            assert!(!parse_env_bool(raw, true), "{raw}");
        }
        assert!(!parse_env_bool("yes", false));
        assert!(parse_env_bool("tRUE", true));
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let vars: HashMap<String, String> = [("PORT", ""), ("APP_ROOT", "/static")]
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let overrides = PlainOverrides::from_vars(&vars);
        assert_eq!(overrides.port, None);
        assert_eq!(overrides.app_root.as_deref(), Some("/static"));
        assert_eq!(overrides.no_cache, None);
    }
}
