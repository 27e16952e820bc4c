//! Path prefix rewriting
//!
//! Strips a configured prefix from request paths so that an application
//! mounted under e.g. `/static` resolves files relative to the web root.

/// Prefix stripping rule, fixed at startup
#[derive(Debug, Clone, Default)]
pub struct PathRewrite {
    prefix: Option<String>,
}

impl PathRewrite {
    /// Build a rewrite rule; an absent, empty or `"/"` prefix disables it
    pub fn new(prefix: Option<&str>) -> Self {
        let prefix = prefix
            .filter(|p| !p.is_empty() && *p != "/")
            .map(ToString::to_string);
        Self { prefix }
    }

    pub const fn is_enabled(&self) -> bool {
        self.prefix.is_some()
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Remove one leading occurrence of the prefix
    ///
    /// Comparison is on raw bytes with no segment boundary check, so
    /// `/staticfoo` under prefix `/static` becomes `foo`.
    pub fn rewrite<'a>(&self, path: &'a str) -> &'a str {
        let Some(prefix) = self.prefix.as_deref() else {
            return path;
        };

        match path.strip_prefix(prefix) {
            Some(stripped) if stripped.len() < path.len() => stripped,
            _ => path,
        }
    }
}
