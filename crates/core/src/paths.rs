use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathPolicy {
    pub separator: char,
    pub case_insensitive: bool,
}

impl PathPolicy {
    pub const fn windows() -> Self {
        Self {
            separator: '\\',
            case_insensitive: true,
        }
    }

    pub const fn unix() -> Self {
        Self {
            separator: '/',
            case_insensitive: false,
        }
    }

    pub const fn macos() -> Self {
        Self {
            separator: '/',
            case_insensitive: true,
        }
    }

    pub fn same_path(&self, a: &str, b: &str) -> bool {
        let (a, b) = (self.canonical_location(a), self.canonical_location(b));
        if self.case_insensitive {
            a.to_lowercase() == b.to_lowercase()
        } else {
            a == b
        }
    }

    pub fn key(&self, path: &str) -> String {
        let path = self.canonical_location(path);
        if self.case_insensitive {
            path.to_lowercase()
        } else {
            path.to_string()
        }
    }

    pub fn trim_location<'a>(&self, location: &'a str) -> &'a str {
        location.trim_end_matches(self.separator)
    }

    // `/data/` becomes `/data`, but `/` and `C:\` keep their separator.
    pub fn canonical_location<'a>(&self, location: &'a str) -> &'a str {
        let trimmed = self.trim_location(location);
        if trimmed.is_empty() || trimmed.ends_with(':') {
            let end = (trimmed.len() + self.separator.len_utf8()).min(location.len());
            return &location[..end];
        }
        trimmed
    }

    pub fn is_under(&self, path: &str, location: &str) -> bool {
        let location = self.trim_location(location);
        let (path, location) = if self.case_insensitive {
            (path.to_lowercase(), location.to_lowercase())
        } else {
            (path.to_string(), location.to_string())
        };

        if path == location {
            return true;
        }
        match path.strip_prefix(location.as_str()) {
            Some(rest) => rest.starts_with(self.separator),
            None => false,
        }
    }

    pub fn is_under_any(&self, path: &str, locations: &[String]) -> bool {
        locations
            .iter()
            .any(|location| self.is_under(path, location))
    }
}

impl Default for PathPolicy {
    fn default() -> Self {
        if cfg!(windows) {
            Self::windows()
        } else if cfg!(target_os = "macos") {
            Self::macos()
        } else {
            Self::unix()
        }
    }
}
