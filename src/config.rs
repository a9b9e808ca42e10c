use std::path::Path;

use crate::error::Error;

/// Project configuration loaded from `.docmove.toml`.
/// Include/exclude patterns are path prefixes applied to markdown files
/// before extraction; excluded files are neither scanned nor patched.
pub struct Config {
    exclude: Vec<String>,
    include: Vec<String>,
}

/// Raw TOML structure for `.docmove.toml`.
#[derive(serde::Deserialize)]
struct DocmoveTomlConfig {
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    include: Vec<String>,
}

impl Config {
    /// Load config from `.docmove.toml` in the given root directory.
    /// Returns a default that scans everything if the file doesn't exist.
    /// Returns an error if the file exists but is malformed — never silently
    /// falls back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(".docmove.toml");
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::scan_everything_by_default());
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let raw: DocmoveTomlConfig = toml::from_str(&content)?;
        Ok(Self {
            exclude: raw.exclude,
            include: raw.include,
        })
    }

    /// Default config that includes everything and excludes nothing.
    fn scan_everything_by_default() -> Self {
        Self {
            exclude: Vec::new(),
            include: Vec::new(),
        }
    }

    /// Check whether a markdown file path should be scanned.
    ///
    /// A path is included if no include patterns are set (scan everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        !self.exclude.iter().any(|p| relative_path.starts_with(p.as_str()))
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_scans_everything() {
        let config = Config::scan_everything_by_default();
        assert!(config.should_scan("docs/guide.md"));
        assert!(config.should_scan("README.md"));
    }

    #[test]
    fn exclude_prefix_wins_over_include() {
        let config = Config {
            exclude: vec!["docs/archive/".to_string()],
            include: vec!["docs/".to_string()],
        };
        assert!(config.should_scan("docs/guide.md"));
        assert!(!config.should_scan("docs/archive/old.md"));
        assert!(!config.should_scan("README.md"));
    }
}
