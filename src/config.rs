//! Checker configuration: where track files live and how strict validation
//! should be. Read from an optional TOML file; command-line flags override.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::validate::ValidateOptions;

pub const TRACK_EXTENSION: &str = "tsm";
const TRACKS_DIR_NAME: &str = "Tracks";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckerConfig {
    /// Directory bare track names resolve against. Defaults to a `Tracks`
    /// directory next to the executable.
    pub tracks_root: Option<PathBuf>,
    pub strict_connectivity: bool,
    pub require_safe_zone: bool,
    pub require_intersection: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config `{}`", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl CheckerConfig {
    pub fn load(path: &Path) -> Result<CheckerConfig, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_owned(), source })?;
        toml::from_str(&text).map_err(|source| ConfigError::Toml { path: path.to_owned(), source })
    }

    pub fn validate_options(&self) -> ValidateOptions {
        ValidateOptions {
            unreachable_is_error: self.strict_connectivity,
            require_safe_zone: self.require_safe_zone,
            require_intersection: self.require_intersection,
        }
    }

    pub fn tracks_root(&self) -> PathBuf {
        self.tracks_root.clone().unwrap_or_else(default_tracks_root)
    }
}

/// A `Tracks` directory next to the running executable, falling back to the
/// working directory when the executable path is unavailable.
pub fn default_tracks_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_owned))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(TRACKS_DIR_NAME)
}

/// Bare names resolve to `<tracks_root>/<name>.tsm`; anything containing a
/// path separator is used verbatim.
pub fn resolve_track_path(tracks_root: &Path, name: &str) -> PathBuf {
    if name.contains(['/', '\\']) {
        return PathBuf::from(name);
    }
    let mut path = tracks_root.join(name);
    if path.extension().is_none() {
        path.set_extension(TRACK_EXTENSION);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_names_resolve_into_the_tracks_root() {
        let root = Path::new("/maps");
        assert_eq!(resolve_track_path(root, "loop_a"), PathBuf::from("/maps/loop_a.tsm"));
        assert_eq!(resolve_track_path(root, "loop_a.tsm"), PathBuf::from("/maps/loop_a.tsm"));
    }

    #[test]
    fn paths_with_separators_are_verbatim() {
        let root = Path::new("/maps");
        assert_eq!(resolve_track_path(root, "sub/dir.tsm"), PathBuf::from("sub/dir.tsm"));
        assert_eq!(resolve_track_path(root, "./local"), PathBuf::from("./local"));
    }

    #[test]
    fn config_parses_and_maps_to_options() {
        let config: CheckerConfig = toml::from_str(
            "tracks_root = \"/data/tracks\"\nstrict_connectivity = true\nrequire_safe_zone = true\n",
        )
        .unwrap();
        assert_eq!(config.tracks_root(), PathBuf::from("/data/tracks"));
        let options = config.validate_options();
        assert!(options.unreachable_is_error);
        assert!(options.require_safe_zone);
        assert!(!options.require_intersection);
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        assert!(toml::from_str::<CheckerConfig>("tracks_rot = \"typo\"\n").is_err());
    }
}
