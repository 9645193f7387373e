//! Media path resolution
//!
//! Theme files and hosts refer to media by short paths. `~` and environment
//! variables are expanded, and relative paths are looked up under the media
//! root (optionally inside the per-title folder).

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathResolver {
    media_root: Option<PathBuf>,
    title_folder: Option<String>,
}

impl PathResolver {
    pub fn new(media_root: Option<PathBuf>) -> Self {
        Self {
            media_root,
            title_folder: None,
        }
    }

    pub fn with_title_folder(mut self, folder: impl Into<String>) -> Self {
        let folder = folder.into();
        self.title_folder = (!folder.is_empty()).then_some(folder);
        self
    }

    pub fn media_root(&self) -> Option<&Path> {
        self.media_root.as_deref()
    }

    /// Directory relative paths are resolved against
    pub fn base_dir(&self) -> Option<PathBuf> {
        let root = self.media_root.as_ref()?;
        Some(match &self.title_folder {
            Some(folder) => root.join(folder),
            None => root.clone(),
        })
    }

    /// Expand and anchor `raw`; an empty string stays empty
    pub fn resolve(&self, raw: &str) -> PathBuf {
        if raw.is_empty() {
            return PathBuf::new();
        }

        let expanded = match shellexpand::full(raw) {
            Ok(expanded) => expanded.into_owned(),
            Err(e) => {
                log::warn!("Failed to expand {}: {}", raw, e);
                shellexpand::tilde(raw).into_owned()
            }
        };

        let path = PathBuf::from(expanded);
        if path.is_absolute() {
            return path;
        }

        match self.base_dir() {
            Some(base) => base.join(path),
            None => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stays_empty() {
        let resolver = PathResolver::new(Some(PathBuf::from("/media")));
        assert_eq!(resolver.resolve(""), PathBuf::new());
    }

    #[test]
    fn test_absolute_path_untouched() {
        let resolver = PathResolver::new(Some(PathBuf::from("/media")));
        assert_eq!(
            resolver.resolve("/videos/a.mp4"),
            PathBuf::from("/videos/a.mp4")
        );
    }

    #[test]
    fn test_relative_joined_to_root() {
        let resolver = PathResolver::new(Some(PathBuf::from("/media")));
        assert_eq!(
            resolver.resolve("clips/a.mp4"),
            PathBuf::from("/media/clips/a.mp4")
        );

        let resolver = resolver.with_title_folder("videos");
        assert_eq!(
            resolver.resolve("a.mp4"),
            PathBuf::from("/media/videos/a.mp4")
        );
    }

    #[test]
    fn test_relative_without_root() {
        let resolver = PathResolver::default();
        assert_eq!(resolver.resolve("a.mp4"), PathBuf::from("a.mp4"));
        assert!(resolver.base_dir().is_none());
    }

    #[test]
    fn test_tilde_expansion() {
        let resolver = PathResolver::default();
        let resolved = resolver.resolve("~/clip.mp4");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(resolved, home.join("clip.mp4"));
        }
    }

    #[test]
    fn test_unknown_variable_kept() {
        let resolver = PathResolver::new(Some(PathBuf::from("/media")));
        let resolved = resolver.resolve("$VIDWIDGET_SURELY_UNSET_VAR/a.mp4");
        assert!(resolved.ends_with("a.mp4"));
    }
}
