//! Video library and pop-up text sources

use crate::constants::{APP_DIR_NAME, CUSTOM_VIDEO_DIR_NAME, DEFAULT_VIDEO_DIR_NAME, VIDEO_EXTENSIONS};
use crate::settings::Settings;
use anyhow::{Context, Result};
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};

/// Ordered set of playable videos from one folder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoLibrary {
    videos: Vec<PathBuf>,
}

impl VideoLibrary {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a library from already-resolved paths, keeping supported ones
    pub fn from_paths<I: IntoIterator<Item = PathBuf>>(paths: I) -> Self {
        let mut videos: Vec<PathBuf> = paths.into_iter().filter(|p| is_supported_video(p)).collect();
        videos.sort();
        videos.dedup();
        Self { videos }
    }

    /// Collect the supported files directly inside `dir`
    ///
    /// Sub-directories are not traversed.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder does not exist or cannot be listed. An
    /// existing folder without videos yields an empty library.
    pub fn scan(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            anyhow::bail!("Video folder '{}' does not exist.", dir.display());
        }

        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to list video folder: {}", dir.display()))?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| format!("Failed to read entry in {}", dir.display()))?;
            let path = entry.path();
            if path.is_file() {
                paths.push(path);
            } else {
                debug!("Skipping non-file entry: {}", path.display());
            }
        }

        let library = Self::from_paths(paths);
        info!("Found {} videos in {}", library.len(), dir.display());
        Ok(library)
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn videos(&self) -> &[PathBuf] {
        &self.videos
    }

    /// Uniformly random video, None for an empty library
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Path> {
        self.videos.choose(rng).map(PathBuf::as_path)
    }
}

/// True if the file extension is one of the supported video formats
pub fn is_supported_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Locations of the bundled and custom video folders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDirs {
    pub default_dir: PathBuf,
    pub custom_dir: PathBuf,
}

impl VideoDirs {
    /// Folders under the platform data directory
    ///
    /// - Linux: `~/.local/share/vidlock/{videos,custom_videos}`
    /// - macOS: `~/Library/Application Support/vidlock/{videos,custom_videos}`
    pub fn standard() -> Result<Self> {
        let base = dirs::data_dir()
            .context("Failed to determine data directory")?
            .join(APP_DIR_NAME);
        Ok(Self::under(&base))
    }

    /// Both folders inside `base`
    pub fn under(base: &Path) -> Self {
        Self {
            default_dir: base.join(DEFAULT_VIDEO_DIR_NAME),
            custom_dir: base.join(CUSTOM_VIDEO_DIR_NAME),
        }
    }

    /// Folder selected by the settings
    pub fn select(&self, settings: &Settings) -> &Path {
        if settings.use_default_videos {
            &self.default_dir
        } else {
            &self.custom_dir
        }
    }
}

/// Read pop-up phrases, one per line, whitespace stripped, blank lines dropped
pub fn load_popup_texts(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read pop-up text file: {}", path.display()))?;

    let phrases: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    info!("Loaded {} pop-up phrases from {}", phrases.len(), path.display());
    Ok(phrases)
}
