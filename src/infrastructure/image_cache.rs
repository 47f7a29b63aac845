//! On-disk card image cache
//!
//! Each card maps to one deterministic path under `<root>/<set_id>/`. An
//! existing file is a cache hit and is never refetched or overwritten. New
//! downloads are written to a hidden temporary file and renamed into place,
//! so an interrupted write is never mistaken for a hit.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use super::config::utils::resolve_url;
use super::page_source::PageSource;

/// Extensions probed for an existing entry, default first
pub const CACHED_EXTENSIONS: &[&str] = &["jpg", "png", "webp", "gif"];

const DEFAULT_EXTENSION: &str = "jpg";
const TEMP_SUFFIX: &str = "part";

/// Result of materializing one card image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// Already on disk, no network access
    Hit(PathBuf),
    /// Downloaded and written during this call
    Fetched(PathBuf),
    /// The asset could not be materialized; only this card is affected
    Unavailable { cause: String },
}

impl ImageOutcome {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Hit(path) | Self::Fetched(path) => Some(path),
            Self::Unavailable { .. } => None,
        }
    }
}

/// Digits of the card number before its first `/` (`"045/102"` -> `"045"`)
#[must_use]
pub fn clean_number(number: &str) -> String {
    number
        .split('/')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_digit)
        .collect()
}

/// Card name without non-ASCII characters, spaces or path separators
#[must_use]
pub fn clean_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii() && *c != ' ' && *c != '/' && *c != '\\')
        .collect()
}

/// File extension for an image `Content-Type`, `jpg` when unknown
#[must_use]
pub fn extension_for(content_type: Option<&str>) -> &'static str {
    let mime = content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase());
    match mime.as_deref() {
        Some("image/png") => "png",
        Some("image/webp") => "webp",
        Some("image/gif") => "gif",
        _ => DEFAULT_EXTENSION,
    }
}

/// Filesystem-backed image cache rooted at a directory
#[derive(Debug, Clone)]
pub struct ImageCache {
    root: PathBuf,
    base_url: String,
}

impl ImageCache {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    /// `<root>/<set_id>/<cleanNumber>_<cleanName>.jpg`; pure and deterministic
    #[must_use]
    pub fn cache_path(&self, set_id: &str, number: &str, name: &str) -> PathBuf {
        self.path_with_extension(set_id, number, name, DEFAULT_EXTENSION)
    }

    fn path_with_extension(&self, set_id: &str, number: &str, name: &str, extension: &str) -> PathBuf {
        self.root
            .join(set_id)
            .join(format!("{}_{}.{}", clean_number(number), clean_name(name), extension))
    }

    /// Existing entry for the card under any of the cached extensions
    pub async fn find_cached(&self, set_id: &str, number: &str, name: &str) -> Option<PathBuf> {
        for extension in CACHED_EXTENSIONS {
            let candidate = self.path_with_extension(set_id, number, name, extension);
            if fs::try_exists(&candidate).await.unwrap_or(false) {
                return Some(candidate);
            }
        }
        None
    }

    /// Make the card image available locally; never fails the caller
    pub async fn materialize<S>(
        &self,
        source: &S,
        image_url: Option<&str>,
        set_id: &str,
        number: &str,
        name: &str,
    ) -> ImageOutcome
    where
        S: PageSource + ?Sized,
    {
        if let Some(path) = self.find_cached(set_id, number, name).await {
            debug!("✓ Image cache hit for {} {}: {}", number, name, path.display());
            return ImageOutcome::Hit(path);
        }

        let Some(raw_url) = image_url.map(str::trim).filter(|url| !url.is_empty()) else {
            return ImageOutcome::Unavailable {
                cause: "no image URL".to_string(),
            };
        };
        let Some(url) = resolve_url(&self.base_url, raw_url) else {
            return ImageOutcome::Unavailable {
                cause: format!("unresolvable image URL '{raw_url}'"),
            };
        };

        let asset = match source.fetch_asset(&url).await {
            Ok(asset) => asset,
            Err(e) => {
                warn!("✗ Image download failed for {} {}: {}", number, name, e);
                return ImageOutcome::Unavailable { cause: e.to_string() };
            }
        };

        let extension = extension_for(asset.content_type.as_deref());
        let path = self.path_with_extension(set_id, number, name, extension);
        match write_atomically(&path, &asset.bytes).await {
            Ok(()) => {
                info!("✓ Downloaded image for {} {} ({} bytes)", number, name, asset.bytes.len());
                ImageOutcome::Fetched(path)
            }
            Err(e) => {
                warn!("✗ Could not store image {}: {}", path.display(), e);
                ImageOutcome::Unavailable {
                    cause: format!("write {} failed: {}", path.display(), e),
                }
            }
        }
    }
}

/// Write to a hidden sibling temp file, then rename onto `path`
async fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).await?;

    let file_name = path.file_name().and_then(|name| name.to_str()).unwrap_or("image");
    let temp_path = parent.join(format!(".{}.{:08x}.{}", file_name, fastrand::u32(..), TEMP_SUFFIX));

    if let Err(e) = fs::write(&temp_path, bytes).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }
    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::fetch_error::{FetchError, FetchResult};
    use crate::infrastructure::page_source::FetchedAsset;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingSource {
        requests: Mutex<Vec<String>>,
        content_type: Option<String>,
        fail: bool,
    }

    impl RecordingSource {
        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageSource for RecordingSource {
        async fn fetch_text(&self, url: &str) -> FetchResult<String> {
            self.requests.lock().unwrap().push(url.to_string());
            Ok(String::new())
        }

        async fn fetch_asset(&self, url: &str) -> FetchResult<FetchedAsset> {
            self.requests.lock().unwrap().push(url.to_string());
            if self.fail {
                return Err(FetchError::Status {
                    status: 404,
                    url: url.to_string(),
                    retry_after_seconds: None,
                });
            }
            Ok(FetchedAsset {
                bytes: b"\xFF\xD8image".to_vec(),
                content_type: self.content_type.clone(),
            })
        }
    }

    fn cache(dir: &TempDir) -> ImageCache {
        ImageCache::new(dir.path(), "https://www.serebii.net")
    }

    #[test]
    fn pikachu_path_basename() {
        let cache = ImageCache::new("/cache", "https://www.serebii.net");
        let path = cache.cache_path("base1", "045/102", "Pikachu");
        assert_eq!(path.file_name().unwrap(), "045_Pikachu.jpg");
        assert_eq!(path.parent().unwrap(), Path::new("/cache/base1"));
    }

    #[test]
    fn names_lose_spaces_and_non_ascii() {
        assert_eq!(clean_name("Flabébé ex"), "Flabbex");
        assert_eq!(clean_name("Team Rocket's Mewtwo"), "TeamRocket'sMewtwo");
        assert_eq!(clean_number("H12"), "12");
        assert_eq!(clean_number("SV 045 / 190"), "045");
    }

    #[test]
    fn extension_follows_content_type() {
        assert_eq!(extension_for(Some("image/png")), "png");
        assert_eq!(extension_for(Some("image/webp; charset=binary")), "webp");
        assert_eq!(extension_for(Some("IMAGE/GIF")), "gif");
        assert_eq!(extension_for(Some("image/jpeg")), "jpg");
        assert_eq!(extension_for(None), "jpg");
    }

    #[tokio::test]
    async fn second_run_is_a_hit_without_network() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        let source = RecordingSource::default();

        let first = cache
            .materialize(&source, Some("/card/base1/045.jpg"), "base1", "045/102", "Pikachu")
            .await;
        assert!(matches!(first, ImageOutcome::Fetched(_)));
        assert_eq!(source.requests(), vec!["https://www.serebii.net/card/base1/045.jpg".to_string()]);

        let second_source = RecordingSource::default();
        let second = cache
            .materialize(&second_source, Some("/card/base1/045.jpg"), "base1", "045/102", "Pikachu")
            .await;
        assert!(second_source.requests().is_empty());
        assert_eq!(second, ImageOutcome::Hit(first.path().unwrap().to_path_buf()));
    }

    #[tokio::test]
    async fn png_content_keeps_png_extension_and_is_found_again() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        let source = RecordingSource {
            content_type: Some("image/png".to_string()),
            ..RecordingSource::default()
        };

        let outcome = cache
            .materialize(&source, Some("https://img.example/x.png"), "s", "1/10", "Eevee")
            .await;
        let path = outcome.path().unwrap().to_path_buf();
        assert_eq!(path.file_name().unwrap(), "1_Eevee.png");
        assert_eq!(cache.find_cached("s", "1/10", "Eevee").await, Some(path));
    }

    #[tokio::test]
    async fn failed_download_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        let source = RecordingSource {
            fail: true,
            ..RecordingSource::default()
        };

        let outcome = cache
            .materialize(&source, Some("/card/base1/045.jpg"), "base1", "045/102", "Pikachu")
            .await;
        assert!(matches!(outcome, ImageOutcome::Unavailable { .. }));
        assert_eq!(cache.find_cached("base1", "045/102", "Pikachu").await, None);
    }

    #[tokio::test]
    async fn unwritable_set_directory_marks_image_unavailable() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        std::fs::write(dir.path().join("base1"), b"not a directory").unwrap();
        let source = RecordingSource::default();

        let outcome = cache
            .materialize(&source, Some("/card/base1/045.jpg"), "base1", "045/102", "Pikachu")
            .await;

        match outcome {
            ImageOutcome::Unavailable { cause } => assert!(cause.contains("045_Pikachu.jpg"), "{cause}"),
            other => panic!("expected unavailable image, got {other:?}"),
        }
        assert_eq!(source.requests().len(), 1);
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(TEMP_SUFFIX))
            .collect();
        assert!(leftovers.is_empty(), "{leftovers:?}");
        assert_eq!(std::fs::read(dir.path().join("base1")).unwrap(), b"not a directory");
    }

    #[tokio::test]
    async fn missing_url_is_unavailable_but_existing_file_still_hits() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        let source = RecordingSource::default();

        let outcome = cache.materialize(&source, None, "base1", "7/102", "Squirtle").await;
        assert!(matches!(outcome, ImageOutcome::Unavailable { .. }));

        let path = cache.cache_path("base1", "7/102", "Squirtle");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"cached").unwrap();
        let outcome = cache.materialize(&source, None, "base1", "7/102", "Squirtle").await;
        assert_eq!(outcome, ImageOutcome::Hit(path));
        assert!(source.requests().is_empty());
    }

    #[tokio::test]
    async fn temp_files_are_not_hits() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        let set_dir = dir.path().join("base1");
        std::fs::create_dir_all(&set_dir).unwrap();
        std::fs::write(set_dir.join(".045_Pikachu.jpg.0000abcd.part"), b"partial").unwrap();
        assert_eq!(cache.find_cached("base1", "045/102", "Pikachu").await, None);
    }

    proptest! {
        #[test]
        fn cache_path_is_deterministic(set in "[a-z0-9]{1,12}", number in "[0-9A-Z /]{0,10}", name in "\\PC{0,16}") {
            let cache = ImageCache::new("/cache", "https://www.serebii.net");
            let first = cache.cache_path(&set, &number, &name);
            let second = cache.cache_path(&set, &number, &name);
            prop_assert_eq!(&first, &second);
            prop_assert!(first.starts_with(Path::new("/cache").join(&set)));
            let file_name = first.file_name().unwrap().to_string_lossy().to_string();
            prop_assert!(file_name.ends_with(".jpg"));
            prop_assert!(!file_name.contains(' '));
        }
    }
}
