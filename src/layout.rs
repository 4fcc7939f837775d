//! On-disk layout of a downloaded series and the naming rules behind it.
//!
//! ```text
//! <output>/<series>/
//!   Images/chapter-<N>/001.jpg ...
//!   Chapters/chapter-<N>.pdf
//! ```
//!
//! `<N>` is the chapter designation exactly as supplied, so fractional
//! chapters (`30.5`) keep their form. Page files are zero-padded so that a
//! lexical directory listing reproduces page order.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::resolver::utils::compile_static_regex;

/// Name used when sanitizing leaves nothing usable.
pub const FALLBACK_SERIES_NAME: &str = "series";

/// Label used for a single chapter whose URL carries no chapter number.
pub const FALLBACK_CHAPTER_LABEL: &str = "custom";

/// Extension used for pages whose URL has no recognized image extension.
const DEFAULT_PAGE_EXTENSION: &str = ".jpg";

/// Extensions kept verbatim (lowercased) for page files.
const KEPT_PAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];

/// Image URL path suffixes that are never page content.
const IGNORED_IMAGE_EXTENSIONS: [&str; 2] = [".svg", ".ico"];

/// Minimum width of the zero-padded page number.
const MIN_PAGE_DIGITS: usize = 3;

static UNSAFE_NAME_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"[^A-Za-z0-9 _-]+"));

static CHAPTER_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"(?i)(?:^|/)(?:chapter|chap|ch)[-_/]?(\d+(?:\.\d+)?)(?:/|$)")
});

/// Directory structure for one series under an output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesLayout {
    root: PathBuf,
}

impl SeriesLayout {
    /// Creates the layout for `series_name` under `output_dir`.
    ///
    /// The name is used as-is; sanitize it first with [`sanitize_name`].
    #[must_use]
    pub fn new(output_dir: impl AsRef<Path>, series_name: &str) -> Self {
        Self {
            root: output_dir.as_ref().join(series_name),
        }
    }

    /// Series directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parent of every chapter's raw page directory.
    #[must_use]
    pub fn images_dir(&self) -> PathBuf {
        self.root.join("Images")
    }

    /// Directory holding assembled chapter documents.
    #[must_use]
    pub fn chapters_dir(&self) -> PathBuf {
        self.root.join("Chapters")
    }

    /// Raw page directory for one chapter.
    #[must_use]
    pub fn chapter_image_dir(&self, chapter_number: &str) -> PathBuf {
        self.images_dir().join(format!("chapter-{chapter_number}"))
    }

    /// Document path for one chapter with the given extension (no dot).
    #[must_use]
    pub fn chapter_document(&self, chapter_number: &str, extension: &str) -> PathBuf {
        self.chapters_dir()
            .join(format!("chapter-{chapter_number}.{extension}"))
    }

    /// Creates `Images/` and `Chapters/`.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error if a directory cannot be created.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.images_dir())?;
        std::fs::create_dir_all(self.chapters_dir())
    }
}

/// Makes a user- or URL-supplied name safe to use as a directory name.
///
/// Each run of characters outside `[A-Za-z0-9 _-]` becomes one `_`; the
/// result is trimmed and falls back to `series` when empty.
#[must_use]
pub fn sanitize_name(raw: &str) -> String {
    let replaced = UNSAFE_NAME_CHARS_RE.replace_all(raw, "_");
    let trimmed = replaced.trim();
    if trimmed.is_empty() {
        FALLBACK_SERIES_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Derives a series directory name from the last non-empty path segment of a URL.
#[must_use]
pub fn derive_series_name(series_url: &str) -> String {
    let last_segment = match Url::parse(series_url) {
        Ok(url) => url
            .path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()).map(str::to_string)),
        Err(_) => series_url
            .split('/')
            .rfind(|s| !s.is_empty())
            .map(str::to_string),
    };
    sanitize_name(last_segment.as_deref().unwrap_or_default())
}

/// Extracts the chapter designation from a chapter URL.
///
/// Matches `chapter-12`, `chap_3`, `ch/7`, `chapter-30.5`, case-insensitively.
/// Returns `custom` when no designation is present.
#[must_use]
pub fn chapter_label_from_url(chapter_url: &str) -> String {
    let path = Url::parse(chapter_url)
        .map(|url| url.path().to_string())
        .unwrap_or_else(|_| chapter_url.to_string());
    CHAPTER_NUMBER_RE
        .captures(&path)
        .and_then(|caps| caps.get(1))
        .map_or_else(
            || FALLBACK_CHAPTER_LABEL.to_string(),
            |m| m.as_str().to_string(),
        )
}

/// File name for the page at zero-based `index` of a `total`-page chapter.
///
/// ```
/// use omegadl_core::layout::page_file_name;
///
/// assert_eq!(page_file_name(0, 12, "https://cdn.example.com/a.PNG"), "001.png");
/// assert_eq!(page_file_name(41, 1200, "https://cdn.example.com/b"), "0042.jpg");
/// ```
#[must_use]
pub fn page_file_name(index: usize, total: usize, url: &str) -> String {
    let width = total.to_string().len().max(MIN_PAGE_DIGITS);
    format!("{:0width$}{}", index + 1, page_extension(url))
}

fn page_extension(url: &str) -> String {
    let path = url_path(url).to_ascii_lowercase();
    let file = path.rsplit('/').next().unwrap_or_default();
    file.rfind('.')
        .map(|dot| &file[dot..])
        .filter(|ext| KEPT_PAGE_EXTENSIONS.contains(ext))
        .unwrap_or(DEFAULT_PAGE_EXTENSION)
        .to_string()
}

fn url_path(url: &str) -> String {
    Url::parse(url).map_or_else(|_| url.to_string(), |u| u.path().to_string())
}

/// Returns true for absolute `http(s)` URLs that are not icons or vector art.
#[must_use]
pub fn is_valid_image_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    let path = parsed.path().to_ascii_lowercase();
    !IGNORED_IMAGE_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(ext))
}
