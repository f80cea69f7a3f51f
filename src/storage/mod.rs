//! Review storage tree
//!
//! Screenshot images and drawover documents live on disk next to the database:
//!
//! ```text
//! {reviews_root}/{family}/{variant}/{version}/
//! ├── screenshots/
//! │   ├── 000_face_closeup.png
//! │   └── 001_hands_detail.png
//! └── drawovers/
//!     ├── 000_face_closeup.json    # vector strokes, same stem as the screenshot
//!     ├── 000_face_closeup.png     # rasterized cache (written by the UI)
//!     └── manifest.json
//! ```
//!
//! `family` is the sanitized asset name, or the asset id when the name is empty.

use anyhow::{anyhow, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const SCREENSHOTS_DIR: &str = "screenshots";
pub const DRAWOVERS_DIR: &str = "drawovers";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Drawover document format version
pub const DRAWOVER_FORMAT_VERSION: &str = "1.0";

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "bmp"];
const MAX_DISPLAY_NAME_LEN: usize = 100;
const DEFAULT_CANVAS_SIZE: [u32; 2] = [1920, 1080];

/// Where one asset version's review files live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewLocation {
    pub asset_id: String,
    pub asset_name: String,
    pub variant_name: String,
    pub version_label: String,
}

impl ReviewLocation {
    pub fn new(asset_id: &str, asset_name: &str, variant_name: &str, version_label: &str) -> Self {
        ReviewLocation {
            asset_id: asset_id.to_string(),
            asset_name: asset_name.to_string(),
            variant_name: variant_name.to_string(),
            version_label: version_label.to_string(),
        }
    }

    /// Folder name of the asset family
    pub fn family_folder(&self) -> String {
        if self.asset_name.trim().is_empty() {
            sanitize_folder_name(&self.asset_id)
        } else {
            sanitize_folder_name(&self.asset_name)
        }
    }
}

/// A screenshot copied into the tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedScreenshot {
    pub filename: String,
    pub file_path: String,
    pub display_name: String,
}

/// A screenshot found on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredScreenshot {
    pub filename: String,
    pub file_path: String,
    pub display_name: String,
    pub order: u32,
}

/// Vector annotations drawn over one screenshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawoverDocument {
    pub version: String,
    pub screenshot_id: Option<i64>,
    pub canvas_size: [u32; 2],
    pub created_at: String,
    pub modified_at: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub strokes: Vec<serde_json::Value>,
    #[serde(default)]
    pub deleted_strokes: Vec<serde_json::Value>,
}

/// Per-screenshot entry of the drawover manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub json: String,
    pub png: String,
    pub modified_at: String,
    pub stroke_count: usize,
}

/// Index of every drawover of a version, rewritten after each drawover change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawoverManifest {
    pub version: String,
    pub asset_id: String,
    pub asset_name: String,
    pub variant_name: String,
    pub version_label: String,
    pub screenshots: BTreeMap<String, ManifestEntry>,
    pub total_screenshots: usize,
    pub total_strokes: usize,
}

/// File store for review screenshots and drawovers
pub struct ReviewFileStore {
    root: PathBuf,
}

impl ReviewFileStore {
    pub fn new<P: AsRef<Path>>(reviews_root: P) -> Self {
        ReviewFileStore {
            root: reviews_root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{root}/{family}/{variant}/{version}`; not created
    pub fn review_dir(&self, loc: &ReviewLocation) -> PathBuf {
        self.root
            .join(loc.family_folder())
            .join(sanitize_folder_name(&loc.variant_name))
            .join(sanitize_folder_name(&loc.version_label))
    }

    pub fn screenshots_dir(&self, loc: &ReviewLocation) -> PathBuf {
        self.review_dir(loc).join(SCREENSHOTS_DIR)
    }

    pub fn drawovers_dir(&self, loc: &ReviewLocation) -> PathBuf {
        self.review_dir(loc).join(DRAWOVERS_DIR)
    }

    // =========================================================================
    // Screenshots
    // =========================================================================

    /// Copy an image into the version's screenshot folder
    ///
    /// The file is named `{order:03}_{sanitized display name}{.ext}`; an existing
    /// file with that name gets a `_1`, `_2`, ... suffix instead of being replaced.
    pub fn save_screenshot(
        &self,
        loc: &ReviewLocation,
        source: &Path,
        display_name: &str,
        order: u32,
    ) -> Result<SavedScreenshot> {
        if !source.is_file() {
            return Err(anyhow!(
                "Failed to save screenshot: source image not found: {}",
                source.display()
            ));
        }

        let dir = self.screenshots_dir(loc);
        fs::create_dir_all(&dir)
            .map_err(|e| anyhow!("Failed to create screenshot directory {:?}: {}", dir, e))?;

        let display_name = if display_name.trim().is_empty() {
            source
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default()
        } else {
            display_name.to_string()
        };
        let extension = lowercase_extension(source);
        let safe_name = sanitize_display_name(&display_name);

        let mut filename = format!("{:03}_{}{}", order, safe_name, extension);
        let mut counter = 1;
        while dir.join(&filename).exists() {
            filename = format!("{:03}_{}_{}{}", order, safe_name, counter, extension);
            counter += 1;
        }

        let dest = dir.join(&filename);
        fs::copy(source, &dest)
            .map_err(|e| anyhow!("Failed to copy screenshot to {:?}: {}", dest, e))?;
        info!("saved review screenshot {:?}", dest);

        Ok(SavedScreenshot {
            filename,
            file_path: dest.to_string_lossy().to_string(),
            display_name,
        })
    }

    /// Delete a screenshot and the drawover files sharing its stem
    pub fn delete_screenshot(&self, loc: &ReviewLocation, filename: &str) -> Result<()> {
        let path = self.screenshots_dir(loc).join(filename);
        remove_if_exists(&path)?;

        let stem = file_stem(filename);
        let drawovers = self.drawovers_dir(loc);
        remove_if_exists(&drawovers.join(format!("{}.json", stem)))?;
        remove_if_exists(&drawovers.join(format!("{}.png", stem)))?;
        self.write_manifest(loc)?;
        Ok(())
    }

    /// Rename a screenshot to a new display name, keeping its order prefix
    ///
    /// Returns the new file name. Fails when the target name is taken.
    pub fn rename_screenshot(
        &self,
        loc: &ReviewLocation,
        old_filename: &str,
        new_display_name: &str,
    ) -> Result<String> {
        let dir = self.screenshots_dir(loc);
        let old_path = dir.join(old_filename);
        if !old_path.is_file() {
            return Err(anyhow!(
                "Failed to rename screenshot: {} not found",
                old_filename
            ));
        }

        let prefix = old_filename.split_once('_').map_or("000", |(p, _)| p);
        let new_filename = format!(
            "{}_{}{}",
            prefix,
            sanitize_display_name(new_display_name),
            lowercase_extension(&old_path)
        );
        if new_filename == old_filename {
            return Ok(new_filename);
        }

        let new_path = dir.join(&new_filename);
        if new_path.exists() {
            return Err(anyhow!(
                "Failed to rename screenshot: {} already exists",
                new_filename
            ));
        }
        fs::rename(&old_path, &new_path)
            .map_err(|e| anyhow!("Failed to rename screenshot {}: {}", old_filename, e))?;
        self.move_drawover_files(loc, file_stem(old_filename), file_stem(&new_filename))?;
        self.write_manifest(loc)?;
        Ok(new_filename)
    }

    /// Renumber screenshots to follow `filenames`, returning the new names in order
    ///
    /// Missing files are skipped. Files are first moved to temporary names so an
    /// order swap never collides; a name still taken by an unlisted file gets a
    /// `_N` suffix.
    pub fn reorder_screenshots(&self, loc: &ReviewLocation, filenames: &[String]) -> Result<Vec<String>> {
        let dir = self.screenshots_dir(loc);

        let mut staged = Vec::new();
        for (index, filename) in filenames.iter().enumerate() {
            let path = dir.join(filename);
            if !path.is_file() {
                continue;
            }
            let temp = format!("_temp_{:03}_{}", index, filename);
            fs::rename(&path, dir.join(&temp))
                .map_err(|e| anyhow!("Failed to stage screenshot {}: {}", filename, e))?;
            self.move_drawover_files(loc, file_stem(filename), file_stem(&temp))?;
            staged.push((temp, filename.as_str()));
        }

        let mut renamed = Vec::with_capacity(staged.len());
        for (order, (temp, original)) in staged.into_iter().enumerate() {
            let name_part = original.split_once('_').map_or(original, |(_, rest)| rest);
            let (stem, extension) = match name_part.rsplit_once('.') {
                Some((stem, ext)) => (stem, format!(".{}", ext)),
                None => (name_part, String::new()),
            };
            // unlisted files keep their names
            let mut new_filename = format!("{:03}_{}", order, name_part);
            let mut counter = 1;
            while dir.join(&new_filename).exists() {
                new_filename = format!("{:03}_{}_{}{}", order, stem, counter, extension);
                counter += 1;
            }
            fs::rename(dir.join(&temp), dir.join(&new_filename))
                .map_err(|e| anyhow!("Failed to reorder screenshot {}: {}", original, e))?;
            self.move_drawover_files(loc, file_stem(&temp), file_stem(&new_filename))?;
            renamed.push(new_filename);
        }

        self.write_manifest(loc)?;
        Ok(renamed)
    }

    /// Images in the version's screenshot folder, sorted by file name
    pub fn list_screenshots(&self, loc: &ReviewLocation) -> Result<Vec<StoredScreenshot>> {
        let dir = self.screenshots_dir(loc);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&dir)
            .map_err(|e| anyhow!("Failed to list screenshots in {:?}: {}", dir, e))?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_image(path))
            .collect();
        paths.sort();

        Ok(paths
            .into_iter()
            .map(|path| {
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                let stem = file_stem(&filename).to_string();
                let (order, display_name) = match stem.split_once('_') {
                    Some((prefix, rest)) => (prefix.parse().unwrap_or(0), rest.to_string()),
                    None => (0, stem.clone()),
                };
                StoredScreenshot {
                    file_path: path.to_string_lossy().to_string(),
                    filename,
                    display_name,
                    order,
                }
            })
            .collect())
    }

    /// Full path of a stored screenshot, if it exists
    pub fn screenshot_path(&self, loc: &ReviewLocation, filename: &str) -> Option<PathBuf> {
        let path = self.screenshots_dir(loc).join(filename);
        path.is_file().then_some(path)
    }

    /// Total bytes under the version's review folder
    pub fn storage_size(&self, loc: &ReviewLocation) -> u64 {
        dir_size(&self.review_dir(loc))
    }

    /// Remove every review file of a version
    pub fn delete_version_reviews(&self, loc: &ReviewLocation) -> Result<()> {
        let dir = self.review_dir(loc);
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .map_err(|e| anyhow!("Failed to delete review files {:?}: {}", dir, e))?;
        }
        Ok(())
    }

    /// Remove version folders without files, then empty variant and family folders
    ///
    /// Returns the number of version folders removed.
    pub fn cleanup_empty_directories(&self, asset_id: &str, asset_name: &str) -> Result<usize> {
        let family = ReviewLocation::new(asset_id, asset_name, "", "").family_folder();
        let family_dir = self.root.join(family);
        if !family_dir.is_dir() {
            return Ok(0);
        }

        let mut removed = 0;
        for variant_dir in subdirectories(&family_dir)? {
            for version_dir in subdirectories(&variant_dir)? {
                if !contains_files(&version_dir) {
                    fs::remove_dir_all(&version_dir).map_err(|e| {
                        anyhow!("Failed to remove empty folder {:?}: {}", version_dir, e)
                    })?;
                    removed += 1;
                }
            }
            remove_dir_if_empty(&variant_dir)?;
        }
        remove_dir_if_empty(&family_dir)?;

        Ok(removed)
    }

    // =========================================================================
    // Drawovers
    // =========================================================================

    fn drawover_path(&self, loc: &ReviewLocation, screenshot_filename: &str) -> PathBuf {
        self.drawovers_dir(loc)
            .join(format!("{}.json", file_stem(screenshot_filename)))
    }

    /// Write the strokes drawn over a screenshot
    ///
    /// An existing document keeps its creation data and soft-deleted strokes. The
    /// rasterized cache is dropped and the manifest rewritten.
    pub fn save_drawover(
        &self,
        loc: &ReviewLocation,
        screenshot_filename: &str,
        screenshot_id: Option<i64>,
        strokes: Vec<serde_json::Value>,
        author: &str,
    ) -> Result<DrawoverDocument> {
        let dir = self.drawovers_dir(loc);
        fs::create_dir_all(&dir)
            .map_err(|e| anyhow!("Failed to create drawover directory {:?}: {}", dir, e))?;

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let document = match self.load_drawover(loc, screenshot_filename)? {
            Some(mut existing) => {
                existing.modified_at = now;
                existing.strokes = strokes;
                if existing.screenshot_id.is_none() {
                    existing.screenshot_id = screenshot_id;
                }
                existing
            }
            None => DrawoverDocument {
                version: DRAWOVER_FORMAT_VERSION.to_string(),
                screenshot_id,
                canvas_size: DEFAULT_CANVAS_SIZE,
                created_at: now.clone(),
                modified_at: now,
                author: author.to_string(),
                strokes,
                deleted_strokes: Vec::new(),
            },
        };

        let path = self.drawover_path(loc, screenshot_filename);
        let content = serde_json::to_string_pretty(&document)
            .map_err(|e| anyhow!("Failed to serialize drawover: {}", e))?;
        fs::write(&path, content)
            .map_err(|e| anyhow!("Failed to write drawover file {:?}: {}", path, e))?;

        remove_if_exists(&path.with_extension("png"))?;
        self.write_manifest(loc)?;
        Ok(document)
    }

    /// Read a screenshot's drawover document; `None` when there is none
    pub fn load_drawover(&self, loc: &ReviewLocation, screenshot_filename: &str) -> Result<Option<DrawoverDocument>> {
        let path = self.drawover_path(loc, screenshot_filename);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| anyhow!("Failed to read drawover file {:?}: {}", path, e))?;
        let document = serde_json::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse drawover file {:?}: {}", path, e))?;
        Ok(Some(document))
    }

    /// Delete a screenshot's drawover document and its raster cache
    pub fn delete_drawover(&self, loc: &ReviewLocation, screenshot_filename: &str) -> Result<()> {
        let path = self.drawover_path(loc, screenshot_filename);
        remove_if_exists(&path)?;
        remove_if_exists(&path.with_extension("png"))?;
        self.write_manifest(loc)?;
        Ok(())
    }

    /// Read the version's drawover manifest
    pub fn load_manifest(&self, loc: &ReviewLocation) -> Result<Option<DrawoverManifest>> {
        let path = self.drawovers_dir(loc).join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| anyhow!("Failed to read drawover manifest {:?}: {}", path, e))?;
        let manifest = serde_json::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse drawover manifest {:?}: {}", path, e))?;
        Ok(Some(manifest))
    }

    /// Rebuild `drawovers/manifest.json` from the documents on disk
    fn write_manifest(&self, loc: &ReviewLocation) -> Result<()> {
        let dir = self.drawovers_dir(loc);
        if !dir.exists() {
            return Ok(());
        }

        let mut screenshots = BTreeMap::new();
        let mut total_strokes = 0;
        for entry in fs::read_dir(&dir)
            .map_err(|e| anyhow!("Failed to list drawovers in {:?}: {}", dir, e))?
            .flatten()
        {
            let path = entry.path();
            let is_document = path.extension().is_some_and(|e| e == "json")
                && path.file_name().is_some_and(|n| n != MANIFEST_FILE);
            if !is_document {
                continue;
            }

            let document = match fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|c| serde_json::from_str::<DrawoverDocument>(&c).map_err(|e| e.to_string()))
            {
                Ok(document) => document,
                Err(e) => {
                    warn!("skipping unreadable drawover {:?}: {}", path, e);
                    continue;
                }
            };

            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            total_strokes += document.strokes.len();
            screenshots.insert(
                stem.clone(),
                ManifestEntry {
                    json: format!("{}.json", stem),
                    png: format!("{}.png", stem),
                    modified_at: document.modified_at,
                    stroke_count: document.strokes.len(),
                },
            );
        }

        let manifest = DrawoverManifest {
            version: DRAWOVER_FORMAT_VERSION.to_string(),
            asset_id: loc.asset_id.clone(),
            asset_name: loc.asset_name.clone(),
            variant_name: loc.variant_name.clone(),
            version_label: loc.version_label.clone(),
            total_screenshots: screenshots.len(),
            screenshots,
            total_strokes,
        };

        let path = dir.join(MANIFEST_FILE);
        let content = serde_json::to_string_pretty(&manifest)
            .map_err(|e| anyhow!("Failed to serialize drawover manifest: {}", e))?;
        fs::write(&path, content)
            .map_err(|e| anyhow!("Failed to write drawover manifest {:?}: {}", path, e))
    }

    fn move_drawover_files(&self, loc: &ReviewLocation, old_stem: &str, new_stem: &str) -> Result<()> {
        let dir = self.drawovers_dir(loc);
        for ext in ["json", "png"] {
            let from = dir.join(format!("{}.{}", old_stem, ext));
            if from.exists() {
                let to = dir.join(format!("{}.{}", new_stem, ext));
                fs::rename(&from, &to)
                    .map_err(|e| anyhow!("Failed to move drawover {:?}: {}", from, e))?;
            }
        }
        Ok(())
    }
}

/// Make a display name safe for a screenshot file name
///
/// `<>:"/\|?*` and spaces become `_`, outer underscores are trimmed and the result
/// is capped at 100 characters. An empty result becomes `screenshot`.
pub fn sanitize_display_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' | ' ' => '_',
            other => other,
        })
        .collect();
    let safe: String = replaced
        .trim_matches('_')
        .chars()
        .take(MAX_DISPLAY_NAME_LEN)
        .collect();
    if safe.is_empty() {
        "screenshot".to_string()
    } else {
        safe
    }
}

/// Make an asset, variant or version name safe for a folder name
///
/// Invalid characters become `_`, surrounding spaces and dots are trimmed and runs
/// of underscores collapse. An empty result becomes `unnamed`.
pub fn sanitize_folder_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        })
        .collect();

    let mut safe = String::with_capacity(replaced.len());
    for c in replaced.trim_matches(|c| c == ' ' || c == '.').chars() {
        if c == '_' && safe.ends_with('_') {
            continue;
        }
        safe.push(c);
    }

    if safe.is_empty() {
        "unnamed".to_string()
    } else {
        safe
    }
}

fn file_stem(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}

fn lowercase_extension(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}

fn remove_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).map_err(|e| anyhow!("Failed to remove {:?}: {}", path, e))?;
    }
    Ok(())
}

fn remove_dir_if_empty(dir: &Path) -> Result<()> {
    let is_empty = fs::read_dir(dir)
        .map_err(|e| anyhow!("Failed to read {:?}: {}", dir, e))?
        .next()
        .is_none();
    if is_empty {
        fs::remove_dir(dir).map_err(|e| anyhow!("Failed to remove {:?}: {}", dir, e))?;
    }
    Ok(())
}

fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(fs::read_dir(dir)
        .map_err(|e| anyhow!("Failed to read {:?}: {}", dir, e))?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect())
}

fn contains_files(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries.flatten().any(|entry| {
                let path = entry.path();
                path.is_file() || (path.is_dir() && contains_files(&path))
            })
        })
        .unwrap_or(false)
}

fn dir_size(dir: &Path) -> u64 {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|entry| {
                    let path = entry.path();
                    if path.is_dir() {
                        dir_size(&path)
                    } else {
                        entry.metadata().map(|m| m.len()).unwrap_or(0)
                    }
                })
                .sum()
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn location() -> ReviewLocation {
        ReviewLocation::new("abc-123", "Hero Chair", "Base", "v001")
    }

    fn write_image(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"\x89PNG fake image").unwrap();
        path
    }

    #[test]
    fn test_sanitize_display_name() {
        assert_eq!(sanitize_display_name("Face close up"), "Face_close_up");
        assert_eq!(sanitize_display_name("a/b:c?"), "a_b_c");
        assert_eq!(sanitize_display_name("  "), "screenshot");
        assert_eq!(sanitize_display_name(&"x".repeat(150)).len(), 100);
    }

    #[test]
    fn test_sanitize_folder_name() {
        assert_eq!(sanitize_folder_name("Hero: Chair"), "Hero_ Chair");
        assert_eq!(sanitize_folder_name("a//b"), "a_b");
        assert_eq!(sanitize_folder_name(" .hidden. "), "hidden");
        assert_eq!(sanitize_folder_name(""), "unnamed");
    }

    #[test]
    fn test_family_folder_falls_back_to_id() {
        let loc = ReviewLocation::new("abc-123", "", "Base", "v001");
        assert_eq!(loc.family_folder(), "abc-123");
        assert_eq!(location().family_folder(), "Hero Chair");
    }

    #[test]
    fn test_save_screenshot_names_and_collisions() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_image(tmp.path(), "capture.PNG");
        let store = ReviewFileStore::new(tmp.path().join("reviews"));
        let loc = location();

        let first = store.save_screenshot(&loc, &source, "Face", 0).unwrap();
        assert_eq!(first.filename, "000_Face.png");
        assert!(Path::new(&first.file_path).exists());
        assert!(first
            .file_path
            .ends_with("Hero Chair/Base/v001/screenshots/000_Face.png"));

        let second = store.save_screenshot(&loc, &source, "Face", 0).unwrap();
        assert_eq!(second.filename, "000_Face_1.png");

        let unnamed = store.save_screenshot(&loc, &source, "", 2).unwrap();
        assert_eq!(unnamed.filename, "002_capture.png");
        assert_eq!(unnamed.display_name, "capture");

        let missing = store.save_screenshot(&loc, &tmp.path().join("nope.png"), "x", 0);
        assert!(missing.is_err());
    }

    #[test]
    fn test_list_rename_reorder() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_image(tmp.path(), "capture.png");
        let store = ReviewFileStore::new(tmp.path().join("reviews"));
        let loc = location();

        store.save_screenshot(&loc, &source, "Front", 0).unwrap();
        store.save_screenshot(&loc, &source, "Back", 1).unwrap();
        store
            .save_drawover(&loc, "001_Back.png", Some(7), vec![json!({"id": "s1"})], "lead")
            .unwrap();

        let listed = store.list_screenshots(&loc).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].display_name, "Back");
        assert_eq!(listed[1].order, 1);

        let renamed = store.rename_screenshot(&loc, "001_Back.png", "Rear view").unwrap();
        assert_eq!(renamed, "001_Rear_view.png");
        assert!(store.load_drawover(&loc, &renamed).unwrap().is_some());

        let order = store
            .reorder_screenshots(&loc, &[renamed.clone(), "000_Front.png".to_string()])
            .unwrap();
        assert_eq!(order, vec!["000_Rear_view.png", "001_Front.png"]);
        assert!(store.screenshot_path(&loc, "000_Rear_view.png").is_some());
        let moved = store.load_drawover(&loc, "000_Rear_view.png").unwrap().unwrap();
        assert_eq!(moved.screenshot_id, Some(7));
    }

    #[test]
    fn test_partial_reorder_keeps_unlisted_files() {
        let tmp = tempfile::tempdir().unwrap();
        let front = write_image(tmp.path(), "front.png");
        let side = tmp.path().join("side.png");
        fs::write(&side, b"\x89PNG side view").unwrap();
        let store = ReviewFileStore::new(tmp.path().join("reviews"));
        let loc = location();

        store.save_screenshot(&loc, &front, "Face", 0).unwrap();
        store.save_screenshot(&loc, &side, "Face", 1).unwrap();

        let order = store
            .reorder_screenshots(&loc, &["001_Face.png".to_string()])
            .unwrap();
        assert_eq!(order, vec!["000_Face_1.png"]);

        let dir = store.screenshots_dir(&loc);
        assert_eq!(fs::read(dir.join("000_Face.png")).unwrap(), fs::read(&front).unwrap());
        assert_eq!(fs::read(dir.join("000_Face_1.png")).unwrap(), fs::read(&side).unwrap());
        assert_eq!(store.list_screenshots(&loc).unwrap().len(), 2);
    }

    #[test]
    fn test_drawover_manifest_and_delete() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_image(tmp.path(), "capture.png");
        let store = ReviewFileStore::new(tmp.path().join("reviews"));
        let loc = location();
        let saved = store.save_screenshot(&loc, &source, "Face", 0).unwrap();

        store
            .save_drawover(&loc, &saved.filename, Some(1), vec![json!({"id": "a"}), json!({"id": "b"})], "lead")
            .unwrap();
        let manifest = store.load_manifest(&loc).unwrap().unwrap();
        assert_eq!(manifest.total_screenshots, 1);
        assert_eq!(manifest.total_strokes, 2);
        assert_eq!(manifest.screenshots["000_Face"].json, "000_Face.json");

        let updated = store
            .save_drawover(&loc, &saved.filename, Some(1), vec![json!({"id": "a"})], "artist")
            .unwrap();
        assert_eq!(updated.author, "lead");
        assert_eq!(store.load_manifest(&loc).unwrap().unwrap().total_strokes, 1);

        store.delete_screenshot(&loc, &saved.filename).unwrap();
        assert!(store.load_drawover(&loc, &saved.filename).unwrap().is_none());
        assert_eq!(store.load_manifest(&loc).unwrap().unwrap().total_screenshots, 0);
    }

    #[test]
    fn test_size_delete_and_cleanup() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_image(tmp.path(), "capture.png");
        let store = ReviewFileStore::new(tmp.path().join("reviews"));
        let loc = location();
        store.save_screenshot(&loc, &source, "Face", 0).unwrap();
        fs::create_dir_all(store.review_dir(&ReviewLocation::new("abc-123", "Hero Chair", "Base", "v002"))).unwrap();

        assert!(store.storage_size(&loc) > 0);
        assert_eq!(store.cleanup_empty_directories("abc-123", "Hero Chair").unwrap(), 1);
        assert!(store.review_dir(&loc).exists());

        store.delete_version_reviews(&loc).unwrap();
        assert_eq!(store.storage_size(&loc), 0);
        assert_eq!(store.cleanup_empty_directories("abc-123", "Hero Chair").unwrap(), 0);
        assert!(!store.root().join("Hero Chair").exists());
    }
}
