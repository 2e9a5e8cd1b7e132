//! Loading and saving images, and the on-disk layout of a sharing session
//!
//! A session directory `<label>_<unix-seconds>/` holds one
//! `<label>_share_<i>.png` per participant plus `manifest.json`, which
//! records the scheme parameters of every share file.

use crate::error::{Result, VCError};
use crate::grid::BinaryImage;
use crate::share::{Share, ShareMetadata};
use crate::utils::{from_raster, to_luma_image};
use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

pub const MANIFEST_FILE: &str = "manifest.json";

/// Manifest written next to the share files of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionManifest {
    pub label: String,
    /// Seconds since the Unix epoch when the session was written
    pub created: u64,
    pub shares: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub file: String,
    #[serde(flatten)]
    pub metadata: ShareMetadata,
}

/// Shares read from disk, with or without recorded metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedShares {
    /// Every file was listed in a manifest
    Tagged(Vec<Share>),
    /// At least one file had no manifest entry; only the pixels are known
    Untagged(Vec<BinaryImage>),
}

/// Decode an image file into an RGB grid
pub fn load_rgb_grid(path: impl AsRef<Path>) -> Result<RgbImage> {
    let path = path.as_ref();
    let image = image::open(path).map_err(|source| VCError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.to_rgb8())
}

/// Decode a black and white raster into a bit grid
pub fn load_binary_grid(path: impl AsRef<Path>) -> Result<BinaryImage> {
    let path = path.as_ref();
    let image = image::open(path).map_err(|source| VCError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;
    from_raster(&image)
}

/// Write a bit grid as PNG (black = 0, white = 255)
pub fn save_binary_grid(grid: &BinaryImage, path: impl AsRef<Path>) -> Result<()> {
    to_luma_image(grid).save_with_format(path.as_ref(), ImageFormat::Png)?;
    Ok(())
}

pub fn share_file_name(label: &str, index: usize) -> String {
    format!("{}_share_{}.png", label, index)
}

/// Where a reconstruction for `label` is written inside `dir`
pub fn reconstruction_path(dir: impl AsRef<Path>, label: &str) -> PathBuf {
    dir.as_ref().join(format!("{}_reconstruction.png", label))
}

/// Write all shares and their manifest into a new session directory under
/// `dir`, returning the session directory
pub fn write_session(dir: impl AsRef<Path>, label: &str, shares: &[Share]) -> Result<PathBuf> {
    let created = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let session_dir = create_session_dir(dir.as_ref(), &format!("{}_{}", label, created))?;

    let mut entries = Vec::with_capacity(shares.len());
    for share in shares {
        let file = share_file_name(label, share.index());
        share.save(session_dir.join(&file))?;
        debug!("wrote {}", file);
        entries.push(ManifestEntry {
            file,
            metadata: share.metadata,
        });
    }

    let manifest = SessionManifest {
        label: label.to_string(),
        created,
        shares: entries,
    };
    let writer = BufWriter::new(File::create(session_dir.join(MANIFEST_FILE))?);
    serde_json::to_writer_pretty(writer, &manifest)?;

    info!(
        "saved {} shares to {}",
        shares.len(),
        session_dir.display()
    );
    Ok(session_dir)
}

/// Create `dir/name`, or `dir/name_2`, `dir/name_3`... if taken, so that an
/// existing session is never written into
fn create_session_dir(dir: &Path, name: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let mut session_dir = dir.join(name);
    let mut attempt = 1;
    loop {
        match fs::create_dir(&session_dir) {
            Ok(()) => return Ok(session_dir),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                attempt += 1;
                session_dir = dir.join(format!("{}_{}", name, attempt));
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Read `manifest.json` from a directory, if there is one
pub fn read_manifest(dir: impl AsRef<Path>) -> Result<Option<SessionManifest>> {
    let path = dir.as_ref().join(MANIFEST_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let reader = BufReader::new(File::open(path)?);
    Ok(Some(serde_json::from_reader(reader)?))
}

/// Load share files, attaching manifest metadata when every file has it
pub fn load_shares<P: AsRef<Path>>(paths: &[P]) -> Result<LoadedShares> {
    let mut manifests: HashMap<PathBuf, Option<SessionManifest>> = HashMap::new();
    let mut grids = Vec::with_capacity(paths.len());
    let mut metadata = Vec::with_capacity(paths.len());

    for path in paths {
        let path = path.as_ref();
        grids.push(load_binary_grid(path)?);

        let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        if !manifests.contains_key(&dir) {
            let manifest = read_manifest(&dir)?;
            manifests.insert(dir.clone(), manifest);
        }

        let file_name = path.file_name().and_then(|f| f.to_str());
        let entry = manifests[&dir].as_ref().and_then(|manifest| {
            manifest
                .shares
                .iter()
                .find(|e| Some(e.file.as_str()) == file_name)
        });
        metadata.push(entry.map(|e| e.metadata));
    }

    if metadata.iter().all(Option::is_some) {
        let shares = grids
            .into_iter()
            .zip(metadata.into_iter().flatten())
            .map(|(grid, meta)| Share::new(grid, meta))
            .collect::<Result<Vec<_>>>()?;
        Ok(LoadedShares::Tagged(shares))
    } else {
        debug!("no manifest entry for some shares, falling back to pixel inference");
        Ok(LoadedShares::Untagged(grids))
    }
}
