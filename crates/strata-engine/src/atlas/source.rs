use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::canvas::CHANNELS;

/// Tightly packed RGBA8 pixels, top row first.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Pixels {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Pixels {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self { width, height, data }
    }

    /// Fully transparent pixels.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self::new(width, height, vec![0; width as usize * height as usize * CHANNELS])
    }

    #[inline]
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * CHANNELS
    }

    pub(crate) fn validate(&self, identity: &str) -> Result<()> {
        if self.data.len() != self.expected_len() {
            return Err(Error::invalid_source(
                identity,
                format_args!(
                    "{}x{} image carries {} bytes, expected {}",
                    self.width,
                    self.height,
                    self.data.len(),
                    self.expected_len()
                ),
            ));
        }
        Ok(())
    }
}

/// Something the atlas can register as one image.
///
/// Decoding is split in two so a batch can be validated cheaply before any
/// full decode happens.
pub trait ImageSource {
    /// Identity used to find an already registered entry.
    fn identity(&self) -> String;

    /// Width and height, ideally without decoding the pixel data.
    fn dimensions(&self) -> Result<(u32, u32)>;

    /// Full RGBA8 pixel data, top row first.
    fn decode(&self) -> Result<Pixels>;
}

/// Image file decoded with the `image` crate (PNG, JPEG, BMP).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ImageFile {
    path: PathBuf,
}

impl ImageFile {
    /// File extensions picked up by directory registration.
    pub const EXTENSIONS: [&'static str; 4] = ["png", "jpeg", "jpg", "bmp"];

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `path` has one of the supported extensions.
    pub fn is_supported(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| Self::EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
    }

    fn check_exists(&self) -> Result<()> {
        if self.path.is_file() {
            Ok(())
        } else {
            Err(Error::invalid_source(self.path.display(), "no such file"))
        }
    }
}

impl ImageSource for ImageFile {
    fn identity(&self) -> String {
        self.path.display().to_string()
    }

    fn dimensions(&self) -> Result<(u32, u32)> {
        self.check_exists()?;
        image::image_dimensions(&self.path)
            .map_err(|e| Error::invalid_source(self.path.display(), e))
    }

    fn decode(&self) -> Result<Pixels> {
        self.check_exists()?;
        let rgba = image::open(&self.path)
            .map_err(|e| Error::invalid_source(self.path.display(), e))?
            .to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Pixels::new(width, height, rgba.into_raw()))
    }
}

/// Already decoded pixels registered under a name.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MemoryImage {
    pub name: String,
    pub pixels: Pixels,
}

impl MemoryImage {
    pub fn new(name: impl Into<String>, pixels: Pixels) -> Self {
        Self { name: name.into(), pixels }
    }
}

impl ImageSource for MemoryImage {
    fn identity(&self) -> String {
        self.name.clone()
    }

    fn dimensions(&self) -> Result<(u32, u32)> {
        Ok((self.pixels.width, self.pixels.height))
    }

    fn decode(&self) -> Result<Pixels> {
        Ok(self.pixels.clone())
    }
}

/// Recursively collects supported image files below `dir`, sorted by path.
pub(crate) fn collect_image_files(dir: &Path) -> Result<Vec<ImageFile>> {
    if !dir.is_dir() {
        return Err(Error::invalid_source(dir.display(), "not a directory"));
    }

    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries = std::fs::read_dir(&current)
            .map_err(|e| Error::invalid_source(current.display(), e))?;
        for entry in entries {
            let path = entry
                .map_err(|e| Error::invalid_source(current.display(), e))?
                .path();
            if path.is_dir() {
                pending.push(path);
            } else if ImageFile::is_supported(&path) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files.into_iter().map(ImageFile::new).collect())
}
