use crate::verdict::Verdict;
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use serde::Serialize;
use std::{io::Cursor, path::Path};
use thiserror::Error;

pub const STATUS_WAITING: &str = "Waiting for input...";
pub const STATUS_UPLOADED: &str = "Image uploaded.";
pub const STATUS_CLASSIFYING: &str = "Classifying...";
pub const STATUS_COMPLETE: &str = "Classification complete.";
pub const STATUS_FAILED: &str = "Classification failed.";
pub const STATUS_CLEARED: &str = "Cleared.";

const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Error, Debug)]
pub enum SelectImageError {
    #[error("Unsupported file type: {0}. Use a .jpg, .jpeg or .png image.")]
    UnsupportedFileType(String),
    #[error("Failed to read image: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("No image selected")]
    NothingSelected,
    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}

#[derive(Debug, Clone)]
pub struct SelectedImage {
    pub name: String,
    pub data: Vec<u8>,
    image: DynamicImage,
}

impl SelectedImage {
    /// Only PNG and JPEG content is accepted, whatever the name says.
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Result<Self, SelectImageError> {
        let name = name.into();
        match image::guess_format(&data) {
            Ok(ImageFormat::Png | ImageFormat::Jpeg) | Err(_) => {}
            Ok(format) => {
                return Err(SelectImageError::UnsupportedFileType(format!(
                    "{} ({:?})",
                    name, format
                )))
            }
        }

        let image = image::load_from_memory(&data)?;
        Ok(Self {
            name,
            data,
            image,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, SelectImageError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();
        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(SelectImageError::UnsupportedFileType(
                path.display().to_string(),
            ));
        }

        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_bytes(name, data)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    /// Square PNG rendering; the aspect ratio is not preserved.
    pub fn render_png(&self, size: u32) -> Result<Vec<u8>, RenderError> {
        let resized = self.image.resize_exact(size, size, FilterType::CatmullRom);
        let mut cursor = Cursor::new(Vec::new());
        resized.write_to(&mut cursor, ImageFormat::Png)?;
        Ok(cursor.into_inner())
    }
}

/// Everything the single result screen shows.
#[derive(Debug)]
pub struct Session {
    selected: Option<SelectedImage>,
    verdict: Option<Verdict>,
    progress: u8,
    status: String,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            selected: None,
            verdict: None,
            progress: 0,
            status: STATUS_WAITING.to_string(),
        }
    }

    pub fn selected(&self) -> Option<&SelectedImage> {
        self.selected.as_ref()
    }

    pub fn select(&mut self, image: SelectedImage) {
        self.selected = Some(image);
        self.verdict = None;
        self.progress = 0;
        self.status = STATUS_UPLOADED.to_string();
    }

    pub fn start_classification(&mut self) {
        self.status = STATUS_CLASSIFYING.to_string();
    }

    pub fn record_verdict(&mut self, verdict: Verdict) {
        self.progress = verdict.progress;
        self.verdict = Some(verdict);
        self.status = STATUS_COMPLETE.to_string();
    }

    pub fn record_failure(&mut self) {
        self.status = STATUS_FAILED.to_string();
    }

    pub fn clear(&mut self) {
        self.selected = None;
        self.verdict = None;
        self.progress = 0;
        self.status = STATUS_CLEARED.to_string();
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            image: self.selected.as_ref().map(|selected| {
                let (width, height) = selected.dimensions();
                ImageView {
                    name: selected.name.clone(),
                    width,
                    height,
                }
            }),
            verdict: self.verdict.clone(),
            progress: self.progress,
            status: self.status.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageView {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub image: Option<ImageView>,
    pub verdict: Option<Verdict>,
    pub progress: u8,
    pub status: String,
}
