//! In-memory data model: source documents, rendered pages and the units that
//! are handed to a text-extraction provider.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of bytes a [`Document`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Image,
}

impl DocumentKind {
    /// Sniff the kind from leading bytes. `None` when neither a PDF header nor
    /// a supported image signature is present.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF") {
            return Some(DocumentKind::Pdf);
        }
        match image::guess_format(bytes) {
            Ok(image::ImageFormat::Png) | Ok(image::ImageFormat::Jpeg) => Some(DocumentKind::Image),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Pdf => f.write_str("pdf"),
            DocumentKind::Image => f.write_str("image"),
        }
    }
}

/// Source bytes plus their declared kind. Immutable once built.
#[derive(Clone)]
pub struct Document {
    bytes: Vec<u8>,
    kind: DocumentKind,
}

impl Document {
    pub fn new(bytes: Vec<u8>, kind: DocumentKind) -> Self {
        Self { bytes, kind }
    }

    pub fn pdf(bytes: Vec<u8>) -> Self {
        Self::new(bytes, DocumentKind::Pdf)
    }

    pub fn image(bytes: Vec<u8>) -> Self {
        Self::new(bytes, DocumentKind::Image)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("kind", &self.kind)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A rasterised page. `number` is 1-based.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub number: usize,
    pub image: DynamicImage,
}

impl PageImage {
    pub fn new(number: usize, image: DynamicImage) -> Self {
        Self { number, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Which part of a page a [`PageUnit`] covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitPart {
    Whole,
    Left,
    Right,
}

impl fmt::Display for UnitPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitPart::Whole => f.write_str("whole"),
            UnitPart::Left => f.write_str("left"),
            UnitPart::Right => f.write_str("right"),
        }
    }
}

/// The image actually sent to a provider: a whole page or one half of it.
#[derive(Debug, Clone)]
pub struct PageUnit {
    pub page: usize,
    pub part: UnitPart,
    pub image: DynamicImage,
}

impl PageUnit {
    /// A page passed through unchanged.
    pub fn whole(page: PageImage) -> Self {
        Self {
            page: page.number,
            part: UnitPart::Whole,
            image: page.image,
        }
    }

    /// Human-readable label, e.g. `p2-left`.
    pub fn label(&self) -> String {
        match self.part {
            UnitPart::Whole => format!("p{}", self.page),
            part => format!("p{}-{}", self.page, part),
        }
    }
}
