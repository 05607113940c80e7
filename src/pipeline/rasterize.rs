//! Rasterisation: turn a [`Document`] into ordered [`PageImage`]s.
//!
//! PDFs go through a [`PdfRenderer`] (pdfium by default); raster images are
//! decoded directly and always count as a single page. Only the pages a run
//! will actually process are rendered: the page count is read first, the
//! limit policy applied, and rendering stops at the effective limit.
//!
//! Rendering is CPU-bound and pdfium keeps thread-local state, so the async
//! entry point moves the work onto the blocking pool.

use crate::config::ExtractionConfig;
use crate::document::{Document, DocumentKind, PageImage};
use crate::error::ExtractError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Hard upper bound on pages processed per run.
pub const PAGE_CEILING: usize = 20;

/// `min(total, requested or total, PAGE_CEILING)`; `requested == 0` means
/// no explicit limit.
pub fn effective_page_count(total_pages: usize, requested_limit: usize) -> usize {
    let requested = if requested_limit == 0 {
        total_pages
    } else {
        requested_limit
    };
    total_pages.min(requested).min(PAGE_CEILING)
}

/// A PDF rasterisation backend.
pub trait PdfRenderer: Send + Sync {
    /// Number of pages in the PDF.
    fn page_count(&self, bytes: &[u8]) -> Result<usize, ExtractError>;

    /// Render the first [`effective_page_count`] pages, numbered from 1.
    fn render(&self, bytes: &[u8], requested_limit: usize) -> Result<Vec<PageImage>, ExtractError>;
}

/// Pdfium-backed renderer producing RGB rasters at a fixed DPI.
#[derive(Debug, Clone)]
pub struct PdfiumRenderer {
    dpi: u32,
    max_pixels: u32,
    library: Option<PathBuf>,
}

impl PdfiumRenderer {
    pub fn new(dpi: u32, max_pixels: u32, library: Option<PathBuf>) -> Self {
        Self {
            dpi,
            max_pixels,
            library,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(
            config.dpi,
            config.max_rendered_pixels,
            config.pdfium_library_path.clone(),
        )
    }

    /// Longest-edge cap in the form pdfium takes it.
    fn pixel_cap(&self) -> i32 {
        i32::try_from(self.max_pixels).unwrap_or(i32::MAX)
    }

    fn bind(&self) -> Result<Pdfium, ExtractError> {
        Ok(backend_locate::bind_pdfium(self.library.as_deref())?)
    }
}

fn load<'a>(pdfium: &'a Pdfium, bytes: &'a [u8]) -> Result<PdfDocument<'a>, ExtractError> {
    pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
        let detail = format!("{:?}", e);
        if detail.contains("Password") || detail.contains("password") {
            ExtractError::CorruptDocument {
                detail: "PDF is encrypted and requires a password".into(),
                source: None,
            }
        } else {
            ExtractError::CorruptDocument {
                detail: format!("PDF could not be parsed: {detail}"),
                source: None,
            }
        }
    })
}

impl PdfRenderer for PdfiumRenderer {
    fn page_count(&self, bytes: &[u8]) -> Result<usize, ExtractError> {
        let pdfium = self.bind()?;
        let document = load(&pdfium, bytes)?;
        let count = document.pages().len() as usize;
        Ok(count)
    }

    fn render(&self, bytes: &[u8], requested_limit: usize) -> Result<Vec<PageImage>, ExtractError> {
        let pdfium = self.bind()?;
        let document = load(&pdfium, bytes)?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        if total_pages == 0 {
            return Err(ExtractError::EmptyDocument {
                detail: "PDF has no pages".into(),
            });
        }
        let count = effective_page_count(total_pages, requested_limit);
        info!(
            "PDF loaded: {} pages, rendering {} at {} DPI",
            total_pages, count, self.dpi
        );

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(self.dpi as f32 / 72.0)
            .set_maximum_width(self.pixel_cap())
            .set_maximum_height(self.pixel_cap());

        let mut results = Vec::with_capacity(count);
        for idx in 0..count {
            let page = pages
                .get(idx as u16)
                .map_err(|e| ExtractError::CorruptDocument {
                    detail: format!("page {} could not be loaded: {:?}", idx + 1, e),
                    source: None,
                })?;

            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                ExtractError::CorruptDocument {
                    detail: format!("page {} could not be rendered: {:?}", idx + 1, e),
                    source: None,
                }
            })?;

            let image = DynamicImage::ImageRgb8(bitmap.as_image().to_rgb8());
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            results.push(PageImage::new(idx + 1, image));
        }

        Ok(results)
    }
}

/// Rasterise `document`, honouring the page-limit policy.
///
/// This runs inside `spawn_blocking` since rendering and decoding are CPU-bound.
pub async fn rasterize(
    document: Document,
    requested_limit: usize,
    renderer: Arc<dyn PdfRenderer>,
) -> Result<Vec<PageImage>, ExtractError> {
    tokio::task::spawn_blocking(move || {
        rasterize_blocking(&document, requested_limit, renderer.as_ref())
    })
    .await
    .map_err(|e| ExtractError::Internal(format!("Rasterise task panicked: {}", e)))?
}

/// Blocking implementation of [`rasterize`].
pub fn rasterize_blocking(
    document: &Document,
    requested_limit: usize,
    renderer: &dyn PdfRenderer,
) -> Result<Vec<PageImage>, ExtractError> {
    if document.is_empty() {
        return Err(ExtractError::EmptyDocument {
            detail: "no bytes received".into(),
        });
    }

    match document.kind() {
        DocumentKind::Image => {
            let decoded = image::load_from_memory(document.bytes())
                .map_err(|e| ExtractError::corrupt("image could not be decoded", e))?;
            let image = DynamicImage::ImageRgb8(decoded.to_rgb8());
            debug!("Decoded image → {}x{} px", image.width(), image.height());
            Ok(vec![PageImage::new(1, image)])
        }
        DocumentKind::Pdf => {
            let pages = renderer.render(document.bytes(), requested_limit)?;
            if pages.is_empty() {
                return Err(ExtractError::EmptyDocument {
                    detail: "PDF has no pages".into(),
                });
            }
            if let Some((i, page)) = pages.iter().enumerate().find(|(i, p)| p.number != i + 1) {
                return Err(ExtractError::Internal(format!(
                    "renderer returned page {} at position {}; pages must be numbered 1..={}",
                    page.number,
                    i + 1,
                    pages.len()
                )));
            }
            Ok(pages)
        }
    }
}

/// Total pages in `document` without rendering anything.
pub fn page_count_blocking(
    document: &Document,
    renderer: &dyn PdfRenderer,
) -> Result<usize, ExtractError> {
    if document.is_empty() {
        return Err(ExtractError::EmptyDocument {
            detail: "no bytes received".into(),
        });
    }
    match document.kind() {
        DocumentKind::Image => Ok(1),
        DocumentKind::Pdf => renderer.page_count(document.bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba, RgbaImage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Renders blank pages and records how many it was asked for.
    struct CountingRenderer {
        total: usize,
        rendered: AtomicUsize,
    }

    impl PdfRenderer for CountingRenderer {
        fn page_count(&self, _bytes: &[u8]) -> Result<usize, ExtractError> {
            Ok(self.total)
        }

        fn render(&self, _bytes: &[u8], limit: usize) -> Result<Vec<PageImage>, ExtractError> {
            let n = effective_page_count(self.total, limit);
            self.rendered.store(n, Ordering::SeqCst);
            Ok((1..=n)
                .map(|i| PageImage::new(i, DynamicImage::new_rgb8(8, 4)))
                .collect())
        }
    }

    fn renderer(total: usize) -> CountingRenderer {
        CountingRenderer {
            total,
            rendered: AtomicUsize::new(0),
        }
    }

    #[test]
    fn effective_page_count_policy() {
        assert_eq!(effective_page_count(5, 0), 5);
        assert_eq!(effective_page_count(30, 0), 20);
        assert_eq!(effective_page_count(5, 100), 5);
        assert_eq!(effective_page_count(30, 10), 10);
        assert_eq!(effective_page_count(30, 25), 20);
        assert_eq!(effective_page_count(0, 0), 0);
        assert_eq!(effective_page_count(1, 1), 1);
    }

    #[test]
    fn pdf_pages_are_numbered_from_one() {
        let r = renderer(3);
        let pages = rasterize_blocking(&Document::pdf(b"%PDF-1.4".to_vec()), 0, &r).unwrap();
        let numbers: Vec<usize> = pages.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    /// Returns pages in a fixed, possibly broken, numbering.
    struct NumberingRenderer(Vec<usize>);

    impl PdfRenderer for NumberingRenderer {
        fn page_count(&self, _bytes: &[u8]) -> Result<usize, ExtractError> {
            Ok(self.0.len())
        }

        fn render(&self, _bytes: &[u8], _limit: usize) -> Result<Vec<PageImage>, ExtractError> {
            Ok(self
                .0
                .iter()
                .map(|&n| PageImage::new(n, DynamicImage::new_rgb8(8, 4)))
                .collect())
        }
    }

    #[test]
    fn misnumbered_renderer_output_is_rejected() {
        let doc = Document::pdf(b"%PDF-1.4".to_vec());
        for numbers in [vec![0, 1], vec![1, 3], vec![2, 1], vec![1, 1]] {
            let err = rasterize_blocking(&doc, 0, &NumberingRenderer(numbers.clone())).unwrap_err();
            assert!(matches!(err, ExtractError::Internal(_)), "{numbers:?} got: {err}");
        }
        assert_eq!(
            rasterize_blocking(&doc, 0, &NumberingRenderer(vec![1, 2])).unwrap().len(),
            2
        );
    }

    #[test]
    fn pixel_cap_saturates() {
        assert_eq!(PdfiumRenderer::new(300, 6000, None).pixel_cap(), 6000);
        assert_eq!(PdfiumRenderer::new(300, u32::MAX, None).pixel_cap(), i32::MAX);
    }

    #[test]
    fn unresolvable_pdfium_is_dependency_missing() {
        let dir = tempfile::tempdir().unwrap();
        let r = PdfiumRenderer::new(300, 6000, Some(dir.path().join("libpdfium-missing.so")));
        let doc = Document::pdf(b"%PDF-1.4".to_vec());

        let err = rasterize_blocking(&doc, 0, &r).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::DependencyMissing, "got: {err}");
        let err = page_count_blocking(&doc, &r).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::DependencyMissing, "got: {err}");
    }

    #[test]
    fn pdf_rendering_stops_at_the_ceiling() {
        let r = renderer(30);
        let pages = rasterize_blocking(&Document::pdf(b"%PDF-1.4".to_vec()), 0, &r).unwrap();
        assert_eq!(pages.len(), PAGE_CEILING);
        assert_eq!(r.rendered.load(Ordering::SeqCst), PAGE_CEILING);
    }

    #[test]
    fn pdf_without_pages_is_empty() {
        let r = renderer(0);
        let err = rasterize_blocking(&Document::pdf(b"%PDF-1.4".to_vec()), 0, &r).unwrap_err();
        assert!(matches!(err, ExtractError::EmptyDocument { .. }), "got: {err}");
    }

    #[test]
    fn image_is_a_single_rgb_page() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(6, 3, Rgba([9, 8, 7, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();

        let pages = rasterize_blocking(&Document::image(buf), 5, &renderer(0)).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, 1);
        assert_eq!((pages[0].width(), pages[0].height()), (6, 3));
        assert_eq!(
            pages[0].image.as_rgb8().map(|i| *i.get_pixel(0, 0)),
            Some(Rgb([9, 8, 7]))
        );
    }

    #[test]
    fn undecodable_image_is_corrupt() {
        let err =
            rasterize_blocking(&Document::image(b"not an image".to_vec()), 0, &renderer(0))
                .unwrap_err();
        assert!(matches!(err, ExtractError::CorruptDocument { .. }), "got: {err}");
    }

    #[test]
    fn empty_bytes_are_an_empty_document() {
        let err = rasterize_blocking(&Document::pdf(Vec::new()), 0, &renderer(3)).unwrap_err();
        assert!(matches!(err, ExtractError::EmptyDocument { .. }));
    }

    #[test]
    fn page_count_for_images_is_one() {
        let doc = Document::image(vec![1, 2, 3]);
        assert_eq!(page_count_blocking(&doc, &renderer(9)).unwrap(), 1);
        let doc = Document::pdf(b"%PDF".to_vec());
        assert_eq!(page_count_blocking(&doc, &renderer(9)).unwrap(), 9);
    }

    #[tokio::test]
    async fn async_rasterize_runs_off_the_runtime() {
        let pages = rasterize(Document::pdf(b"%PDF-1.4".to_vec()), 2, Arc::new(renderer(5)))
            .await
            .unwrap();
        assert_eq!(pages.len(), 2);
    }
}
