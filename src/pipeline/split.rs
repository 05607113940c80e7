//! Double-page scan splitting.
//!
//! A scanned spread is cut at `width / 2`: the left half covers columns
//! `[0, mid)` and the right half `[mid, width)`, so the halves never overlap
//! and together cover every column. An odd width puts the extra column on
//! the right.

use crate::document::{PageImage, PageUnit, UnitPart};
use crate::error::ExtractError;

/// Split one page into its left and right halves.
pub fn split_page(page: &PageImage) -> Result<[PageUnit; 2], ExtractError> {
    let (width, height) = (page.width(), page.height());
    if width < 2 || height == 0 {
        return Err(ExtractError::InvalidImage {
            page: page.number,
            detail: format!("cannot split a {width}x{height} image into two halves"),
        });
    }

    let mid = width / 2;
    let left = page.image.crop_imm(0, 0, mid, height);
    let right = page.image.crop_imm(mid, 0, width - mid, height);

    Ok([
        PageUnit {
            page: page.number,
            part: UnitPart::Left,
            image: left,
        },
        PageUnit {
            page: page.number,
            part: UnitPart::Right,
            image: right,
        },
    ])
}

/// Flatten pages into the ordered unit sequence a run extracts.
///
/// With `split` off every page becomes one `Whole` unit; with it on every
/// page becomes `Left` then `Right`.
pub fn expand_units(pages: Vec<PageImage>, split: bool) -> Result<Vec<PageUnit>, ExtractError> {
    if !split {
        return Ok(pages.into_iter().map(PageUnit::whole).collect());
    }

    let mut units = Vec::with_capacity(pages.len() * 2);
    for page in &pages {
        units.extend(split_page(page)?);
    }
    Ok(units)
}
