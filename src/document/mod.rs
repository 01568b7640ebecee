//! Sign-off document model and the pipeline that builds it.
//!
//! A submission is laid out into a [`DocumentArtifact`] (pages of positioned
//! blocks) by the [`assembler`], then serialized to PDF bytes by [`render`].
//! Keeping the two apart lets the layout rules be checked without parsing PDF.

pub mod assembler;
pub mod asset;
pub mod fonts;
pub mod layout;
pub mod raster;
pub mod render;

use chrono::{DateTime, Local};

use self::asset::AssetSlot;
use self::fonts::FontStyle;
use self::raster::RasterImage;

/// A fully laid out document, ready to be rendered.
#[derive(Debug)]
pub struct DocumentArtifact {
    pub title: String,
    pub generated_at: DateTime<Local>,
    pub pages: Vec<Page>,
    /// Decoded images, referenced by index from [`ImageBlock::image`].
    pub images: Vec<RasterImage>,
}

#[derive(Debug, Default)]
pub struct Page {
    pub blocks: Vec<Block>,
}

#[derive(Debug)]
pub enum Block {
    Text(TextBlock),
    Image(ImageBlock),
}

/// One line of text. `y` is the top of the line, measured down from the top
/// edge of the page.
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub color: Rgb,
    pub runs: Vec<Run>,
}

impl TextBlock {
    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub style: FontStyle,
    pub text: String,
}

impl Run {
    pub fn regular(text: impl Into<String>) -> Self {
        Self {
            style: FontStyle::Regular,
            text: text.into(),
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            style: FontStyle::Bold,
            text: text.into(),
        }
    }
}

/// A placed image. Coordinates follow the same top-down convention as text.
#[derive(Debug, Clone)]
pub struct ImageBlock {
    pub slot: AssetSlot,
    pub image: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);

    pub const fn hex(value: u32) -> Self {
        Rgb(
            ((value >> 16) & 0xff) as f32 / 255.0,
            ((value >> 8) & 0xff) as f32 / 255.0,
            (value & 0xff) as f32 / 255.0,
        )
    }
}

impl DocumentArtifact {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Text lines of one page, top to bottom.
    pub fn page_lines(&self, page: usize) -> Vec<String> {
        self.pages
            .get(page)
            .map(|p| {
                p.blocks
                    .iter()
                    .filter_map(|block| match block {
                        Block::Text(text) => Some(text.text()),
                        Block::Image(_) => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every text line in document order.
    pub fn lines(&self) -> Vec<String> {
        (0..self.pages.len())
            .flat_map(|page| self.page_lines(page))
            .collect()
    }

    /// Placed images as `(page index, slot)` in document order.
    pub fn placed_images(&self) -> Vec<(usize, AssetSlot)> {
        self.pages
            .iter()
            .enumerate()
            .flat_map(|(index, page)| {
                page.blocks.iter().filter_map(move |block| match block {
                    Block::Image(image) => Some((index, image.slot)),
                    Block::Text(_) => None,
                })
            })
            .collect()
    }
}
