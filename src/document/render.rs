use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::fonts::{encode_win_ansi, FontStyle, ASCENT};
use super::layout::{PAGE_HEIGHT, PAGE_WIDTH};
use super::raster::RasterImage;
use super::{Block, DocumentArtifact, ImageBlock, TextBlock};

const PRODUCER: &str = concat!("osd-signoff ", env!("CARGO_PKG_VERSION"));

#[derive(Debug)]
pub struct RenderError(String);

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for RenderError {}

impl From<lopdf::Error> for RenderError {
    fn from(err: lopdf::Error) -> Self {
        RenderError(err.to_string())
    }
}

/// Serialize a laid out document to PDF bytes.
pub fn render(artifact: &DocumentArtifact) -> Result<Vec<u8>, RenderError> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for style in FontStyle::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => style.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(style.resource_name(), font_id);
    }

    let image_ids: Vec<ObjectId> = artifact
        .images
        .iter()
        .map(|image| add_image(&mut doc, image))
        .collect();

    let mut kids = Vec::with_capacity(artifact.pages.len());
    for page in &artifact.pages {
        let mut operations = Vec::new();
        let mut xobjects = Dictionary::new();

        for block in &page.blocks {
            match block {
                Block::Text(text) => text_operations(&mut operations, text),
                Block::Image(image) => {
                    let name = image_name(image.image);
                    let id = image_ids
                        .get(image.image)
                        .copied()
                        .ok_or_else(|| RenderError(format!("missing image {}", image.image)))?;
                    xobjects.set(name.as_str(), id);
                    image_operations(&mut operations, image, &name);
                }
            }
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Real(PAGE_WIDTH), Object::Real(PAGE_HEIGHT)],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => fonts.clone(),
                "XObject" => xobjects,
            },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(artifact.title.as_str()),
        "Producer" => Object::string_literal(PRODUCER),
        "CreationDate" => Object::string_literal(
            artifact.generated_at.format("D:%Y%m%d%H%M%S").to_string(),
        ),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| RenderError(format!("failed to write PDF: {e}")))?;
    Ok(bytes)
}

fn image_name(index: usize) -> String {
    format!("Im{}", index + 1)
}

fn add_image(doc: &mut Document, image: &RasterImage) -> ObjectId {
    let smask_id = image.alpha.as_ref().map(|alpha| {
        doc.add_object(
            Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => image.width as i64,
                    "Height" => image.height as i64,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                    "Filter" => "FlateDecode",
                },
                alpha.clone(),
            )
            .with_compression(false),
        )
    });

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => image.width as i64,
        "Height" => image.height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };
    if let Some(id) = smask_id {
        dict.set("SMask", id);
    }

    doc.add_object(Stream::new(dict, image.rgb.clone()).with_compression(false))
}

fn text_operations(operations: &mut Vec<Operation>, block: &TextBlock) {
    if block.runs.iter().all(|run| run.text.is_empty()) {
        return;
    }

    let baseline = PAGE_HEIGHT - block.y - block.size * ASCENT;
    let color = block.color;

    operations.push(Operation::new("BT", vec![]));
    operations.push(Operation::new(
        "rg",
        vec![Object::Real(color.0), Object::Real(color.1), Object::Real(color.2)],
    ));
    operations.push(Operation::new(
        "Td",
        vec![Object::Real(block.x), Object::Real(baseline)],
    ));
    for run in &block.runs {
        operations.push(Operation::new(
            "Tf",
            vec![
                Object::Name(run.style.resource_name().as_bytes().to_vec()),
                Object::Real(block.size),
            ],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(encode_win_ansi(&run.text), StringFormat::Literal)],
        ));
    }
    operations.push(Operation::new("ET", vec![]));
}

fn image_operations(operations: &mut Vec<Operation>, block: &ImageBlock, name: &str) {
    let bottom = PAGE_HEIGHT - block.y - block.height;

    operations.push(Operation::new("q", vec![]));
    operations.push(Operation::new(
        "cm",
        vec![
            Object::Real(block.width),
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(block.height),
            Object::Real(block.x),
            Object::Real(bottom),
        ],
    ));
    operations.push(Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]));
    operations.push(Operation::new("Q", vec![]));
}
