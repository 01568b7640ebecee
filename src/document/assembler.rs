use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};

use super::asset::{decode_data_url, AssetFault, AssetSlot, FaultSink};
use super::layout::{Align, BoundingBox, PageCursor};
use super::raster::RasterImage;
use super::{DocumentArtifact, Rgb, Run};
use crate::submission::record::SubmissionRecord;

pub const TITLE: &str = "OSD – Driver Sign-Off";
pub const NO_NOTES: &str = "(none)";
pub const NO_SIGNATURE: &str = "(no signature provided)";
pub const SIGNATURE_FAILED: &str = "(signature failed to render)";
pub const COMPANION_NOTICE: &str = "BOL PDF provided (attached to email).";

const TITLE_SIZE: f32 = 20.0;
const BODY_SIZE: f32 = 10.0;
const PHOTOS_HEADING_SIZE: f32 = 16.0;

const SLATE: Rgb = Rgb::hex(0x475569);
const INK: Rgb = Rgb::hex(0x0f172a);

const BOL_IMAGE_BOX: BoundingBox = BoundingBox::new(520.0, 360.0);
const SIGNATURE_BOX: BoundingBox = BoundingBox::new(420.0, 120.0);
const PHOTO_BOX: BoundingBox = BoundingBox::new(520.0, 280.0);

/// What a slot renders when its asset is missing or fails to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Omit,
    Placeholder(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPolicy {
    pub when_absent: Fallback,
    pub when_faulted: Fallback,
}

pub fn policy_for(slot: AssetSlot) -> SlotPolicy {
    match slot {
        AssetSlot::Signature => SlotPolicy {
            when_absent: Fallback::Placeholder(NO_SIGNATURE),
            when_faulted: Fallback::Placeholder(SIGNATURE_FAILED),
        },
        AssetSlot::BolImage | AssetSlot::CompanionPdf | AssetSlot::Photo(_) => SlotPolicy {
            when_absent: Fallback::Omit,
            when_faulted: Fallback::Omit,
        },
    }
}

/// Lays a submission out into a [`DocumentArtifact`].
///
/// Assembly cannot fail. Each optional asset is decoded on its own; a
/// failure is reported to the fault sink and the slot's [`SlotPolicy`]
/// decides what, if anything, is rendered in its place.
pub struct Assembler<'a> {
    reference: &'a str,
    faults: &'a dyn FaultSink,
    generated_at: DateTime<Local>,
}

impl<'a> Assembler<'a> {
    pub fn new(reference: &'a str, faults: &'a dyn FaultSink) -> Self {
        Self {
            reference,
            faults,
            generated_at: Local::now(),
        }
    }

    pub fn generated_at(mut self, at: DateTime<Local>) -> Self {
        self.generated_at = at;
        self
    }

    pub fn assemble(&self, record: &SubmissionRecord) -> DocumentArtifact {
        let mut doc = DocumentBuilder::default();

        doc.cursor.text(&[Run::regular(TITLE)], TITLE_SIZE, Rgb::BLACK);
        doc.cursor.move_down(TITLE_SIZE, 0.5);
        doc.cursor.text(
            &[Run::regular(format!("Generated: {}", format_local(&self.generated_at)))],
            BODY_SIZE,
            SLATE,
        );
        doc.cursor.move_down(BODY_SIZE, 1.0);

        for (label, value) in scalar_rows(record) {
            doc.row(label, &value);
        }

        if let Some(data_url) = &record.bol_photo_data_url {
            if let Some(image) = self.load(AssetSlot::BolImage, data_url) {
                doc.cursor.move_down(BODY_SIZE, 1.0);
                doc.cursor.text(&[Run::bold("BOL Image")], BODY_SIZE, INK);
                doc.place(AssetSlot::BolImage, image, BOL_IMAGE_BOX, Align::Center);
            } else {
                doc.fallback(policy_for(AssetSlot::BolImage).when_faulted);
            }
        }

        if record.bol_pdf_data_url.is_some() {
            doc.cursor.move_down(BODY_SIZE, 1.0);
            doc.cursor.text(&[Run::regular(COMPANION_NOTICE)], BODY_SIZE, INK);
        }

        doc.cursor.move_down(BODY_SIZE, 1.0);
        doc.cursor.text(&[Run::bold("Notes / Exceptions")], BODY_SIZE, INK);
        let notes = record.notes.as_deref().unwrap_or(NO_NOTES);
        doc.cursor.text(&[Run::regular(notes)], BODY_SIZE, INK);
        doc.cursor.move_down(BODY_SIZE, 1.0);

        doc.row("Driver Name:", record.driver_name.as_deref().unwrap_or_default());
        doc.row("Driver ID / PRO:", record.driver_id.as_deref().unwrap_or_default());
        doc.cursor.move_down(BODY_SIZE, 0.5);

        let signature = AssetSlot::Signature;
        match &record.signature_data_url {
            Some(data_url) => match self.load(signature, data_url) {
                Some(image) => {
                    doc.cursor.text(&[Run::regular("Signature:")], BODY_SIZE, INK);
                    doc.place(signature, image, SIGNATURE_BOX, Align::Left);
                }
                None => doc.fallback(policy_for(signature).when_faulted),
            },
            None => doc.fallback(policy_for(signature).when_absent),
        }

        // Photos are decoded up front so the page only exists if one survives.
        let photos: Vec<(AssetSlot, RasterImage)> = record
            .photos
            .iter()
            .enumerate()
            .filter_map(|(index, photo)| {
                let slot = AssetSlot::Photo(index);
                let data_url = photo.data_url.as_deref().unwrap_or_default();
                self.load(slot, data_url).map(|image| (slot, image))
            })
            .collect();

        if !photos.is_empty() {
            doc.cursor.add_page();
            doc.cursor
                .text(&[Run::bold("Photos")], PHOTOS_HEADING_SIZE, INK);
            doc.cursor.move_down(PHOTOS_HEADING_SIZE, 1.0);
            for (slot, image) in photos {
                doc.place(slot, image, PHOTO_BOX, Align::Center);
                doc.cursor.move_down(PHOTOS_HEADING_SIZE, 1.0);
            }
        }

        doc.finish(format!("OSD Sign-Off {}", self.reference), self.generated_at)
    }

    fn load(&self, slot: AssetSlot, data_url: &str) -> Option<RasterImage> {
        let loaded = decode_data_url(data_url)
            .map_err(|e| AssetFault::new(slot, e))
            .and_then(|bytes| RasterImage::decode(&bytes).map_err(|e| AssetFault::new(slot, e)));

        match loaded {
            Ok(image) => Some(image),
            Err(fault) => {
                self.faults.report(self.reference, &fault);
                None
            }
        }
    }
}

#[derive(Default)]
struct DocumentBuilder {
    cursor: PageCursor,
    images: Vec<RasterImage>,
}

impl DocumentBuilder {
    fn row(&mut self, label: &str, value: &str) {
        self.cursor.text(
            &[Run::bold(label), Run::regular(format!(" {value}"))],
            BODY_SIZE,
            INK,
        );
    }

    fn place(&mut self, slot: AssetSlot, image: RasterImage, bounds: BoundingBox, align: Align) {
        let natural = (image.width, image.height);
        self.images.push(image);
        self.cursor
            .image(slot, self.images.len() - 1, natural, bounds, align);
    }

    fn fallback(&mut self, fallback: Fallback) {
        if let Fallback::Placeholder(text) = fallback {
            self.cursor.text(&[Run::regular(text)], BODY_SIZE, INK);
        }
    }

    fn finish(self, title: String, generated_at: DateTime<Local>) -> DocumentArtifact {
        DocumentArtifact {
            title,
            generated_at,
            pages: self.cursor.finish(),
            images: self.images,
        }
    }
}

fn scalar_rows(record: &SubmissionRecord) -> [(&'static str, String); 10] {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    [
        ("Date/Time:", record.date.as_deref().map(format_date).unwrap_or_default()),
        ("Location:", text(&record.location)),
        ("Load ID / BOL #:", text(&record.bol)),
        ("PO Number:", text(&record.po)),
        ("Digital BOL Link / Load #:", text(&record.bol_link)),
        ("Stop #:", text(&record.stop)),
        ("Carrier:", text(&record.carrier)),
        ("Vendor ID:", text(&record.vendor_id)),
        ("Vendor Name:", text(&record.vendor_name)),
        ("Trailer #:", text(&record.trailer_number)),
    ]
}

pub fn format_local(at: &DateTime<Local>) -> String {
    at.format("%m/%d/%Y, %-I:%M:%S %p").to_string()
}

/// Render a submitted date in local time, or verbatim when it is not a
/// recognizable timestamp.
pub fn format_date(raw: &str) -> String {
    let trimmed = raw.trim();

    if let Ok(at) = DateTime::parse_from_rfc3339(trimmed) {
        return format_local(&at.with_timezone(&Local));
    }

    let naive = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        });

    match naive.and_then(|n| Local.from_local_datetime(&n).earliest()) {
        Some(at) => format_local(&at),
        None => raw.to_string(),
    }
}
