//! COCO-style conversion of records.
//!
//! [`records_to_coco`] reshapes records into the `images` / `annotations` /
//! `categories` dictionary COCO evaluation tooling consumes. Per record, the
//! annotation fields are zipped by position:
//!
//! | record field | COCO key      | when absent                         |
//! |--------------|---------------|-------------------------------------|
//! | `labels`     | `category_id` | error                               |
//! | `bboxes`     | `bbox` (xywh) | omitted                             |
//! | `areas`      | `area`        | bbox area, or omitted without boxes |
//! | `masks`      | `segmentation`| omitted                             |
//! | `iscrowds`   | `iscrowd`     | all zero                            |
//! | `scores`     | `score`       | omitted                             |
//!
//! # Deterministic Output
//!
//! Annotation ids are `1..=n` over the flattened annotation order (record
//! order, then position within the record). Categories are sorted by id.

pub mod eval;
mod index;

pub use index::{coco_api_from_preds, coco_api_from_records, CocoIndex};

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::RecordError;
use crate::progress;
use crate::record::{
    fields, AnnotationId, BBox, CategoryId, FieldLengths, FieldValue, ImageId, Mask, Record,
    Segmentation,
};

// ============================================================================
// COCO Schema Types
// ============================================================================

/// A COCO dataset dictionary. Each section is present only if requested.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoDataset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<CocoImage>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Vec<CocoAnnotation>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<CocoCategory>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CocoImage {
    pub id: ImageId,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CocoAnnotation {
    pub id: AnnotationId,
    pub image_id: ImageId,
    pub category_id: CategoryId,

    /// COCO bbox format: [x, y, width, height] with (x,y) as top-left corner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentation: Option<Segmentation>,

    pub iscrowd: u8,

    /// Score/confidence for detection results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Categories carry only their id; records have no category metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CocoCategory {
    pub id: CategoryId,
}

// ============================================================================
// Public API
// ============================================================================

/// Which sections to produce.
#[derive(Clone, Debug)]
pub struct CocoOptions {
    pub images: bool,
    pub annotations: bool,
    pub categories: bool,
    pub show_progress: bool,
}

impl Default for CocoOptions {
    fn default() -> Self {
        Self {
            images: true,
            annotations: true,
            categories: true,
            show_progress: false,
        }
    }
}

impl CocoOptions {
    /// Annotations only: predictions refer to images and categories that the
    /// ground truth already defines.
    pub fn predictions() -> Self {
        Self {
            images: false,
            categories: false,
            ..Self::default()
        }
    }
}

/// Converts records into a COCO dataset dictionary.
///
/// Categories are the distinct category ids of the included annotations, so
/// they are empty when annotations are excluded.
///
/// # Errors
/// Fails on the first record that is missing a required field, holds a value
/// of the wrong kind, or whose annotation fields (after mask expansion) have
/// different lengths. No partial output is returned.
///
/// # Example
/// ```
/// use coco_records::coco::{records_to_coco, CocoOptions};
/// use coco_records::record::{fields, BBox, Record};
///
/// let record = Record::new(1u64)
///     .with_info(fields::FILEPATH, "images/a.jpg")
///     .with_info(fields::WIDTH, 10u32)
///     .with_info(fields::HEIGHT, 20u32)
///     .with_annotations(fields::LABELS, [3i64])
///     .with_annotations(fields::BBOXES, [BBox::from_xywh(1.0, 1.0, 2.0, 2.0)]);
///
/// let coco = records_to_coco(&[record], &CocoOptions::default())?;
/// assert_eq!(coco.images.unwrap()[0].file_name, "a.jpg");
/// assert_eq!(coco.annotations.unwrap()[0].area, Some(4.0));
/// # Ok::<(), coco_records::RecordError>(())
/// ```
pub fn records_to_coco(records: &[Record], opts: &CocoOptions) -> Result<CocoDataset, RecordError> {
    let pb = progress::bar(opts.show_progress, records.len() as u64, "Converting records");

    let mut images = Vec::new();
    let mut annotations = Vec::new();
    for record in records {
        if opts.images {
            images.push(record_to_image(record)?);
        }
        if opts.annotations {
            annotations.extend(record_to_annotations(record)?);
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    // annotation ids start at 1
    for (k, annotation) in annotations.iter_mut().enumerate() {
        annotation.id = AnnotationId::new(k as u64 + 1);
    }

    let categories = opts.categories.then(|| {
        annotations
            .iter()
            .map(|ann| ann.category_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|id| CocoCategory { id })
            .collect::<Vec<_>>()
    });

    debug!(
        "converted {} record(s) into {} image(s), {} annotation(s), {} categorie(s)",
        records.len(),
        images.len(),
        annotations.len(),
        categories.as_ref().map_or(0, Vec::len)
    );

    Ok(CocoDataset {
        images: opts.images.then_some(images),
        annotations: opts.annotations.then_some(annotations),
        categories,
    })
}

/// Converts prediction records: annotations only.
pub fn preds_to_coco(preds: &[Record]) -> Result<CocoDataset, RecordError> {
    records_to_coco(preds, &CocoOptions::predictions())
}

/// Fuzz-only entrypoint: parse records JSON, validate it, then convert.
#[cfg(feature = "fuzzing")]
pub fn fuzz_records_to_coco(data: &[u8]) -> Result<(), RecordError> {
    let records = crate::record::io_json::from_records_slice(data).map_err(|source| {
        RecordError::RecordsJsonParse {
            path: "<fuzz>".into(),
            source,
        }
    })?;
    let _ = crate::validation::validate_records(&records, &Default::default());
    records_to_coco(&records, &CocoOptions::default())?;
    Ok(())
}

/// Writes a COCO dataset to a JSON string.
pub fn to_coco_string(dataset: &CocoDataset) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(dataset)
}

pub fn to_coco_value(dataset: &CocoDataset) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(dataset)
}

// ============================================================================
// Conversion: Record -> COCO
// ============================================================================

fn record_to_image(record: &Record) -> Result<CocoImage, RecordError> {
    let filepath = record.require_text(fields::FILEPATH)?;
    let file_name = Path::new(filepath)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| filepath.to_string());

    Ok(CocoImage {
        id: record.imageid,
        file_name,
        width: record.require_u32(fields::WIDTH)?,
        height: record.require_u32(fields::HEIGHT)?,
    })
}

/// Reads an optional annotation field, converting every entry with `read`.
fn column<T>(
    record: &Record,
    name: &str,
    expected: &'static str,
    read: impl Fn(&FieldValue) -> Option<T>,
) -> Result<Option<Vec<T>>, RecordError> {
    let Some(values) = record.annotations(name) else {
        return Ok(None);
    };

    values
        .iter()
        .map(|value| read(value).ok_or_else(|| record.type_error(name, expected, value)))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn read_category(value: &FieldValue) -> Option<CategoryId> {
    value
        .as_int()
        .and_then(|v| u64::try_from(v).ok())
        .map(CategoryId::new)
}

fn read_iscrowd(value: &FieldValue) -> Option<u8> {
    match value {
        FieldValue::Bool(b) => Some(u8::from(*b)),
        FieldValue::Int(v @ (0 | 1)) => Some(*v as u8),
        _ => None,
    }
}

fn record_segmentations(record: &Record) -> Result<Option<Vec<Segmentation>>, RecordError> {
    let Some(masks) = record.annotations(fields::MASKS) else {
        return Ok(None);
    };

    let mut size = None;
    let mut segmentations = Vec::with_capacity(masks.len());
    for value in masks {
        let mask = value.as_mask().ok_or(RecordError::UnsupportedMask {
            imageid: record.imageid,
            found: value.kind(),
        })?;
        if let Mask::Polygon(polygon) = mask {
            segmentations.push(Segmentation::Polygon(polygon.points.clone()));
            continue;
        }

        // only pixel masks need the image size
        let (height, width) = match size {
            Some(known) => known,
            None => *size.insert((
                record.require_u32(fields::HEIGHT)?,
                record.require_u32(fields::WIDTH)?,
            )),
        };
        // a mask file may expand to several instances
        segmentations.extend(mask.to_coco_segmentation(height, width)?);
    }
    Ok(Some(segmentations))
}

fn record_to_annotations(record: &Record) -> Result<Vec<CocoAnnotation>, RecordError> {
    let categories = column(record, fields::LABELS, "non-negative int", read_category)?.ok_or_else(
        || RecordError::MissingField {
            imageid: record.imageid,
            field: fields::LABELS.to_string(),
        },
    )?;
    let bboxes = column(record, fields::BBOXES, "bbox", |v| v.as_bbox().copied())?;
    let areas = column(record, fields::AREAS, "float", FieldValue::as_float)?;
    let segmentations = record_segmentations(record)?;
    let iscrowds = column(record, fields::ISCROWDS, "0/1", read_iscrowd)?;
    let scores = column(record, fields::SCORES, "float", FieldValue::as_float)?;

    // Only fields the record carries take part; defaults are filled in after.
    let mut lengths = BTreeMap::new();
    lengths.insert(fields::LABELS.to_string(), categories.len());
    let present = [
        (fields::BBOXES, bboxes.as_ref().map(Vec::len)),
        (fields::AREAS, areas.as_ref().map(Vec::len)),
        (fields::MASKS, segmentations.as_ref().map(Vec::len)),
        (fields::ISCROWDS, iscrowds.as_ref().map(Vec::len)),
        (fields::SCORES, scores.as_ref().map(Vec::len)),
    ];
    for (name, len) in present {
        if let Some(len) = len {
            lengths.insert(name.to_string(), len);
        }
    }
    let lengths = FieldLengths(lengths);
    if !lengths.all_equal() {
        return Err(RecordError::MismatchedLength {
            imageid: record.imageid,
            lengths,
        });
    }

    let areas = areas.or_else(|| bboxes.as_ref().map(|b| b.iter().map(BBox::area).collect()));
    let iscrowds = iscrowds.unwrap_or_else(|| vec![0; categories.len()]);

    let mut segmentations = segmentations.map(Vec::into_iter);
    let annotations = categories
        .into_iter()
        .enumerate()
        .map(|(i, category_id)| CocoAnnotation {
            id: AnnotationId::new(0),
            image_id: record.imageid,
            category_id,
            bbox: bboxes.as_ref().map(|b| b[i].to_xywh()),
            area: areas.as_ref().map(|a| a[i]),
            segmentation: segmentations.as_mut().and_then(Iterator::next),
            iscrowd: iscrowds[i],
            score: scores.as_ref().map(|s| s[i]),
        })
        .collect();

    Ok(annotations)
}
