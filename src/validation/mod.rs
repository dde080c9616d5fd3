//! Record validation.
//!
//! Checks records for the problems that would make COCO conversion fail or
//! quietly skew evaluation:
//! - Structural integrity (equal annotation lengths, unique image ids)
//! - Field shapes (labels, dimensions, boxes, masks, crowd flags)
//! - Geometric sanity (finite, ordered boxes inside the image)

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::HashMap;

use crate::record::{fields, FieldValue, ImageId, Record};

#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// If true, treat warnings as errors.
    pub strict: bool,
}

/// Validates records and returns every issue found.
///
/// Never stops early; callers decide whether errors are fatal.
pub fn validate_records<'a, I>(records: I, _opts: &ValidateOptions) -> ValidationReport
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut report = ValidationReport::new();
    let mut seen_ids: HashMap<ImageId, usize> = HashMap::new();

    for (idx, record) in records.into_iter().enumerate() {
        if let Some(first_idx) = seen_ids.get(&record.imageid) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateImageId,
                format!(
                    "Duplicate image id {} (first seen at index {})",
                    record.imageid, first_idx
                ),
                IssueContext::image(record.imageid),
            ));
        } else {
            seen_ids.insert(record.imageid, idx);
        }

        validate_record(record, &mut report);
    }

    report
}

/// Checks only that annotation fields have equal lengths.
pub fn check_annotation_lengths(record: &Record, report: &mut ValidationReport) {
    let lengths = record.annotation_lengths();
    if !lengths.all_equal() {
        report.add(ValidationIssue::error(
            IssueCode::AnnotationLengthMismatch,
            format!("Inconsistent number of annotations: {}", lengths),
            IssueContext::image(record.imageid),
        ));
    }
}

fn validate_record(record: &Record, report: &mut ValidationReport) {
    check_annotation_lengths(record, report);

    if !record.annotations.is_empty() && !record.has_annotations(fields::LABELS) {
        report.add(ValidationIssue::warning(
            IssueCode::MissingLabels,
            "Record has annotation fields but no labels",
            IssueContext::image(record.imageid),
        ));
    }

    let dims = validate_info(record, report);

    for (index, label) in record
        .annotations(fields::LABELS)
        .unwrap_or_default()
        .iter()
        .enumerate()
    {
        if !matches!(label.as_int(), Some(v) if v >= 0) {
            report.add(ValidationIssue::error(
                IssueCode::InvalidLabel,
                format!("Label must be a non-negative integer, found {}", label.kind()),
                IssueContext::annotation(record.imageid, index),
            ));
        }
    }

    for (index, value) in record
        .annotations(fields::BBOXES)
        .unwrap_or_default()
        .iter()
        .enumerate()
    {
        validate_bbox(record.imageid, index, value, dims, report);
    }

    for (index, value) in record
        .annotations(fields::MASKS)
        .unwrap_or_default()
        .iter()
        .enumerate()
    {
        if value.as_mask().is_none() {
            report.add(ValidationIssue::error(
                IssueCode::UnsupportedMask,
                format!("Mask type '{}' unsupported", value.kind()),
                IssueContext::annotation(record.imageid, index),
            ));
        }
    }

    for (index, value) in record
        .annotations(fields::ISCROWDS)
        .unwrap_or_default()
        .iter()
        .enumerate()
    {
        let ok = value.as_bool().is_some() || matches!(value.as_int(), Some(0 | 1));
        if !ok {
            report.add(ValidationIssue::error(
                IssueCode::InvalidIsCrowd,
                "iscrowd must be 0, 1 or a bool",
                IssueContext::annotation(record.imageid, index),
            ));
        }
    }
}

/// Returns `(width, height)` when both are valid.
fn validate_info(record: &Record, report: &mut ValidationReport) -> Option<(f64, f64)> {
    if let Some(path) = record.info(fields::FILEPATH) {
        if path.as_text().map(str::is_empty).unwrap_or(true) {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyFileName,
                "Empty or non-text filepath",
                IssueContext::image(record.imageid),
            ));
        }
    }

    let width = record.info(fields::WIDTH);
    let height = record.info(fields::HEIGHT);
    if width.is_none() && height.is_none() {
        return None;
    }

    match (record.require_u32(fields::WIDTH), record.require_u32(fields::HEIGHT)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => Some((w as f64, h as f64)),
        _ => {
            report.add(ValidationIssue::error(
                IssueCode::InvalidImageDimensions,
                format!(
                    "Invalid dimensions {}x{} (must be positive integers)",
                    describe(width),
                    describe(height)
                ),
                IssueContext::image(record.imageid),
            ));
            None
        }
    }
}

fn describe(value: Option<&FieldValue>) -> String {
    match value {
        Some(FieldValue::Int(v)) => v.to_string(),
        Some(other) => other.kind().to_string(),
        None => "missing".to_string(),
    }
}

fn validate_bbox(
    imageid: ImageId,
    index: usize,
    value: &FieldValue,
    dims: Option<(f64, f64)>,
    report: &mut ValidationReport,
) {
    let ctx = || IssueContext::annotation(imageid, index);

    let Some(bbox) = value.as_bbox() else {
        report.add(ValidationIssue::error(
            IssueCode::NotABBox,
            format!("Expected a bbox, found {}", value.kind()),
            ctx(),
        ));
        return;
    };

    if !bbox.is_finite() {
        report.add(ValidationIssue::error(
            IssueCode::BBoxNotFinite,
            "Bounding box has non-finite coordinates",
            ctx(),
        ));
        return;
    }

    if !bbox.is_ordered() {
        report.add(ValidationIssue::error(
            IssueCode::InvalidBBoxOrdering,
            format!(
                "Bounding box has min > max: ({}, {}, {}, {})",
                bbox.xmin, bbox.ymin, bbox.xmax, bbox.ymax
            ),
            ctx(),
        ));
    }

    if let Some((w, h)) = dims {
        if bbox.xmin < 0.0 || bbox.ymin < 0.0 || bbox.xmax > w || bbox.ymax > h {
            report.add(ValidationIssue::warning(
                IssueCode::BBoxOutOfBounds,
                format!("Bounding box extends outside the {}x{} image", w, h),
                ctx(),
            ));
        }
    }
}
