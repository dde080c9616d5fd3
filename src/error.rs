use std::path::PathBuf;
use thiserror::Error;

use crate::record::{FieldLengths, ImageId};
use crate::validation::ValidationReport;

/// The main error type for record parsing and conversion.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse records JSON from {path:?}: {source}")]
    RecordsJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize COCO dataset: {source}")]
    CocoJsonWrite {
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write JSON output: {source}")]
    JsonWrite {
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "imageid->{imageid} has an inconsistent number of annotations, \
         all annotations must have the same length. Number of annotations: {lengths}"
    )]
    InconsistentAnnotations {
        imageid: String,
        lengths: FieldLengths,
    },

    #[error("Mismatched length of annotation fields for image {imageid}: {lengths}")]
    MismatchedLength {
        imageid: ImageId,
        lengths: FieldLengths,
    },

    #[error("Mask type '{found}' unsupported for image {imageid}, expected polygon, RLE or mask file")]
    UnsupportedMask { imageid: ImageId, found: &'static str },

    #[error("Image {imageid} is missing required field '{field}'")]
    MissingField { imageid: ImageId, field: String },

    #[error("Field '{field}' of image {imageid} should be {expected}, found {found}")]
    FieldType {
        imageid: ImageId,
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Got {records} ground-truth record(s) but {preds} prediction record(s)")]
    RecordCountMismatch { records: usize, preds: usize },

    #[error("Prediction {index} is for '{found}' but ground truth at that position is '{expected}'")]
    MisalignedPrediction {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("Invalid split: {message}")]
    InvalidSplit { message: String },

    #[error("Splitter returned image {id}, which was not parsed or is already in a split")]
    UnknownImageId { id: ImageId },

    #[error("Invalid RLE: {message}")]
    InvalidRle { message: String },

    #[error("Failed to load mask {path:?}: {message}")]
    MaskLoad { path: PathBuf, message: String },

    #[error("Mask {path:?} is {}x{}, expected {}x{}", .found.0, .found.1, .expected.0, .expected.1)]
    MaskSize {
        path: PathBuf,
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}
