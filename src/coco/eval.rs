//! Evaluation adapter: hands ground truth and predictions to a COCO engine.
//!
//! The crate does not compute metrics itself. An engine implements
//! [`CocoEvaluator`] and receives both sides already converted and indexed,
//! with prediction image ids aligned to the ground truth.

use std::fmt;

use log::debug;

use crate::error::RecordError;
use crate::record::{fields, Record};

use super::{coco_api_from_preds, coco_api_from_records, CocoIndex};

/// Kind of overlap a COCO evaluation measures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricType {
    BBox,
    Segm,
    Keypoints,
}

impl MetricType {
    /// The COCO `iouType` string.
    pub fn iou_type(&self) -> &'static str {
        match self {
            MetricType::BBox => "bbox",
            MetricType::Segm => "segm",
            MetricType::Keypoints => "keypoints",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.iou_type())
    }
}

/// A COCO evaluation engine.
pub trait CocoEvaluator {
    /// Whatever the engine hands back: a finished result or a handle to run.
    type Handle;

    fn evaluate(
        &self,
        ground_truth: CocoIndex,
        predictions: CocoIndex,
        metric: MetricType,
    ) -> Result<Self::Handle, RecordError>;
}

/// Builds an evaluation handle for `preds` against `records`.
///
/// Predictions are matched to records by position. Each prediction's
/// `imageid` is overwritten with its record's id so both sides share ids.
/// When both a record and its prediction carry a `filepath`, they must
/// agree; this is checked for every pair before anything is modified.
///
/// # Errors
/// [`RecordError::RecordCountMismatch`] when the slices differ in length,
/// [`RecordError::MisalignedPrediction`] on a filepath disagreement, and
/// any conversion error from either side.
pub fn create_coco_eval<E>(
    engine: &E,
    records: &[Record],
    preds: &mut [Record],
    metric: MetricType,
) -> Result<E::Handle, RecordError>
where
    E: CocoEvaluator + ?Sized,
{
    if records.len() != preds.len() {
        return Err(RecordError::RecordCountMismatch {
            records: records.len(),
            preds: preds.len(),
        });
    }

    for (index, (record, pred)) in records.iter().zip(preds.iter()).enumerate() {
        let expected = record.info(fields::FILEPATH).and_then(|v| v.as_text());
        let found = pred.info(fields::FILEPATH).and_then(|v| v.as_text());
        if let (Some(expected), Some(found)) = (expected, found) {
            if expected != found {
                return Err(RecordError::MisalignedPrediction {
                    index,
                    expected: expected.to_string(),
                    found: found.to_string(),
                });
            }
        }
    }

    for (record, pred) in records.iter().zip(preds.iter_mut()) {
        pred.imageid = record.imageid;
    }

    let ground_truth = coco_api_from_records(records)?;
    let predictions = coco_api_from_preds(preds)?;
    debug!(
        "evaluating {} prediction(s) against {} ground-truth annotation(s) ({})",
        predictions.num_annotations(),
        ground_truth.num_annotations(),
        metric
    );

    engine.evaluate(ground_truth, predictions, metric)
}
