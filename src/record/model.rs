//! Per-image records and the values their fields hold.
//!
//! A [`Record`] is deliberately schema-light: parsers decide which info and
//! annotation fields exist. The only structural rule is that every
//! annotation field of a record holds the same number of entries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use super::bbox::BBox;
use super::ids::ImageId;
use super::mask::Mask;
use crate::error::RecordError;

/// Well-known field names read by the COCO converter.
pub mod fields {
    pub const IMAGEID: &str = "imageid";
    pub const FILEPATH: &str = "filepath";
    pub const WIDTH: &str = "width";
    pub const HEIGHT: &str = "height";
    pub const LABELS: &str = "labels";
    pub const BBOXES: &str = "bboxes";
    pub const AREAS: &str = "areas";
    pub const MASKS: &str = "masks";
    pub const ISCROWDS: &str = "iscrowds";
    pub const SCORES: &str = "scores";
}

/// A single value stored in a record field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    BBox(BBox),
    Mask(Mask),
}

impl FieldValue {
    /// Short name of the variant, used in type errors.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::Text(_) => "text",
            FieldValue::BBox(_) => "bbox",
            FieldValue::Mask(_) => "mask",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Floats, and integers widened to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bbox(&self) -> Option<&BBox> {
        match self {
            FieldValue::BBox(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_mask(&self) -> Option<&Mask> {
        match self {
            FieldValue::Mask(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! field_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    FieldValue::$variant(value.into())
                }
            }
        )*
    };
}

field_value_from!(
    bool => Bool,
    i64 => Int,
    i32 => Int,
    u32 => Int,
    f64 => Float,
    f32 => Float,
    String => Text,
    &str => Text,
    BBox => BBox,
    Mask => Mask,
);

impl From<PathBuf> for FieldValue {
    fn from(path: PathBuf) -> Self {
        FieldValue::Text(path.to_string_lossy().into_owned())
    }
}

/// Per-field annotation counts, printed as `{bboxes: 1, labels: 2}`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldLengths(pub BTreeMap<String, usize>);

impl FieldLengths {
    /// True when every field has the same length (vacuously for zero or one field).
    pub fn all_equal(&self) -> bool {
        let mut lengths = self.0.values();
        match lengths.next() {
            Some(first) => lengths.all(|len| len == first),
            None => true,
        }
    }
}

impl fmt::Display for FieldLengths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, len)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, len)?;
        }
        write!(f, "}}")
    }
}

/// Everything known about one image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub imageid: ImageId,

    /// Image-level scalars such as `filepath`, `width`, `height`.
    #[serde(default)]
    pub info: BTreeMap<String, FieldValue>,

    /// One ordered sequence per annotation field, one entry per instance.
    #[serde(default)]
    pub annotations: BTreeMap<String, Vec<FieldValue>>,
}

impl Record {
    pub fn new(imageid: impl Into<ImageId>) -> Self {
        Self {
            imageid: imageid.into(),
            info: BTreeMap::new(),
            annotations: BTreeMap::new(),
        }
    }

    /// Sets an info field, replacing any previous value.
    pub fn with_info(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set_info(name, value);
        self
    }

    /// Sets an annotation field, replacing any previous sequence.
    pub fn with_annotations<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        self.annotations
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn set_info(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.info.insert(name.into(), value.into());
    }

    /// Appends to an annotation field, creating it if needed.
    pub fn extend_annotations<I>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = FieldValue>,
    {
        match self.annotations.get_mut(name) {
            Some(existing) => existing.extend(values),
            None => {
                self.annotations
                    .insert(name.to_string(), values.into_iter().collect());
            }
        }
    }

    pub fn info(&self, name: &str) -> Option<&FieldValue> {
        self.info.get(name)
    }

    pub fn annotations(&self, name: &str) -> Option<&[FieldValue]> {
        self.annotations.get(name).map(Vec::as_slice)
    }

    pub fn has_annotations(&self, name: &str) -> bool {
        self.annotations.contains_key(name)
    }

    /// Length of every annotation field.
    pub fn annotation_lengths(&self) -> FieldLengths {
        FieldLengths(
            self.annotations
                .iter()
                .map(|(name, values)| (name.clone(), values.len()))
                .collect(),
        )
    }

    /// Number of annotations, if the record is consistent.
    pub fn num_annotations(&self) -> Option<usize> {
        let lengths = self.annotation_lengths();
        if !lengths.all_equal() {
            return None;
        }
        Some(lengths.0.values().next().copied().unwrap_or(0))
    }

    /// Required info field, as an error naming this record when absent.
    pub fn require_info(&self, name: &str) -> Result<&FieldValue, RecordError> {
        self.info(name).ok_or_else(|| RecordError::MissingField {
            imageid: self.imageid,
            field: name.to_string(),
        })
    }

    pub fn require_text(&self, name: &str) -> Result<&str, RecordError> {
        let value = self.require_info(name)?;
        value
            .as_text()
            .ok_or_else(|| self.type_error(name, "text", value))
    }

    /// Required info field that must be a non-negative integer fitting in u32.
    pub fn require_u32(&self, name: &str) -> Result<u32, RecordError> {
        let value = self.require_info(name)?;
        value
            .as_int()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| self.type_error(name, "u32", value))
    }

    pub(crate) fn type_error(
        &self,
        field: &str,
        expected: &'static str,
        value: &FieldValue,
    ) -> RecordError {
        RecordError::FieldType {
            imageid: self.imageid,
            field: field.to_string(),
            expected,
            found: value.kind(),
        }
    }
}
