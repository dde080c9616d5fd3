//! Validation report types for structured error reporting.
//!
//! Reports can be displayed to users, serialized for tooling, or inspected
//! programmatically.

use serde::Serialize;
use std::fmt;

use crate::record::ImageId;

/// All issues found while validating a set of records.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// Returns true if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    /// Returns true if there are no issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Attaches human-readable image names to image-level issues.
    pub fn name_images<F>(&mut self, name: F)
    where
        F: Fn(ImageId) -> Option<String>,
    {
        for issue in &mut self.issues {
            if let IssueContext::Image { id, name: slot } = &mut issue.context {
                if slot.is_none() {
                    *slot = name(ImageId::new(*id));
                }
            }
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return writeln!(f, "Validation passed: no issues found");
        }

        writeln!(
            f,
            "Validation completed with {} error(s) and {} warning(s):",
            self.error_count(),
            self.warning_count()
        )?;
        writeln!(f)?;

        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }

        Ok(())
    }
}

/// A single validation issue (error or warning).
#[derive(Clone, Debug, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,

    /// A stable code for the issue type.
    pub code: IssueCode,

    pub message: String,

    pub context: IssueContext,
}

impl ValidationIssue {
    pub fn new(
        severity: Severity,
        code: IssueCode,
        message: impl Into<String>,
        context: IssueContext,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            context,
        }
    }

    pub fn error(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Error, code, message, context)
    }

    pub fn warning(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Warning, code, message, context)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        write!(
            f,
            "[{}] {:?} in {}: {}",
            severity, self.code, self.context, self.message
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Severity {
    /// Conversion will still run but the output may be misleading.
    Warning,
    /// Conversion or evaluation would fail or produce corrupt data.
    Error,
}

/// A stable code identifying the type of validation issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum IssueCode {
    /// Annotation fields of one record have different lengths.
    AnnotationLengthMismatch,
    /// Two records share an image id.
    DuplicateImageId,
    /// A record has annotation fields but no `labels`.
    MissingLabels,
    /// A `labels` entry is not a non-negative integer.
    InvalidLabel,
    /// `width`/`height` are missing the integer shape or are zero.
    InvalidImageDimensions,
    /// `filepath` is present but empty.
    EmptyFileName,
    /// A `bboxes` entry is not a box.
    NotABBox,
    /// A bounding box has non-finite coordinates.
    BBoxNotFinite,
    /// A bounding box has min > max.
    InvalidBBoxOrdering,
    /// A bounding box extends outside the image.
    BBoxOutOfBounds,
    /// A `masks` entry is not a mask.
    UnsupportedMask,
    /// An `iscrowds` entry is not 0/1 or a bool.
    InvalidIsCrowd,
}

/// Where a validation issue occurred.
#[derive(Clone, Debug, Serialize)]
pub enum IssueContext {
    /// Issue with the record list as a whole.
    Dataset,
    /// Issue with a whole record. `name` is the external image key, when known.
    Image { id: u64, name: Option<String> },
    /// Issue with one annotation of a record.
    Annotation { image: u64, index: usize },
}

impl IssueContext {
    pub fn image(id: ImageId) -> Self {
        IssueContext::Image {
            id: id.as_u64(),
            name: None,
        }
    }

    pub fn annotation(image: ImageId, index: usize) -> Self {
        IssueContext::Annotation {
            image: image.as_u64(),
            index,
        }
    }
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueContext::Dataset => write!(f, "dataset"),
            IssueContext::Image { id, name: None } => write!(f, "image {}", id),
            IssueContext::Image {
                id,
                name: Some(name),
            } => write!(f, "image {} ({})", id, name),
            IssueContext::Annotation { image, index } => {
                write!(f, "annotation {} of image {}", index, image)
            }
        }
    }
}
