//! JSON interchange for record lists.
//!
//! The file is a JSON array of records:
//!
//! ```json
//! [{"imageid": 1,
//!   "info": {"filepath": "a.jpg", "width": 10, "height": 20},
//!   "annotations": {"labels": [3], "bboxes": [{"xmin": 1, "ymin": 1, "xmax": 3, "ymax": 3}]}}]
//! ```
//!
//! Values use the untagged [`FieldValue`](super::FieldValue) encoding. Masks
//! are written as `{"polygon": [[...]]}` or `{"rle": [...]}`; mask files have
//! no JSON form.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::model::Record;
use crate::error::RecordError;

/// Reads a record list from a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn read_records_json(path: &Path) -> Result<Vec<Record>, RecordError> {
    let file = File::open(path).map_err(RecordError::Io)?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| RecordError::RecordsJsonParse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn from_records_str(json: &str) -> Result<Vec<Record>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Reads records from raw bytes, skipping the UTF-8 check a `&str` needs.
pub fn from_records_slice(bytes: &[u8]) -> Result<Vec<Record>, serde_json::Error> {
    serde_json::from_slice(bytes)
}

pub fn to_records_string(records: &[Record]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(records)
}
