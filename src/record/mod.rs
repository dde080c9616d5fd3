//! Records: the per-image, format-agnostic representation.
//!
//! Parsers aggregate raw samples into [`Record`]s; the COCO converter reads
//! them back out. Everything here is plain data plus the small amount of
//! bookkeeping ([`IdMap`]) and encoding ([`Mask`], [`Rle`]) the pipeline
//! needs.
//!
//! # Example
//!
//! ```
//! use coco_records::record::{fields, BBox, IdMap, Record};
//!
//! let mut idmap = IdMap::new();
//! let id = idmap.lookup("image.jpg".to_string());
//!
//! let record = Record::new(id)
//!     .with_info(fields::FILEPATH, "image.jpg")
//!     .with_annotations(fields::LABELS, [1i64])
//!     .with_annotations(fields::BBOXES, [BBox::from_xyxy(10.0, 20.0, 100.0, 200.0)]);
//!
//! assert_eq!(record.num_annotations(), Some(1));
//! ```

mod bbox;
mod idmap;
mod ids;
pub mod io_json;
mod mask;
mod model;
mod rle;

pub use bbox::BBox;
pub use idmap::{IdMap, DEFAULT_ID_BASE};
pub use ids::{AnnotationId, CategoryId, ImageId};
pub use mask::{InMemoryMasks, LabelMap, Mask, MaskFile, MaskLoader, Polygon, Segmentation};
pub use model::{fields, FieldLengths, FieldValue, Record};
pub use rle::Rle;
