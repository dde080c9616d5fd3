//! Instance masks and their COCO segmentation encodings.
//!
//! A record's `masks` field holds one [`Mask`] per annotation, except for
//! [`MaskFile`], which points at a label bitmap that may hold several
//! instances and therefore expands to several segmentations.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::rle::Rle;
use crate::error::RecordError;

/// A segmentation value in the shape COCO tooling reads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segmentation {
    /// One or more polygons, each a flat `[x, y, x, y, ...]` list.
    Polygon(Vec<Vec<f64>>),
    /// Uncompressed RLE. `size` is `[height, width]`.
    Rle { counts: Vec<u32>, size: [u32; 2] },
    /// Compressed RLE string. `size` is `[height, width]`.
    CompressedRle { counts: String, size: [u32; 2] },
}

/// Polygon boundary made of one or more point sequences.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    pub points: Vec<Vec<f64>>,
}

impl Polygon {
    pub fn new(points: Vec<Vec<f64>>) -> Self {
        Self { points }
    }
}

/// Row-major instance labels for one image; 0 is background.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelMap {
    pub height: u32,
    pub width: u32,
    pub labels: Vec<u32>,
}

impl LabelMap {
    pub fn new(height: u32, width: u32, labels: Vec<u32>) -> Self {
        Self {
            height,
            width,
            labels,
        }
    }

    /// Distinct non-zero labels in ascending order.
    pub fn instance_labels(&self) -> BTreeSet<u32> {
        self.labels.iter().copied().filter(|&l| l != 0).collect()
    }

    /// True when `labels` holds exactly `height * width` pixels.
    pub fn is_complete(&self) -> bool {
        self.labels.len() == self.height as usize * self.width as usize
    }

    /// Column-major binary bitmap of the pixels carrying `label`.
    ///
    /// `None` if the map is not [complete](Self::is_complete).
    pub fn instance_bitmap(&self, label: u32) -> Option<Vec<u8>> {
        if !self.is_complete() {
            return None;
        }

        let (h, w) = (self.height as usize, self.width as usize);
        let mut bitmap = Vec::with_capacity(h * w);
        for x in 0..w {
            for y in 0..h {
                bitmap.push(u8::from(self.labels[y * w + x] == label));
            }
        }
        Some(bitmap)
    }
}

/// Source of label bitmaps for [`MaskFile`]s.
///
/// Decoding image files is left to the implementor.
pub trait MaskLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<LabelMap, RecordError>;
}

/// A [`MaskLoader`] backed by bitmaps held in memory, keyed by path.
#[derive(Clone, Debug, Default)]
pub struct InMemoryMasks {
    maps: HashMap<PathBuf, LabelMap>,
}

impl InMemoryMasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, map: LabelMap) {
        self.maps.insert(path.into(), map);
    }
}

impl MaskLoader for InMemoryMasks {
    fn load(&self, path: &Path) -> Result<LabelMap, RecordError> {
        self.maps
            .get(path)
            .cloned()
            .ok_or_else(|| RecordError::MaskLoad {
                path: path.to_path_buf(),
                message: "no bitmap registered for this path".to_string(),
            })
    }
}

/// Reference to an external label bitmap.
#[derive(Clone)]
pub struct MaskFile {
    path: PathBuf,
    loader: Arc<dyn MaskLoader>,
}

impl MaskFile {
    pub fn new(path: impl Into<PathBuf>, loader: Arc<dyn MaskLoader>) -> Self {
        Self {
            path: path.into(),
            loader,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the bitmap and encodes one RLE per instance, by ascending label.
    ///
    /// The bitmap must be exactly `height x width`.
    pub fn to_coco_rle(&self, height: u32, width: u32) -> Result<Vec<Rle>, RecordError> {
        let map = self.loader.load(&self.path)?;
        let size_error = || RecordError::MaskSize {
            path: self.path.clone(),
            expected: (height, width),
            found: (map.height, map.width),
        };
        if (map.height, map.width) != (height, width) {
            return Err(size_error());
        }

        map.instance_labels()
            .into_iter()
            .map(|label| {
                let bitmap = map.instance_bitmap(label).ok_or_else(&size_error)?;
                Rle::encode(&bitmap, height, width)
            })
            .collect()
    }
}

impl fmt::Debug for MaskFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaskFile")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Two mask files are equal when they point at the same path.
impl PartialEq for MaskFile {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

/// An instance mask in one of the supported encodings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mask {
    Polygon(Polygon),
    Rle(Rle),
    /// Not part of the JSON interchange; serializing one is an error.
    #[serde(skip)]
    MaskFile(MaskFile),
}

impl Mask {
    /// Converts to COCO segmentations sized for a `height x width` image.
    ///
    /// Polygons and RLEs yield exactly one segmentation. A mask file yields
    /// one per instance found in its bitmap, possibly none.
    pub fn to_coco_segmentation(
        &self,
        height: u32,
        width: u32,
    ) -> Result<Vec<Segmentation>, RecordError> {
        match self {
            Mask::Polygon(polygon) => Ok(vec![Segmentation::Polygon(polygon.points.clone())]),
            Mask::Rle(rle) => Ok(vec![Segmentation::Rle {
                counts: rle.to_coco(),
                size: [height, width],
            }]),
            Mask::MaskFile(file) => Ok(file
                .to_coco_rle(height, width)?
                .into_iter()
                .map(|rle| Segmentation::CompressedRle {
                    counts: rle.to_compressed(),
                    size: [height, width],
                })
                .collect()),
        }
    }
}

impl From<Polygon> for Mask {
    fn from(polygon: Polygon) -> Self {
        Mask::Polygon(polygon)
    }
}

impl From<Rle> for Mask {
    fn from(rle: Rle) -> Self {
        Mask::Rle(rle)
    }
}

impl From<MaskFile> for Mask {
    fn from(file: MaskFile) -> Self {
        Mask::MaskFile(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_instance_loader() -> Arc<dyn MaskLoader> {
        // 2x3 image, row-major:
        // [0, 1, 1]
        // [2, 2, 0]
        let mut masks = InMemoryMasks::new();
        masks.insert("inst.png", LabelMap::new(2, 3, vec![0, 1, 1, 2, 2, 0]));
        Arc::new(masks)
    }

    #[test]
    fn polygon_passes_points_through() {
        let mask = Mask::from(Polygon::new(vec![vec![0.0, 0.0, 4.0, 0.0, 4.0, 4.0]]));
        let segs = mask.to_coco_segmentation(10, 10).unwrap();
        assert_eq!(
            segs,
            vec![Segmentation::Polygon(vec![vec![0.0, 0.0, 4.0, 0.0, 4.0, 4.0]])]
        );
    }

    #[test]
    fn rle_carries_height_then_width() {
        let mask = Mask::from(Rle::from_coco(vec![2, 3]));
        let segs = mask.to_coco_segmentation(20, 10).unwrap();
        assert_eq!(
            segs,
            vec![Segmentation::Rle {
                counts: vec![2, 3],
                size: [20, 10],
            }]
        );
    }

    #[test]
    fn mask_file_expands_per_instance() {
        let mask = Mask::from(MaskFile::new("inst.png", two_instance_loader()));
        let segs = mask.to_coco_segmentation(2, 3).unwrap();
        assert_eq!(segs.len(), 2);

        // label 1 covers (x=1, y=0) and (x=2, y=0): column-major positions 2 and 4
        let first = match &segs[0] {
            Segmentation::CompressedRle { counts, size } => {
                assert_eq!(size, &[2, 3]);
                Rle::from_compressed(counts).unwrap()
            }
            other => panic!("unexpected segmentation {:?}", other),
        };
        assert_eq!(first.counts(), &[2, 1, 1, 1, 1]);
        assert_eq!(first.area(), 2);
    }

    #[test]
    fn mask_file_rejects_size_mismatch() {
        let file = MaskFile::new("inst.png", two_instance_loader());
        let err = file.to_coco_rle(3, 2).unwrap_err();
        assert!(matches!(err, RecordError::MaskSize { .. }));
    }

    #[test]
    fn short_label_map_has_no_bitmap() {
        let map = LabelMap::new(2, 3, vec![1, 1, 0]);
        assert!(!map.is_complete());
        assert_eq!(map.instance_bitmap(1), None);

        let mut masks = InMemoryMasks::new();
        masks.insert("short.png", map);
        let file = MaskFile::new("short.png", Arc::new(masks));
        assert!(matches!(
            file.to_coco_rle(2, 3),
            Err(RecordError::MaskSize { .. })
        ));
    }

    #[test]
    fn label_map_bitmap_is_column_major() {
        let map = LabelMap::new(2, 3, vec![0, 1, 1, 2, 2, 0]);
        assert_eq!(map.instance_bitmap(2), Some(vec![0, 1, 0, 1, 0, 0]));
    }

    #[test]
    fn mask_file_reports_missing_bitmap() {
        let file = MaskFile::new("missing.png", two_instance_loader());
        assert!(matches!(
            file.to_coco_rle(2, 3),
            Err(RecordError::MaskLoad { .. })
        ));
    }

    #[test]
    fn segmentation_serializes_in_coco_shape() {
        let seg = Segmentation::Rle {
            counts: vec![1, 2],
            size: [4, 5],
        };
        let json = serde_json::to_value(&seg).unwrap();
        assert_eq!(json, serde_json::json!({"counts": [1, 2], "size": [4, 5]}));
    }
}
