//! Bounding boxes carried in record `bboxes` fields.

use serde::{Deserialize, Serialize};

/// An axis-aligned box in pixel XYXY form (xmin, ymin, xmax, ymax).
///
/// Construction does not check that min <= max. Malformed boxes stay
/// representable so validation can report them instead of a parser panicking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BBox {
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Builds a box from COCO order: top-left corner plus width and height.
    #[inline]
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_xyxy(x, y, x + width, y + height)
    }

    /// May be negative if the box is malformed.
    #[inline]
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// May be negative if the box is malformed.
    #[inline]
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// The `[x, y, width, height]` layout COCO stores.
    #[inline]
    pub fn to_xywh(&self) -> [f64; 4] {
        [self.xmin, self.ymin, self.width(), self.height()]
    }

    /// Returns true if all coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.xmin.is_finite()
            && self.ymin.is_finite()
            && self.xmax.is_finite()
            && self.ymax.is_finite()
    }

    /// Returns true if min <= max on both axes.
    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.xmin <= self.xmax && self.ymin <= self.ymax
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xywh_constructor_matches_xyxy() {
        let bbox = BBox::from_xywh(10.0, 20.0, 90.0, 60.0);
        assert_eq!(bbox, BBox::from_xyxy(10.0, 20.0, 100.0, 80.0));
        assert_eq!(bbox.to_xywh(), [10.0, 20.0, 90.0, 60.0]);
    }

    #[test]
    fn area_is_width_times_height() {
        let bbox = BBox::from_xyxy(1.0, 1.0, 3.0, 3.0);
        assert_eq!(bbox.width(), 2.0);
        assert_eq!(bbox.height(), 2.0);
        assert_eq!(bbox.area(), 4.0);
    }

    #[test]
    fn malformed_boxes_are_representable() {
        let flipped = BBox::from_xyxy(100.0, 80.0, 10.0, 20.0);
        assert!(!flipped.is_ordered());
        assert!(flipped.area() > 0.0);

        let nan = BBox::from_xyxy(f64::NAN, 0.0, 1.0, 1.0);
        assert!(!nan.is_finite());
    }
}
