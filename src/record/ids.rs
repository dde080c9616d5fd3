//! Dense integer identifiers for records and their COCO projections.
//!
//! Image ids are handed out by [`IdMap`](super::IdMap); category and
//! annotation ids only appear on the COCO side of a conversion.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! dense_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            #[inline]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value.
            #[inline]
            pub fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

dense_id!(
    /// Identifier of one record (one image), assigned by an `IdMap`.
    ImageId
);

dense_id!(
    /// Identifier of a category, taken verbatim from a record's `labels`.
    CategoryId
);

dense_id!(
    /// Position of an annotation in a converted COCO dataset, starting at 1.
    AnnotationId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_order_by_value() {
        assert!(ImageId(1) < ImageId(2));
        assert!(CategoryId(10) > CategoryId(5));
    }

    #[test]
    fn debug_names_the_id_kind() {
        assert_eq!(format!("{:?}", ImageId(7)), "ImageId(7)");
        assert_eq!(format!("{:?}", AnnotationId(3)), "AnnotationId(3)");
        assert_eq!(ImageId(7).to_string(), "7");
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&ImageId(42)).unwrap();
        assert_eq!(json, "42");
        let back: CategoryId = serde_json::from_str("3").unwrap();
        assert_eq!(back, CategoryId::new(3));
    }
}
