//! Indexed view over a COCO dataset, the shape evaluators query.

use std::collections::BTreeMap;

use crate::error::RecordError;
use crate::record::{CategoryId, ImageId, Record};

use super::{preds_to_coco, records_to_coco, CocoAnnotation, CocoDataset, CocoImage, CocoOptions};

/// A COCO dataset with lookups by image and category.
///
/// Lookups only cover the sections the dataset carries: an index built from
/// predictions has annotations but no images or categories.
#[derive(Clone, Debug)]
pub struct CocoIndex {
    dataset: CocoDataset,
    images: BTreeMap<ImageId, usize>,
    image_annotations: BTreeMap<ImageId, Vec<usize>>,
    category_annotations: BTreeMap<CategoryId, Vec<usize>>,
}

impl CocoIndex {
    pub fn new(dataset: CocoDataset) -> Self {
        let mut images = BTreeMap::new();
        for (i, image) in dataset.images.iter().flatten().enumerate() {
            images.insert(image.id, i);
        }

        let mut image_annotations: BTreeMap<ImageId, Vec<usize>> = BTreeMap::new();
        let mut category_annotations: BTreeMap<CategoryId, Vec<usize>> = BTreeMap::new();
        for (i, ann) in dataset.annotations.iter().flatten().enumerate() {
            image_annotations.entry(ann.image_id).or_default().push(i);
            category_annotations.entry(ann.category_id).or_default().push(i);
        }

        Self {
            dataset,
            images,
            image_annotations,
            category_annotations,
        }
    }

    pub fn dataset(&self) -> &CocoDataset {
        &self.dataset
    }

    pub fn into_dataset(self) -> CocoDataset {
        self.dataset
    }

    pub fn image(&self, id: ImageId) -> Option<&CocoImage> {
        let images = self.dataset.images.as_deref()?;
        self.images.get(&id).map(|&i| &images[i])
    }

    /// Ids of the `images` section, ascending.
    pub fn image_ids(&self) -> impl Iterator<Item = ImageId> + '_ {
        self.images.keys().copied()
    }

    /// Ids of the `categories` section, in dataset order.
    pub fn category_ids(&self) -> impl Iterator<Item = CategoryId> + '_ {
        self.dataset.categories.iter().flatten().map(|cat| cat.id)
    }

    pub fn annotations_for_image(&self, id: ImageId) -> impl Iterator<Item = &CocoAnnotation> + '_ {
        self.select(self.image_annotations.get(&id))
    }

    pub fn annotations_for_category(
        &self,
        id: CategoryId,
    ) -> impl Iterator<Item = &CocoAnnotation> + '_ {
        self.select(self.category_annotations.get(&id))
    }

    pub fn num_annotations(&self) -> usize {
        self.dataset.annotations.as_ref().map_or(0, Vec::len)
    }

    fn select<'a>(
        &'a self,
        positions: Option<&'a Vec<usize>>,
    ) -> impl Iterator<Item = &'a CocoAnnotation> + 'a {
        let annotations = self.dataset.annotations.as_deref().unwrap_or(&[]);
        positions
            .into_iter()
            .flatten()
            .map(move |&i| &annotations[i])
    }
}

impl From<CocoDataset> for CocoIndex {
    fn from(dataset: CocoDataset) -> Self {
        Self::new(dataset)
    }
}

/// Converts ground-truth records and indexes the result.
pub fn coco_api_from_records(records: &[Record]) -> Result<CocoIndex, RecordError> {
    records_to_coco(records, &CocoOptions::default()).map(CocoIndex::new)
}

/// Converts prediction records (annotations only) and indexes the result.
pub fn coco_api_from_preds(preds: &[Record]) -> Result<CocoIndex, RecordError> {
    preds_to_coco(preds).map(CocoIndex::new)
}
