//! Extraction functions a parser runs on every sample.

use std::sync::Arc;

use crate::record::{FieldValue, ImageId, Record};

/// Reads one image-level value from a sample.
pub type InfoFn<S> = Arc<dyn Fn(&S) -> FieldValue + Send + Sync>;

/// Reads zero or more annotation values from a sample.
pub type AnnotationFn<S> = Arc<dyn Fn(&S) -> Vec<FieldValue> + Send + Sync>;

type ImageIdFn<S, K> = Arc<dyn Fn(&S) -> K + Send + Sync>;

/// The extractor set of a parser: a mandatory image key extractor plus named
/// info and annotation extractors, run in declaration order.
pub struct ParseFns<S, K> {
    imageid: ImageIdFn<S, K>,
    info: Vec<(String, InfoFn<S>)>,
    annotations: Vec<(String, AnnotationFn<S>)>,
}

impl<S, K> Clone for ParseFns<S, K> {
    fn clone(&self) -> Self {
        Self {
            imageid: Arc::clone(&self.imageid),
            info: self.info.clone(),
            annotations: self.annotations.clone(),
        }
    }
}

impl<S: 'static, K: 'static> ParseFns<S, K> {
    /// Starts an extractor set from the function naming a sample's image.
    pub fn new<F>(imageid: F) -> Self
    where
        F: Fn(&S) -> K + Send + Sync + 'static,
    {
        Self {
            imageid: Arc::new(imageid),
            info: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// Declares an info field. Redeclaring a name replaces its extractor.
    pub fn info<F, V>(mut self, name: impl Into<String>, extract: F) -> Self
    where
        F: Fn(&S) -> V + Send + Sync + 'static,
        V: Into<FieldValue> + 'static,
    {
        let func: InfoFn<S> = Arc::new(move |sample: &S| extract(sample).into());
        upsert(&mut self.info, name.into(), func);
        self
    }

    /// Declares an annotation field. Redeclaring a name replaces its extractor.
    pub fn annotation<F, I>(mut self, name: impl Into<String>, extract: F) -> Self
    where
        F: Fn(&S) -> I + Send + Sync + 'static,
        I: IntoIterator + 'static,
        I::Item: Into<FieldValue>,
    {
        let func: AnnotationFn<S> = Arc::new(move |sample: &S| {
            extract(sample).into_iter().map(Into::into).collect()
        });
        upsert(&mut self.annotations, name.into(), func);
        self
    }
}

impl<S, K> ParseFns<S, K> {
    pub fn imageid(&self, sample: &S) -> K {
        (self.imageid)(sample)
    }

    pub fn info_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.info.iter().map(|(name, _)| name.as_str())
    }

    pub fn annotation_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.annotations.iter().map(|(name, _)| name.as_str())
    }

    /// A record with every declared annotation field present and empty.
    pub(crate) fn empty_record(&self, imageid: ImageId) -> Record {
        let mut record = Record::new(imageid);
        for (name, _) in &self.annotations {
            record.annotations.insert(name.clone(), Vec::new());
        }
        record
    }

    /// Runs all extractors on `sample` and folds the results into `record`.
    pub(crate) fn apply(&self, sample: &S, record: &mut Record) {
        for (name, extract) in &self.info {
            record.info.insert(name.clone(), extract(sample));
        }
        for (name, extract) in &self.annotations {
            record.extend_annotations(name, extract(sample));
        }
    }
}

fn upsert<T>(entries: &mut Vec<(String, T)>, name: String, value: T) {
    match entries.iter_mut().find(|(existing, _)| *existing == name) {
        Some(entry) => entry.1 = value,
        None => entries.push((name, value)),
    }
}
