//! The record parsing pipeline.
//!
//! A parser turns a stream of raw samples into one [`Record`] per image:
//!
//! 1. every sample runs through the parser's [`prepare`](Parser::prepare) hook;
//! 2. the `imageid` extractor names the image, and an [`IdMap`] turns that
//!    name into a dense [`ImageId`];
//! 3. info extractors overwrite image-level fields (last sample wins);
//! 4. annotation extractors append to per-field sequences in sample order;
//! 5. once all samples are consumed, every record must hold equally long
//!    annotation sequences.
//!
//! [`parse`](Parser::parse) then hands the ids to a [`DataSplitter`] and
//! materializes each group.
//!
//! Concrete parsers only supply samples and extractors. [`SampleParser`]
//! does that from an in-memory sample list.

mod fns;

pub use fns::{AnnotationFn, InfoFn, ParseFns};

use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use log::{debug, info};

use crate::error::RecordError;
use crate::progress;
use crate::record::{IdMap, ImageId, Record};
use crate::split::{DataSplitter, SingleSplitSplitter};
use crate::validation::{self, ValidationReport};

/// Knobs for a parse pass.
#[derive(Clone, Debug, Default)]
pub struct ParseOptions {
    /// Show a progress spinner while consuming samples.
    pub show_progress: bool,

    /// Check every record and report all inconsistent ones together
    /// instead of failing on the first.
    pub collect_issues: bool,
}

/// A source of raw samples plus the extractors that read them.
pub trait Parser {
    type Sample;

    /// The key the raw source uses for an image, e.g. a filename.
    type ExternalId: Hash + Eq + Clone + fmt::Display;

    /// The raw samples, in the order they should be aggregated.
    fn samples(&self) -> Box<dyn Iterator<Item = Self::Sample> + '_>;

    fn parse_fns(&self) -> ParseFns<Self::Sample, Self::ExternalId>;

    /// Adapts a sample before extraction. No-op by default.
    fn prepare(&self, _sample: &mut Self::Sample) {}

    /// Aggregates all samples into records keyed by image id.
    fn parse_all(
        &self,
        idmap: &mut IdMap<Self::ExternalId>,
        opts: &ParseOptions,
    ) -> Result<BTreeMap<ImageId, Record>, RecordError> {
        parse_all(self, idmap, opts)
    }

    /// Aggregates all samples, then materializes the groups `splitter` returns.
    fn parse(
        &self,
        splitter: &dyn DataSplitter,
        idmap: &mut IdMap<Self::ExternalId>,
        opts: &ParseOptions,
    ) -> Result<Vec<Vec<Record>>, RecordError> {
        parse(self, splitter, idmap, opts)
    }

    /// Parses with a fresh id map into a single split.
    fn parse_default(&self) -> Result<Vec<Vec<Record>>, RecordError> {
        let mut idmap = IdMap::new();
        parse(
            self,
            &SingleSplitSplitter,
            &mut idmap,
            &ParseOptions::default(),
        )
    }
}

/// See [`Parser::parse_all`].
pub fn parse_all<P>(
    parser: &P,
    idmap: &mut IdMap<P::ExternalId>,
    opts: &ParseOptions,
) -> Result<BTreeMap<ImageId, Record>, RecordError>
where
    P: Parser + ?Sized,
{
    let fns = parser.parse_fns();
    let pb = progress::spinner(opts.show_progress, "Parsing samples");

    let mut records: BTreeMap<ImageId, Record> = BTreeMap::new();
    let mut num_samples = 0usize;

    for mut sample in parser.samples() {
        parser.prepare(&mut sample);
        let imageid = idmap.lookup(fns.imageid(&sample));

        let record = records
            .entry(imageid)
            .or_insert_with(|| fns.empty_record(imageid));
        fns.apply(&sample, record);

        num_samples += 1;
        pb.inc(1);
    }
    pb.finish_and_clear();

    debug!(
        "aggregated {} sample(s) into {} record(s)",
        num_samples,
        records.len()
    );

    if opts.collect_issues {
        check_all(&records, idmap)?;
    } else {
        check_first(&records, idmap)?;
    }

    Ok(records)
}

/// See [`Parser::parse`].
pub fn parse<P>(
    parser: &P,
    splitter: &dyn DataSplitter,
    idmap: &mut IdMap<P::ExternalId>,
    opts: &ParseOptions,
) -> Result<Vec<Vec<Record>>, RecordError>
where
    P: Parser + ?Sized,
{
    let mut records = parse_all(parser, idmap, opts)?;
    let ids: Vec<ImageId> = records.keys().copied().collect();

    let splits = splitter
        .split(&ids)
        .into_iter()
        .map(|group| {
            group
                .into_iter()
                .map(|id| records.remove(&id).ok_or(RecordError::UnknownImageId { id }))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        "parsed {} record(s) into split sizes {:?}",
        ids.len(),
        splits.iter().map(Vec::len).collect::<Vec<_>>()
    );

    Ok(splits)
}

fn external_name<K: Hash + Eq + Clone + fmt::Display>(idmap: &IdMap<K>, id: ImageId) -> String {
    idmap
        .external_id(id)
        .map(ToString::to_string)
        .unwrap_or_else(|| id.to_string())
}

fn check_first<K>(records: &BTreeMap<ImageId, Record>, idmap: &IdMap<K>) -> Result<(), RecordError>
where
    K: Hash + Eq + Clone + fmt::Display,
{
    for (&id, record) in records {
        let lengths = record.annotation_lengths();
        if !lengths.all_equal() {
            return Err(RecordError::InconsistentAnnotations {
                imageid: external_name(idmap, id),
                lengths,
            });
        }
    }
    Ok(())
}

fn check_all<K>(records: &BTreeMap<ImageId, Record>, idmap: &IdMap<K>) -> Result<(), RecordError>
where
    K: Hash + Eq + Clone + fmt::Display,
{
    let mut report = ValidationReport::new();
    for record in records.values() {
        validation::check_annotation_lengths(record, &mut report);
    }

    if report.is_ok() {
        return Ok(());
    }

    report.name_images(|id| idmap.external_id(id).map(ToString::to_string));
    Err(RecordError::ValidationFailed {
        error_count: report.error_count(),
        warning_count: report.warning_count(),
        report,
    })
}

type PrepareFn<S> = Arc<dyn Fn(&mut S) + Send + Sync>;

/// A parser over an in-memory list of samples.
///
/// Extractors are injected at construction instead of being declared by a
/// dedicated type.
pub struct SampleParser<S, K> {
    samples: Vec<S>,
    fns: ParseFns<S, K>,
    prepare: Option<PrepareFn<S>>,
}

impl<S, K> SampleParser<S, K> {
    pub fn new(samples: Vec<S>, fns: ParseFns<S, K>) -> Self {
        Self {
            samples,
            fns,
            prepare: None,
        }
    }

    /// Installs a hook run on every sample before extraction.
    pub fn with_prepare<F>(mut self, prepare: F) -> Self
    where
        F: Fn(&mut S) + Send + Sync + 'static,
    {
        self.prepare = Some(Arc::new(prepare));
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl<S, K> Parser for SampleParser<S, K>
where
    S: Clone,
    K: Hash + Eq + Clone + fmt::Display,
{
    type Sample = S;
    type ExternalId = K;

    fn samples(&self) -> Box<dyn Iterator<Item = S> + '_> {
        Box::new(self.samples.iter().cloned())
    }

    fn parse_fns(&self) -> ParseFns<S, K> {
        self.fns.clone()
    }

    fn prepare(&self, sample: &mut S) {
        if let Some(prepare) = &self.prepare {
            prepare(sample);
        }
    }
}
