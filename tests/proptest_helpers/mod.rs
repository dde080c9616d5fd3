#![allow(dead_code)]

use std::collections::BTreeMap;

use coco_records::parser::{ParseFns, SampleParser};
use coco_records::record::{fields, BBox, Record};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// One annotation of one image, the way CSV-style sources lay data out.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationRow {
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub label: i64,
    pub bbox: BBox,
}

pub fn row_fns() -> ParseFns<AnnotationRow, String> {
    ParseFns::new(|r: &AnnotationRow| r.filename.clone())
        .info(fields::FILEPATH, |r: &AnnotationRow| r.filename.clone())
        .info(fields::WIDTH, |r: &AnnotationRow| r.width)
        .info(fields::HEIGHT, |r: &AnnotationRow| r.height)
        .annotation(fields::LABELS, |r: &AnnotationRow| [r.label])
        .annotation(fields::BBOXES, |r: &AnnotationRow| [r.bbox])
}

pub fn row_parser(rows: Vec<AnnotationRow>) -> SampleParser<AnnotationRow, String> {
    SampleParser::new(rows, row_fns())
}

/// Number of rows per filename, in first-seen order.
pub fn rows_per_file(rows: &[AnnotationRow]) -> Vec<(String, usize)> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for row in rows {
        let count = counts.entry(row.filename.clone()).or_insert(0);
        if *count == 0 {
            order.push(row.filename.clone());
        }
        *count += 1;
    }
    order
        .into_iter()
        .map(|name| {
            let n = counts[&name];
            (name, n)
        })
        .collect()
}

pub fn arb_bbox(width: u32, height: u32) -> impl Strategy<Value = BBox> {
    let (w, h) = (width as f64, height as f64);
    (0.0..w, 0.0..h, 0.0..w, 0.0..h).prop_map(|(x1, y1, x2, y2)| {
        BBox::from_xyxy(x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2))
    })
}

/// Rows over at most `max_files` filenames, each image with fixed dimensions.
pub fn arb_rows(max_files: usize, max_rows: usize) -> BoxedStrategy<Vec<AnnotationRow>> {
    prop::collection::vec((1u32..200, 1u32..200), 1..=max_files)
        .prop_flat_map(move |dims| {
            let files = dims.len();
            let row = (0..files, 0i64..20).prop_flat_map({
                let dims = dims.clone();
                move |(file, label)| {
                    let (width, height) = dims[file];
                    arb_bbox(width, height).prop_map(move |bbox| AnnotationRow {
                        filename: format!("img_{:03}.jpg", file),
                        width,
                        height,
                        label,
                        bbox,
                    })
                }
            });
            prop::collection::vec(row, 0..=max_rows)
        })
        .boxed()
}

/// Records with consistent annotation lengths and sequential ids from 1.
pub fn arb_records(max_records: usize, max_anns: usize) -> BoxedStrategy<Vec<Record>> {
    let record = (1u32..200, 1u32..200).prop_flat_map(move |(width, height)| {
        prop::collection::vec((0i64..20, arb_bbox(width, height)), 0..=max_anns).prop_map(
            move |anns| {
                let (labels, bboxes): (Vec<i64>, Vec<BBox>) = anns.into_iter().unzip();
                (width, height, labels, bboxes)
            },
        )
    });

    prop::collection::vec(record, 0..=max_records)
        .prop_map(|parts| {
            parts
                .into_iter()
                .enumerate()
                .map(|(i, (width, height, labels, bboxes))| {
                    Record::new(i as u64 + 1)
                        .with_info(fields::FILEPATH, format!("dir/img_{}.jpg", i))
                        .with_info(fields::WIDTH, width)
                        .with_info(fields::HEIGHT, height)
                        .with_annotations(fields::LABELS, labels)
                        .with_annotations(fields::BBOXES, bboxes)
                })
                .collect()
        })
        .boxed()
}
