//! End-to-end: CSV rows -> records -> splits -> COCO.

use coco_records::coco::eval::{create_coco_eval, CocoEvaluator, MetricType};
use coco_records::coco::{records_to_coco, CocoIndex, CocoOptions};
use coco_records::parser::{ParseFns, ParseOptions, Parser};
use coco_records::record::{fields, BBox, IdMap, Record};
use coco_records::split::{FixedSplitter, RandomSplitter, SingleSplitSplitter};
use coco_records::RecordError;
use serde::Deserialize;

const WHEAT_CSV: &str = "\
image_id,width,height,source,label,xmin,ymin,xmax,ymax
b6ab77fd7,1024,1024,usask_1,1,834,222,890,258
b6ab77fd7,1024,1024,usask_1,1,226,548,356,606
7b72ea0fb,1024,1024,arvalis_1,1,332,662,445,716
b6ab77fd7,1024,1024,usask_1,2,377,504,451,664
91c9d9c38,1024,1024,inrae_1,1,124,273,183,325
";

#[derive(Clone, Debug, Deserialize)]
struct WheatRow {
    image_id: String,
    width: u32,
    height: u32,
    source: String,
    label: i64,
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
}

/// Parser reading one annotation per CSV row.
struct WheatParser {
    rows: Vec<WheatRow>,
}

impl WheatParser {
    fn from_csv(data: &str) -> Self {
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let rows = reader
            .deserialize()
            .collect::<Result<Vec<WheatRow>, _>>()
            .expect("valid csv");
        Self { rows }
    }
}

impl Parser for WheatParser {
    type Sample = WheatRow;
    type ExternalId = String;

    fn samples(&self) -> Box<dyn Iterator<Item = WheatRow> + '_> {
        Box::new(self.rows.iter().cloned())
    }

    fn parse_fns(&self) -> ParseFns<WheatRow, String> {
        ParseFns::new(|r: &WheatRow| r.image_id.clone())
            .info(fields::FILEPATH, |r: &WheatRow| format!("train/{}.jpg", r.image_id))
            .info(fields::WIDTH, |r: &WheatRow| r.width)
            .info(fields::HEIGHT, |r: &WheatRow| r.height)
            .info("source", |r: &WheatRow| r.source.clone())
            .annotation(fields::LABELS, |r: &WheatRow| [r.label])
            .annotation(fields::BBOXES, |r: &WheatRow| {
                [BBox::from_xyxy(r.xmin, r.ymin, r.xmax, r.ymax)]
            })
    }
}

fn image_names(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.require_text(fields::FILEPATH).unwrap().to_string())
        .collect()
}

#[test]
fn csv_rows_aggregate_into_one_record_per_image() {
    let parser = WheatParser::from_csv(WHEAT_CSV);
    let splits = parser.parse_default().unwrap();

    assert_eq!(splits.len(), 1);
    let records = &splits[0];
    assert_eq!(
        image_names(records),
        vec!["train/b6ab77fd7.jpg", "train/7b72ea0fb.jpg", "train/91c9d9c38.jpg"]
    );

    let first = &records[0];
    assert_eq!(first.imageid.as_u64(), 1);
    assert_eq!(first.num_annotations(), Some(3));
    assert_eq!(first.require_text("source").unwrap(), "usask_1");
    let labels: Vec<_> = first
        .annotations(fields::LABELS)
        .unwrap()
        .iter()
        .filter_map(|v| v.as_int())
        .collect();
    assert_eq!(labels, vec![1, 1, 2]);
}

#[test]
fn fixed_split_follows_external_names() {
    let parser = WheatParser::from_csv(WHEAT_CSV);
    let mut idmap = IdMap::new();
    let splitter = FixedSplitter::from_external(
        vec![
            vec!["91c9d9c38".to_string(), "b6ab77fd7".to_string()],
            vec!["7b72ea0fb".to_string(), "not_in_csv".to_string()],
        ],
        &mut idmap,
    );

    let splits = parser
        .parse(&splitter, &mut idmap, &ParseOptions::default())
        .unwrap();

    assert_eq!(
        image_names(&splits[0]),
        vec!["train/91c9d9c38.jpg", "train/b6ab77fd7.jpg"]
    );
    assert_eq!(image_names(&splits[1]), vec!["train/7b72ea0fb.jpg"]);
    assert_eq!(idmap.get(&"91c9d9c38".to_string()).unwrap().as_u64(), 1);
}

#[test]
fn random_split_covers_every_image() {
    let parser = WheatParser::from_csv(WHEAT_CSV);
    let splitter = RandomSplitter::new(vec![0.67, 0.33], Some(3)).unwrap();
    let splits = parser
        .parse(&splitter, &mut IdMap::new(), &ParseOptions::default())
        .unwrap();

    assert_eq!(splits.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 1]);
    let mut ids: Vec<_> = splits.iter().flatten().map(|r| r.imageid.as_u64()).collect();
    ids.sort();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn inconsistent_rows_name_the_image() {
    struct Broken(WheatParser);

    impl Parser for Broken {
        type Sample = WheatRow;
        type ExternalId = String;

        fn samples(&self) -> Box<dyn Iterator<Item = WheatRow> + '_> {
            self.0.samples()
        }

        fn parse_fns(&self) -> ParseFns<WheatRow, String> {
            // second label for usask rows only
            self.0
                .parse_fns()
                .annotation(fields::LABELS, |r: &WheatRow| {
                    if r.source == "usask_1" {
                        vec![r.label, r.label]
                    } else {
                        vec![r.label]
                    }
                })
        }
    }

    let err = Broken(WheatParser::from_csv(WHEAT_CSV))
        .parse(&SingleSplitSplitter, &mut IdMap::new(), &ParseOptions::default())
        .unwrap_err();

    match err {
        RecordError::InconsistentAnnotations { imageid, lengths } => {
            assert_eq!(imageid, "b6ab77fd7");
            assert_eq!(lengths.to_string(), "{bboxes: 3, labels: 6}");
        }
        other => panic!("expected inconsistency, got {:?}", other),
    }
}

#[test]
fn parsed_records_convert_to_coco() {
    let parser = WheatParser::from_csv(WHEAT_CSV);
    let records = parser.parse_default().unwrap().remove(0);
    let coco = records_to_coco(&records, &CocoOptions::default()).unwrap();

    let images = coco.images.unwrap();
    assert_eq!(images[1].file_name, "7b72ea0fb.jpg");

    let anns = coco.annotations.unwrap();
    assert_eq!(anns.len(), 5);
    assert_eq!(anns[3].image_id.as_u64(), 2);
    assert_eq!(anns[0].bbox, Some([834.0, 222.0, 56.0, 36.0]));
    assert_eq!(anns[0].area, Some(56.0 * 36.0));
    assert_eq!(coco.categories.unwrap().len(), 2);
}

struct AnnotationCounts;

impl CocoEvaluator for AnnotationCounts {
    type Handle = (usize, usize);

    fn evaluate(
        &self,
        ground_truth: CocoIndex,
        predictions: CocoIndex,
        _metric: MetricType,
    ) -> Result<Self::Handle, RecordError> {
        Ok((ground_truth.num_annotations(), predictions.num_annotations()))
    }
}

#[test]
fn predictions_are_evaluated_against_parsed_records() {
    let records = WheatParser::from_csv(WHEAT_CSV)
        .parse_default()
        .unwrap()
        .remove(0);

    // one prediction per image, ids unrelated to the ground truth
    let mut preds: Vec<Record> = records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            Record::new(100 + i as u64)
                .with_info(fields::FILEPATH, r.require_text(fields::FILEPATH).unwrap())
                .with_annotations(fields::LABELS, [1i64])
                .with_annotations(fields::BBOXES, [BBox::from_xywh(0.0, 0.0, 10.0, 10.0)])
                .with_annotations(fields::SCORES, [0.75f64])
        })
        .collect();

    let counts = create_coco_eval(&AnnotationCounts, &records, &mut preds, MetricType::BBox).unwrap();
    assert_eq!(counts, (5, 3));
    let pred_ids: Vec<_> = preds.iter().map(|p| p.imageid).collect();
    let gt_ids: Vec<_> = records.iter().map(|r| r.imageid).collect();
    assert_eq!(pred_ids, gt_ids);
}
