//! Operator lists for painting annotation appearances.

use std::fmt;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document};
use tracing::{debug, warn};

use crate::annotation::AnnotationRecord;
use crate::error::AnnotError;
use crate::types::{Matrix, Rect, axial_aligned_bounding_box};
use crate::utils::{get_contents, get_inherited, maybe_get};
use crate::widget::FieldType;

/// Which flag predicate selects annotations for painting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderIntent {
    #[default]
    Display,
    Print,
}

impl RenderIntent {
    pub fn includes(&self, record: &AnnotationRecord) -> bool {
        match self {
            RenderIntent::Display => record.viewable(),
            RenderIntent::Print => record.printable(),
        }
    }
}

impl fmt::Display for RenderIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RenderIntent::Display => "display",
            RenderIntent::Print => "print",
        })
    }
}

#[derive(Debug, Clone)]
pub enum PaintOp {
    BeginAnnotations,
    BeginAnnotation {
        rect: Rect,
        transform: Matrix,
        matrix: Matrix,
    },
    EndAnnotation,
    EndAnnotations,
    /// A content-stream operation produced by the evaluator.
    Content(Operation),
}

pub type OperatorList = Vec<PaintOp>;

/// Turns content streams into paint operations.
pub trait AppearanceEvaluator {
    fn evaluate(
        &mut self,
        doc: &Document,
        content: &[u8],
        resources: Option<&Dictionary>,
        ops: &mut OperatorList,
    ) -> Result<(), AnnotError>;
}

/// Decodes the content stream and forwards every operation unchanged.
#[derive(Debug, Default)]
pub struct ContentDecoder;

impl AppearanceEvaluator for ContentDecoder {
    fn evaluate(
        &mut self,
        _doc: &Document,
        content: &[u8],
        _resources: Option<&Dictionary>,
        ops: &mut OperatorList,
    ) -> Result<(), AnnotError> {
        let content = Content::decode(content)
            .map_err(|e| AnnotError::AppearanceError(format!("undecodable content: {}", e)))?;
        ops.extend(content.operations.into_iter().map(PaintOp::Content));
        Ok(())
    }
}

/// Map the appearance bounding box, under `matrix`, onto `rect`. A box that
/// collapses to a line or point only gets translated to the rect origin.
pub fn transform_matrix(rect: &Rect, bbox: &Rect, matrix: &Matrix) -> Matrix {
    let [min_x, min_y, max_x, max_y] = axial_aligned_bounding_box(bbox, matrix);
    if min_x == max_x || min_y == max_y {
        return [1.0, 0.0, 0.0, 1.0, rect[0], rect[1]];
    }

    let x_ratio = (rect[2] - rect[0]) / (max_x - min_x);
    let y_ratio = (rect[3] - rect[1]) / (max_y - min_y);
    [
        x_ratio,
        0.0,
        0.0,
        y_ratio,
        rect[0] - min_x * x_ratio,
        rect[1] - min_y * y_ratio,
    ]
}

fn is_text_widget(record: &AnnotationRecord) -> bool {
    record
        .field()
        .is_some_and(|f| f.field_type == FieldType::Text)
}

/// Text widgets without an appearance stream paint their `/DA` string
/// directly, with the field's `/DR` resources and without markers.
fn default_appearance_ops<E: AppearanceEvaluator>(
    doc: &Document,
    record: &AnnotationRecord,
    evaluator: &mut E,
) -> Result<OperatorList, AnnotError> {
    let mut ops = OperatorList::new();
    let Some(da) = record.field().map(|f| f.default_appearance.as_str()) else {
        return Ok(ops);
    };
    if da.is_empty() {
        return Ok(ops);
    }

    let dict = doc.get_dictionary(record.object_id)?;
    let resources = get_inherited::<&Dictionary>(doc, dict, b"DR");
    evaluator.evaluate(doc, da.as_bytes(), resources, &mut ops)?;
    Ok(ops)
}

/// Paint operations for one annotation.
pub fn get_operator_list<E: AppearanceEvaluator>(
    doc: &Document,
    record: &AnnotationRecord,
    evaluator: &mut E,
) -> Result<OperatorList, AnnotError> {
    let Some(appearance) = &record.appearance else {
        if is_text_widget(record) {
            return default_appearance_ops(doc, record, evaluator);
        }
        return Ok(OperatorList::new());
    };

    let stream = doc.get_object(appearance.stream)?.as_stream()?;
    let resources = maybe_get::<&Dictionary>(doc, &stream.dict, b"Resources");
    let transform = transform_matrix(&record.rect, &appearance.bbox, &appearance.matrix);
    debug!("annotation {} transform {:?}", record.id, transform);

    let mut ops = vec![PaintOp::BeginAnnotation {
        rect: record.rect,
        transform,
        matrix: appearance.matrix,
    }];
    evaluator.evaluate(doc, &get_contents(stream), resources, &mut ops)?;
    ops.push(PaintOp::EndAnnotation);
    Ok(ops)
}

/// Append the paint operations of every annotation selected by `intent`,
/// bracketed by `BeginAnnotations`/`EndAnnotations`. An annotation that
/// fails to paint is left out.
pub fn append_to_operator_list<E: AppearanceEvaluator>(
    doc: &Document,
    records: &[AnnotationRecord],
    intent: RenderIntent,
    evaluator: &mut E,
    ops: &mut OperatorList,
) {
    ops.push(PaintOp::BeginAnnotations);
    for record in records.iter().filter(|r| intent.includes(r)) {
        match get_operator_list(doc, record, evaluator) {
            Ok(list) => ops.extend(list),
            Err(e) => warn!("failed to paint annotation {}: {}", record.id, e),
        }
    }
    ops.push(PaintOp::EndAnnotations);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::AnnotationFactory;
    use lopdf::{Object, ObjectId, Stream, dictionary};

    fn numbers(values: &[i64]) -> Object {
        Object::Array(values.iter().map(|&v| Object::Integer(v)).collect())
    }

    fn record(doc: &Document, id: ObjectId) -> AnnotationRecord {
        AnnotationFactory::create(doc, id).unwrap()
    }

    #[test]
    fn transform_scales_bbox_onto_rect() {
        let t = transform_matrix(&[10.0, 20.0, 110.0, 70.0], &[0.0, 0.0, 50.0, 50.0], &[1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        assert_eq!(t, [2.0, 0.0, 0.0, 1.0, 10.0, 20.0]);
    }

    #[test]
    fn degenerate_bbox_only_translates() {
        let t = transform_matrix(&[10.0, 20.0, 110.0, 70.0], &[0.0, 0.0, 0.0, 0.0], &[1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        assert_eq!(t, [1.0, 0.0, 0.0, 1.0, 10.0, 20.0]);
    }

    #[test_log::test]
    fn appearance_is_bracketed() {
        let mut doc = Document::with_version("1.7");
        let ap = doc.add_object(Stream::new(
            dictionary! { "BBox" => numbers(&[0, 0, 10, 10]) },
            b"0 0 1 rg 0 0 10 10 re f".to_vec(),
        ));
        let id = doc.add_object(dictionary! {
            "Subtype" => "Square",
            "Rect" => numbers(&[0, 0, 20, 20]),
            "AP" => dictionary! { "N" => ap },
        });
        let ops = get_operator_list(&doc, &record(&doc, id), &mut ContentDecoder).unwrap();
        assert_eq!(ops.len(), 5);
        match &ops[0] {
            PaintOp::BeginAnnotation {
                rect,
                transform,
                matrix,
            } => {
                assert_eq!(rect, &[0.0, 0.0, 20.0, 20.0]);
                assert_eq!(transform, &[2.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
                assert_eq!(matrix, &[1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
            }
            other => panic!("unexpected op {:?}", other),
        }
        assert!(matches!(&ops[1], PaintOp::Content(op) if op.operator == "rg"));
        assert!(matches!(ops[4], PaintOp::EndAnnotation));
    }

    #[test]
    fn no_appearance_paints_nothing() {
        let mut doc = Document::with_version("1.7");
        let id = doc.add_object(dictionary! { "Subtype" => "Square" });
        let ops = get_operator_list(&doc, &record(&doc, id), &mut ContentDecoder).unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn text_widget_paints_default_appearance() {
        let mut doc = Document::with_version("1.7");
        let parent = doc.add_object(dictionary! {
            "FT" => "Tx",
            "DA" => Object::string_literal("/Helv 10 Tf 0 g"),
            "DR" => dictionary! { "Font" => Dictionary::new() },
        });
        let id = doc.add_object(dictionary! { "Subtype" => "Widget", "Parent" => parent });

        struct Recorder(Vec<bool>);
        impl AppearanceEvaluator for Recorder {
            fn evaluate(
                &mut self,
                doc: &Document,
                content: &[u8],
                resources: Option<&Dictionary>,
                ops: &mut OperatorList,
            ) -> Result<(), AnnotError> {
                self.0.push(resources.is_some_and(|r| r.has(b"Font")));
                ContentDecoder.evaluate(doc, content, resources, ops)
            }
        }

        let mut recorder = Recorder(vec![]);
        let ops = get_operator_list(&doc, &record(&doc, id), &mut recorder).unwrap();
        assert_eq!(recorder.0, vec![true]);
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(|op| matches!(op, PaintOp::Content(_))));
    }

    #[test_log::test]
    fn intent_filters_and_failures_are_isolated() {
        let mut doc = Document::with_version("1.7");
        let ap = doc.add_object(Stream::new(Dictionary::new(), b"0 g".to_vec()));
        let printable = doc.add_object(dictionary! {
            "Subtype" => "Square",
            "F" => 4,
            "AP" => dictionary! { "N" => ap },
        });
        let hidden = doc.add_object(dictionary! {
            "Subtype" => "Square",
            "F" => 2,
            "AP" => dictionary! { "N" => ap },
        });
        let records = vec![record(&doc, printable), record(&doc, hidden)];

        let mut ops = OperatorList::new();
        append_to_operator_list(&doc, &records, RenderIntent::Print, &mut ContentDecoder, &mut ops);
        assert!(matches!(ops.first(), Some(PaintOp::BeginAnnotations)));
        assert!(matches!(ops.last(), Some(PaintOp::EndAnnotations)));
        assert_eq!(
            ops.iter()
                .filter(|op| matches!(op, PaintOp::BeginAnnotation { .. }))
                .count(),
            1
        );

        struct Failing;
        impl AppearanceEvaluator for Failing {
            fn evaluate(
                &mut self,
                _: &Document,
                _: &[u8],
                _: Option<&Dictionary>,
                _: &mut OperatorList,
            ) -> Result<(), AnnotError> {
                Err(AnnotError::AppearanceError("broken".into()))
            }
        }
        let mut ops = OperatorList::new();
        append_to_operator_list(&doc, &records, RenderIntent::Display, &mut Failing, &mut ops);
        assert!(matches!(
            ops.as_slice(),
            [PaintOp::BeginAnnotations, PaintOp::EndAnnotations]
        ));
    }
}
