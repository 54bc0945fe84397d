//! Subtype dispatch and the per-page decode pass.

use lopdf::{Document, Object, ObjectId};
use tracing::{debug, trace, warn};

use crate::actions::Trigger;
use crate::annotation::{
    AnnotationRecord, AnnotationSubtype, build_base, build_file_attachment, build_link,
    build_popup, build_text, build_text_markup,
};
use crate::error::AnnotError;
use crate::utils::maybe_get_array;
use crate::widget::build_widget;

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptEntry {
    pub annotation_id: String,
    pub trigger: Trigger,
    pub script: String,
}

/// Translated scripts gathered while decoding, in annotation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptRegistry {
    entries: Vec<ScriptEntry>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every script of `record`.
    pub fn register(&mut self, record: &AnnotationRecord) {
        for (trigger, script) in record.scripts() {
            trace!("registering {} script for {}", trigger, record.id);
            self.entries.push(ScriptEntry {
                annotation_id: record.id.clone(),
                trigger,
                script: script.to_string(),
            });
        }
    }

    pub fn get(&self, annotation_id: &str, trigger: Trigger) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.annotation_id == annotation_id && e.trigger == trigger)
            .map(|e| e.script.as_str())
    }

    pub fn for_annotation<'a>(&'a self, annotation_id: &'a str) -> impl Iterator<Item = &'a ScriptEntry> {
        self.entries
            .iter()
            .filter(move |e| e.annotation_id == annotation_id)
    }

    pub fn entries(&self) -> &[ScriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotationFactory;

impl AnnotationFactory {
    /// Decode the annotation behind `id`. References that do not resolve to
    /// a dictionary yield `None`.
    pub fn create(doc: &Document, id: ObjectId) -> Option<AnnotationRecord> {
        let dict = match doc.get_object(id) {
            Ok(Object::Dictionary(dict)) => dict,
            Ok(_) => {
                debug!("annotation {:?} is not a dictionary", id);
                return None;
            }
            Err(e) => {
                debug!("annotation {:?} does not resolve: {}", id, e);
                return None;
            }
        };

        let record = build_base(doc, dict, id);
        let subtype = record.subtype.clone();
        Some(match subtype {
            AnnotationSubtype::Link => build_link(doc, dict, record),
            AnnotationSubtype::Text => build_text(doc, dict, record),
            AnnotationSubtype::Widget => build_widget(doc, dict, record),
            AnnotationSubtype::Popup => build_popup(doc, dict, record),
            AnnotationSubtype::Highlight
            | AnnotationSubtype::Underline
            | AnnotationSubtype::Squiggly
            | AnnotationSubtype::StrikeOut => build_text_markup(doc, dict, record),
            AnnotationSubtype::FileAttachment => build_file_attachment(doc, dict, record),
            AnnotationSubtype::Unknown(name) => {
                warn!(
                    "unimplemented annotation type {:?}, falling back to base annotation",
                    name
                );
                record
            }
        })
    }
}

/// Decode every annotation of a page, registering their scripts.
pub fn decode_page(
    doc: &Document,
    page_id: ObjectId,
    scripts: &mut ScriptRegistry,
) -> Result<Vec<AnnotationRecord>, AnnotError> {
    decode_page_with(doc, page_id, scripts, |_| true)
}

/// Like [`decode_page`], keeping only the records `keep` accepts. Scripts
/// of dropped records are not registered.
pub fn decode_page_with<F>(
    doc: &Document,
    page_id: ObjectId,
    scripts: &mut ScriptRegistry,
    mut keep: F,
) -> Result<Vec<AnnotationRecord>, AnnotError>
where
    F: FnMut(&AnnotationRecord) -> bool,
{
    let page = doc.get_dictionary(page_id)?;
    let Some(annots) = maybe_get_array(doc, page, b"Annots") else {
        return Ok(Vec::new());
    };

    let mut records = Vec::with_capacity(annots.len());
    for entry in annots {
        let &Object::Reference(id) = entry else {
            debug!("skipping direct annotation entry on page {:?}", page_id);
            continue;
        };
        let Some(record) = AnnotationFactory::create(doc, id) else {
            continue;
        };
        if !keep(&record) {
            trace!("dropping {} on page {:?}", record.id, page_id);
            continue;
        }
        scripts.register(&record);
        records.push(record);
    }
    debug!("page {:?}: {} annotations", page_id, records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationPayload;
    use lopdf::{Dictionary, dictionary};

    #[test_log::test]
    fn create_dispatches_on_subtype() {
        let mut doc = Document::with_version("1.7");
        let link = doc.add_object(dictionary! {
            "Subtype" => "Link",
            "A" => dictionary! { "S" => "Named", "N" => "NextPage" },
        });
        let underline = doc.add_object(dictionary! { "Subtype" => "Underline" });
        let missing = doc.add_object(Dictionary::new());
        let not_a_dict = doc.add_object(Object::Integer(3));

        let record = AnnotationFactory::create(&doc, link).unwrap();
        assert!(matches!(record.payload, AnnotationPayload::Link(_)));
        let record = AnnotationFactory::create(&doc, underline).unwrap();
        assert!(matches!(record.payload, AnnotationPayload::TextMarkup(_)));
        let record = AnnotationFactory::create(&doc, missing).unwrap();
        assert_eq!(record.subtype, AnnotationSubtype::Unknown(String::new()));
        assert_eq!(record.payload, AnnotationPayload::Unknown);

        assert!(AnnotationFactory::create(&doc, not_a_dict).is_none());
        assert!(AnnotationFactory::create(&doc, (404, 0)).is_none());
    }

    #[test_log::test]
    fn page_pass_collects_records_and_scripts() {
        let mut doc = Document::with_version("1.7");
        let field = doc.add_object(dictionary! {
            "Subtype" => "Widget",
            "FT" => "Tx",
            "T" => Object::string_literal("total"),
            "AA" => dictionary! {
                "C" => dictionary! { "S" => "JavaScript", "JS" => Object::string_literal("app.alert(1)") },
            },
        });
        let stale = (77, 0);
        let page = doc.add_object(dictionary! {
            "Type" => "Page",
            "Annots" => Object::Array(vec![
                field.into(),
                Object::Reference(stale),
                Object::Dictionary(dictionary! { "Subtype" => "Text" }),
            ]),
        });

        let mut scripts = ScriptRegistry::new();
        let records = decode_page(&doc, page, &mut scripts).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].field().unwrap().full_name, "total");
        assert_eq!(scripts.len(), 1);
        let id = records[0].id.clone();
        assert!(scripts.get(&id, Trigger::Calculate).unwrap().contains("window.alert(1)"));
        assert!(scripts.get(&id, Trigger::Focus).is_none());
        assert_eq!(scripts.for_annotation(&id).count(), 1);
    }

    #[test]
    fn page_without_annotations() {
        let mut doc = Document::with_version("1.7");
        let page = doc.add_object(dictionary! { "Type" => "Page" });
        let mut scripts = ScriptRegistry::new();
        assert!(decode_page(&doc, page, &mut scripts).unwrap().is_empty());
        assert!(scripts.is_empty());
    }

    #[test_log::test]
    fn filtered_records_register_no_scripts() {
        let mut doc = Document::with_version("1.7");
        let script = dictionary! {
            "C" => dictionary! { "S" => "JavaScript", "JS" => Object::string_literal("app.alert(1)") },
        };
        let hidden = doc.add_object(dictionary! {
            "Subtype" => "Widget",
            "FT" => "Tx",
            "F" => 2,
            "AA" => script.clone(),
        });
        let shown = doc.add_object(dictionary! {
            "Subtype" => "Widget",
            "FT" => "Tx",
            "AA" => script,
        });
        let page = doc.add_object(dictionary! {
            "Type" => "Page",
            "Annots" => Object::Array(vec![hidden.into(), shown.into()]),
        });

        let mut scripts = ScriptRegistry::new();
        let records = decode_page_with(&doc, page, &mut scripts, AnnotationRecord::viewable).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].object_id, shown);
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts.entries()[0].annotation_id, records[0].id);
    }
}
