//! Caller-supplied values layered over decoded form fields.

use std::collections::HashMap;

use crate::annotation::AnnotationRecord;
use crate::widget::{FieldDescriptor, FieldPayload, FormElementType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
    /// Selections of a multi-select list.
    Multiple(Vec<String>),
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// Overrides keyed by full field name, or by corrected id for button groups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormValues {
    values: HashMap<String, FieldValue>,
}

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = FormValues::new();
        for (k, v) in iter {
            values.insert(k, v);
        }
        values
    }
}

/// The group name of a field: the full name cut before its first anonymous
/// kid segment.
pub fn corrected_id(full_name: &str) -> &str {
    match full_name.find(".`") {
        Some(i) => &full_name[..i],
        None => full_name,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlignment {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlignment {
    fn from_quadding(q: Option<i64>) -> Self {
        match q {
            Some(1) => TextAlignment::Center,
            Some(2) => TextAlignment::Right,
            _ => TextAlignment::Left,
        }
    }
}

/// A form field as it should be presented, after overrides. The decoded
/// record is borrowed, never changed.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldState<'a> {
    pub record: &'a AnnotationRecord,
    pub field: &'a FieldDescriptor,
    pub kind: FormElementType,
    pub corrected_id: &'a str,
    pub is_group_member: bool,
    /// Current value of text and choice fields.
    pub value: Option<String>,
    /// Current state of check boxes and radio buttons.
    pub selected: Option<bool>,
    pub alignment: TextAlignment,
}

fn toggle_selected(options: &[String], value: &str) -> bool {
    options.iter().position(|o| o == value).is_some_and(|i| i > 0)
}

fn text_override(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(s) => s.clone(),
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::Multiple(items) => items.join(","),
    }
}

/// Resolve the presented state of a form field. Records without a form
/// element yield `None`.
pub fn field_state<'a>(record: &'a AnnotationRecord, values: &FormValues) -> Option<FieldState<'a>> {
    let field = record.field()?;
    let kind = field.form_element_type?;
    let corrected_id = corrected_id(&field.full_name);

    let mut value = None;
    let mut selected = None;
    let mut alignment = TextAlignment::Left;

    match &field.payload {
        FieldPayload::Toggle {
            options,
            selected: decoded,
        } => {
            let lookup = if kind == FormElementType::RadioButton {
                values.get(corrected_id)
            } else {
                values
                    .get(&field.full_name)
                    .or_else(|| values.get(corrected_id))
            };
            selected = Some(match lookup {
                Some(FieldValue::Text(v)) => toggle_selected(options, v),
                Some(FieldValue::Bool(b)) if kind == FormElementType::CheckBox => *b,
                Some(_) if kind == FormElementType::RadioButton => false,
                _ => *decoded,
            });
        }
        FieldPayload::Text { alignment: q, .. } => {
            alignment = TextAlignment::from_quadding(*q);
            value = Some(
                values
                    .get(&field.full_name)
                    .map(text_override)
                    .unwrap_or_else(|| field.field_value.clone()),
            );
        }
        FieldPayload::Choice { .. } => {
            value = Some(
                values
                    .get(&field.full_name)
                    .map(text_override)
                    .unwrap_or_else(|| field.field_value.clone()),
            );
        }
        _ => {}
    }

    Some(FieldState {
        record,
        field,
        kind,
        is_group_member: corrected_id.len() != field.full_name.len(),
        corrected_id,
        value,
        selected,
        alignment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::AnnotationFactory;
    use lopdf::{Document, Object, ObjectId, dictionary};

    #[test]
    fn corrected_id_strips_anonymous_kids() {
        assert_eq!(corrected_id("group.`1"), "group");
        assert_eq!(corrected_id("a.b.`0.`2"), "a.b");
        assert_eq!(corrected_id("plain.name"), "plain.name");
    }

    fn radio_group(doc: &mut Document) -> (ObjectId, ObjectId) {
        let parent_id = doc.new_object_id();
        let mut kids = Vec::new();
        for state in ["A", "B"] {
            let on = doc.add_object(lopdf::Stream::new(lopdf::Dictionary::new(), vec![]));
            kids.push(doc.add_object(dictionary! {
                "Subtype" => "Widget",
                "Parent" => parent_id,
                "AS" => "Off",
                "AP" => dictionary! { "N" => dictionary! { "Off" => on, state => on } },
            }));
        }
        doc.objects.insert(
            parent_id,
            Object::Dictionary(dictionary! {
                "FT" => "Btn",
                "Ff" => 32768,
                "T" => Object::string_literal("choice"),
                "Kids" => kids.iter().map(|&k| Object::Reference(k)).collect::<Vec<_>>(),
            }),
        );
        (kids[0], kids[1])
    }

    #[test]
    fn radio_overrides_use_corrected_id() {
        let mut doc = Document::with_version("1.7");
        let (a, b) = radio_group(&mut doc);
        let a = AnnotationFactory::create(&doc, a).unwrap();
        let b = AnnotationFactory::create(&doc, b).unwrap();

        let values: FormValues = [("choice", "B")].into_iter().collect();
        let state_a = field_state(&a, &values).unwrap();
        let state_b = field_state(&b, &values).unwrap();
        assert_eq!(state_a.corrected_id, "choice");
        assert!(state_a.is_group_member);
        assert_eq!(state_a.selected, Some(false));
        assert_eq!(state_b.selected, Some(true));

        // Decoded record is untouched.
        match &b.field().unwrap().payload {
            FieldPayload::Toggle { selected, .. } => assert!(!selected),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn text_and_check_box_overrides() {
        let mut doc = Document::with_version("1.7");
        let text = doc.add_object(dictionary! {
            "Subtype" => "Widget",
            "FT" => "Tx",
            "T" => Object::string_literal("name"),
            "V" => Object::string_literal("decoded"),
            "Q" => 2,
        });
        let check = doc.add_object(dictionary! {
            "Subtype" => "Widget",
            "FT" => "Btn",
            "T" => Object::string_literal("agree"),
        });
        let text = AnnotationFactory::create(&doc, text).unwrap();
        let check = AnnotationFactory::create(&doc, check).unwrap();

        let state = field_state(&text, &FormValues::new()).unwrap();
        assert_eq!(state.value.as_deref(), Some("decoded"));
        assert_eq!(state.alignment, TextAlignment::Right);

        let mut values = FormValues::new();
        values.insert("name", "typed");
        values.insert("agree", true);
        assert_eq!(field_state(&text, &values).unwrap().value.as_deref(), Some("typed"));
        assert_eq!(field_state(&check, &values).unwrap().selected, Some(true));

        values.insert("agree", "Off");
        assert_eq!(field_state(&check, &values).unwrap().selected, Some(false));
    }

    #[test]
    fn non_fields_have_no_state() {
        let mut doc = Document::with_version("1.7");
        let link = doc.add_object(dictionary! { "Subtype" => "Link" });
        let link = AnnotationFactory::create(&doc, link).unwrap();
        assert!(field_state(&link, &FormValues::new()).is_none());
    }
}
