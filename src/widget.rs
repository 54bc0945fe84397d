//! Form field classification for Widget annotations.

use std::fmt;
use std::sync::LazyLock;

use bitflags::bitflags;
use lopdf::{Dictionary, Document, Object};
use regex::Regex;
use tracing::debug;

use crate::annotation::{AnnotationFlags, AnnotationPayload, AnnotationRecord};
use crate::field_name::resolve_full_name;
use crate::utils::{
    as_integer, as_text, get_inherited, get_inherited_obj, maybe_deref, maybe_get,
    maybe_get_name_string, maybe_get_text,
};

bitflags! {
    /// Field flags (`/Ff`), kept with every bit that was set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FieldFlags: u32 {
        const READ_ONLY = 1 << 0;
        const REQUIRED = 1 << 1;
        const NO_EXPORT = 1 << 2;
        const MULTILINE = 1 << 12;
        const PASSWORD = 1 << 13;
        const NO_TOGGLE_TO_OFF = 1 << 14;
        const RADIO = 1 << 15;
        const PUSHBUTTON = 1 << 16;
        const COMBO = 1 << 17;
        const EDIT = 1 << 18;
        const FILE_SELECT = 1 << 20;
        const MULTI_SELECT = 1 << 21;
    }
}

/// Combo box with an editable text entry, and nothing else set.
const EDITABLE_COMBO: u32 = 393216;
/// Multiple-selection list box, and nothing else set.
const MULTI_SELECT_LIST: u32 = 2097152;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Button,
    Choice,
    Signature,
    /// Any other `/FT`, or empty when there is none.
    Other(String),
}

impl FieldType {
    fn from_pdf_name(name: &str) -> Self {
        match name {
            "Tx" => FieldType::Text,
            "Btn" => FieldType::Button,
            "Ch" => FieldType::Choice,
            "Sig" => FieldType::Signature,
            other => FieldType::Other(other.to_string()),
        }
    }

    pub fn as_pdf_name(&self) -> &str {
        match self {
            FieldType::Text => "Tx",
            FieldType::Button => "Btn",
            FieldType::Choice => "Ch",
            FieldType::Signature => "Sig",
            FieldType::Other(name) => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormElementType {
    Text,
    CheckBox,
    RadioButton,
    PushButton,
    DropDown,
    Signature,
}

impl fmt::Display for FormElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FormElementType::Text => "TEXT",
            FormElementType::CheckBox => "CHECK_BOX",
            FormElementType::RadioButton => "RADIO_BUTTON",
            FormElementType::PushButton => "PUSH_BUTTON",
            FormElementType::DropDown => "DROP_DOWN",
            FormElementType::Signature => "SIGNATURE",
        })
    }
}

/// Font resource name and size parsed from a `/DA` string.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultFont {
    pub name: String,
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    pub value: String,
    pub text: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureLock {
    pub action: String,
    pub lock_type: Option<String>,
    /// Locked field names; absent when `action` is `All`.
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldPayload {
    Text {
        multiline: bool,
        password: bool,
        file_upload: bool,
        max_length: Option<i64>,
        rich_text: String,
        alignment: Option<i64>,
    },
    Choice {
        /// `None` when `/Opt` or `/I` is malformed.
        options: Option<Vec<ChoiceOption>>,
        allow_text_entry: bool,
        multi_select: bool,
    },
    /// Check boxes and radio buttons. `options[0]` is always `Off`.
    Toggle { options: Vec<String>, selected: bool },
    PushButton { label: String },
    Signature { lock: Option<SignatureLock> },
    /// No form element was assigned.
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub field_type: FieldType,
    pub form_element_type: Option<FormElementType>,
    pub field_flags: FieldFlags,
    pub full_name: String,
    /// The node's own `/T`.
    pub original_name: String,
    pub field_value: String,
    pub alternative_text: String,
    pub default_appearance: String,
    pub default_font: Option<DefaultFont>,
    /// Barcode payload text fields; these get no form element.
    pub paper_meta_data: bool,
    /// Drawn for print but left to the form layer for display.
    pub hidden_for_forms: bool,
    pub payload: FieldPayload,
}

impl FieldDescriptor {
    pub fn read_only(&self) -> bool {
        self.field_flags.contains(FieldFlags::READ_ONLY)
    }

    pub fn required(&self) -> bool {
        self.field_flags.contains(FieldFlags::REQUIRED)
    }

    pub fn no_export(&self) -> bool {
        self.field_flags.contains(FieldFlags::NO_EXPORT)
    }

    pub fn is_toggle(&self) -> bool {
        matches!(
            self.form_element_type,
            Some(FormElementType::CheckBox | FormElementType::RadioButton)
        )
    }
}

static DA_FONT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\w+) (\d+(?:\.\d+)?) Tf").expect("font pattern is valid"));

fn parse_default_font(da: &str) -> Option<DefaultFont> {
    let caps = DA_FONT.captures(da)?;
    let size: f64 = caps[2].parse().ok()?;
    (size > 0.0).then(|| DefaultFont {
        name: caps[1].to_string(),
        size,
    })
}

fn classify(
    doc: &Document,
    dict: &Dictionary,
    field_type: &FieldType,
    flags: FieldFlags,
) -> Option<FormElementType> {
    match field_type {
        FieldType::Text => {
            if has_paper_meta_data(doc, dict) {
                None
            } else {
                Some(FormElementType::Text)
            }
        }
        FieldType::Button => Some(if flags.contains(FieldFlags::RADIO) {
            FormElementType::RadioButton
        } else if flags.contains(FieldFlags::PUSHBUTTON) {
            FormElementType::PushButton
        } else {
            FormElementType::CheckBox
        }),
        FieldType::Choice => Some(FormElementType::DropDown),
        FieldType::Signature => Some(FormElementType::Signature),
        FieldType::Other(_) => None,
    }
}

fn has_paper_meta_data(doc: &Document, dict: &Dictionary) -> bool {
    !matches!(
        get_inherited_obj(doc, dict, b"PMD"),
        None | Some(Object::Null) | Some(Object::Boolean(false))
    )
}

fn decode_field_value(doc: &Document, dict: &Dictionary) -> String {
    match get_inherited_obj(doc, dict, b"V") {
        Some(Object::Array(values)) => values
            .iter()
            .map(|v| maybe_deref(doc, v).and_then(as_text).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(","),
        Some(v) => as_text(v).unwrap_or_default(),
        None => String::new(),
    }
}

/// Appearance states of `/AP /N`, as far as they can be read.
enum AppearanceStates {
    States(Vec<String>),
    Absent,
    Broken,
}

fn appearance_states(doc: &Document, dict: &Dictionary) -> AppearanceStates {
    let Ok(ap) = dict.get(b"AP") else {
        return AppearanceStates::Absent;
    };
    let Some(ap) = maybe_deref(doc, ap) else {
        return AppearanceStates::Broken;
    };
    let Ok(ap) = ap.as_dict() else {
        return AppearanceStates::Absent;
    };
    let Ok(normal) = ap.get(b"N") else {
        return AppearanceStates::Absent;
    };
    match maybe_deref(doc, normal) {
        Some(Object::Dictionary(states)) => {
            if states.is_empty() {
                return AppearanceStates::Absent;
            }
            let mut options = vec!["Off".to_string()];
            options.extend(
                states
                    .iter()
                    .map(|(key, _)| String::from_utf8_lossy(key).into_owned())
                    .filter(|key| key != "Off"),
            );
            AppearanceStates::States(options)
        }
        Some(_) => AppearanceStates::Absent,
        None => AppearanceStates::Broken,
    }
}

fn selected_from_states(options: &[String], value: Option<&str>) -> bool {
    options.len() >= 2 && value == Some(options[1].as_str())
}

fn toggle_fallback(on: String) -> FieldPayload {
    FieldPayload::Toggle {
        options: vec!["Off".to_string(), on],
        selected: false,
    }
}

/// Own `/V` of a check box; `Off` when absent, `None` when not a name.
fn check_box_value(doc: &Document, dict: &Dictionary) -> Option<String> {
    if dict.has(b"V") {
        maybe_get_name_string(doc, dict, b"V")
    } else {
        Some("Off".to_string())
    }
}

fn check_box_payload(doc: &Document, dict: &Dictionary, id: &str) -> FieldPayload {
    let value = check_box_value(doc, dict);

    match appearance_states(doc, dict) {
        AppearanceStates::States(options) => {
            let selected = selected_from_states(&options, value.as_deref());
            return FieldPayload::Toggle { options, selected };
        }
        AppearanceStates::Broken => {
            debug!("check box {} has an unreadable appearance dictionary", id);
            return toggle_fallback("Yes".to_string());
        }
        AppearanceStates::Absent => {}
    }

    // The export value may be carried by /AS when the box is checked.
    if let Some(state) = maybe_get_name_string(doc, dict, b"AS").filter(|s| s != "Off") {
        return FieldPayload::Toggle {
            selected: value.as_deref() == Some(state.as_str()),
            options: vec!["Off".to_string(), state],
        };
    }

    FieldPayload::Toggle {
        options: vec!["Off".to_string(), "Yes".to_string()],
        selected: value.as_deref() != Some("Off"),
    }
}

fn radio_payload(doc: &Document, dict: &Dictionary, record: &AnnotationRecord) -> FieldPayload {
    let value =
        maybe_get_name_string(doc, dict, b"AS").unwrap_or_else(|| "Off".to_string());

    match appearance_states(doc, dict) {
        AppearanceStates::States(options) => {
            let selected = selected_from_states(&options, Some(&value));
            FieldPayload::Toggle { options, selected }
        }
        AppearanceStates::Absent | AppearanceStates::Broken => {
            debug!("radio button {} has no usable appearance states", record.id);
            let (num, generation) = record.object_id;
            toggle_fallback(format!("Yes_{}_{}", num, generation))
        }
    }
}

fn choice_option(doc: &Document, entry: &Object) -> Option<ChoiceOption> {
    let (value, text) = match maybe_deref(doc, entry)? {
        Object::Array(pair) => {
            let value = as_text(maybe_deref(doc, pair.first()?)?)?;
            let text = as_text(maybe_deref(doc, pair.get(1)?)?)?;
            (value, text)
        }
        other => {
            let value = as_text(other)?;
            (value.clone(), value)
        }
    };
    Some(ChoiceOption {
        value,
        text,
        selected: false,
    })
}

/// Options from `/Opt` with the `/I` selections applied. A missing `/I`
/// selects nothing rather than failing the whole option list. Any malformed
/// entry yields `None`.
fn choice_options(doc: &Document, dict: &Dictionary) -> Option<Vec<ChoiceOption>> {
    let mut options = match dict.get(b"Opt") {
        Ok(opt) => maybe_deref(doc, opt)?
            .as_array()
            .ok()?
            .iter()
            .map(|entry| choice_option(doc, entry))
            .collect::<Option<Vec<_>>>()?,
        Err(_) => Vec::new(),
    };

    if let Ok(indexes) = dict.get(b"I") {
        for index in maybe_deref(doc, indexes)?.as_array().ok()? {
            let index = as_integer(maybe_deref(doc, index)?)?;
            options.get_mut(usize::try_from(index).ok()?)?.selected = true;
        }
    }

    Some(options)
}

fn choice_payload(doc: &Document, dict: &Dictionary, flags: FieldFlags, id: &str) -> FieldPayload {
    let options = choice_options(doc, dict);
    if options.is_none() {
        debug!("choice field {} has malformed /Opt or /I", id);
    }
    FieldPayload::Choice {
        options,
        allow_text_entry: flags.bits() == EDITABLE_COMBO,
        multi_select: flags.bits() == MULTI_SELECT_LIST,
    }
}

fn text_payload(doc: &Document, dict: &Dictionary, flags: FieldFlags) -> FieldPayload {
    FieldPayload::Text {
        multiline: flags.contains(FieldFlags::MULTILINE),
        password: flags.contains(FieldFlags::PASSWORD),
        file_upload: flags.contains(FieldFlags::FILE_SELECT),
        max_length: get_inherited::<i64>(doc, dict, b"MaxLen"),
        rich_text: get_inherited_obj(doc, dict, b"RV")
            .and_then(as_text)
            .unwrap_or_default(),
        alignment: get_inherited::<i64>(doc, dict, b"Q"),
    }
}

fn push_button_payload(doc: &Document, dict: &Dictionary) -> FieldPayload {
    let label = maybe_get::<&Dictionary>(doc, dict, b"MK")
        .and_then(|mk| maybe_get_text(doc, mk, b"CA"))
        .unwrap_or_default();
    FieldPayload::PushButton { label }
}

fn signature_lock(doc: &Document, dict: &Dictionary, id: &str) -> Option<SignatureLock> {
    let lock = get_inherited::<&Dictionary>(doc, dict, b"Lock")?;
    let Some(action) = maybe_get_name_string(doc, lock, b"Action") else {
        debug!("signature lock on {} has no /Action", id);
        return None;
    };
    let fields = if action == "All" {
        None
    } else {
        maybe_get::<&Object>(doc, lock, b"Fields")
            .and_then(|f| f.as_array().ok())
            .map(|names| {
                names
                    .iter()
                    .filter_map(|n| maybe_deref(doc, n).and_then(as_text))
                    .collect()
            })
    };
    Some(SignatureLock {
        lock_type: maybe_get_name_string(doc, lock, b"Type"),
        action,
        fields,
    })
}

/// Classify a Widget's field and decode its category-specific properties.
pub fn decode_field(doc: &Document, dict: &Dictionary, record: &AnnotationRecord) -> FieldDescriptor {
    let field_type = FieldType::from_pdf_name(
        &get_inherited_obj(doc, dict, b"FT")
            .and_then(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .unwrap_or_default(),
    );
    let field_flags = match get_inherited_obj(doc, dict, b"Ff") {
        Some(&Object::Integer(i)) => FieldFlags::from_bits_retain(u32::try_from(i).unwrap_or(0)),
        _ => FieldFlags::empty(),
    };
    let default_appearance = get_inherited_obj(doc, dict, b"DA")
        .and_then(as_text)
        .unwrap_or_default();

    let form_element_type = classify(doc, dict, &field_type, field_flags);
    let paper_meta_data = field_type == FieldType::Text && form_element_type.is_none();

    let payload = match form_element_type {
        Some(FormElementType::Text) => text_payload(doc, dict, field_flags),
        Some(FormElementType::CheckBox) => check_box_payload(doc, dict, &record.id),
        Some(FormElementType::RadioButton) => radio_payload(doc, dict, record),
        Some(FormElementType::PushButton) => push_button_payload(doc, dict),
        Some(FormElementType::DropDown) => choice_payload(doc, dict, field_flags, &record.id),
        Some(FormElementType::Signature) => FieldPayload::Signature {
            lock: signature_lock(doc, dict, &record.id),
        },
        None => FieldPayload::None,
    };

    FieldDescriptor {
        full_name: resolve_full_name(doc, dict, Some(record.object_id)),
        original_name: maybe_get_text(doc, dict, b"T").unwrap_or_default(),
        field_value: decode_field_value(doc, dict),
        alternative_text: maybe_get_text(doc, dict, b"TU").unwrap_or_default(),
        default_font: parse_default_font(&default_appearance),
        default_appearance,
        hidden_for_forms: form_element_type.is_some()
            && !record.has_flag(AnnotationFlags::HIDDEN),
        paper_meta_data,
        form_element_type,
        field_flags,
        field_type,
        payload,
    }
}

pub fn build_widget(doc: &Document, dict: &Dictionary, mut record: AnnotationRecord) -> AnnotationRecord {
    let field = decode_field(doc, dict, &record);
    record.payload = AnnotationPayload::Widget(Box::new(field));
    record
}
