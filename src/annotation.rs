//! The decoded annotation record and the builders shared by every subtype.

use std::collections::BTreeMap;
use std::fmt;

use bitflags::bitflags;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, warn};

use crate::actions::{
    ActionBundle, LinkTarget, Trigger, decode_action, decode_additional_actions,
    decode_link_target,
};
use crate::border::{BorderStyle, resolve_border_style};
use crate::color::{Rgb, resolve_color};
use crate::types::{IDENTITY_MATRIX, Matrix, Rect, normalize_rect};
use crate::utils::{
    get_contents, get_parent_ref, maybe_get, maybe_get_name, maybe_get_name_string,
    maybe_get_obj, maybe_get_text, object_id_string,
};
use crate::widget::FieldDescriptor;

bitflags! {
    /// Annotation flags (`/F`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AnnotationFlags: u32 {
        const INVISIBLE = 1 << 0;
        const HIDDEN = 1 << 1;
        const PRINT = 1 << 2;
        const NO_ZOOM = 1 << 3;
        const NO_ROTATE = 1 << 4;
        const NO_VIEW = 1 << 5;
        const READ_ONLY = 1 << 6;
        const LOCKED = 1 << 7;
        const TOGGLE_NO_VIEW = 1 << 8;
        const LOCKED_CONTENTS = 1 << 9;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationSubtype {
    Link,
    Text,
    Widget,
    Popup,
    Highlight,
    Underline,
    Squiggly,
    StrikeOut,
    FileAttachment,
    /// Any other `/Subtype`, kept verbatim (empty when missing).
    Unknown(String),
}

impl AnnotationSubtype {
    pub fn from_pdf_name(name: &str) -> Self {
        match name {
            "Link" => Self::Link,
            "Text" => Self::Text,
            "Widget" => Self::Widget,
            "Popup" => Self::Popup,
            "Highlight" => Self::Highlight,
            "Underline" => Self::Underline,
            "Squiggly" => Self::Squiggly,
            "StrikeOut" => Self::StrikeOut,
            "FileAttachment" => Self::FileAttachment,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_pdf_name(&self) -> &str {
        match self {
            Self::Link => "Link",
            Self::Text => "Text",
            Self::Widget => "Widget",
            Self::Popup => "Popup",
            Self::Highlight => "Highlight",
            Self::Underline => "Underline",
            Self::Squiggly => "Squiggly",
            Self::StrikeOut => "StrikeOut",
            Self::FileAttachment => "FileAttachment",
            Self::Unknown(name) => name,
        }
    }
}

impl fmt::Display for AnnotationSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_pdf_name())
    }
}

/// The normal appearance stream selected for painting.
#[derive(Debug, Clone, PartialEq)]
pub struct Appearance {
    pub stream: ObjectId,
    /// The `/AS` state used to pick the stream, if `/AP /N` holds states.
    pub state: Option<String>,
    pub bbox: Rect,
    pub matrix: Matrix,
}

/// Popup-related data of markup annotations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkupInfo {
    pub has_popup: bool,
    pub title: String,
    pub contents: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileSpec {
    pub filename: String,
    pub content: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationPayload {
    Link(LinkTarget),
    Text {
        /// Icon name; `NoIcon` when an appearance stream exists.
        name: String,
        markup: MarkupInfo,
    },
    Widget(Box<FieldDescriptor>),
    Popup {
        parent_id: Option<String>,
        title: String,
        contents: String,
    },
    /// Highlight, Underline, Squiggly and StrikeOut.
    TextMarkup(MarkupInfo),
    FileAttachment {
        file: Option<FileSpec>,
        markup: MarkupInfo,
    },
    Unknown,
}

/// One decoded annotation. Built once per page pass and never changed.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    pub id: String,
    pub object_id: ObjectId,
    pub subtype: AnnotationSubtype,
    pub flags: AnnotationFlags,
    /// Normalized so that `rect[0] <= rect[2]` and `rect[1] <= rect[3]`.
    pub rect: Rect,
    /// `None` is transparent.
    pub color: Option<Rgb>,
    pub border_style: BorderStyle,
    pub appearance: Option<Appearance>,
    pub action: Option<ActionBundle>,
    pub additional_actions: Option<BTreeMap<Trigger, ActionBundle>>,
    pub payload: AnnotationPayload,
}

impl AnnotationRecord {
    pub fn has_flag(&self, flag: AnnotationFlags) -> bool {
        self.flags.intersects(flag)
    }

    /// Shown for the display intent.
    pub fn viewable(&self) -> bool {
        if self.flags.is_empty() {
            return true;
        }
        !self.has_flag(AnnotationFlags::INVISIBLE)
            && !self.has_flag(AnnotationFlags::HIDDEN)
            && !self.has_flag(AnnotationFlags::NO_VIEW)
    }

    /// Shown for the print intent. An annotation without flags never prints.
    pub fn printable(&self) -> bool {
        if self.flags.is_empty() {
            return false;
        }
        self.has_flag(AnnotationFlags::PRINT)
            && !self.has_flag(AnnotationFlags::INVISIBLE)
            && !self.has_flag(AnnotationFlags::HIDDEN)
    }

    pub fn has_appearance(&self) -> bool {
        self.appearance.is_some()
    }

    pub fn field(&self) -> Option<&FieldDescriptor> {
        match &self.payload {
            AnnotationPayload::Widget(field) => Some(field.as_ref()),
            _ => None,
        }
    }

    /// Every translated script of this annotation with its trigger.
    pub fn scripts(&self) -> impl Iterator<Item = (Trigger, &str)> {
        let primary = self
            .action
            .iter()
            .filter_map(|a| a.script.as_deref().map(|s| (Trigger::Activate, s)));
        let additional = self.additional_actions.iter().flat_map(|aa| {
            aa.iter()
                .filter_map(|(t, a)| a.script.as_deref().map(|s| (*t, s)))
        });
        primary.chain(additional)
    }
}

impl fmt::Display for AnnotationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{:.1} {:.1} {:.1} {:.1}]",
            self.id, self.subtype, self.rect[0], self.rect[1], self.rect[2], self.rect[3]
        )?;
        match &self.payload {
            AnnotationPayload::Widget(field) => {
                write!(f, " {}", field.full_name)?;
                if let Some(kind) = field.form_element_type {
                    write!(f, " ({})", kind)?;
                }
            }
            AnnotationPayload::Link(link) => {
                if let Some(url) = link.url.as_deref().filter(|u| !u.is_empty()) {
                    write!(f, " -> {}", url)?;
                } else if let Some(dest) = &link.dest {
                    write!(f, " -> {:?}", dest)?;
                } else if let Some(action) = &link.action {
                    write!(f, " -> {}", action)?;
                }
            }
            AnnotationPayload::Text { markup, .. }
            | AnnotationPayload::TextMarkup(markup)
            | AnnotationPayload::FileAttachment { markup, .. } => {
                if !markup.contents.is_empty() {
                    write!(f, " {:?}", markup.contents)?;
                }
            }
            AnnotationPayload::Popup { contents, .. } => {
                if !contents.is_empty() {
                    write!(f, " {:?}", contents)?;
                }
            }
            AnnotationPayload::Unknown => {}
        }
        Ok(())
    }
}

fn decode_flags(doc: &Document, dict: &Dictionary) -> AnnotationFlags {
    match maybe_get_obj(doc, dict, b"F") {
        Some(&Object::Integer(i)) => AnnotationFlags::from_bits_retain(u32::try_from(i).unwrap_or(0)),
        _ => AnnotationFlags::empty(),
    }
}

fn decode_rect(doc: &Document, dict: &Dictionary) -> Rect {
    let numbers: Option<Vec<f64>> = maybe_get::<Vec<f64>>(doc, dict, b"Rect");
    match numbers.as_deref() {
        Some(&[a, b, c, d]) => normalize_rect([a, b, c, d]),
        _ => [0.0; 4],
    }
}

fn decode_number_array<const N: usize>(
    doc: &Document,
    dict: &Dictionary,
    key: &[u8],
) -> Option<[f64; N]> {
    let values = maybe_get::<Vec<f64>>(doc, dict, key)?;
    values.try_into().ok()
}

/// Pick the normal appearance: `/AP /N` directly, or the `/AS` state of it
/// when `/N` is a dictionary of states.
fn decode_appearance(doc: &Document, dict: &Dictionary) -> Option<Appearance> {
    let ap = maybe_get::<&Dictionary>(doc, dict, b"AP")?;
    let normal = ap.get(b"N").ok()?;

    let (stream_ref, state) = match normal {
        &Object::Reference(r) => match doc.get_object(r).ok()? {
            Object::Stream(_) => (r, None),
            Object::Dictionary(states) => select_state(doc, dict, states)?,
            _ => return None,
        },
        Object::Dictionary(states) => select_state(doc, dict, states)?,
        _ => {
            debug!("/AP /N is neither a stream reference nor a state dictionary");
            return None;
        }
    };

    let stream = doc.get_object(stream_ref).ok()?.as_stream().ok()?;
    Some(Appearance {
        stream: stream_ref,
        state,
        bbox: decode_number_array::<4>(doc, &stream.dict, b"BBox").unwrap_or([0.0, 0.0, 1.0, 1.0]),
        matrix: decode_number_array::<6>(doc, &stream.dict, b"Matrix").unwrap_or(IDENTITY_MATRIX),
    })
}

fn select_state(
    doc: &Document,
    dict: &Dictionary,
    states: &Dictionary,
) -> Option<(ObjectId, Option<String>)> {
    let state = maybe_get_name(doc, dict, b"AS")?;
    match states.get(state) {
        Ok(&Object::Reference(r)) => Some((r, Some(String::from_utf8_lossy(state).into_owned()))),
        _ => {
            debug!(
                "no appearance stream for state /{}",
                String::from_utf8_lossy(state)
            );
            None
        }
    }
}

/// Decode everything common to all subtypes. The payload is left as
/// [`AnnotationPayload::Unknown`] for the subtype builders to fill.
pub fn build_base(doc: &Document, dict: &Dictionary, object_id: ObjectId) -> AnnotationRecord {
    let id = object_id_string(object_id);
    let subtype = AnnotationSubtype::from_pdf_name(
        &maybe_get_name_string(doc, dict, b"Subtype").unwrap_or_default(),
    );

    let action = maybe_get::<&Dictionary>(doc, dict, b"A").and_then(|a| decode_action(doc, a, &id));
    let additional_actions =
        maybe_get::<&Dictionary>(doc, dict, b"AA").map(|aa| decode_additional_actions(doc, aa, &id));

    AnnotationRecord {
        flags: decode_flags(doc, dict),
        rect: decode_rect(doc, dict),
        color: resolve_color(doc, dict.get(b"C").ok()),
        border_style: resolve_border_style(doc, dict),
        appearance: decode_appearance(doc, dict),
        action,
        additional_actions,
        payload: AnnotationPayload::Unknown,
        subtype,
        object_id,
        id,
    }
}

/// Popup data shared by markup annotations. A missing `/C` means the viewer
/// default color rather than black.
fn prepare_popup(doc: &Document, dict: &Dictionary, record: &mut AnnotationRecord) -> MarkupInfo {
    if !dict.has(b"C") {
        record.color = None;
    }
    MarkupInfo {
        has_popup: dict.has(b"Popup"),
        title: maybe_get_text(doc, dict, b"T").unwrap_or_default(),
        contents: maybe_get_text(doc, dict, b"Contents").unwrap_or_default(),
    }
}

const DEFAULT_ICON_SIZE: f64 = 22.0;

pub fn build_text(doc: &Document, dict: &Dictionary, mut record: AnnotationRecord) -> AnnotationRecord {
    let name = if record.has_appearance() {
        "NoIcon".to_string()
    } else {
        record.rect[1] = record.rect[3] - DEFAULT_ICON_SIZE;
        record.rect[2] = record.rect[0] + DEFAULT_ICON_SIZE;
        maybe_get_name_string(doc, dict, b"Name").unwrap_or_else(|| "Note".to_string())
    };
    let markup = prepare_popup(doc, dict, &mut record);
    record.payload = AnnotationPayload::Text { name, markup };
    record
}

pub fn build_link(doc: &Document, dict: &Dictionary, mut record: AnnotationRecord) -> AnnotationRecord {
    record.payload = AnnotationPayload::Link(decode_link_target(doc, dict, &record.id));
    record
}

pub fn build_popup(doc: &Document, dict: &Dictionary, mut record: AnnotationRecord) -> AnnotationRecord {
    let Some(parent) = maybe_get::<&Dictionary>(doc, dict, b"Parent") else {
        warn!("Popup annotation {} has a missing or invalid parent annotation", record.id);
        record.payload = AnnotationPayload::Popup {
            parent_id: None,
            title: String::new(),
            contents: String::new(),
        };
        return record;
    };

    record.color = if parent.has(b"C") {
        resolve_color(doc, parent.get(b"C").ok())
    } else {
        None
    };
    record.payload = AnnotationPayload::Popup {
        parent_id: get_parent_ref(dict).map(object_id_string),
        title: maybe_get_text(doc, parent, b"T").unwrap_or_default(),
        contents: maybe_get_text(doc, parent, b"Contents").unwrap_or_default(),
    };
    record
}

/// Highlight, Underline, Squiggly and StrikeOut. Viewers ignore their
/// border styles, so the border is never drawn.
pub fn build_text_markup(
    doc: &Document,
    dict: &Dictionary,
    mut record: AnnotationRecord,
) -> AnnotationRecord {
    let markup = prepare_popup(doc, dict, &mut record);
    record.border_style.width = 0;
    record.payload = AnnotationPayload::TextMarkup(markup);
    record
}

const PLATFORM_KEYS: [&[u8]; 5] = [b"UF", b"F", b"Unix", b"Mac", b"DOS"];

fn pick_platform_item<'a>(doc: &'a Document, dict: &'a Dictionary) -> Option<&'a Object> {
    PLATFORM_KEYS
        .iter()
        .find_map(|key| maybe_get_obj(doc, dict, key))
}

fn decode_file_spec(doc: &Document, fs: &Dictionary) -> FileSpec {
    let filename = pick_platform_item(doc, fs)
        .and_then(crate::utils::as_text)
        .unwrap_or_default()
        .replace("\\\\", "\\")
        .replace("\\/", "/")
        .replace('\\', "/");

    let content = maybe_get::<&Dictionary>(doc, fs, b"EF")
        .and_then(|ef| pick_platform_item(doc, ef))
        .and_then(|o| o.as_stream().ok())
        .map(get_contents);
    if content.is_none() {
        debug!("file specification {:?} has no embedded file", filename);
    }

    FileSpec { filename, content }
}

pub fn build_file_attachment(
    doc: &Document,
    dict: &Dictionary,
    mut record: AnnotationRecord,
) -> AnnotationRecord {
    let file = maybe_get::<&Dictionary>(doc, dict, b"FS").map(|fs| decode_file_spec(doc, fs));
    let markup = prepare_popup(doc, dict, &mut record);
    record.payload = AnnotationPayload::FileAttachment { file, markup };
    record
}
