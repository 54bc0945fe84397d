//! Annotation actions, link targets and destinations.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, warn};

use crate::script::translate_script;
use crate::utils::{
    as_number, as_text, get_contents, maybe_deref, maybe_get, maybe_get_name_string,
    maybe_get_obj, pdf_to_utf8,
};

/// The entry an action hangs off: the primary `/A` action or one of the
/// `/AA` triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Trigger {
    Activate,
    Focus,
    Blur,
    Keystroke,
    Validate,
    Calculate,
}

impl Trigger {
    /// The `/AA` triggers that are decoded, in decoding order.
    pub const ADDITIONAL: [Trigger; 5] = [
        Trigger::Focus,
        Trigger::Blur,
        Trigger::Keystroke,
        Trigger::Validate,
        Trigger::Calculate,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Trigger::Activate => "A",
            Trigger::Focus => "Fo",
            Trigger::Blur => "Bl",
            Trigger::Keystroke => "K",
            Trigger::Validate => "V",
            Trigger::Calculate => "C",
        }
    }

    pub fn from_key(key: &str) -> Option<Trigger> {
        match key {
            "A" => Some(Trigger::Activate),
            "Fo" => Some(Trigger::Focus),
            "Bl" => Some(Trigger::Blur),
            "K" => Some(Trigger::Keystroke),
            "V" => Some(Trigger::Validate),
            "C" => Some(Trigger::Calculate),
            _ => None,
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionTarget {
    Reference(ObjectId),
    Text(String),
}

/// A decoded action: its `/S` kind, optional `/T` target and the
/// translated `/JS` script.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionBundle {
    pub kind: String,
    pub target: Option<ActionTarget>,
    pub script: Option<String>,
}

fn script_source(doc: &Document, js: &Object) -> Option<String> {
    match maybe_deref(doc, js)? {
        Object::String(s, _) => Some(pdf_to_utf8(s)),
        Object::Stream(stream) => Some(pdf_to_utf8(&get_contents(stream))),
        _ => {
            debug!("ignoring /JS that is neither a string nor a stream");
            None
        }
    }
}

/// Decode one action dictionary. Actions without a `/S` name are dropped.
pub fn decode_action(
    doc: &Document,
    action: &Dictionary,
    annotation_id: &str,
) -> Option<ActionBundle> {
    let Some(kind) = maybe_get_name_string(doc, action, b"S") else {
        warn!("action on {} has no /S type, skipping", annotation_id);
        return None;
    };

    let target = match action.get(b"T") {
        Ok(&Object::Reference(r)) => Some(ActionTarget::Reference(r)),
        Ok(t) => as_text(t).map(ActionTarget::Text),
        Err(_) => None,
    };

    let script = action
        .get(b"JS")
        .ok()
        .and_then(|js| script_source(doc, js))
        .map(|source| translate_script(&source, annotation_id));

    Some(ActionBundle {
        kind,
        target,
        script,
    })
}

/// Decode the `/AA` additional-actions dictionary.
pub fn decode_additional_actions(
    doc: &Document,
    aa: &Dictionary,
    annotation_id: &str,
) -> BTreeMap<Trigger, ActionBundle> {
    Trigger::ADDITIONAL
        .iter()
        .filter_map(|trigger| {
            let action = maybe_get::<&Dictionary>(doc, aa, trigger.key().as_bytes())?;
            decode_action(doc, action, annotation_id).map(|bundle| (*trigger, bundle))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum DestinationPage {
    Reference(ObjectId),
    Index(i64),
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    Named(String),
    Explicit {
        page: DestinationPage,
        fit: String,
        args: Vec<Option<f64>>,
    },
}

/// Decode a destination: a name, a string, or an explicit
/// `[page /Fit args...]` array.
pub fn decode_destination(doc: &Document, dest: &Object) -> Option<Destination> {
    match maybe_deref(doc, dest)? {
        Object::Name(n) => Some(Destination::Named(
            String::from_utf8_lossy(n).into_owned(),
        )),
        Object::String(s, _) => Some(Destination::Named(pdf_to_utf8(s))),
        Object::Array(items) => {
            let page = match items.first() {
                Some(&Object::Reference(r)) => DestinationPage::Reference(r),
                Some(&Object::Integer(i)) => DestinationPage::Index(i),
                _ => DestinationPage::Unknown,
            };
            let fit = items
                .get(1)
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).into_owned())
                .unwrap_or_default();
            let args = items
                .iter()
                .skip(2)
                .map(|o| maybe_deref(doc, o).and_then(as_number))
                .collect();
            Some(Destination::Explicit { page, fit, args })
        }
        Object::Dictionary(d) => d.get(b"D").ok().and_then(|d| decode_destination(doc, d)),
        _ => None,
    }
}

/// Only absolute URLs with a known scheme are accepted.
pub fn is_valid_url(url: &str) -> bool {
    let Some(colon) = url.find(':') else {
        return false;
    };
    let scheme = &url[..colon];
    let mut chars = scheme.chars();
    let well_formed = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !well_formed {
        return false;
    }
    matches!(
        scheme.to_ascii_lowercase().as_str(),
        "http" | "https" | "ftp" | "mailto" | "tel"
    )
}

fn add_default_protocol(url: String) -> String {
    if url.starts_with("www.") {
        format!("http://{}", url)
    } else {
        url
    }
}

/// URI bytes are nominally 7-bit ASCII; UTF-8 is accepted, anything else
/// is read as Latin-1.
fn decode_uri_bytes(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xfe, 0xff]) {
        return pdf_to_utf8(bytes);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn validated(url: String) -> String {
    if is_valid_url(&url) { url } else { String::new() }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkTarget {
    pub url: Option<String>,
    pub dest: Option<Destination>,
    /// Named action such as `NextPage`.
    pub action: Option<String>,
}

/// Resolve where a link annotation points.
pub fn decode_link_target(doc: &Document, dict: &Dictionary, annotation_id: &str) -> LinkTarget {
    let mut target = LinkTarget::default();

    if let Some(action) = maybe_get::<&Dictionary>(doc, dict, b"A") {
        let kind = maybe_get_name_string(doc, action, b"S").unwrap_or_default();
        match kind.as_str() {
            "URI" => {
                let url = match maybe_get_obj(doc, action, b"URI") {
                    // Some bad PDFs do not put parentheses around relative URLs.
                    Some(Object::Name(n)) => format!("/{}", String::from_utf8_lossy(n)),
                    Some(Object::String(s, _)) => add_default_protocol(decode_uri_bytes(s)),
                    _ => String::new(),
                };
                target.url = Some(validated(url));
            }
            "GoTo" => {
                target.dest = action.get(b"D").ok().and_then(|d| decode_destination(doc, d));
            }
            "GoToR" => {
                let url = maybe_get::<&Dictionary>(doc, action, b"F")
                    .and_then(|fs| maybe_get_obj(doc, fs, b"F"))
                    .and_then(as_text)
                    .unwrap_or_default();
                target.url = Some(validated(url));
                target.dest = action.get(b"D").ok().and_then(|d| decode_destination(doc, d));
            }
            "Named" => {
                target.action = maybe_get_name_string(doc, action, b"N");
            }
            other => {
                warn!("unrecognized link type {:?} on {}", other, annotation_id);
            }
        }
    } else if let Ok(dest) = dict.get(b"Dest") {
        target.dest = decode_destination(doc, dest);
    }

    target
}
