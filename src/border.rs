//! Annotation border styles from `/BS` dictionaries or legacy `/Border` arrays.

use lopdf::{Dictionary, Document, Object};

use crate::utils::{as_integer, as_number, maybe_deref, maybe_get_obj};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderStyleType {
    Solid,
    Dashed,
    Beveled,
    Inset,
    Underline,
}

impl BorderStyleType {
    pub fn from_pdf_name(name: &[u8]) -> Option<Self> {
        match name {
            b"S" => Some(Self::Solid),
            b"D" => Some(Self::Dashed),
            b"B" => Some(Self::Beveled),
            b"I" => Some(Self::Inset),
            b"U" => Some(Self::Underline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BorderStyle {
    /// Zero disables border drawing.
    pub width: i64,
    pub style: BorderStyleType,
    /// Never empty and never all zeros.
    pub dash_array: Vec<f64>,
    pub horizontal_corner_radius: i64,
    pub vertical_corner_radius: i64,
}

impl Default for BorderStyle {
    fn default() -> Self {
        BorderStyle {
            width: 1,
            style: BorderStyleType::Solid,
            dash_array: vec![3.0],
            horizontal_corner_radius: 0,
            vertical_corner_radius: 0,
        }
    }
}

impl BorderStyle {
    /// A border that is never drawn.
    pub fn none() -> Self {
        BorderStyle {
            width: 0,
            ..Default::default()
        }
    }

    fn set_width(&mut self, width: Option<&Object>) {
        if let Some(w) = width.and_then(as_integer) {
            self.width = w;
        }
    }

    fn set_style(&mut self, style: Option<&Object>) {
        if let Some(s) = style
            .and_then(|s| s.as_name().ok())
            .and_then(BorderStyleType::from_pdf_name)
        {
            self.style = s;
        }
    }

    /// Dash elements must be non-negative numbers, not all zero. Anything
    /// else present (including an empty array) disables the border.
    fn set_dash_array(&mut self, doc: &Document, dash_array: Option<&Object>) {
        let Some(dash_array) = dash_array else {
            return;
        };
        let elements = match dash_array {
            Object::Array(a) if !a.is_empty() => a,
            _ => {
                self.width = 0;
                return;
            }
        };

        let values: Option<Vec<f64>> = elements
            .iter()
            .map(|e| maybe_deref(doc, e).and_then(as_number).filter(|v| *v >= 0.0))
            .collect();
        match values {
            Some(values) if values.iter().any(|v| *v > 0.0) => self.dash_array = values,
            _ => self.width = 0,
        }
    }

    fn set_horizontal_corner_radius(&mut self, radius: &Object) {
        if let Some(r) = as_integer(radius) {
            self.horizontal_corner_radius = r;
        }
    }

    fn set_vertical_corner_radius(&mut self, radius: &Object) {
        if let Some(r) = as_integer(radius) {
            self.vertical_corner_radius = r;
        }
    }
}

fn from_border_style_dict(doc: &Document, bs: &Dictionary) -> BorderStyle {
    let mut border = BorderStyle::default();
    let accepted = match bs.get(b"Type") {
        Err(_) => true,
        Ok(t) => maybe_deref(doc, t).and_then(|t| t.as_name().ok()) == Some(&b"Border"[..]),
    };
    if accepted {
        border.set_width(maybe_get_obj(doc, bs, b"W"));
        border.set_style(maybe_get_obj(doc, bs, b"S"));
        border.set_dash_array(doc, maybe_get_obj(doc, bs, b"D"));
    }
    border
}

fn from_border_array(doc: &Document, array: &[Object]) -> BorderStyle {
    let mut border = BorderStyle::default();
    if array.len() < 3 {
        return border;
    }
    let entries: Vec<&Object> = array
        .iter()
        .map(|o| maybe_deref(doc, o).unwrap_or(&Object::Null))
        .collect();
    border.set_horizontal_corner_radius(entries[0]);
    border.set_vertical_corner_radius(entries[1]);
    border.set_width(Some(entries[2]));
    if entries.len() == 4 {
        border.set_dash_array(doc, Some(entries[3]));
    }
    border
}

/// Resolve the border style of an annotation dictionary.
///
/// `/BS` wins over `/Border`. With neither entry no border is drawn, unlike
/// the PDF default of a 1pt solid border.
pub fn resolve_border_style(doc: &Document, dict: &Dictionary) -> BorderStyle {
    if dict.has(b"BS") {
        match maybe_get_obj(doc, dict, b"BS").and_then(|o| o.as_dict().ok()) {
            Some(bs) => from_border_style_dict(doc, bs),
            None => BorderStyle::default(),
        }
    } else if dict.has(b"Border") {
        match maybe_get_obj(doc, dict, b"Border").and_then(|o| o.as_array().ok()) {
            Some(array) => from_border_array(doc, array),
            None => BorderStyle::default(),
        }
    } else {
        BorderStyle::none()
    }
}
