use encoding_rs::UTF_16BE;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

/// Parent chains deeper than this are treated as cyclic.
pub(crate) const MAX_PARENT_DEPTH: usize = 64;

#[allow(non_upper_case_globals)]
pub(crate) const PDFDocEncoding: &'static [u16] = &[
    0x0000, 0x0001, 0x0002, 0x0003, 0x0004, 0x0005, 0x0006, 0x0007, 0x0008, 0x0009, 0x000a, 0x000b,
    0x000c, 0x000d, 0x000e, 0x000f, 0x0010, 0x0011, 0x0012, 0x0013, 0x0014, 0x0015, 0x0016, 0x0017,
    0x02d8, 0x02c7, 0x02c6, 0x02d9, 0x02dd, 0x02db, 0x02da, 0x02dc, 0x0020, 0x0021, 0x0022, 0x0023,
    0x0024, 0x0025, 0x0026, 0x0027, 0x0028, 0x0029, 0x002a, 0x002b, 0x002c, 0x002d, 0x002e, 0x002f,
    0x0030, 0x0031, 0x0032, 0x0033, 0x0034, 0x0035, 0x0036, 0x0037, 0x0038, 0x0039, 0x003a, 0x003b,
    0x003c, 0x003d, 0x003e, 0x003f, 0x0040, 0x0041, 0x0042, 0x0043, 0x0044, 0x0045, 0x0046, 0x0047,
    0x0048, 0x0049, 0x004a, 0x004b, 0x004c, 0x004d, 0x004e, 0x004f, 0x0050, 0x0051, 0x0052, 0x0053,
    0x0054, 0x0055, 0x0056, 0x0057, 0x0058, 0x0059, 0x005a, 0x005b, 0x005c, 0x005d, 0x005e, 0x005f,
    0x0060, 0x0061, 0x0062, 0x0063, 0x0064, 0x0065, 0x0066, 0x0067, 0x0068, 0x0069, 0x006a, 0x006b,
    0x006c, 0x006d, 0x006e, 0x006f, 0x0070, 0x0071, 0x0072, 0x0073, 0x0074, 0x0075, 0x0076, 0x0077,
    0x0078, 0x0079, 0x007a, 0x007b, 0x007c, 0x007d, 0x007e, 0x0000, 0x2022, 0x2020, 0x2021, 0x2026,
    0x2014, 0x2013, 0x0192, 0x2044, 0x2039, 0x203a, 0x2212, 0x2030, 0x201e, 0x201c, 0x201d, 0x2018,
    0x2019, 0x201a, 0x2122, 0xfb01, 0xfb02, 0x0141, 0x0152, 0x0160, 0x0178, 0x017d, 0x0131, 0x0142,
    0x0153, 0x0161, 0x017e, 0x0000, 0x20ac, 0x00a1, 0x00a2, 0x00a3, 0x00a4, 0x00a5, 0x00a6, 0x00a7,
    0x00a8, 0x00a9, 0x00aa, 0x00ab, 0x00ac, 0x0000, 0x00ae, 0x00af, 0x00b0, 0x00b1, 0x00b2, 0x00b3,
    0x00b4, 0x00b5, 0x00b6, 0x00b7, 0x00b8, 0x00b9, 0x00ba, 0x00bb, 0x00bc, 0x00bd, 0x00be, 0x00bf,
    0x00c0, 0x00c1, 0x00c2, 0x00c3, 0x00c4, 0x00c5, 0x00c6, 0x00c7, 0x00c8, 0x00c9, 0x00ca, 0x00cb,
    0x00cc, 0x00cd, 0x00ce, 0x00cf, 0x00d0, 0x00d1, 0x00d2, 0x00d3, 0x00d4, 0x00d5, 0x00d6, 0x00d7,
    0x00d8, 0x00d9, 0x00da, 0x00db, 0x00dc, 0x00dd, 0x00de, 0x00df, 0x00e0, 0x00e1, 0x00e2, 0x00e3,
    0x00e4, 0x00e5, 0x00e6, 0x00e7, 0x00e8, 0x00e9, 0x00ea, 0x00eb, 0x00ec, 0x00ed, 0x00ee, 0x00ef,
    0x00f0, 0x00f1, 0x00f2, 0x00f3, 0x00f4, 0x00f5, 0x00f6, 0x00f7, 0x00f8, 0x00f9, 0x00fa, 0x00fb,
    0x00fc, 0x00fd, 0x00fe, 0x00ff,
];

/// Decode a PDF text string (UTF-16BE with BOM, or PDFDocEncoding).
pub(crate) fn pdf_to_utf8(s: &[u8]) -> String {
    if s.len() >= 2 && s[0] == 0xfe && s[1] == 0xff {
        let (text, _) = UTF_16BE.decode_without_bom_handling(&s[2..]);
        text.into_owned()
    } else if s.len() >= 3 && s[0] == 0xef && s[1] == 0xbb && s[2] == 0xbf {
        String::from_utf8_lossy(&s[3..]).into_owned()
    } else {
        let r: Vec<u8> = s
            .iter()
            .flat_map(|&x| {
                let k = PDFDocEncoding[x as usize];
                if k == 0 && x != 0 {
                    vec![].into_iter()
                } else {
                    vec![(k >> 8) as u8, k as u8].into_iter()
                }
            })
            .collect();
        let (text, _) = UTF_16BE.decode_without_bom_handling(&r);
        text.into_owned()
    }
}

/// Canonical string form of an object reference: `12R` or `12R3`.
pub(crate) fn object_id_string(id: ObjectId) -> String {
    if id.1 == 0 {
        format!("{}R", id.0)
    } else {
        format!("{}R{}", id.0, id.1)
    }
}

pub(crate) fn maybe_deref<'a>(doc: &'a Document, o: &'a Object) -> Option<&'a Object> {
    match o {
        &Object::Reference(r) => match doc.get_object(r) {
            Ok(obj) => Some(obj),
            Err(e) => {
                debug!("unresolvable reference {:?}: {}", r, e);
                None
            }
        },
        _ => Some(o),
    }
}

pub(crate) fn maybe_get_obj<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    dict.get(key).ok().and_then(|o| maybe_deref(doc, o))
}

pub(crate) trait FromObj<'a>
where
    Self: std::marker::Sized,
{
    fn from_obj(doc: &'a Document, obj: &'a Object) -> Option<Self>;
}

impl<'a, T: FromObj<'a>> FromObj<'a> for Vec<T> {
    fn from_obj(doc: &'a Document, obj: &'a Object) -> Option<Self> {
        maybe_deref(doc, obj)?
            .as_array()
            .ok()?
            .iter()
            .map(|x| T::from_obj(doc, x))
            .collect()
    }
}

impl<'a> FromObj<'a> for f64 {
    fn from_obj(doc: &'a Document, obj: &'a Object) -> Option<Self> {
        as_number(maybe_deref(doc, obj)?)
    }
}

impl<'a> FromObj<'a> for i64 {
    fn from_obj(doc: &'a Document, obj: &'a Object) -> Option<Self> {
        match maybe_deref(doc, obj)? {
            &Object::Integer(i) => Some(i),
            _ => None,
        }
    }
}

impl<'a> FromObj<'a> for &'a Dictionary {
    fn from_obj(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
        maybe_deref(doc, obj)?.as_dict().ok()
    }
}

impl<'a> FromObj<'a> for &'a Object {
    fn from_obj(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
        maybe_deref(doc, obj)
    }
}

pub(crate) fn maybe_get<'a, T: FromObj<'a>>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<T> {
    dict.get(key).ok().and_then(|o| T::from_obj(doc, o))
}

pub(crate) fn maybe_get_name_string<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<String> {
    maybe_get_name(doc, dict, key).map(|n| String::from_utf8_lossy(n).into_owned())
}

pub(crate) fn maybe_get_name<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a [u8]> {
    maybe_get_obj(doc, dict, key).and_then(|n| n.as_name().ok())
}

pub(crate) fn maybe_get_array<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Vec<Object>> {
    maybe_get_obj(doc, dict, key).and_then(|n| n.as_array().ok())
}

/// Text of a string or name object.
pub(crate) fn as_text(o: &Object) -> Option<String> {
    match o {
        Object::String(s, _) => Some(pdf_to_utf8(s)),
        Object::Name(n) => Some(String::from_utf8_lossy(n).into_owned()),
        _ => None,
    }
}

pub(crate) fn maybe_get_text<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<String> {
    maybe_get_obj(doc, dict, key).and_then(as_text)
}

pub(crate) fn as_number(o: &Object) -> Option<f64> {
    match o {
        &Object::Integer(i) => Some(i as f64),
        &Object::Real(f) => Some(f.into()),
        _ => None,
    }
}

/// Integer-valued numbers only; `2.0` is accepted, `2.5` is not.
pub(crate) fn as_integer(o: &Object) -> Option<i64> {
    match o {
        &Object::Integer(i) => Some(i),
        &Object::Real(f) if f.fract() == 0.0 && f.is_finite() => Some(f as i64),
        _ => None,
    }
}

pub(crate) fn get_contents(contents: &Stream) -> Vec<u8> {
    if contents.filters().is_ok() {
        contents
            .decompressed_content()
            .unwrap_or_else(|_| contents.content.clone())
    } else {
        contents.content.clone()
    }
}

pub(crate) fn get_parent<'a>(doc: &'a Document, dict: &'a Dictionary) -> Option<&'a Dictionary> {
    maybe_get::<&Dictionary>(doc, dict, b"Parent")
}

/// The raw `/Parent` reference, if the parent is an indirect object.
pub(crate) fn get_parent_ref(dict: &Dictionary) -> Option<ObjectId> {
    dict.get(b"Parent").and_then(|p| p.as_reference()).ok()
}

/// Look `key` up on `dict`, then on each ancestor reachable through `/Parent`.
pub(crate) fn get_inherited_obj<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node = Some(dict);
    for _ in 0..MAX_PARENT_DEPTH {
        let current = node?;
        if current.has(key) {
            return maybe_get_obj(doc, current, key);
        }
        node = get_parent(doc, current);
    }
    debug!(
        "parent chain too deep looking up /{}",
        String::from_utf8_lossy(key)
    );
    None
}

pub(crate) fn get_inherited<'a, T: FromObj<'a>>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<T> {
    get_inherited_obj(doc, dict, key).and_then(|o| T::from_obj(doc, o))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn decodes_pdfdoc_and_utf16_strings() {
        assert_eq!(pdf_to_utf8(b"Name"), "Name");
        assert_eq!(pdf_to_utf8(&[0xfe, 0xff, 0x00, 0x41, 0x00, 0xe9]), "A\u{e9}");
        assert_eq!(pdf_to_utf8(&[0x80]), "\u{2022}");
    }

    #[test]
    fn object_id_string_omits_zero_generation() {
        assert_eq!(object_id_string((12, 0)), "12R");
        assert_eq!(object_id_string((7, 3)), "7R3");
    }

    #[test]
    fn integer_valued_reals_are_integers() {
        assert_eq!(as_integer(&Object::Real(2.0)), Some(2));
        assert_eq!(as_integer(&Object::Real(2.5)), None);
        assert_eq!(as_integer(&Object::Integer(-3)), Some(-3));
    }

    #[test]
    fn inherited_lookup_walks_parents() {
        let mut doc = Document::with_version("1.7");
        let root = doc.add_object(dictionary! { "FT" => "Btn", "Ff" => 32768 });
        let mid = doc.add_object(dictionary! { "Parent" => root, "T" => Object::string_literal("group") });
        let leaf = dictionary! { "Parent" => mid };

        let ft: Option<&Object> = get_inherited_obj(&doc, &leaf, b"FT");
        assert_eq!(ft.and_then(|o| o.as_name().ok()), Some(&b"Btn"[..]));
        assert_eq!(get_inherited::<i64>(&doc, &leaf, b"Ff"), Some(32768));
        assert!(get_inherited_obj(&doc, &leaf, b"DA").is_none());
    }

    #[test]
    fn inherited_lookup_terminates_on_cycles() {
        let mut doc = Document::with_version("1.7");
        let a = doc.new_object_id();
        let b = doc.add_object(dictionary! { "Parent" => a });
        doc.objects
            .insert(a, Object::Dictionary(dictionary! { "Parent" => b }));
        let leaf = dictionary! { "Parent" => a };
        assert!(get_inherited_obj(&doc, &leaf, b"FT").is_none());
    }
}
