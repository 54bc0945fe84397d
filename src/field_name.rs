//! Fully-qualified AcroForm field names.

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::utils::{
    MAX_PARENT_DEPTH, get_parent, get_parent_ref, maybe_get_array, maybe_get_text,
};

/// Position of `id` in the parent's `/Kids`, matched by reference identity.
/// A node missing from `/Kids` gets the index one past the end.
fn kid_index(doc: &Document, parent: &Dictionary, id: ObjectId) -> usize {
    let kids = maybe_get_array(doc, parent, b"Kids").map(Vec::as_slice).unwrap_or(&[]);
    kids.iter()
        .position(|kid| matches!(kid, Object::Reference(r) if *r == id))
        .unwrap_or(kids.len())
}

/// Build the dot-joined name of a field from its own `/T` up to the root.
///
/// A node without a `/T` gets a `` `<index> `` segment naming its slot in the
/// parent's `/Kids`, so sibling widgets of one field stay distinguishable.
pub fn resolve_full_name(doc: &Document, dict: &Dictionary, id: Option<ObjectId>) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut node = Some(dict);
    let mut reference = id;

    for _ in 0..MAX_PARENT_DEPTH {
        let Some(current) = node else {
            break;
        };
        let parent = get_parent(doc, current);

        match maybe_get_text(doc, current, b"T").filter(|t| !t.is_empty()) {
            Some(name) => parts.push(name),
            None => {
                if let (Some(parent), Some(r)) = (parent, reference) {
                    parts.push(format!("`{}", kid_index(doc, parent, r)));
                }
            }
        }

        reference = get_parent_ref(current);
        node = parent;
    }
    if node.is_some() {
        debug!("field parent chain truncated while naming {:?}", id);
    }

    parts.reverse();
    parts.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn joins_names_from_root_down() {
        let mut doc = Document::with_version("1.7");
        let root = doc.add_object(dictionary! { "T" => Object::string_literal("form") });
        let mid = doc.add_object(dictionary! {
            "T" => Object::string_literal("address"),
            "Parent" => root,
        });
        let leaf_id = doc.add_object(dictionary! {
            "T" => Object::string_literal("street"),
            "Parent" => mid,
        });
        let leaf = doc.get_dictionary(leaf_id).unwrap();
        assert_eq!(resolve_full_name(&doc, leaf, Some(leaf_id)), "form.address.street");
    }

    #[test]
    fn anonymous_kid_gets_index_segment() {
        let mut doc = Document::with_version("1.7");
        let parent_id = doc.new_object_id();
        let a = doc.add_object(dictionary! { "Parent" => parent_id });
        let b = doc.add_object(dictionary! { "Parent" => parent_id });
        let c = doc.add_object(dictionary! { "Parent" => parent_id });
        doc.objects.insert(
            parent_id,
            Object::Dictionary(dictionary! {
                "T" => Object::string_literal("choice"),
                "Kids" => vec![Object::Reference(a), Object::Reference(b), Object::Reference(c)],
            }),
        );

        let widget = doc.get_dictionary(b).unwrap();
        assert_eq!(resolve_full_name(&doc, widget, Some(b)), "choice.`1");
    }

    #[test]
    fn kid_missing_from_parent_uses_past_the_end_index() {
        let mut doc = Document::with_version("1.7");
        let other = doc.add_object(Dictionary::new());
        let parent_id = doc.add_object(dictionary! {
            "T" => Object::string_literal("group"),
            "Kids" => vec![Object::Reference(other)],
        });
        let orphan = doc.add_object(dictionary! { "Parent" => parent_id });
        let dict = doc.get_dictionary(orphan).unwrap();
        assert_eq!(resolve_full_name(&doc, dict, Some(orphan)), "group.`1");
    }

    #[test]
    fn root_without_name_contributes_nothing() {
        let doc = Document::with_version("1.7");
        assert_eq!(resolve_full_name(&doc, &Dictionary::new(), Some((1, 0))), "");
    }
}
