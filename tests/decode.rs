use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use pdf_annots::{
    AnnotError, AnnotationExtractor, AnnotationPayload, AnnotationSubtype, FieldPayload,
    FormElementType, FormValues, RenderIntent, Trigger, field_state,
};

fn numbers(values: &[i64]) -> Object {
    Object::Array(values.iter().map(|&v| Object::Integer(v)).collect())
}

fn add_form_page(doc: &mut Document) -> Vec<ObjectId> {
    let on = doc.add_object(Stream::new(
        dictionary! { "BBox" => numbers(&[0, 0, 12, 12]) },
        b"0 g 0 0 12 12 re f".to_vec(),
    ));
    let off = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));

    let link = doc.add_object(dictionary! {
        "Subtype" => "Link",
        "Rect" => numbers(&[72, 700, 200, 720]),
        "F" => 4,
        "A" => dictionary! { "S" => "URI", "URI" => Object::string_literal("https://example.com/") },
    });
    let check = doc.add_object(dictionary! {
        "Subtype" => "Widget",
        "FT" => "Btn",
        "T" => Object::string_literal("agree"),
        "Rect" => numbers(&[72, 600, 84, 612]),
        "F" => 4,
        "V" => "Yes",
        "AS" => "Yes",
        "AP" => dictionary! { "N" => dictionary! { "Yes" => on, "Off" => off } },
    });
    let text = doc.add_object(dictionary! {
        "Subtype" => "Widget",
        "FT" => "Tx",
        "T" => Object::string_literal("total"),
        "Rect" => numbers(&[72, 500, 272, 520]),
        "F" => 4,
        "DA" => Object::string_literal("/Helv 11 Tf 0 g"),
        "AA" => dictionary! {
            "Bl" => dictionary! {
                "S" => "JavaScript",
                "JS" => Object::string_literal("this.getField(\"total\").required = true"),
            },
        },
    });
    let hidden_note = doc.add_object(dictionary! {
        "Subtype" => "Text",
        "Rect" => numbers(&[300, 300, 400, 400]),
        "F" => 2,
        "Contents" => Object::string_literal("secret"),
    });
    vec![link, check, text, hidden_note]
}

fn build_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let annots = add_form_page(&mut doc);
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => numbers(&[0, 0, 612, 792]),
        "Annots" => Object::Array(annots.into_iter().map(Object::Reference).collect()),
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => Object::Array(vec![Object::Reference(page_id)]),
            "Count" => 1,
        }),
    );
    let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

#[test_log::test]
fn decodes_every_annotation_of_a_page() {
    let output = pdf_annots::from_bytes(&build_pdf()).unwrap();
    assert_eq!(output.pages.len(), 1);
    assert_eq!(output.len(), 4);

    let subtypes: Vec<_> = output.annotations().map(|(_, a)| a.subtype.clone()).collect();
    assert_eq!(
        subtypes,
        vec![
            AnnotationSubtype::Link,
            AnnotationSubtype::Widget,
            AnnotationSubtype::Widget,
            AnnotationSubtype::Text,
        ]
    );

    let (page, link) = output.annotations().next().unwrap();
    assert_eq!(page, 1);
    match &link.payload {
        AnnotationPayload::Link(target) => {
            assert_eq!(target.url.as_deref(), Some("https://example.com/"))
        }
        other => panic!("unexpected payload {:?}", other),
    }

    let check = output.annotations().nth(1).unwrap().1;
    let field = check.field().unwrap();
    assert_eq!(field.form_element_type, Some(FormElementType::CheckBox));
    assert_eq!(
        field.payload,
        FieldPayload::Toggle {
            options: vec!["Off".into(), "Yes".into()],
            selected: true,
        }
    );
    assert!(check.has_appearance());
}

#[test]
fn scripts_are_collected_per_annotation() {
    let output = pdf_annots::from_bytes(&build_pdf()).unwrap();
    let text = output.annotations().nth(2).unwrap().1;
    let script = output.scripts.get(&text.id, Trigger::Blur).unwrap();
    assert!(script.starts_with(
        "try {document.querySelector(\"[name='total']\").setAttribute(\"required\", true)}"
    ));
    assert!(script.contains(&format!("annotation for {}", text.id)));
    assert_eq!(output.scripts.len(), 1);
}

#[test]
fn intent_and_page_selection() {
    let bytes = build_pdf();

    let printed = AnnotationExtractor::builder()
        .intent(RenderIntent::Print)
        .build()
        .from_bytes(&bytes)
        .unwrap();
    assert_eq!(printed.len(), 3);
    assert!(
        printed
            .annotations()
            .all(|(_, a)| a.subtype != AnnotationSubtype::Text)
    );

    let missing = AnnotationExtractor::builder()
        .pages([2])
        .build()
        .from_bytes(&bytes);
    assert!(matches!(missing, Err(AnnotError::PageNotFound(2))));
}

#[test]
fn form_values_override_without_touching_records() {
    let output = pdf_annots::from_bytes(&build_pdf()).unwrap();
    let check = output.annotations().nth(1).unwrap().1;
    let text = output.annotations().nth(2).unwrap().1;

    let mut values = FormValues::new();
    values.insert("agree", false);
    values.insert("total", "42");

    assert_eq!(field_state(check, &values).unwrap().selected, Some(false));
    assert_eq!(field_state(text, &values).unwrap().value.as_deref(), Some("42"));
    assert_eq!(output.find(&check.id), Some(check));
}
