//! PDF annotation and form field decoding library
//!
//! This library decodes the annotation dictionaries of a PDF page into typed
//! records: flags, geometry, colors, border styles, actions, and for form
//! widgets the classified field with its category-specific properties.

mod actions;
mod annotation;
mod appearance;
mod border;
mod color;
mod error;
mod extract;
mod factory;
mod field_name;
mod form_values;
mod script;
mod types;
mod utils;
mod widget;

// Re-export error type
pub use error::AnnotError;

// Re-export extraction API
pub use extract::{
    AnnotationExtractor, AnnotationExtractorBuilder, DocumentAnnotations, PageAnnotations,
    from_bytes, from_path, from_reader,
};

// Re-export decoding entry points
pub use factory::{
    AnnotationFactory, ScriptEntry, ScriptRegistry, decode_page, decode_page_with,
};

// Re-export public types
pub use actions::{ActionBundle, ActionTarget, Destination, DestinationPage, LinkTarget, Trigger};
pub use annotation::{
    AnnotationFlags, AnnotationPayload, AnnotationRecord, AnnotationSubtype, Appearance, FileSpec,
    MarkupInfo,
};
pub use appearance::{
    AppearanceEvaluator, ContentDecoder, OperatorList, PaintOp, RenderIntent,
    append_to_operator_list, get_operator_list, transform_matrix,
};
pub use border::{BorderStyle, BorderStyleType};
pub use color::Rgb;
pub use field_name::resolve_full_name;
pub use form_values::{FieldState, FieldValue, FormValues, TextAlignment, corrected_id, field_state};
pub use script::{rewrite_script, translate_script};
pub use types::{Matrix, Rect};
pub use widget::{
    ChoiceOption, DefaultFont, FieldDescriptor, FieldFlags, FieldPayload, FieldType,
    FormElementType, SignatureLock,
};
