use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

use pdf_annots::AnnotationRecord;

#[repr(C)]
pub struct FfiRect {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

#[repr(C)]
pub struct FfiAnnotation {
    pub id: *mut c_char,
    pub subtype: *mut c_char,
    pub page: u32,
    pub rect: FfiRect,
    pub flags: u32,
    /// Null for annotations that are not form fields.
    pub full_name: *mut c_char,
    /// Null when no form element type was assigned.
    pub form_element_type: *mut c_char,
}

pub(crate) fn into_c_string(s: impl Into<Vec<u8>>) -> *mut c_char {
    match CString::new(s) {
        Ok(s) => s.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

impl FfiAnnotation {
    pub fn from_record(page: u32, record: &AnnotationRecord) -> Self {
        let field = record.field();
        FfiAnnotation {
            id: into_c_string(record.id.as_str()),
            subtype: into_c_string(record.subtype.as_pdf_name()),
            page,
            rect: FfiRect {
                llx: record.rect[0],
                lly: record.rect[1],
                urx: record.rect[2],
                ury: record.rect[3],
            },
            flags: record.flags.bits(),
            full_name: field.map_or(ptr::null_mut(), |f| into_c_string(f.full_name.as_str())),
            form_element_type: field
                .and_then(|f| f.form_element_type)
                .map_or(ptr::null_mut(), |t| into_c_string(t.to_string())),
        }
    }

    /// Free the strings owned by this annotation and null them out.
    pub(crate) unsafe fn free_strings(&mut self) {
        for s in [
            &mut self.id,
            &mut self.subtype,
            &mut self.full_name,
            &mut self.form_element_type,
        ] {
            if !s.is_null() {
                drop(CString::from_raw(*s));
                *s = ptr::null_mut();
            }
        }
    }
}
