mod types;

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use pdf_annots::{AnnotationExtractor, DocumentAnnotations, Trigger};

pub use types::{FfiAnnotation, FfiRect};

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = RefCell::new(None);
}

fn set_last_error(err: String) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(err).ok();
    });
}

pub struct PdfAnnotsHandle {
    output: DocumentAnnotations,
}

/// Read an optional C string argument. A null pointer is `Ok(None)`.
unsafe fn str_arg<'a>(ptr: *const c_char, what: &str) -> Result<Option<&'a str>, ()> {
    if ptr.is_null() {
        return Ok(None);
    }
    match CStr::from_ptr(ptr).to_str() {
        Ok(s) => Ok(Some(s)),
        Err(e) => {
            set_last_error(format!("Invalid UTF-8 in {}: {}", what, e));
            Err(())
        }
    }
}

fn extractor(password: Option<&str>) -> AnnotationExtractor {
    match password {
        Some(pwd) => AnnotationExtractor::builder().password(pwd).build(),
        None => AnnotationExtractor::default(),
    }
}

fn into_handle(result: Result<DocumentAnnotations, pdf_annots::AnnotError>) -> *mut PdfAnnotsHandle {
    match result {
        Ok(output) => Box::into_raw(Box::new(PdfAnnotsHandle { output })),
        Err(e) => {
            set_last_error(format!("Failed to read annotations: {}", e));
            ptr::null_mut()
        }
    }
}

#[no_mangle]
pub extern "C" fn pdf_annots_from_path_with_password(
    path: *const c_char,
    password: *const c_char,
) -> *mut PdfAnnotsHandle {
    if path.is_null() {
        set_last_error("Path pointer is null".to_string());
        return ptr::null_mut();
    }

    let (path_str, password_str) = unsafe {
        match (str_arg(path, "path"), str_arg(password, "password")) {
            (Ok(Some(path)), Ok(password)) => (path, password),
            _ => return ptr::null_mut(),
        }
    };

    into_handle(extractor(password_str).from_path(path_str))
}

#[no_mangle]
pub extern "C" fn pdf_annots_from_path(path: *const c_char) -> *mut PdfAnnotsHandle {
    pdf_annots_from_path_with_password(path, ptr::null())
}

#[no_mangle]
pub extern "C" fn pdf_annots_from_bytes_with_password(
    data: *const u8,
    len: usize,
    password: *const c_char,
) -> *mut PdfAnnotsHandle {
    if data.is_null() {
        set_last_error("Data pointer is null".to_string());
        return ptr::null_mut();
    }

    let bytes = unsafe { std::slice::from_raw_parts(data, len) };
    let password_str = match unsafe { str_arg(password, "password") } {
        Ok(password) => password,
        Err(()) => return ptr::null_mut(),
    };

    into_handle(extractor(password_str).from_bytes(bytes))
}

#[no_mangle]
pub extern "C" fn pdf_annots_from_bytes(data: *const u8, len: usize) -> *mut PdfAnnotsHandle {
    pdf_annots_from_bytes_with_password(data, len, ptr::null())
}

#[no_mangle]
pub extern "C" fn pdf_annots_count(handle: *const PdfAnnotsHandle) -> usize {
    if handle.is_null() {
        set_last_error("Handle is null".to_string());
        return 0;
    }

    let handle = unsafe { &*handle };
    handle.output.len()
}

/// Fill `out` with the annotation at `index`, counted across all pages.
/// The strings in `out` must be released with `pdf_annots_annotation_free`.
#[no_mangle]
pub extern "C" fn pdf_annots_get(
    handle: *const PdfAnnotsHandle,
    index: usize,
    out: *mut FfiAnnotation,
) -> i32 {
    if handle.is_null() {
        set_last_error("Handle is null".to_string());
        return -1;
    }

    if out.is_null() {
        set_last_error("Output pointer is null".to_string());
        return -1;
    }

    let handle = unsafe { &*handle };

    match handle.output.annotations().nth(index) {
        Some((page, record)) => {
            unsafe {
                out.write(FfiAnnotation::from_record(page, record));
            }
            0
        }
        None => {
            set_last_error(format!("Annotation index {} out of bounds", index));
            -1
        }
    }
}

/// Translated script of an annotation for a trigger key (`A`, `Fo`, `Bl`,
/// `K`, `V` or `C`). Returns null when there is none.
#[no_mangle]
pub extern "C" fn pdf_annots_script(
    handle: *const PdfAnnotsHandle,
    annotation_id: *const c_char,
    trigger: *const c_char,
) -> *mut c_char {
    if handle.is_null() {
        set_last_error("Handle is null".to_string());
        return ptr::null_mut();
    }

    let handle = unsafe { &*handle };
    let (id, key) = unsafe {
        match (str_arg(annotation_id, "annotation id"), str_arg(trigger, "trigger")) {
            (Ok(Some(id)), Ok(Some(key))) => (id, key),
            _ => {
                set_last_error("Annotation id and trigger are required".to_string());
                return ptr::null_mut();
            }
        }
    };

    let Some(trigger) = Trigger::from_key(key) else {
        set_last_error(format!("Unknown trigger {:?}", key));
        return ptr::null_mut();
    };

    match handle.output.scripts.get(id, trigger) {
        Some(script) => types::into_c_string(script),
        None => ptr::null_mut(),
    }
}

#[no_mangle]
pub extern "C" fn pdf_annots_annotation_free(annotation: *mut FfiAnnotation) {
    if !annotation.is_null() {
        unsafe {
            (*annotation).free_strings();
        }
    }
}

#[no_mangle]
pub extern "C" fn pdf_annots_string_free(s: *mut c_char) {
    if !s.is_null() {
        unsafe {
            drop(CString::from_raw(s));
        }
    }
}

#[no_mangle]
pub extern "C" fn pdf_annots_free(handle: *mut PdfAnnotsHandle) {
    if !handle.is_null() {
        unsafe {
            drop(Box::from_raw(handle));
        }
    }
}

#[no_mangle]
pub extern "C" fn pdf_annots_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(err) => err.as_ptr(),
        None => ptr::null(),
    })
}
