use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use lopdf::{Document, ObjectId};
use tracing::debug;

use crate::annotation::AnnotationRecord;
use crate::appearance::RenderIntent;
use crate::error::AnnotError;
use crate::factory::{ScriptRegistry, decode_page_with};

/// The annotations of one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageAnnotations {
    /// 1-based page number.
    pub page_number: u32,
    pub page_id: ObjectId,
    pub annotations: Vec<AnnotationRecord>,
}

/// Result of a decode pass over a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentAnnotations {
    pub pages: Vec<PageAnnotations>,
    pub scripts: ScriptRegistry,
}

impl DocumentAnnotations {
    pub fn annotations(&self) -> impl Iterator<Item = (u32, &AnnotationRecord)> {
        self.pages
            .iter()
            .flat_map(|p| p.annotations.iter().map(move |a| (p.page_number, a)))
    }

    pub fn len(&self) -> usize {
        self.pages.iter().map(|p| p.annotations.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find(&self, id: &str) -> Option<&AnnotationRecord> {
        self.annotations().map(|(_, a)| a).find(|a| a.id == id)
    }
}

/// Builder for configuring annotation extraction.
///
/// # Examples
///
/// ```no_run
/// use pdf_annots::{AnnotationExtractor, RenderIntent};
///
/// let output = AnnotationExtractor::builder()
///     .password("secret")
///     .intent(RenderIntent::Print)
///     .pages([1, 2])
///     .build()
///     .from_path("form.pdf")?;
/// # Ok::<(), pdf_annots::AnnotError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct AnnotationExtractorBuilder {
    password: Option<String>,
    intent: Option<RenderIntent>,
    pages: Option<BTreeSet<u32>>,
}

impl AnnotationExtractorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the password for encrypted PDFs.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Keep only annotations shown for `intent`.
    pub fn intent(mut self, intent: RenderIntent) -> Self {
        self.intent = Some(intent);
        self
    }

    /// Restrict extraction to these 1-based page numbers.
    pub fn pages(mut self, pages: impl IntoIterator<Item = u32>) -> Self {
        self.pages = Some(pages.into_iter().collect());
        self
    }

    pub fn build(self) -> AnnotationExtractor {
        AnnotationExtractor {
            password: self.password,
            intent: self.intent,
            pages: self.pages,
        }
    }
}

/// Decodes the annotations of every page of a PDF.
///
/// # Examples
///
/// ```no_run
/// use pdf_annots::AnnotationExtractor;
///
/// let output = AnnotationExtractor::default().from_path("form.pdf")?;
/// for (page, annotation) in output.annotations() {
///     println!("page {}: {}", page, annotation);
/// }
/// # Ok::<(), pdf_annots::AnnotError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct AnnotationExtractor {
    password: Option<String>,
    intent: Option<RenderIntent>,
    pages: Option<BTreeSet<u32>>,
}

impl AnnotationExtractor {
    pub fn builder() -> AnnotationExtractorBuilder {
        AnnotationExtractorBuilder::new()
    }

    /// Extract annotations from a PDF file at the given path.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<DocumentAnnotations, AnnotError> {
        let mut doc = Document::load(path)?;
        self.decrypt(&mut doc)?;
        self.extract_from_document(&doc)
    }

    /// Extract annotations from a PDF in memory.
    pub fn from_bytes(&self, bytes: &[u8]) -> Result<DocumentAnnotations, AnnotError> {
        let mut doc = Document::load_mem(bytes)?;
        self.decrypt(&mut doc)?;
        self.extract_from_document(&doc)
    }

    /// Extract annotations from a PDF reader.
    pub fn from_reader<R: Read>(&self, mut reader: R) -> Result<DocumentAnnotations, AnnotError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        self.from_bytes(&bytes)
    }

    /// Decrypt `doc` with the configured password, or the empty one.
    pub fn decrypt(&self, doc: &mut Document) -> Result<(), AnnotError> {
        if doc.is_encrypted() {
            doc.decrypt(self.password.as_deref().unwrap_or(""))?;
        }
        Ok(())
    }

    /// Run the decode pass over an already loaded, decrypted document.
    pub fn extract_from_document(&self, doc: &Document) -> Result<DocumentAnnotations, AnnotError> {
        let all_pages = doc.get_pages();
        if let Some(wanted) = &self.pages {
            if let Some(missing) = wanted.iter().find(|n| !all_pages.contains_key(*n)) {
                return Err(AnnotError::PageNotFound(*missing));
            }
        }

        let mut output = DocumentAnnotations::default();
        for (page_number, page_id) in all_pages {
            if self.pages.as_ref().is_some_and(|p| !p.contains(&page_number)) {
                continue;
            }
            let intent = self.intent;
            let annotations = decode_page_with(doc, page_id, &mut output.scripts, |a| {
                intent.is_none_or(|i| i.includes(a))
            })?;
            debug!("page {}: kept {} annotations", page_number, annotations.len());
            output.pages.push(PageAnnotations {
                page_number,
                page_id,
                annotations,
            });
        }
        Ok(output)
    }
}

/// Extract annotations from a PDF file using default settings.
///
/// ```no_run
/// let output = pdf_annots::from_path("form.pdf")?;
/// println!("{} annotations", output.len());
/// # Ok::<(), pdf_annots::AnnotError>(())
/// ```
pub fn from_path<P: AsRef<Path>>(path: P) -> Result<DocumentAnnotations, AnnotError> {
    AnnotationExtractor::default().from_path(path)
}

/// Extract annotations from a PDF in memory using default settings.
pub fn from_bytes(bytes: &[u8]) -> Result<DocumentAnnotations, AnnotError> {
    AnnotationExtractor::default().from_bytes(bytes)
}

/// Extract annotations from a PDF reader using default settings.
pub fn from_reader<R: Read>(reader: R) -> Result<DocumentAnnotations, AnnotError> {
    AnnotationExtractor::default().from_reader(reader)
}
