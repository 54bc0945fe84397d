use std::fmt::Formatter;

#[derive(Debug)]
pub enum AnnotError {
    IoError(std::io::Error),
    PdfError(lopdf::Error),
    PageNotFound(u32),
    AppearanceError(String),
}

impl std::fmt::Display for AnnotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            AnnotError::IoError(e) => write!(f, "IO error: {}", e),
            AnnotError::PdfError(e) => write!(f, "PDF error: {}", e),
            AnnotError::PageNotFound(n) => write!(f, "Page {} not found", n),
            AnnotError::AppearanceError(e) => write!(f, "Appearance error: {}", e),
        }
    }
}

impl std::error::Error for AnnotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnnotError::IoError(e) => Some(e),
            AnnotError::PdfError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AnnotError {
    fn from(e: std::io::Error) -> Self {
        AnnotError::IoError(e)
    }
}

impl From<lopdf::Error> for AnnotError {
    fn from(e: lopdf::Error) -> Self {
        AnnotError::PdfError(e)
    }
}
