//! PDF document extraction: embedded text first, OCR fallback for scans.
//!
//! [`PdfSource`] reads the PDF's embedded text layer and splits it into pages
//! on form-feed boundaries. Certification standards are frequently scanned
//! documents with no text layer at all; for those the source falls back to
//! rasterizing pages with `pdftoppm` and running `tesseract` over each image.
//! OCR accuracy is out of scope; the fallback exists so scanned documents
//! ingest at all.

use std::path::{Path, PathBuf};
use std::process::Command;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::types::{PageText, RagError};

/// Produces the ordered `(page_number, text)` sequence for a document.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fails with [`RagError::Document`].
    async fn pages(&self, path: &Path) -> Result<Vec<PageText>, RagError>;
}

/// PDF extraction backed by `pdf-extract`, with an external OCR fallback.
pub struct PdfSource {
    ocr_fallback: bool,
}

impl PdfSource {
    pub fn new() -> Self {
        Self { ocr_fallback: true }
    }

    /// Disable the `pdftoppm` + `tesseract` fallback; documents without a
    /// text layer then yield zero pages.
    #[must_use]
    pub fn without_ocr_fallback(mut self) -> Self {
        self.ocr_fallback = false;
        self
    }
}

impl Default for PdfSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentSource for PdfSource {
    async fn pages(&self, path: &Path) -> Result<Vec<PageText>, RagError> {
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            return Err(RagError::document(
                "the provided file is not a PDF",
                path.display().to_string(),
            ));
        }

        let bytes = tokio::fs::read(path).await.map_err(|err| {
            RagError::document(
                format!("unable to read {}", path.display()),
                err.to_string(),
            )
        })?;

        let ocr_fallback = self.ocr_fallback;
        tokio::task::spawn_blocking(move || extract_pages(&bytes, ocr_fallback))
            .await
            .map_err(|err| RagError::document("document extraction task failed", err.to_string()))?
    }
}

fn extract_pages(bytes: &[u8], ocr_fallback: bool) -> Result<Vec<PageText>, RagError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|err| RagError::document("failed to extract PDF text", err.to_string()))?;

    if text.trim().is_empty() {
        if ocr_fallback {
            info!("no text layer found, falling back to OCR");
            return ocr_pages(bytes);
        }
        return Ok(Vec::new());
    }

    Ok(paginate(&text))
}

/// Split extracted text into pages on form feeds, numbering from 1.
///
/// `pdf-extract` returns the whole document as one string with `\x0C`
/// separating pages; a document without any form feed is treated as a single
/// page.
fn paginate(text: &str) -> Vec<PageText> {
    if text.contains('\x0C') {
        text.split('\x0C')
            .enumerate()
            .map(|(i, page)| PageText::new(i as u32 + 1, page.trim()))
            .collect()
    } else {
        vec![PageText::new(1, text.trim())]
    }
}

fn ocr_pages(bytes: &[u8]) -> Result<Vec<PageText>, RagError> {
    let work_dir = std::env::temp_dir().join(format!("greenrag-ocr-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&work_dir).map_err(|err| {
        RagError::document("unable to create OCR work directory", err.to_string())
    })?;
    let result = run_ocr(&work_dir, bytes);
    let _ = std::fs::remove_dir_all(&work_dir);
    result
}

fn run_ocr(work_dir: &Path, bytes: &[u8]) -> Result<Vec<PageText>, RagError> {
    let pdf_path = work_dir.join("input.pdf");
    std::fs::write(&pdf_path, bytes)
        .map_err(|err| RagError::document("unable to stage PDF for OCR", err.to_string()))?;

    let output = Command::new("pdftoppm")
        .args(["-r", "300", "-png"])
        .arg(&pdf_path)
        .arg(work_dir.join("page"))
        .output()
        .map_err(|err| RagError::document("failed to run pdftoppm", err.to_string()))?;
    if !output.status.success() {
        return Err(RagError::document(
            "failed to convert PDF pages to images",
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ));
    }

    let mut images: Vec<(u32, PathBuf)> = std::fs::read_dir(work_dir)
        .map_err(|err| RagError::document("unable to list OCR work directory", err.to_string()))?
        .filter_map(|dir_entry| {
            let path = dir_entry.ok()?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("png") {
                return None;
            }
            let number = page_number_from_stem(path.file_stem()?.to_str()?)?;
            Some((number, path))
        })
        .collect();
    images.sort_by_key(|(number, _)| *number);

    let mut pages = Vec::with_capacity(images.len());
    for (number, image) in images {
        let output = Command::new("tesseract")
            .arg(&image)
            .arg("stdout")
            .args(["-l", "eng"])
            .output()
            .map_err(|err| {
                RagError::document(
                    format!("failed to run tesseract on page {number}"),
                    err.to_string(),
                )
            })?;
        if !output.status.success() {
            return Err(RagError::document(
                format!("failed to extract text from page {number}"),
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }
        pages.push(PageText::new(
            number,
            String::from_utf8_lossy(&output.stdout).into_owned(),
        ));
    }
    Ok(pages)
}

/// Parse the page number from a `pdftoppm` output stem such as `page-07`.
///
/// Numeric parsing rather than lexicographic sorting: `pdftoppm` only
/// zero-pads when the document is large enough, so `page-10` would otherwise
/// sort before `page-2`.
fn page_number_from_stem(stem: &str) -> Option<u32> {
    let digits: String = stem
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginate_splits_on_form_feeds_and_numbers_from_one() {
        let pages = paginate("first page\x0Csecond page\x0Cthird page");
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0], PageText::new(1, "first page"));
        assert_eq!(pages[2], PageText::new(3, "third page"));
    }

    #[test]
    fn paginate_without_form_feeds_is_a_single_page() {
        let pages = paginate("  all the text  ");
        assert_eq!(pages, vec![PageText::new(1, "all the text")]);
    }

    #[test]
    fn page_number_parsing_handles_padding_and_large_counts() {
        assert_eq!(page_number_from_stem("page-1"), Some(1));
        assert_eq!(page_number_from_stem("page-07"), Some(7));
        assert_eq!(page_number_from_stem("page-120"), Some(120));
        assert_eq!(page_number_from_stem("page"), None);
    }

    #[tokio::test]
    async fn non_pdf_paths_are_rejected() {
        let source = PdfSource::new();
        let err = source.pages(Path::new("notes.txt")).await.unwrap_err();
        assert!(matches!(err, RagError::Document { .. }));
    }
}
