//! Text extraction: pull the text layer out of every page via pdfium.
//!
//! pdfium is not async-safe, so all work runs inside
//! `tokio::task::spawn_blocking`. The page-count ceiling is checked right
//! after the document opens, before any page text is read.

use crate::error::DeckGuardError;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Text of every page plus the page count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    /// Page texts joined with `\n`.
    pub text: String,
    pub page_count: usize,
}

/// Extract the text of a deck held in memory.
///
/// # Errors
/// * [`DeckGuardError::PasswordRequired`] / [`DeckGuardError::WrongPassword`]
/// * [`DeckGuardError::CorruptPdf`]: pdfium could not open the document
/// * [`DeckGuardError::EmptyDocument`]: zero pages
/// * [`DeckGuardError::TooManyPages`]: more than `max_pages` pages
pub async fn extract_text(
    name: &str,
    bytes: Vec<u8>,
    password: Option<&str>,
    max_pages: usize,
) -> Result<ExtractedText, DeckGuardError> {
    let name = name.to_string();
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || {
        extract_text_blocking(&name, &bytes, password.as_deref(), max_pages)
    })
    .await
    .map_err(|e| DeckGuardError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Blocking implementation of text extraction.
fn extract_text_blocking(
    name: &str,
    bytes: &[u8],
    password: Option<&str>,
    max_pages: usize,
) -> Result<ExtractedText, DeckGuardError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| classify_open_error(name, password, &e))?;

    let pages = document.pages();
    let page_count = pages.len() as usize;
    info!("PDF loaded: {} pages", page_count);

    check_page_count(name, page_count, max_pages)?;

    let mut texts = Vec::with_capacity(page_count);
    for (idx, page) in pages.iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| DeckGuardError::ExtractionFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?
            .all();
        debug!("Page {}: {} chars", idx + 1, text.chars().count());
        texts.push(text);
    }

    Ok(ExtractedText {
        text: texts.join("\n"),
        page_count,
    })
}

/// Reject empty documents and documents over the page ceiling.
pub fn check_page_count(name: &str, pages: usize, max_pages: usize) -> Result<(), DeckGuardError> {
    if pages == 0 {
        return Err(DeckGuardError::EmptyDocument {
            name: name.to_string(),
        });
    }
    if pages > max_pages {
        return Err(DeckGuardError::TooManyPages {
            pages,
            max: max_pages,
        });
    }
    Ok(())
}

/// Bind pdfium from `PDFIUM_LIB_PATH`, the working directory, or the system.
fn bind_pdfium() -> Result<Pdfium, DeckGuardError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if Path::new(&path).is_file() => Pdfium::bind_to_library(&path),
        Ok(dir) => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir.as_str()))
        }
        Err(_) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./")),
    };

    bindings
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| DeckGuardError::PdfiumBindingFailed(format!("{:?}", e)))
}

fn classify_open_error(name: &str, password: Option<&str>, err: &PdfiumError) -> DeckGuardError {
    let err_str = format!("{:?}", err);
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            DeckGuardError::WrongPassword {
                name: name.to_string(),
            }
        } else {
            DeckGuardError::PasswordRequired {
                name: name.to_string(),
            }
        }
    } else {
        DeckGuardError::CorruptPdf {
            name: name.to_string(),
            detail: err_str,
        }
    }
}
