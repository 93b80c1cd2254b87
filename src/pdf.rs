//! PDF text extraction with lopdf.

use anyhow::{Context, Result};
use lopdf::Document;
use std::io::Cursor;
use tracing::debug;

/// Text of a whole document.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfText {
    /// Every page's text, concatenated in page order.
    pub content: String,
    pub pages: usize,
}

/// Extract the text of every page, in page order.
pub fn extract_pdf_text(data: &[u8]) -> Result<PdfText> {
    let doc = Document::load_from(Cursor::new(data)).context("Failed to load PDF")?;

    let page_texts = page_texts(&doc)?;
    debug!("Extracted text from {} PDF pages", page_texts.len());

    Ok(PdfText {
        pages: page_texts.len(),
        content: page_texts.concat(),
    })
}

fn page_texts(doc: &Document) -> Result<Vec<String>> {
    // get_pages is keyed by page number, so iteration is in page order
    doc.get_pages()
        .into_keys()
        .map(|page_num| {
            doc.extract_text(&[page_num])
                .with_context(|| format!("Failed to extract text from page {}", page_num))
        })
        .collect()
}
