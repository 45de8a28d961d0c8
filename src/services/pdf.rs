//! A4 documents laid out as headings, text lines, tables and label/value
//! pairs. Pages are added as content runs past the bottom margin.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use thiserror::Error;
use tracing::debug;

use crate::error::AppError;

#[derive(Debug, Error)]
#[error("PDF generation failed: {0}")]
pub struct PdfError(String);

impl From<printpdf::Error> for PdfError {
    fn from(err: printpdf::Error) -> Self { Self(err.to_string()) }
}

impl From<PdfError> for AppError {
    fn from(err: PdfError) -> Self { Self::Internal(err.to_string()) }
}

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
/// Rough Helvetica advance per character, in mm per point of font size.
const CHAR_WIDTH_PER_PT: f32 = 0.19;

pub struct Column {
    pub title: &'static str,
    /// Width in mm.
    pub width: f32,
}

/// Shortens `text` so it fits `width` mm at `size` pt.
pub fn fit(text: &str, width: f32, size: f32) -> String {
    let max = (width / (size * CHAR_WIDTH_PER_PT)).floor().max(1.0) as usize;
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max.saturating_sub(2)).collect();
    short.push_str("..");
    short
}

pub struct PdfSheet {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl PdfSheet {
    pub fn new(title: &str) -> Result<Self, PdfError> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "content");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self { doc, layer, regular, bold, y: PAGE_HEIGHT - MARGIN, pages: 1 })
    }

    pub fn page_count(&self) -> usize { self.pages }

    fn ensure_room(&mut self, height: f32) -> bool {
        if self.y - height >= MARGIN {
            return false;
        }
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "content");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
        self.pages += 1;
        true
    }

    fn put(&self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    pub fn heading(&mut self, text: &str) {
        self.ensure_room(10.0);
        self.y -= 8.0;
        self.put(text, 18.0, MARGIN, true);
        self.y -= 4.0;
    }

    pub fn subheading(&mut self, text: &str) {
        self.ensure_room(8.0);
        self.y -= 6.0;
        self.put(text, 12.0, MARGIN, true);
        self.y -= 1.5;
    }

    pub fn line(&mut self, text: &str) {
        self.ensure_room(5.0);
        self.y -= 5.0;
        self.put(&fit(text, PAGE_WIDTH - 2.0 * MARGIN, 10.0), 10.0, MARGIN, false);
    }

    pub fn gap(&mut self, mm: f32) { self.y -= mm; }

    /// Header row, then one row per entry; the header repeats on new pages.
    pub fn table(&mut self, columns: &[Column], rows: &[Vec<String>]) {
        const SIZE: f32 = 9.0;
        const ROW: f32 = 5.5;
        let header: Vec<String> = columns.iter().map(|c| c.title.to_string()).collect();
        self.ensure_room(2.0 * ROW);
        self.table_row(columns, &header, SIZE, ROW, true);
        for row in rows {
            if self.ensure_room(ROW) {
                self.table_row(columns, &header, SIZE, ROW, true);
            }
            self.table_row(columns, row, SIZE, ROW, false);
        }
    }

    fn table_row(&mut self, columns: &[Column], cells: &[String], size: f32, height: f32, bold: bool) {
        self.y -= height;
        let mut x = MARGIN;
        for (col, cell) in columns.iter().zip(cells) {
            self.put(&fit(cell, col.width - 1.0, size), size, x, bold);
            x += col.width;
        }
    }

    /// A right-hand summary line such as `Subtotal: Rs. 100.00`.
    pub fn pair(&mut self, label: &str, value: &str, bold: bool) {
        self.ensure_room(5.5);
        self.y -= 5.5;
        self.put(label, 10.0, 120.0, bold);
        self.put(value, 10.0, 160.0, bold);
    }

    pub fn finish(self) -> Result<Vec<u8>, PdfError> {
        debug!(pages = self.pages, "PDF rendered");
        Ok(self.doc.save_to_bytes()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_truncates_long_text() {
        assert_eq!(fit("Boot", 40.0, 9.0), "Boot");
        let fitted = fit("Trail Runner Ultra Grip Waterproof Edition (Black / 10)", 30.0, 9.0);
        assert!(fitted.ends_with(".."));
        assert!(fitted.chars().count() <= (30.0 / (9.0 * CHAR_WIDTH_PER_PT)) as usize);
    }

    #[test]
    fn test_long_tables_spill_onto_new_pages() {
        let mut sheet = PdfSheet::new("Report").unwrap();
        let columns = [Column { title: "Order", width: 60.0 }, Column { title: "Total", width: 40.0 }];
        let rows: Vec<Vec<String>> = (0..120).map(|i| vec![format!("ORD-{i:010}"), "Rs. 10.00".into()]).collect();
        sheet.heading("Sales");
        sheet.table(&columns, &rows);
        assert!(sheet.page_count() >= 3);
        let bytes = sheet.finish().unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }
}
