//! Paints an [`InvoicePage`] with printpdf.
//!
//! The layout works in millimetres from the top-left corner; PDF user space
//! starts bottom-left, so every y is flipped against the page height.
//!
//! Only the built-in Helvetica faces are used. They cover ASCII text
//! reliably, so the currency symbol is swapped for an ASCII spelling and any
//! other non-ASCII character is replaced before painting.

use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rect,
    Rgb as PdfRgb,
};

use tillbook_core::layout::{Align, DrawOp, FontStyle, InvoicePage, Rgb, PAGE_HEIGHT_MM, PAGE_WIDTH_MM};

#[derive(Debug, thiserror::Error)]
#[error("PDF rendering failed: {0}")]
pub struct PdfError(String);

/// Millimetres per point.
const MM_PER_PT: f32 = 0.3528;

/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_EM: f32 = 0.52;

/// ASCII stand-in for a currency symbol the built-in fonts cannot draw.
pub fn pdf_currency_symbol(symbol: &str) -> String {
    match symbol {
        "₹" => "Rs.".to_string(),
        s if s.is_ascii() => s.to_string(),
        _ => String::new(),
    }
}

struct Fonts {
    normal: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

impl Fonts {
    fn get(&self, style: FontStyle) -> &IndirectFontRef {
        match style {
            FontStyle::Normal => &self.normal,
            FontStyle::Bold => &self.bold,
            FontStyle::Italic => &self.italic,
        }
    }
}

/// Renders one page to PDF bytes.
pub fn render_pdf(page: &InvoicePage) -> Result<Vec<u8>, PdfError> {
    let (doc, page_index, layer_index) = PdfDocument::new(
        page.title.as_str(),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Invoice",
    );

    let font = |f: BuiltinFont| doc.add_builtin_font(f).map_err(|e| PdfError(e.to_string()));
    let fonts = Fonts {
        normal: font(BuiltinFont::Helvetica)?,
        bold: font(BuiltinFont::HelveticaBold)?,
        italic: font(BuiltinFont::HelveticaOblique)?,
    };

    let layer = doc.get_page(page_index).get_layer(layer_index);
    for op in &page.ops {
        paint(&layer, &fonts, op);
    }

    doc.save_to_bytes().map_err(|e| PdfError(e.to_string()))
}

fn paint(layer: &PdfLayerReference, fonts: &Fonts, op: &DrawOp) {
    match op {
        DrawOp::FillRect { x, y, w, h, color } => {
            layer.set_fill_color(pdf_color(*color));
            layer.add_rect(rect(*x, *y, *w, *h).with_mode(PaintMode::Fill));
        }
        DrawOp::StrokeRect {
            x,
            y,
            w,
            h,
            color,
            width,
        } => {
            layer.set_outline_color(pdf_color(*color));
            layer.set_outline_thickness(mm_to_pt(*width));
            layer.add_rect(rect(*x, *y, *w, *h).with_mode(PaintMode::Stroke));
        }
        DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            color,
            width,
        } => {
            layer.set_outline_color(pdf_color(*color));
            layer.set_outline_thickness(mm_to_pt(*width));
            layer.add_line(Line {
                points: vec![
                    (Point::new(Mm(*x1), Mm(flip(*y1))), false),
                    (Point::new(Mm(*x2), Mm(flip(*y2))), false),
                ],
                is_closed: false,
            });
        }
        DrawOp::Text {
            text,
            x,
            y,
            size,
            style,
            color,
            align,
        } => {
            let text = ascii_only(text);
            let left = match align {
                Align::Left => *x,
                Align::Center => x - text_width_mm(&text, *size) / 2.0,
                Align::Right => x - text_width_mm(&text, *size),
            };
            layer.set_fill_color(pdf_color(*color));
            layer.use_text(text, *size, Mm(left), Mm(flip(*y)), fonts.get(*style));
        }
    }
}

fn flip(y: f32) -> f32 {
    PAGE_HEIGHT_MM - y
}

/// Layout rect (top-left origin) to PDF rect (bottom-left origin).
fn rect(x: f32, y: f32, w: f32, h: f32) -> Rect {
    Rect::new(Mm(x), Mm(flip(y + h)), Mm(x + w), Mm(flip(y)))
}

fn mm_to_pt(mm: f32) -> f32 {
    mm / MM_PER_PT
}

fn pdf_color(Rgb(r, g, b): Rgb) -> Color {
    Color::Rgb(PdfRgb::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        None,
    ))
}

fn text_width_mm(text: &str, size_pt: f32) -> f32 {
    text.chars().count() as f32 * size_pt * AVG_GLYPH_EM * MM_PER_PT
}

fn ascii_only(text: &str) -> String {
    text.replace('₹', "Rs.")
        .chars()
        .map(|c| if c.is_ascii() { c } else { '?' })
        .collect()
}
