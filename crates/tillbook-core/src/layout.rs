//! # Invoice Page Layout
//!
//! Describes the printable A4 invoice as a flat list of drawing operations.
//! The server paints these with a PDF backend; tests assert on them
//! directly.
//!
//! Coordinates are millimetres from the TOP-LEFT corner of the page, y
//! growing downwards. Painters that use a bottom-left origin must flip.
//!
//! ```text
//!  0 ┌──────────────────────────────────────────┐
//!    │▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓ INVOICE ▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓│  header band (45mm)
//!    │▓▓▓▓▓▓▓▓▓▓▓▓▓▓ Invoice #id ▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓│
//! 65 │ Bill To:                 Invoice Date: ..│
//!    │ client                   Due Date:     ..│
//!    │ email                    Status:       ..│
//!100 │──────────────────────────────────────────│  divider
//!115 │ Items: / Description:                    │
//!    │ ░ Item         Qty    Price      Total ░ │  zebra rows
//!    │                    ┌───────────────────┐ │
//!    │                    │ Subtotal / Tax    │ │  totals box
//!    │                    │ Total             │ │
//!    │                    └───────────────────┘ │
//!    │──────────────────────────────────────────│
//!267 │       Thank you for your business!       │
//!297 └──────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::Serialize;

use crate::checkout::POS_DESCRIPTION_PREFIX;
use crate::money::Money;
use crate::types::{Invoice, InvoiceStatus};

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;

const MARGIN: f32 = 20.0;
const HEADER_HEIGHT: f32 = 45.0;
const DIVIDER_Y: f32 = 100.0;
const BODY_TOP: f32 = 115.0;
const TOTALS_BOX_WIDTH: f32 = 100.0;
const TOTALS_BOX_HEIGHT: f32 = 40.0;

/// Longest item name printed in the table.
pub const MAX_ITEM_NAME_CHARS: usize = 40;

/// Characters per wrapped description line at 11pt across the body width.
const DESCRIPTION_WRAP_CHARS: usize = 90;

// =============================================================================
// Drawing Primitives
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const BRAND: Rgb = Rgb(24, 144, 255);
    pub const MUTED: Rgb = Rgb(100, 100, 100);
    pub const RULE: Rgb = Rgb(200, 200, 200);
    pub const BOX_EDGE: Rgb = Rgb(220, 220, 220);
    pub const TABLE_HEADER: Rgb = Rgb(245, 245, 245);
    pub const ZEBRA: Rgb = Rgb(250, 250, 250);
    pub const BOX_FILL: Rgb = Rgb(248, 249, 250);
    pub const PAID: Rgb = Rgb(76, 175, 80);
    pub const OVERDUE: Rgb = Rgb(244, 67, 54);
    pub const PENDING: Rgb = Rgb(33, 150, 243);

    pub fn for_status(status: InvoiceStatus) -> Rgb {
        match status {
            InvoiceStatus::Paid => Rgb::PAID,
            InvoiceStatus::Overdue => Rgb::OVERDUE,
            InvoiceStatus::Pending => Rgb::PENDING,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FontStyle {
    Normal,
    Bold,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DrawOp {
    FillRect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Rgb,
    },
    StrokeRect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Rgb,
        width: f32,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        color: Rgb,
        width: f32,
    },
    /// `y` is the text baseline; `x` is interpreted per `align`.
    Text {
        text: String,
        x: f32,
        y: f32,
        size: f32,
        style: FontStyle,
        color: Rgb,
        align: Align,
    },
}

impl DrawOp {
    fn text(text: impl Into<String>, x: f32, y: f32, size: f32, style: FontStyle) -> Self {
        DrawOp::Text {
            text: text.into(),
            x,
            y,
            size,
            style,
            color: Rgb::BLACK,
            align: Align::Left,
        }
    }

    fn colored(mut self, c: Rgb) -> Self {
        if let DrawOp::Text { ref mut color, .. } = self {
            *color = c;
        }
        self
    }

    fn aligned(mut self, a: Align) -> Self {
        if let DrawOp::Text { ref mut align, .. } = self {
            *align = a;
        }
        self
    }

    /// Text content, if this is a text op.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            DrawOp::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// A laid-out invoice page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoicePage {
    pub title: String,
    pub file_name: String,
    pub ops: Vec<DrawOp>,
}

impl InvoicePage {
    /// All text on the page, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(DrawOp::as_text)
    }
}

// =============================================================================
// Layout
// =============================================================================

/// `invoice-{id}.pdf`
pub fn pdf_file_name(invoice_id: &str) -> String {
    format!("invoice-{}.pdf", invoice_id)
}

/// `DD/MM/YYYY`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Lays out one invoice. The status shown is its display status on `today`.
pub fn layout_invoice(invoice: &Invoice, today: NaiveDate, currency_symbol: &str) -> InvoicePage {
    let money = |cents: i64| Money::from_cents(cents).format_with(currency_symbol);
    let right = PAGE_WIDTH_MM - MARGIN;
    let center = PAGE_WIDTH_MM / 2.0;
    let mut ops = Vec::new();

    // Header band
    ops.push(DrawOp::FillRect {
        x: 0.0,
        y: 0.0,
        w: PAGE_WIDTH_MM,
        h: HEADER_HEIGHT,
        color: Rgb::BRAND,
    });
    ops.push(
        DrawOp::text("INVOICE", center, 25.0, 24.0, FontStyle::Bold)
            .colored(Rgb::WHITE)
            .aligned(Align::Center),
    );
    ops.push(
        DrawOp::text(format!("Invoice #{}", invoice.id), center, 35.0, 12.0, FontStyle::Normal)
            .colored(Rgb::WHITE)
            .aligned(Align::Center),
    );

    // Bill-to block
    ops.push(DrawOp::text("Bill To:", MARGIN, 65.0, 14.0, FontStyle::Bold));
    ops.push(DrawOp::text(&invoice.client, MARGIN, 77.0, 12.0, FontStyle::Normal));
    if let Some(email) = invoice.email.as_deref().filter(|e| !e.is_empty()) {
        ops.push(DrawOp::text(email, MARGIN, 87.0, 12.0, FontStyle::Normal));
    }

    // Metadata
    let status = invoice.display_status(today);
    let meta = [
        ("Invoice Date:", format_date(invoice.created_at.date_naive()), 65.0, Rgb::BLACK),
        ("Due Date:", format_date(invoice.due_date), 75.0, Rgb::BLACK),
        ("Status:", status.to_string(), 85.0, Rgb::for_status(status)),
    ];
    for (label, value, y, color) in meta {
        ops.push(DrawOp::text(label, right - 50.0, y, 12.0, FontStyle::Bold));
        ops.push(
            DrawOp::text(value, right, y, 12.0, FontStyle::Normal)
                .colored(color)
                .aligned(Align::Right),
        );
    }

    ops.push(DrawOp::Line {
        x1: MARGIN,
        y1: DIVIDER_Y,
        x2: right,
        y2: DIVIDER_Y,
        color: Rgb::RULE,
        width: 0.5,
    });

    let mut y = BODY_TOP;
    if invoice.items.is_empty() {
        y = layout_description(&mut ops, invoice, y);
    } else {
        ops.push(DrawOp::text("Items:", MARGIN, y, 14.0, FontStyle::Bold));
        y += 15.0;

        ops.push(DrawOp::FillRect {
            x: MARGIN,
            y: y - 5.0,
            w: PAGE_WIDTH_MM - 2.0 * MARGIN,
            h: 12.0,
            color: Rgb::TABLE_HEADER,
        });
        let qty_x = PAGE_WIDTH_MM - 120.0;
        let price_x = PAGE_WIDTH_MM - 80.0;
        let total_x = PAGE_WIDTH_MM - 25.0;
        ops.push(DrawOp::text("Item", 25.0, y + 3.0, 11.0, FontStyle::Bold));
        ops.push(DrawOp::text("Qty", qty_x, y + 3.0, 11.0, FontStyle::Bold).aligned(Align::Center));
        ops.push(DrawOp::text("Price", price_x, y + 3.0, 11.0, FontStyle::Bold).aligned(Align::Center));
        ops.push(DrawOp::text("Total", total_x, y + 3.0, 11.0, FontStyle::Bold).aligned(Align::Right));
        y += 15.0;

        for (index, item) in invoice.items.iter().enumerate() {
            if index % 2 == 0 {
                ops.push(DrawOp::FillRect {
                    x: MARGIN,
                    y: y - 3.0,
                    w: PAGE_WIDTH_MM - 2.0 * MARGIN,
                    h: 10.0,
                    color: Rgb::ZEBRA,
                });
            }
            let name: String = item.name.chars().take(MAX_ITEM_NAME_CHARS).collect();
            ops.push(DrawOp::text(name, 25.0, y + 2.0, 10.0, FontStyle::Normal));
            ops.push(
                DrawOp::text(item.quantity.to_string(), qty_x, y + 2.0, 10.0, FontStyle::Normal)
                    .aligned(Align::Center),
            );
            ops.push(
                DrawOp::text(money(item.unit_price_cents), price_x, y + 2.0, 10.0, FontStyle::Normal)
                    .aligned(Align::Center),
            );
            ops.push(
                DrawOp::text(money(item.total_cents), total_x, y + 2.0, 10.0, FontStyle::Normal)
                    .aligned(Align::Right),
            );
            y += 12.0;
        }
        y += 10.0;
    }

    // Totals box
    let box_x = PAGE_WIDTH_MM - 120.0;
    let label_x = PAGE_WIDTH_MM - 115.0;
    let value_x = PAGE_WIDTH_MM - 25.0;
    ops.push(DrawOp::FillRect {
        x: box_x,
        y,
        w: TOTALS_BOX_WIDTH,
        h: TOTALS_BOX_HEIGHT,
        color: Rgb::BOX_FILL,
    });
    ops.push(DrawOp::StrokeRect {
        x: box_x,
        y,
        w: TOTALS_BOX_WIDTH,
        h: TOTALS_BOX_HEIGHT,
        color: Rgb::BOX_EDGE,
        width: 0.5,
    });
    ops.push(DrawOp::text("Subtotal:", label_x, y + 12.0, 11.0, FontStyle::Normal));
    ops.push(DrawOp::text(money(invoice.amount_cents), value_x, y + 12.0, 11.0, FontStyle::Normal).aligned(Align::Right));
    ops.push(DrawOp::text("Tax:", label_x, y + 22.0, 11.0, FontStyle::Normal));
    ops.push(DrawOp::text(money(0), value_x, y + 22.0, 11.0, FontStyle::Normal).aligned(Align::Right));
    ops.push(DrawOp::Line {
        x1: label_x,
        y1: y + 26.0,
        x2: value_x,
        y2: y + 26.0,
        color: Rgb::BOX_EDGE,
        width: 0.3,
    });
    ops.push(DrawOp::text("Total:", label_x, y + 36.0, 13.0, FontStyle::Bold).colored(Rgb::BRAND));
    ops.push(
        DrawOp::text(money(invoice.amount_cents), value_x, y + 36.0, 13.0, FontStyle::Bold)
            .colored(Rgb::BRAND)
            .aligned(Align::Right),
    );

    // Footer
    let footer_y = PAGE_HEIGHT_MM - 30.0;
    ops.push(DrawOp::Line {
        x1: MARGIN,
        y1: footer_y - 5.0,
        x2: right,
        y2: footer_y - 5.0,
        color: Rgb::RULE,
        width: 0.3,
    });
    ops.push(
        DrawOp::text("Thank you for your business!", center, footer_y, 10.0, FontStyle::Italic)
            .colored(Rgb::MUTED)
            .aligned(Align::Center),
    );

    InvoicePage {
        title: format!("Invoice #{}", invoice.id),
        file_name: pdf_file_name(&invoice.id),
        ops,
    }
}

fn layout_description(ops: &mut Vec<DrawOp>, invoice: &Invoice, mut y: f32) -> f32 {
    ops.push(DrawOp::text("Description:", MARGIN, y, 14.0, FontStyle::Bold));
    y += 15.0;

    let text = match invoice.description.strip_prefix(POS_DESCRIPTION_PREFIX) {
        Some(rest) => {
            ops.push(DrawOp::text("Point of Sale Transaction", MARGIN, y, 11.0, FontStyle::Bold));
            y += 10.0;
            format!("Items: {}", rest)
        }
        None => invoice.description.clone(),
    };

    let lines = wrap_text(&text, DESCRIPTION_WRAP_CHARS);
    for (i, line) in lines.iter().enumerate() {
        ops.push(DrawOp::text(line.as_str(), MARGIN, y + i as f32 * 6.0, 11.0, FontStyle::Normal));
    }
    y + lines.len() as f32 * 6.0 + 15.0
}

/// Greedy word wrap on character count. Words longer than `width` are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                lines.push(word.drain(..width).collect());
            }
            let word: String = word.into_iter().collect();
            if word.is_empty() {
                continue;
            }
            let needed = current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
            if needed > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
