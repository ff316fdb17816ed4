//! Scannable ticket documents.
//!
//! A ticket artifact is a single fixed-size page: the QR code for the ticket
//! id centred in the upper region, then centred, word-wrapped text blocks for
//! the event name, venue, schedule and optional details. Only the ticket id is
//! encoded in the QR code.
//!
//! [`compose`] is pure: the same input always yields the same [`TicketLayout`].
//! [`render`] composes and writes the layout as a PDF.

mod font;
mod pdf;

use std::path::Path;

use qrcode::{Color, EcLevel, QrCode};
use thiserror::Error;

pub use font::text_width;

pub const PAGE_WIDTH: f32 = 300.0;
pub const PAGE_HEIGHT: f32 = 500.0;

const QR_DISPLAY_SIZE: f32 = 180.0;
const QR_TOP_MARGIN: f32 = 20.0;
const FIRST_BASELINE_GAP: f32 = 30.0;
const BLOCK_GAP: f32 = 8.0;
const WRAP_RATIO: f32 = 0.8;

const NAME_FONT_SIZE: f32 = 16.0;
const VENUE_FONT_SIZE: f32 = 13.0;
const SCHEDULE_FONT_SIZE: f32 = 11.0;
const DETAILS_FONT_SIZE: f32 = 9.0;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to create ticket document: {0}")]
    RenderInitFailed(String),

    #[error("Failed to save ticket document to {path}: {reason}")]
    SaveFailed { path: String, reason: String },

    #[error("Ticket document {0} already exists")]
    PathInUse(String),
}

/// Everything printed on a ticket.
#[derive(Debug, Clone, Copy)]
pub struct TicketArtifact<'a> {
    pub ticket_id: &'a str,
    pub event_name: &'a str,
    pub venue: &'a str,
    pub details: Option<&'a str>,
    /// Display-formatted start, e.g. `9 Dec, 2025  6:05 PM UTC`.
    pub starts_at: &'a str,
    pub ends_at: &'a str,
}

/// QR matrix placed on the page. `x`/`y` is the lower-left corner in points.
#[derive(Debug, Clone, PartialEq)]
pub struct QrBlock {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    /// Modules per side.
    pub modules: usize,
    dark: Vec<bool>,
}

impl QrBlock {
    pub fn module_size(&self) -> f32 {
        self.size / self.modules as f32
    }

    /// Module at column `x`, row `y`, rows counted from the top.
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.modules && y < self.modules && self.dark[y * self.modules + x]
    }

    /// Lower-left corner of every dark module, in page coordinates.
    pub fn dark_modules(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        let step = self.module_size();
        (0..self.modules).flat_map(move |y| {
            (0..self.modules).filter(move |&x| self.is_dark(x, y)).map(move |x| {
                (
                    self.x + x as f32 * step,
                    self.y + (self.modules - y - 1) as f32 * step,
                )
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub font_size: f32,
    pub x: f32,
    pub baseline: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TicketLayout {
    pub page_width: f32,
    pub page_height: f32,
    pub qr: QrBlock,
    pub lines: Vec<TextLine>,
}

/// Lays out a ticket page without touching the filesystem.
pub fn compose(artifact: &TicketArtifact<'_>) -> Result<TicketLayout, ArtifactError> {
    let code = QrCode::with_error_correction_level(artifact.ticket_id.as_bytes(), EcLevel::L)
        .map_err(|e| ArtifactError::RenderInitFailed(format!("QR encoding failed: {e:?}")))?;

    let qr = QrBlock {
        x: (PAGE_WIDTH - QR_DISPLAY_SIZE) / 2.0,
        y: PAGE_HEIGHT - QR_DISPLAY_SIZE - QR_TOP_MARGIN,
        size: QR_DISPLAY_SIZE,
        modules: code.width(),
        dark: code
            .to_colors()
            .into_iter()
            .map(|c| matches!(c, Color::Dark))
            .collect(),
    };

    let mut blocks: Vec<(Vec<&str>, f32)> = vec![
        (vec![artifact.event_name], NAME_FONT_SIZE),
        (vec![artifact.venue], VENUE_FONT_SIZE),
        (
            vec![artifact.starts_at, "to", artifact.ends_at],
            SCHEDULE_FONT_SIZE,
        ),
    ];
    if let Some(details) = artifact.details.filter(|d| !d.trim().is_empty()) {
        blocks.push((vec![details], DETAILS_FONT_SIZE));
    }

    let max_width = PAGE_WIDTH * WRAP_RATIO;
    let mut baseline = qr.y - FIRST_BASELINE_GAP;
    let mut lines = Vec::new();

    for (paragraphs, font_size) in blocks {
        for paragraph in paragraphs {
            for text in wrap_text(paragraph, font_size, max_width) {
                let x = (PAGE_WIDTH - text_width(&text, font_size)) / 2.0;
                lines.push(TextLine {
                    text,
                    font_size,
                    x,
                    baseline,
                });
                baseline -= font_size + 2.0;
            }
        }
        baseline -= BLOCK_GAP;
    }

    Ok(TicketLayout {
        page_width: PAGE_WIDTH,
        page_height: PAGE_HEIGHT,
        qr,
        lines,
    })
}

/// Composes the ticket and writes it to `path` as a PDF.
pub fn render(artifact: &TicketArtifact<'_>, path: &Path) -> Result<TicketLayout, ArtifactError> {
    let layout = compose(artifact)?;
    pdf::write(&layout, artifact.event_name, path)?;
    tracing::debug!(ticket_id = artifact.ticket_id, path = %path.display(), "Ticket artifact written");
    Ok(layout)
}

/// Greedy word wrap: words are packed onto a line while its rendered width
/// stays under `max_width`. A word wider than `max_width` gets a line of its own.
pub fn wrap_text(text: &str, font_size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if text_width(&candidate, font_size) < max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
}
