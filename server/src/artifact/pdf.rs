use std::fs::OpenOptions;
use std::io::{BufWriter, ErrorKind};
use std::path::Path;

use printpdf::{BuiltinFont, Mm, PdfDocument, Rect};

use super::{ArtifactError, TicketLayout};

fn mm(points: f32) -> Mm {
    Mm(points * 25.4 / 72.0)
}

/// Writes a composed layout to a new file at `path`. An existing file is never
/// replaced; a partially written file is removed.
pub(super) fn write(layout: &TicketLayout, title: &str, path: &Path) -> Result<(), ArtifactError> {
    let (doc, page, layer) = PdfDocument::new(
        title,
        mm(layout.page_width),
        mm(layout.page_height),
        "ticket",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ArtifactError::RenderInitFailed(format!("{e:?}")))?;
    let canvas = doc.get_page(page).get_layer(layer);

    let step = layout.qr.module_size();
    for (x, y) in layout.qr.dark_modules() {
        canvas.add_rect(Rect::new(mm(x), mm(y), mm(x + step), mm(y + step)));
    }

    for line in &layout.lines {
        canvas.use_text(
            line.text.as_str(),
            line.font_size,
            mm(line.x),
            mm(line.baseline),
            &font,
        );
    }

    let save_failed = |reason: String| ArtifactError::SaveFailed {
        path: path.display().to_string(),
        reason,
    };

    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => ArtifactError::PathInUse(path.display().to_string()),
            _ => save_failed(e.to_string()),
        })?;

    if let Err(e) = doc.save(&mut BufWriter::new(file)) {
        if let Err(cleanup) = std::fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %cleanup, "Failed to remove partial ticket artifact");
        }
        return Err(save_failed(format!("{e:?}")));
    }

    Ok(())
}
