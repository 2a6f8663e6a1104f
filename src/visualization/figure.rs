//! Backend lifecycle for every figure: PNG file, in-memory buffer, or both.

use super::style::FigureSize;
use super::{draw_error, RenderError};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Something that can draw itself onto a white drawing area.
pub trait FigurePainter {
    fn paint<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), RenderError>;
}

/// A rendered figure kept in memory as packed RGB rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Figure {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Figure {
    /// RGB triple at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let at = (y as usize * self.width as usize + x as usize) * 3;
        self.pixels.get(at..at + 3).map(|p| [p[0], p[1], p[2]])
    }
}

/// Where a figure ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFigure {
    pub saved: Option<PathBuf>,
    pub figure: Option<Figure>,
}

/// Draw `painter` at `size` inches and `dpi`.
///
/// With `save_path` the parent directory is created and a PNG written; with
/// `show` the figure is also drawn into a buffer returned to the caller.
pub fn render_figure<P: FigurePainter>(
    painter: &P,
    size: FigureSize,
    dpi: u32,
    save_path: Option<&Path>,
    show: bool,
) -> Result<RenderedFigure, RenderError> {
    let (width, height) = size
        .pixels(dpi)
        .ok_or(RenderError::InvalidSize(size.width, size.height, dpi))?;

    let saved = match save_path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|source| RenderError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
            draw_on(painter, &root)?;
            drop(root);
            info!(path = %path.display(), width, height, "Figure saved");
            Some(path.to_path_buf())
        }
        None => None,
    };

    let figure = if show {
        let mut pixels = vec![255u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
            draw_on(painter, &root)?;
        }
        debug!(width, height, "Figure rendered to memory");
        Some(Figure {
            width,
            height,
            pixels,
        })
    } else {
        None
    };

    Ok(RenderedFigure { saved, figure })
}

fn draw_on<P: FigurePainter, DB: DrawingBackend>(
    painter: &P,
    root: &DrawingArea<DB, Shift>,
) -> Result<(), RenderError> {
    root.fill(&WHITE).map_err(draw_error)?;
    painter.paint(root)?;
    root.present().map_err(draw_error)
}
