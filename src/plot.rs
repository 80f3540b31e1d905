mod bars;
mod colormap;
mod eda;
mod heatmap;

use std::{ops::Range, path::Path};

use plotters::{
    coord::Shift,
    prelude::*,
    style::{
        text_anchor::{HPos, Pos, VPos},
        FontTransform,
    },
};
use tracing::info;

pub use self::{bars::*, colormap::*, eda::*, heatmap::*};
use crate::Error;

pub(crate) const FONT: &str = "sans-serif";

pub(crate) fn font(size: f64) -> TextStyle<'static> {
    (FONT, size).into_font().color(&BLACK)
}

pub(crate) fn anchored<'a>(style: &TextStyle<'a>, h: HPos, v: VPos) -> TextStyle<'a> {
    style.pos(Pos::new(h, v))
}

pub(crate) fn vertical<'a>(style: &TextStyle<'a>) -> TextStyle<'a> {
    style.transform(FontTransform::Rotate270)
}

/// Rough rendered width of `text`, used to size margins.
pub(crate) fn text_width(text: &str, size: f64) -> i32 {
    (text.chars().count() as f64 * size * 0.6).ceil() as i32
}

/// Axis range placing `n` categories at 0, 1, .., n - 1.
pub(crate) fn category_range(n: usize) -> Range<f64> {
    -0.5..(n.max(1) as f64 - 0.5)
}

/// Name of the category centred on `x`, empty between categories.
pub(crate) fn category_label(names: &[&str], x: f64) -> String {
    let i = x.round();
    if (x - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    names
        .get(i as usize)
        .map(|n| n.to_string())
        .unwrap_or_default()
}

/// `lo..hi` widened by `pad` of its width on both sides. An empty or non-finite range becomes a
/// unit-wide one.
pub(crate) fn padded(lo: f64, hi: f64, pad: f64) -> Range<f64> {
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    if hi <= lo {
        return (lo - 0.5)..(lo + 0.5);
    }
    let d = (hi - lo) * pad;
    (lo - d)..(hi + d)
}

/// Smallest and largest non-NaN value.
pub(crate) fn extent(data: impl IntoIterator<Item = f64>) -> (f64, f64) {
    data.into_iter()
        .filter(|x| !x.is_nan())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
            (lo.min(x), hi.max(x))
        })
}

/// Draws `draw` into a new SVG file at `path`, creating its directory first.
#[tracing::instrument(skip(draw))]
pub fn render_svg<F>(path: &Path, size: (u32, u32), draw: F) -> Result<(), Error>
where
    F: FnOnce(&DrawingArea<SVGBackend<'_>, Shift>) -> Result<(), Error>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let root = SVGBackend::new(path, size).into_drawing_area();
    draw(&root)?;
    root.present()?;
    info!("Wrote {}", path.display());
    Ok(())
}
