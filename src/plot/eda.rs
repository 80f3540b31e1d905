use plotters::{coord::Shift, prelude::*};

use super::{
    category_label, category_range, extent, font, padded, text_width, vertical, FONT, HISTOGRAM,
    SET2, VIRIDIS,
};
use crate::{quantile_sorted, Error, Frame};

const LABEL_SIZE: f64 = 10.0;
pub const HISTOGRAM_BINS: usize = 20;

/// Equal-width bin counts over the range of the non-NaN values. The last bin includes its right
/// edge. A constant sample is centred in a unit-wide range.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub lo: f64,
    pub hi: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn new(data: &[f64], bins: usize) -> Option<Self> {
        let values = data.iter().copied().filter(|x| !x.is_nan());
        let (lo, hi) = values
            .clone()
            .fold(None, |acc: Option<(f64, f64)>, x| match acc {
                None => Some((x, x)),
                Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
            })?;
        let (lo, hi) = if lo == hi {
            (lo - 0.5, hi + 0.5)
        } else {
            (lo, hi)
        };
        let bins = bins.max(1);
        let width = (hi - lo) / bins as f64;
        let mut counts = vec![0; bins];
        for x in values {
            let b = (((x - lo) / width) as usize).min(bins - 1);
            counts[b] += 1;
        }
        Some(Self { lo, hi, counts })
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

/// Quartiles, 1.5 IQR whiskers and outliers of one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_lo: f64,
    pub whisker_hi: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    pub fn new(data: &[f64]) -> Option<Self> {
        let mut sorted = data
            .iter()
            .copied()
            .filter(|x| !x.is_nan())
            .collect::<Vec<_>>();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);
        let q1 = quantile_sorted(&sorted, 0.25);
        let q3 = quantile_sorted(&sorted, 0.75);
        let iqr = q3 - q1;
        let (fence_lo, fence_hi) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
        let inside = sorted
            .iter()
            .copied()
            .filter(|x| *x >= fence_lo && *x <= fence_hi);
        let whisker_lo = inside.clone().next().unwrap_or(q1);
        let whisker_hi = inside.last().unwrap_or(q3);
        Some(Self {
            q1,
            median: quantile_sorted(&sorted, 0.5),
            q3,
            whisker_lo,
            whisker_hi,
            outliers: sorted
                .iter()
                .copied()
                .filter(|x| *x < fence_lo || *x > fence_hi)
                .collect(),
        })
    }
}

/// Missing cells of `frame` in the light end of viridis, present cells in the dark end. Row 0 is
/// at the top.
#[tracing::instrument(skip(area, frame))]
pub fn draw_missing_map<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    frame: &Frame,
) -> Result<(), Error> {
    area.fill(&WHITE)?;
    let (rows, cols) = frame.shape();
    let names = frame.colnames();
    let longest = names
        .iter()
        .map(|n| text_width(n, LABEL_SIZE))
        .max()
        .unwrap_or(0);
    let mut chart = ChartBuilder::on(area)
        .caption("Missing Values Heatmap", (FONT, 16))
        .margin(10)
        .x_label_area_size(longest + 12)
        .y_label_area_size(40)
        .build_cartesian_2d(category_range(cols), category_range(rows))?;
    let x_formatter = |x: &f64| category_label(&names, *x);
    let y_formatter = |y: &f64| {
        let row = rows as f64 - 1.0 - y;
        if row.fract() == 0.0 && row >= 0.0 && row < rows as f64 {
            (row as usize).to_string()
        } else {
            String::new()
        }
    };
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(cols.max(1))
        .y_labels(6)
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter)
        .x_label_style(vertical(&font(LABEL_SIZE)))
        .y_label_style(font(LABEL_SIZE))
        .draw()?;
    if rows == 0 || cols == 0 {
        return Ok(());
    }

    let (present, missing) = (VIRIDIS.first(), VIRIDIS.last());
    chart.draw_series(std::iter::once(Rectangle::new(
        [(-0.5, -0.5), (cols as f64 - 0.5, rows as f64 - 0.5)],
        present.filled(),
    )))?;
    chart.draw_series(frame.columns().iter().enumerate().flat_map(|(j, column)| {
        let x = j as f64;
        (0..rows)
            .filter(move |r| column.is_missing(*r))
            .map(move |r| {
                let y = (rows - 1 - r) as f64;
                Rectangle::new([(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)], missing.filled())
            })
    }))?;
    Ok(())
}

fn histogram_bars<'a>(hist: &'a Histogram) -> impl Iterator<Item = (f64, f64, usize)> + 'a {
    let width = (hist.hi - hist.lo) / hist.counts.len() as f64;
    hist.counts
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .map(move |(b, count)| {
            let x0 = hist.lo + b as f64 * width;
            (x0, x0 + width, *count)
        })
}

fn draw_histogram_panel<DB: DrawingBackend>(
    panel: &DrawingArea<DB, Shift>,
    name: &str,
    data: &[f64],
    bins: usize,
) -> Result<(), Error> {
    let Some(hist) = Histogram::new(data, bins) else {
        panel.titled(name, font(LABEL_SIZE + 1.0))?;
        return Ok(());
    };
    let mut chart = ChartBuilder::on(panel)
        .caption(name, font(LABEL_SIZE + 1.0))
        .margin(5)
        .x_label_area_size(20)
        .y_label_area_size(30)
        .build_cartesian_2d(hist.lo..hist.hi, 0.0..hist.max_count().max(1) as f64 * 1.05)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(4)
        .y_labels(4)
        .label_style(font(LABEL_SIZE - 1.0))
        .draw()?;
    chart.draw_series(histogram_bars(&hist).map(|(x0, x1, count)| {
        Rectangle::new([(x0, 0.0), (x1, count as f64)], HISTOGRAM.filled())
    }))?;
    chart.draw_series(histogram_bars(&hist).map(|(x0, x1, count)| {
        Rectangle::new([(x0, 0.0), (x1, count as f64)], BLACK.stroke_width(1))
    }))?;
    Ok(())
}

/// One histogram per numeric column, laid out on a near-square grid.
#[tracing::instrument(skip(area, frame))]
pub fn draw_histograms<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    frame: &Frame,
    bins: usize,
) -> Result<(), Error> {
    area.fill(&WHITE)?;
    let body = area.titled("Distributions of Numeric Data", font(16.0))?;
    let numeric = frame
        .columns()
        .iter()
        .filter_map(|c| c.as_f64().map(|d| (c.name(), d)))
        .collect::<Vec<_>>();
    if numeric.is_empty() {
        return Ok(());
    }
    let cols = (numeric.len() as f64).sqrt().ceil() as usize;
    let rows = numeric.len().div_ceil(cols);
    for (panel, (name, data)) in body.split_evenly((rows, cols)).iter().zip(numeric) {
        draw_histogram_panel(panel, name, data, bins)?;
    }
    Ok(())
}

/// Horizontal boxplots of every numeric column on a shared axis, first column on top.
#[tracing::instrument(skip(area, frame))]
pub fn draw_boxplots<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    frame: &Frame,
) -> Result<(), Error> {
    area.fill(&WHITE)?;
    let stats = frame
        .columns()
        .iter()
        .filter_map(|c| c.as_f64().map(|d| (c.name(), BoxStats::new(d))))
        .collect::<Vec<_>>();
    let k = stats.len();
    let (lo, hi) = extent(
        stats
            .iter()
            .filter_map(|(_, s)| s.as_ref())
            .flat_map(|s| {
                s.outliers
                    .iter()
                    .copied()
                    .chain([s.whisker_lo, s.whisker_hi])
            }),
    );
    // bottom to top
    let names = stats.iter().rev().map(|(n, _)| *n).collect::<Vec<_>>();
    let longest = names
        .iter()
        .map(|n| text_width(n, LABEL_SIZE))
        .max()
        .unwrap_or(0);
    let mut chart = ChartBuilder::on(area)
        .caption("Boxplots of Numeric Data", (FONT, 16))
        .margin(15)
        .x_label_area_size(30)
        .y_label_area_size(longest + 12)
        .build_cartesian_2d(padded(lo, hi, 0.05), category_range(k))?;
    let y_formatter = |y: &f64| category_label(&names, *y);
    chart
        .configure_mesh()
        .disable_y_mesh()
        .light_line_style(WHITE.stroke_width(0))
        .y_labels(k.max(1))
        .y_label_formatter(&y_formatter)
        .label_style(font(LABEL_SIZE))
        .draw()?;

    for (i, (_, s)) in stats.iter().enumerate() {
        let Some(s) = s else {
            continue;
        };
        let cy = (k - 1 - i) as f64;
        let (half, cap) = (0.35, 0.175);
        let color = SET2[i % SET2.len()];
        chart.draw_series(
            [
                vec![(s.whisker_lo, cy), (s.q1, cy)],
                vec![(s.q3, cy), (s.whisker_hi, cy)],
                vec![(s.whisker_lo, cy - cap), (s.whisker_lo, cy + cap)],
                vec![(s.whisker_hi, cy - cap), (s.whisker_hi, cy + cap)],
            ]
            .into_iter()
            .map(|path| PathElement::new(path, BLACK.stroke_width(1))),
        )?;
        let corners = [(s.q1, cy - half), (s.q3, cy + half)];
        chart.draw_series([
            Rectangle::new(corners, color.filled()),
            Rectangle::new(corners, BLACK.stroke_width(1)),
        ])?;
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(s.median, cy - half), (s.median, cy + half)],
            BLACK.stroke_width(2),
        )))?;
        chart.draw_series(
            s.outliers
                .iter()
                .map(|o| Circle::new((*o, cy), 3, BLACK.stroke_width(1))),
        )?;
    }
    Ok(())
}

/// Scatter plots of every pair of the columns of `frame` with histograms on the diagonal.
#[tracing::instrument(skip(area, frame))]
pub fn draw_pairplot<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    frame: &Frame,
) -> Result<(), Error> {
    area.fill(&WHITE)?;
    let cols = frame
        .columns()
        .iter()
        .filter_map(|c| c.as_f64().map(|d| (c.name(), d)))
        .collect::<Vec<_>>();
    let k = cols.len();
    if k == 0 {
        return Ok(());
    }
    let ranges = cols
        .iter()
        .map(|(_, d)| {
            let (lo, hi) = extent(d.iter().copied());
            padded(lo, hi, 0.05)
        })
        .collect::<Vec<_>>();
    for (idx, panel) in area.split_evenly((k, k)).iter().enumerate() {
        let (i, j) = (idx / k, idx % k);
        let hist = (i == j).then(|| Histogram::new(cols[i].1, 10)).flatten();
        let y_range = match &hist {
            Some(hist) => 0.0..hist.max_count().max(1) as f64 * 1.05,
            None => ranges[i].clone(),
        };
        let x_range = match &hist {
            Some(hist) => hist.lo..hist.hi,
            None => ranges[j].clone(),
        };
        let mut chart = ChartBuilder::on(panel)
            .margin(4)
            .x_label_area_size(if i == k - 1 { 30 } else { 0 })
            .y_label_area_size(if j == 0 { 40 } else { 0 })
            .build_cartesian_2d(x_range, y_range)?;
        let mut mesh = chart.configure_mesh();
        mesh.disable_mesh()
            .x_labels(3)
            .y_labels(3)
            .label_style(font(LABEL_SIZE - 2.0))
            .axis_desc_style(font(LABEL_SIZE));
        if i == k - 1 {
            mesh.x_desc(cols[j].0);
        } else {
            mesh.disable_x_axis();
        }
        if j == 0 {
            mesh.y_desc(cols[i].0);
        } else {
            mesh.disable_y_axis();
        }
        mesh.draw()?;

        if let Some(hist) = &hist {
            chart.draw_series(histogram_bars(hist).map(|(x0, x1, count)| {
                Rectangle::new([(x0, 0.0), (x1, count as f64)], HISTOGRAM.filled())
            }))?;
        } else if i != j {
            chart.draw_series(
                cols[j]
                    .1
                    .iter()
                    .zip(cols[i].1)
                    .filter(|(x, y)| !x.is_nan() && !y.is_nan())
                    .map(|(x, y)| Circle::new((*x, *y), 2, HISTOGRAM.filled())),
            )?;
        }
    }
    Ok(())
}
