use plotters::{
    coord::Shift,
    prelude::*,
    style::text_anchor::{HPos, VPos},
};

use super::{anchored, category_label, category_range, font, text_width, vertical, FONT};
use crate::{Error, PairedComparison, Significance};

const TITLE: &str = "Comparison of Quantitative Measures";
const X_LABEL: &str = "Quantitative Measures";
const Y_LABEL: &str = "Mean Scores";
const LABEL_SIZE: f64 = 12.0;
const BAR_WIDTH: f64 = 0.4;
const BAR_ALPHA: f64 = 0.6;
const CAP: f64 = 0.05;

const BASELINE_FILL: RGBColor = RGBColor(255, 255, 255);
const AFTER_FILL: RGBColor = RGBColor(128, 128, 128);
const GRID: RGBColor = RGBColor(0xdd, 0xdd, 0xdd);

fn top_of(mean: f64, sd: f64) -> f64 {
    if sd.is_nan() {
        mean
    } else {
        mean + sd
    }
}

/// Grouped baseline/after bars with ±1 SD error bars. Significant pairs get a bracket joining
/// their error-bar tops and a `*` above the higher one.
#[tracing::instrument(skip(area, comparisons))]
pub fn draw_comparison_bars<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    comparisons: &[PairedComparison],
    significance: &Significance,
) -> Result<(), Error> {
    area.fill(&WHITE)?;
    let highest = comparisons
        .iter()
        .flat_map(|c| {
            [
                top_of(c.baseline_mean, c.baseline_sd),
                top_of(c.after_mean, c.after_sd),
            ]
        })
        .filter(|x| x.is_finite())
        .fold(0.0f64, f64::max);
    let lowest = comparisons
        .iter()
        .flat_map(|c| {
            [
                c.baseline_mean - c.baseline_sd,
                c.after_mean - c.after_sd,
            ]
        })
        .filter(|x| x.is_finite())
        .fold(0.0f64, f64::min);
    let span = (highest - lowest).max(1.0);
    let (y_lo, y_hi) = (lowest, highest + 0.15 * span);
    let offset = 0.03 * (y_hi - y_lo);

    let labels = comparisons
        .iter()
        .map(|c| c.label.as_str())
        .collect::<Vec<_>>();
    let longest = labels
        .iter()
        .map(|l| text_width(l, LABEL_SIZE))
        .max()
        .unwrap_or(0);
    let mut chart = ChartBuilder::on(area)
        .caption(TITLE, (FONT, 20))
        .margin(15)
        .x_label_area_size(longest + 40)
        .y_label_area_size(60)
        .build_cartesian_2d(category_range(comparisons.len()), y_lo..y_hi)?;
    let x_formatter = |x: &f64| category_label(&labels, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .bold_line_style(GRID.stroke_width(1))
        .light_line_style(WHITE.stroke_width(0))
        .x_labels(comparisons.len().max(1))
        .x_label_formatter(&x_formatter)
        .x_label_style(vertical(&font(LABEL_SIZE)))
        .y_label_style(font(LABEL_SIZE))
        .axis_desc_style(font(14.0))
        .x_desc(X_LABEL)
        .y_desc(Y_LABEL)
        .draw()?;

    // (offset of the bar from the group centre, mean, sd) per phase
    let phases = [
        (
            "Baseline",
            BASELINE_FILL,
            -BAR_WIDTH,
            comparisons
                .iter()
                .map(|c| (c.baseline_mean, c.baseline_sd))
                .collect::<Vec<_>>(),
        ),
        (
            "After Education",
            AFTER_FILL,
            0.0,
            comparisons
                .iter()
                .map(|c| (c.after_mean, c.after_sd))
                .collect::<Vec<_>>(),
        ),
    ];
    for (name, fill, shift, values) in &phases {
        let bars = values
            .iter()
            .enumerate()
            .filter(|(_, (mean, _))| !mean.is_nan())
            .map(|(i, (mean, _))| {
                let x0 = i as f64 + shift;
                [(x0, 0.0), (x0 + BAR_WIDTH, *mean)]
            })
            .collect::<Vec<_>>();
        let fill = *fill;
        chart
            .draw_series(
                bars.iter()
                    .map(|corners| Rectangle::new(*corners, fill.mix(BAR_ALPHA).filled())),
            )?
            .label(*name)
            .legend(move |(x, y)| {
                EmptyElement::at((x, y))
                    + Rectangle::new([(0, -6), (16, 6)], fill.mix(BAR_ALPHA).filled())
                    + Rectangle::new([(0, -6), (16, 6)], BLACK.stroke_width(1))
            });
        chart.draw_series(
            bars.iter()
                .map(|corners| Rectangle::new(*corners, BLACK.stroke_width(1))),
        )?;
        chart.draw_series(
            values
                .iter()
                .enumerate()
                .filter(|(_, (mean, sd))| !mean.is_nan() && !sd.is_nan())
                .flat_map(|(i, (mean, sd))| {
                    let x = i as f64 + shift + BAR_WIDTH / 2.0;
                    let (lo, hi) = (mean - sd, mean + sd);
                    [
                        vec![(x, lo), (x, hi)],
                        vec![(x - CAP, lo), (x + CAP, lo)],
                        vec![(x - CAP, hi), (x + CAP, hi)],
                    ]
                })
                .map(|points| PathElement::new(points, BLACK.stroke_width(1))),
        )?;
    }

    for (i, c) in comparisons.iter().enumerate() {
        if !significance.is_significant(c.p_value()) {
            continue;
        }
        let top_b = top_of(c.baseline_mean, c.baseline_sd);
        let top_a = top_of(c.after_mean, c.after_sd);
        let annotation = top_b.max(top_a) + offset;
        let x = i as f64;
        let (xb, xa) = (x - BAR_WIDTH / 2.0, x + BAR_WIDTH / 2.0);
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(xb, top_b), (xb, annotation), (xa, annotation), (xa, top_a)],
            BLACK.stroke_width(1),
        )))?;
        chart.draw_series(std::iter::once(Text::new(
            "*",
            (x, annotation),
            anchored(&font(16.0), HPos::Center, VPos::Bottom),
        )))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .label_font(font(LABEL_SIZE))
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}
