use plotters::{
    coord::Shift,
    prelude::*,
    style::text_anchor::{HPos, VPos},
};

use super::{anchored, font, text_width, vertical, Colormap, COOLWARM, RDBU};
use crate::{CorrMatrix, Error, Significance};

const TITLE_SIZE: f64 = 16.0;
const LABEL_SIZE: f64 = 11.0;
const COLORBAR_STEPS: i32 = 64;

/// An annotated correlation heatmap.
#[derive(Debug, Clone)]
pub struct Heatmap<'a> {
    pub matrix: &'a CorrMatrix,
    pub title: &'a str,
    pub colormap: Colormap,
    pub colorbar_label: &'a str,
    /// Hide the cells above the diagonal.
    pub lower_triangle: bool,
    /// Mark the cells below the diagonal by their p-value.
    pub significance: Option<Significance>,
}

impl<'a> Heatmap<'a> {
    pub fn spearman(matrix: &'a CorrMatrix, title: &'a str, significance: Significance) -> Self {
        Self {
            matrix,
            title,
            colormap: RDBU,
            colorbar_label: "Spearman Correlation",
            lower_triangle: true,
            significance: Some(significance),
        }
    }

    pub fn pearson(matrix: &'a CorrMatrix, title: &'a str) -> Self {
        Self {
            matrix,
            title,
            colormap: COOLWARM,
            colorbar_label: "Pearson Correlation",
            lower_triangle: false,
            significance: None,
        }
    }

    fn is_shown(&self, i: usize, j: usize) -> bool {
        !self.lower_triangle || j <= i
    }

    pub fn draw<DB: DrawingBackend>(&self, area: &DrawingArea<DB, Shift>) -> Result<(), Error> {
        area.fill(&WHITE)?;
        let (w, h) = area.dim_in_pixel();
        let (w, h) = (w as i32, h as i32);
        let k = self.matrix.len();
        let names = self.matrix.names();
        let longest = names
            .iter()
            .map(|n| text_width(n, LABEL_SIZE))
            .max()
            .unwrap_or(0);

        let top = 40;
        let left = longest + 15;
        let bottom = longest + 15;
        let right = 110;
        area.draw(&Text::new(
            self.title.to_string(),
            (w / 2, 10),
            anchored(&font(TITLE_SIZE), HPos::Center, VPos::Top),
        ))?;
        if k == 0 {
            return Ok(());
        }
        let cell = ((w - left - right) / k as i32)
            .min((h - top - bottom) / k as i32)
            .max(1);
        let label = font(LABEL_SIZE);
        let annotation_size = (cell as f64 * 0.28).clamp(6.0, 14.0);

        for i in 0..k {
            let y0 = top + i as i32 * cell;
            for j in 0..k {
                if !self.is_shown(i, j) {
                    continue;
                }
                let x0 = left + j as i32 * cell;
                let r = self.matrix.coefficient(i, j);
                let color = self.colormap.scaled(r, -1.0, 1.0);
                area.draw(&Rectangle::new(
                    [(x0, y0), (x0 + cell, y0 + cell)],
                    color.filled(),
                ))?;
                if r.is_nan() {
                    continue;
                }
                let (cx, cy) = (x0 + cell / 2, y0 + cell / 2);
                let text_color = super::text_color(color);
                area.draw(&Text::new(
                    format!("{:.2}", r),
                    (cx, cy),
                    anchored(
                        &font(annotation_size).color(&text_color),
                        HPos::Center,
                        VPos::Center,
                    ),
                ))?;
                if j >= i {
                    continue;
                }
                let marker = self
                    .significance
                    .as_ref()
                    .and_then(|s| s.marker(self.matrix.p_value(i, j)));
                if let Some(marker) = marker {
                    area.draw(&Text::new(
                        marker,
                        (cx, cy + (cell as f64 * 0.12) as i32),
                        anchored(&font(annotation_size), HPos::Center, VPos::Top),
                    ))?;
                }
            }
            area.draw(&Text::new(
                names[i].clone(),
                (left - 5, y0 + cell / 2),
                anchored(&label, HPos::Right, VPos::Center),
            ))?;
        }
        let grid_bottom = top + k as i32 * cell;
        for (j, name) in names.iter().enumerate() {
            area.draw(&Text::new(
                name.clone(),
                (left + j as i32 * cell + cell / 2, grid_bottom + 5),
                anchored(&vertical(&label), HPos::Right, VPos::Center),
            ))?;
        }
        self.draw_colorbar(area, left + k as i32 * cell + 20, top, k as i32 * cell)
    }

    fn draw_colorbar<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        x: i32,
        top: i32,
        height: i32,
    ) -> Result<(), Error> {
        let width = 18;
        let step = height as f64 / COLORBAR_STEPS as f64;
        for s in 0..COLORBAR_STEPS {
            let y0 = top + (s as f64 * step).round() as i32;
            let y1 = top + ((s + 1) as f64 * step).round() as i32;
            let t = 1.0 - (s as f64 + 0.5) / COLORBAR_STEPS as f64;
            area.draw(&Rectangle::new(
                [(x, y0), (x + width, y1)],
                self.colormap.at(t).filled(),
            ))?;
        }
        area.draw(&Rectangle::new(
            [(x, top), (x + width, top + height)],
            BLACK.stroke_width(1),
        ))?;
        let label = font(LABEL_SIZE);
        for tick in [-1.0f64, -0.5, 0.0, 0.5, 1.0] {
            let y = top + ((1.0 - tick) / 2.0 * height as f64).round() as i32;
            area.draw(&PathElement::new(
                vec![(x + width, y), (x + width + 4, y)],
                BLACK.stroke_width(1),
            ))?;
            area.draw(&Text::new(
                format!("{:.1}", tick),
                (x + width + 7, y),
                anchored(&label, HPos::Left, VPos::Center),
            ))?;
        }
        area.draw(&Text::new(
            self.colorbar_label.to_string(),
            (x + width + 50, top + height / 2),
            anchored(&vertical(&label), HPos::Center, VPos::Center),
        ))?;
        Ok(())
    }
}

/// Draws the heatmaps one above the other.
pub fn draw_stacked<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    heatmaps: &[Heatmap<'_>],
) -> Result<(), Error> {
    area.fill(&WHITE)?;
    for (panel, heatmap) in area
        .split_evenly((heatmaps.len().max(1), 1))
        .iter()
        .zip(heatmaps)
    {
        heatmap.draw(panel)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::{correlation_matrix, Column, CorrelationKind, CorrelationMethod, DiagonalFill, Frame};

    fn matrix(method: CorrelationMethod) -> CorrMatrix {
        let f = Frame::new(vec![
            Column::float("a", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
            Column::float("b", vec![5.0, 4.0, 3.0, 2.0, 1.0]),
            Column::float("c", vec![2.0, 1.0, 4.0, 3.0, 5.0]),
        ])
        .unwrap();
        correlation_matrix(
            &f,
            CorrelationKind::Spearman,
            method,
            DiagonalFill::Zero,
        )
        .unwrap()
    }

    fn render(heatmap: &Heatmap<'_>) -> String {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (640, 480)).into_drawing_area();
            heatmap.draw(&root).unwrap();
            root.present().unwrap();
        }
        svg
    }

    #[test]
    fn test_lower_triangle_only() {
        let m = matrix(CorrelationMethod::Matrix);
        let svg = render(&Heatmap::spearman(
            &m,
            "Spearman Rho Correlation Matrix: Baseline",
            Significance::default(),
        ));
        assert!(svg.contains("Spearman Rho Correlation Matrix: Baseline"));
        assert!(svg.contains("Spearman Correlation"));
        // diagonal 1.00 three times and -1.00 once
        assert_eq!(svg.matches("1.00").count(), 4);
        assert_eq!(svg.matches("0.80").count(), 2);
    }

    #[test]
    fn test_significance_markers() {
        let m = matrix(CorrelationMethod::Matrix);
        let svg = render(&Heatmap::spearman(&m, "t", Significance::default()));
        // only the perfect negative correlation is significant
        assert_eq!(svg.matches("**").count(), 1);
    }

    #[test]
    fn test_full_matrix_without_markers() {
        let m = matrix(CorrelationMethod::Matrix);
        let svg = render(&Heatmap::pearson(&m, "Correlation Heatmap"));
        assert_eq!(svg.matches("1.00").count(), 5);
        assert_eq!(svg.matches("0.80").count(), 4);
        assert!(!svg.contains('*'));
        assert!(svg.contains("Pearson Correlation"));
    }

    #[test]
    fn test_pairwise_unit_diagonal() {
        let m = matrix(CorrelationMethod::Pairwise);
        let svg = render(&Heatmap::spearman(&m, "t", Significance::default()));
        // diagonal 1.00 three times and -1.00 once
        assert_eq!(svg.matches("1.00").count(), 4);
        assert!(!svg.contains("0.00"));
    }

    #[test]
    fn test_stacked() {
        let m = matrix(CorrelationMethod::Matrix);
        let significance = Significance::default();
        let maps = [
            Heatmap::spearman(&m, "Spearman Rho Correlation Matrix: Baseline", significance),
            Heatmap::spearman(&m, "Spearman Rho Correlation Matrix: After Education", significance),
        ];
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (640, 960)).into_drawing_area();
            draw_stacked(&root, &maps).unwrap();
            root.present().unwrap();
        }
        assert!(svg.contains("Matrix: Baseline"));
        assert!(svg.contains("Matrix: After Education"));
        assert_eq!(svg.matches("**").count(), 2);
    }
}
