//! Chart adapter: renders a risk trend as an SVG line chart.
//!
//! One marker per record in series order, a fixed 0-1 score axis, and dashed
//! guides at the tier thresholds.

use std::path::{Path, PathBuf};

use plotters::prelude::*;
use plotters_svg::SVGBackend;

use crate::domain::{subject_ref, TrendSeries, HIGH_THRESHOLD, MODERATE_THRESHOLD};
use crate::ports::{RenderError, TrendRenderer};

const SIZE: (u32, u32) = (640, 420);
const GUIDE: RGBColor = RGBColor(153, 153, 153);

/// Writes `<dir>/<subject>_risk.svg`.
#[derive(Debug, Clone)]
pub struct SvgTrendRenderer {
    output_dir: PathBuf,
}

impl SvgTrendRenderer {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Chart file path for a subject.
    #[must_use]
    pub fn chart_path(&self, subject_id: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_risk.svg", safe_file_stem(subject_id)))
    }
}

impl TrendRenderer for SvgTrendRenderer {
    type Output = PathBuf;

    fn render(&self, subject_id: &str, series: &TrendSeries) -> Result<PathBuf, RenderError> {
        let svg = render_svg(subject_id, series)?;
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.chart_path(subject_id);
        std::fs::write(&path, svg)?;
        tracing::info!(
            subject_ref = %subject_ref(subject_id),
            points = series.len(),
            "Wrote trend chart"
        );
        Ok(path)
    }
}

/// Reduce a subject id to characters safe in a file name.
///
/// Ids that needed rewriting get their `subject_ref` appended, so two ids
/// that differ only in replaced characters never share a file.
#[must_use]
pub fn safe_file_stem(subject_id: &str) -> String {
    let stem: String = subject_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        format!("subject_{}", subject_ref(subject_id))
    } else if stem != subject_id {
        format!("{stem}_{}", subject_ref(subject_id))
    } else {
        stem
    }
}

fn draw_err<E: std::fmt::Display>(err: E) -> RenderError {
    RenderError::Draw(err.to_string())
}

/// Render the chart document.
///
/// # Errors
/// `RenderError::Invalid` if a score is not finite, `RenderError::Draw` if
/// plotting fails.
pub fn render_svg(subject_id: &str, series: &TrendSeries) -> Result<String, RenderError> {
    if let Some(bad) = series.points().iter().find(|p| !p.score.is_finite()) {
        return Err(RenderError::Invalid(format!(
            "non-finite score at {}",
            bad.label
        )));
    }

    let labels: Vec<&str> = series.points().iter().map(|p| p.label.as_str()).collect();
    let coords: Vec<(f64, f64)> = series
        .points()
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.score.clamp(0.0, 1.0)))
        .collect();
    let x_max = labels.len() as f64 - 0.5;
    let date_label = |x: &f64| {
        let i = x.round();
        if (x - i).abs() > 1e-6 || i < 0.0 {
            return String::new();
        }
        labels
            .get(i as usize)
            .map(|s| (*s).to_string())
            .unwrap_or_default()
    };

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("Autism Risk Progression ({subject_id})"),
                ("sans-serif", 18).into_font(),
            )
            .margin(10)
            .x_label_area_size(50)
            .y_label_area_size(50)
            .build_cartesian_2d(-0.5f64..x_max, 0f64..1f64)
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(labels.len())
            .x_label_formatter(&date_label)
            .y_labels(6)
            .x_desc("Date")
            .y_desc("Risk Score")
            .draw()
            .map_err(draw_err)?;

        for threshold in [MODERATE_THRESHOLD, HIGH_THRESHOLD] {
            chart
                .draw_series(DashedLineSeries::new(
                    vec![(-0.5, threshold), (x_max, threshold)],
                    6,
                    4,
                    GUIDE.stroke_width(1),
                ))
                .map_err(draw_err)?;
        }

        chart
            .draw_series(LineSeries::new(coords.clone(), BLUE.stroke_width(2)))
            .map_err(draw_err)?;
        chart
            .draw_series(coords.into_iter().map(|c| Circle::new(c, 4, BLUE.filled())))
            .map_err(draw_err)?;

        root.present().map_err(draw_err)?;
    }
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sanitize::SanitizingMakeWriter;
    use crate::domain::{parse_date, HistoryRecord, RiskScore};
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    fn series(points: &[(&str, f64)]) -> TrendSeries {
        let records: Vec<_> = points
            .iter()
            .enumerate()
            .map(|(i, (date, p))| HistoryRecord {
                id: i as i64 + 1,
                subject_id: "C001".into(),
                date: parse_date(date).expect("valid date"),
                score: RiskScore::new(*p).expect("valid score"),
            })
            .collect();
        TrendSeries::from_records(&records).expect("non-empty")
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0
                .lock()
                .map_err(|_| std::io::Error::other("poisoned"))?
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_svg_contains_every_point() {
        let svg = render_svg(
            "C001",
            &series(&[("2024-01-01", 0.2), ("2024-02-01", 0.5), ("2024-03-01", 0.8)]),
        )
        .expect("Should render");

        assert!(svg.contains("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<circle").count(), 3);
        assert!(svg.contains("Autism Risk Progression (C001)"));
        assert!(svg.contains("Risk Score"));
    }

    #[test]
    fn test_single_point_renders() {
        let svg = render_svg("C001", &series(&[("2024-01-01", 0.4)])).expect("Should render");
        assert_eq!(svg.matches("<circle").count(), 1);
    }

    #[test]
    fn test_subject_markup_not_injected() {
        let svg = render_svg("<b>&", &series(&[("2024-01-01", 0.4)])).expect("Should render");
        assert!(!svg.contains("<b>"));
    }

    #[test]
    fn test_safe_file_stem() {
        assert_eq!(safe_file_stem("C001"), "C001");
        assert_eq!(safe_file_stem("C-001_a"), "C-001_a");

        let escaped = safe_file_stem("../etc/passwd");
        assert!(escaped.starts_with("___etc_passwd_"));
        assert!(!escaped.contains('/'));

        assert!(safe_file_stem("").starts_with("subject_"));
    }

    #[test]
    fn test_rewritten_ids_do_not_collide() {
        assert_ne!(safe_file_stem("C 001"), safe_file_stem("C_001"));
        assert_ne!(safe_file_stem("C 001"), safe_file_stem("C.001"));
        assert_eq!(safe_file_stem("C_001"), "C_001");
    }

    #[test]
    fn test_render_writes_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let renderer = SvgTrendRenderer::new(temp.path().join("static"));

        let path = renderer
            .render("C001", &series(&[("2024-01-01", 0.4)]))
            .expect("Should render");
        assert_eq!(path, temp.path().join("static").join("C001_risk.svg"));
        assert!(path.exists());
    }

    #[test]
    fn test_render_log_omits_subject_id() {
        let temp = tempfile::tempdir().expect("tempdir");
        let renderer = SvgTrendRenderer::new(temp.path());
        let captured = CapturedLog::default();
        let sink = captured.clone();

        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(SanitizingMakeWriter::new(move || sink.clone()))
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            renderer
                .render("Jane_Doe", &series(&[("2024-01-01", 0.4)]))
                .expect("Should render");
        });

        let bytes = captured.0.lock().expect("lock").clone();
        let out = String::from_utf8(bytes).expect("utf8");
        assert!(out.contains("Wrote trend chart"));
        assert!(out.contains(&subject_ref("Jane_Doe")));
        assert!(!out.contains("Jane_Doe"));
    }
}
