// ============================================================
// Layer 6 — Learning-Curve Graph
// ============================================================
// Renders the training history as a two-panel PNG with plotters:
//
//   ┌──────────────┬────────────────┐
//   │  Loss Graph  │ Accuracy Graph │   red  = train
//   │  (per epoch) │   (per epoch)  │   blue = valid
//   └──────────────┴────────────────┘
//
// Each panel has a caption, mesh, axis labels and a legend.
// Non-finite points are skipped, breaking the line.

use anyhow::{anyhow, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

use crate::ml::trainer::{History, PhasePair};

pub const GRAPH_FILE: &str = "Graphs.png";

const PANEL_W: u32 = 500;
const PANEL_H: u32 = 400;

type Panel<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Write loss (left) and accuracy (right) curves to `dir/Graphs.png`.
pub fn save_history_graph(history: &History, dir: &Path) -> Result<()> {
    let path = dir.join(GRAPH_FILE);
    let root = BitMapBackend::new(&path, (PANEL_W * 2, PANEL_H)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| anyhow!("Cannot prepare graph '{}': {e}", path.display()))?;

    let panels = root.split_evenly((1, 2));
    draw_panel(&panels[0], "Loss Graph", "Loss", &history.loss)?;
    draw_panel(&panels[1], "Accuracy Graph", "Accuracy", &history.accuracy)?;

    root.present()
        .map_err(|e| anyhow!("Cannot write graph '{}': {e}", path.display()))?;
    tracing::info!("Saved learning curves to '{}'", path.display());
    Ok(())
}

// ─── Panel drawing ───────────────────────────────────────────────────────────

fn draw_panel(area: &Panel<'_>, title: &str, y_desc: &str, series: &[PhasePair]) -> Result<()> {
    let (lo, hi) = value_range(series).unwrap_or((0.0, 1.0));
    let last     = series.len().max(2) as f64;

    let mut chart = ChartBuilder::on(area)
        .margin(12)
        .caption(title, ("sans-serif", 22))
        .x_label_area_size(36)
        .y_label_area_size(52)
        .build_cartesian_2d(1f64..last, lo..hi)
        .map_err(|e| anyhow!("{title}: chart build error: {e}"))?;

    chart
        .configure_mesh()
        .x_desc("Epoch")
        .y_desc(y_desc)
        .draw()
        .map_err(|e| anyhow!("{title}: mesh error: {e}"))?;

    let train: Vec<f64> = series.iter().map(|p| p.train).collect();
    let valid: Vec<f64> = series.iter().map(|p| p.valid).collect();

    let mut labelled = false;
    for (name, values, color) in [("Train", &train, RED), ("Valid", &valid, BLUE)] {
        for (i, run) in finite_runs(values).into_iter().enumerate() {
            let drawn = chart
                .draw_series(LineSeries::new(run, &color))
                .map_err(|e| anyhow!("{title}: series error: {e}"))?;
            // one legend entry per phase
            if i == 0 {
                labelled = true;
                drawn
                    .label(name)
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            }
        }
    }

    if labelled {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(|e| anyhow!("{title}: legend error: {e}"))?;
    }
    Ok(())
}

/// Consecutive finite values as `(epoch, value)` points, epochs 1-indexed.
fn finite_runs(values: &[f64]) -> Vec<Vec<(f64, f64)>> {
    let mut runs    = Vec::new();
    let mut current = Vec::new();
    for (i, &v) in values.iter().enumerate() {
        if v.is_finite() {
            current.push(((i + 1) as f64, v));
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Finite min/max over both phases, padded so flat curves stay visible.
fn value_range(series: &[PhasePair]) -> Option<(f64, f64)> {
    let values = series.iter().flat_map(|p| [p.train, p.valid]).filter(|v| v.is_finite());
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo > hi {
        return None;
    }
    let pad = ((hi - lo) * 0.05).max(1e-6);
    Some((lo - pad, hi + pad))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn history() -> History {
        History {
            loss: vec![
                PhasePair { train: 2.0, valid: 2.2 },
                PhasePair { train: 1.0, valid: 1.4 },
                PhasePair { train: 0.5, valid: 1.1 },
            ],
            accuracy: vec![
                PhasePair { train: 0.3, valid: 0.25 },
                PhasePair { train: 0.6, valid: 0.5 },
                PhasePair { train: 0.8, valid: 0.6 },
            ],
        }
    }

    fn render(h: &History) -> RgbImage {
        let dir = tempfile::tempdir().unwrap();
        save_history_graph(h, dir.path()).unwrap();
        image::open(dir.path().join(GRAPH_FILE)).unwrap().to_rgb8()
    }

    fn count(img: &RgbImage, color: [u8; 3], x_range: std::ops::Range<u32>) -> usize {
        img.enumerate_pixels()
            .filter(|(x, _, p)| x_range.contains(x) && **p == Rgb(color))
            .count()
    }

    #[test]
    fn test_both_panels_have_both_curves() {
        let img = render(&history());
        assert_eq!(img.dimensions(), (PANEL_W * 2, PANEL_H));
        for panel in [0..PANEL_W, PANEL_W..PANEL_W * 2] {
            assert!(count(&img, [255, 0, 0], panel.clone()) > 0);
            assert!(count(&img, [0, 0, 255], panel) > 0);
        }
    }

    #[test]
    fn test_empty_history_still_writes_axes() {
        let img = render(&History::default());
        assert_eq!(img.dimensions(), (PANEL_W * 2, PANEL_H));
        assert!(count(&img, [0, 0, 0], 0..PANEL_W * 2) > 0);
    }

    #[test]
    fn test_single_epoch_and_nan_do_not_fail() {
        let h = History {
            loss:     vec![PhasePair { train: f64::NAN, valid: 1.0 }],
            accuracy: vec![PhasePair { train: 0.5, valid: 0.5 }],
        };
        let img = render(&h);
        assert_eq!(img.width(), PANEL_W * 2);
    }

    #[test]
    fn test_nan_breaks_the_line() {
        let runs = finite_runs(&[1.0, 2.0, f64::NAN, 3.0, f64::INFINITY]);
        assert_eq!(runs, vec![vec![(1.0, 1.0), (2.0, 2.0)], vec![(4.0, 3.0)]]);
        assert!(finite_runs(&[f64::NAN]).is_empty());
    }

    #[test]
    fn test_value_range_pads_and_skips_non_finite() {
        let series = [
            PhasePair { train: 1.0, valid: f64::NAN },
            PhasePair { train: 3.0, valid: 2.0 },
        ];
        let (lo, hi) = value_range(&series).unwrap();
        assert!(lo < 1.0 && lo > 0.8);
        assert!(hi > 3.0 && hi < 3.2);

        let flat = [PhasePair { train: 0.5, valid: 0.5 }];
        let (lo, hi) = value_range(&flat).unwrap();
        assert!(lo < hi);

        assert_eq!(value_range(&[]), None);
    }
}
