use std::path::Path;

use anyhow::{Context, Result};
use plotters::coord::combinators::WithKeyPoints;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::color::{ColorScale, subunit_color};
use crate::data::model::{RiboTable, Subunit};
use crate::stats::{ConditionSummary, OutlierGenes};

/// Title and axis descriptions of a chart.
#[derive(Debug, Clone, Copy)]
pub struct ChartText<'a> {
    pub title: &'a str,
    pub x_desc: &'a str,
    pub y_desc: &'a str,
}

/// One box of a box plot.
#[derive(Debug, Clone)]
pub struct BoxGroup {
    pub label: String,
    pub values: Vec<f64>,
    pub color: RGBColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeatmapScale {
    Sequential,
    Diverging,
}

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Category `i` sits at `i`, each one cell wide, with a tick per category.
fn category_axis(n: usize) -> WithKeyPoints<RangedCoordf64> {
    (-0.5..n as f64 - 0.5).with_key_points((0..n).map(|i| i as f64).collect())
}

fn category_label(v: f64, labels: &[String]) -> String {
    let i = v.round();
    if i < 0.0 || (v - i).abs() > 1e-6 {
        return String::new();
    }
    labels.get(i as usize).cloned().unwrap_or_default()
}

/// Vertical category names below the x axis, each starting at its tick.
///
/// The mesh anchors x labels at their centre, which pushes half of a
/// rotated label into the plot, so these are drawn on the root area.
fn draw_rotated_labels(root: &Area, ticks: &[(i32, i32)], labels: &[String]) -> Result<()> {
    let style = TextStyle::from(
        ("sans-serif", 12)
            .into_font()
            .transform(FontTransform::Rotate90),
    )
    .pos(Pos::new(HPos::Left, VPos::Center));
    for (&(x, y), label) in ticks.iter().zip(labels) {
        root.draw(&Text::new(label.as_str(), (x, y + 8), style.clone()))?;
    }
    Ok(())
}

fn finite_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

// ---------------------------------------------------------------------------
// Heatmap: genes × conditions
// ---------------------------------------------------------------------------

/// Render a gene × condition heatmap with a colour bar.  The first gene is
/// drawn on the top row.
pub fn heatmap(path: &Path, table: &RiboTable, scale: HeatmapScale, text: ChartText) -> Result<()> {
    let Some((lo, hi)) = finite_range(
        table
            .genes
            .iter()
            .flat_map(|g| g.concentrations.iter().filter_map(|c| *c)),
    ) else {
        log::warn!("No values to draw; skipping {}", path.display());
        return Ok(());
    };
    let scale = match scale {
        HeatmapScale::Sequential => ColorScale::blues(lo, hi),
        HeatmapScale::Diverging => ColorScale::coolwarm(lo, hi),
    };

    let n_cols = table.conditions.len();
    let n_rows = table.len();
    let row_labels: Vec<String> = table.genes.iter().rev().map(|g| g.gene.clone()).collect();

    let width = (420 + 24 * n_cols as u32).max(800);
    let height = (360 + 18 * n_rows as u32).max(600);
    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;
    let (main, legend) = root.split_horizontally((width - 130) as i32);

    let mut chart = ChartBuilder::on(&main)
        .margin(20)
        .caption(text.title, ("sans-serif", 26))
        .x_label_area_size(240)
        .y_label_area_size(90)
        .build_cartesian_2d(category_axis(n_cols), category_axis(n_rows))?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n_cols)
        .y_labels(n_rows)
        .x_label_formatter(&|_| String::new())
        .y_label_formatter(&|v| category_label(*v, &row_labels))
        .x_desc(text.x_desc)
        .y_desc(text.y_desc)
        .draw()?;

    let scale_ref = &scale;
    chart.draw_series(table.genes.iter().enumerate().flat_map(|(r, g)| {
        let y = (n_rows - 1 - r) as f64;
        g.concentrations.iter().enumerate().map(move |(c, v)| {
            let x = c as f64;
            Rectangle::new(
                [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
                scale_ref.color_for(*v).filled(),
            )
        })
    }))?;

    let ticks: Vec<(i32, i32)> = (0..n_cols)
        .map(|c| chart.backend_coord(&(c as f64, -0.5)))
        .collect();
    draw_rotated_labels(&root, &ticks, &table.conditions)?;
    color_bar(&legend, &scale, lo, hi)?;

    root.present()
        .with_context(|| format!("writing {}", path.display()))?;
    log::info!("Heatmap saved: {}", path.display());
    Ok(())
}

fn color_bar(area: &Area, scale: &ColorScale, lo: f64, hi: f64) -> Result<()> {
    let hi = if hi > lo { hi } else { lo + 1.0 };
    let mut bar = ChartBuilder::on(area)
        .margin_top(80)
        .margin_bottom(200)
        .margin_right(10)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..1.0, lo..hi)?;
    bar.configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_labels(6)
        .y_label_formatter(&|v| format!("{v:.0}"))
        .draw()?;

    let steps = 100;
    let step = (hi - lo) / steps as f64;
    bar.draw_series((0..steps).map(|i| {
        let y0 = lo + i as f64 * step;
        Rectangle::new(
            [(0.0, y0), (1.0, y0 + step)],
            scale.color_for(Some(y0 + step / 2.0)).filled(),
        )
    }))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Box plot
// ---------------------------------------------------------------------------

/// One vertical box per group (Tukey whiskers).  Empty groups leave a gap.
pub fn boxplot(path: &Path, groups: &[BoxGroup], text: ChartText) -> Result<()> {
    let Some((lo, hi)) = finite_range(groups.iter().flat_map(|g| g.values.iter().copied())) else {
        log::warn!("No values to draw; skipping {}", path.display());
        return Ok(());
    };
    let pad = ((hi - lo) * 0.05).max(f64::EPSILON);
    let (y_lo, y_hi) = ((lo - pad) as f32, (hi + pad) as f32);
    let labels: Vec<String> = groups.iter().map(|g| g.label.clone()).collect();
    let n = groups.len();

    let width = (200 + 70 * n as u32).max(800);
    let root = BitMapBackend::new(path, (width, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(text.title, ("sans-serif", 22))
        .x_label_area_size(200)
        .y_label_area_size(90)
        .build_cartesian_2d(category_axis(n), y_lo..y_hi)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|_| String::new())
        .x_desc(text.x_desc)
        .y_desc(text.y_desc)
        .draw()?;

    chart.draw_series(
        groups
            .iter()
            .enumerate()
            .filter(|(_, g)| !g.values.is_empty())
            .map(|(i, g)| {
                let quartiles = Quartiles::new(&g.values);
                Boxplot::new_vertical(i as f64, &quartiles)
                    .width(30)
                    .whisker_width(0.5)
                    .style(g.color.stroke_width(2))
            }),
    )?;

    let ticks: Vec<(i32, i32)> = (0..n)
        .map(|i| chart.backend_coord(&(i as f64, y_lo)))
        .collect();
    draw_rotated_labels(&root, &ticks, &labels)?;

    root.present()
        .with_context(|| format!("writing {}", path.display()))?;
    log::info!("Box plot saved: {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Bar charts
// ---------------------------------------------------------------------------

/// Horizontal bar per condition with its 30S/50S ratio and a reference
/// line at the stoichiometric ratio of 1.
pub fn ratio_bars(path: &Path, summaries: &[ConditionSummary], text: ChartText) -> Result<()> {
    let Some((_, hi)) = finite_range(summaries.iter().filter_map(|s| s.ratio)) else {
        log::warn!("No ratios to draw; skipping {}", path.display());
        return Ok(());
    };
    let n = summaries.len();
    let labels: Vec<String> = summaries.iter().rev().map(|s| s.condition.clone()).collect();
    let x_max = hi.max(1.0) * 1.1;

    let height = (200 + 22 * n as u32).max(600);
    let root = BitMapBackend::new(path, (700, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(text.title, ("sans-serif", 22))
        .x_label_area_size(50)
        .y_label_area_size(180)
        .build_cartesian_2d(0.0..x_max, category_axis(n))?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(n)
        .y_label_formatter(&|v| category_label(*v, &labels))
        .x_desc(text.x_desc)
        .y_desc(text.y_desc)
        .draw()?;

    let bar_color = RGBColor(173, 216, 230);
    chart.draw_series(summaries.iter().enumerate().filter_map(|(i, s)| {
        let ratio = s.ratio.filter(|r| r.is_finite())?;
        let y = (n - 1 - i) as f64;
        Some(Rectangle::new(
            [(0.0, y - 0.4), (ratio, y + 0.4)],
            bar_color.filled(),
        ))
    }))?;

    chart.draw_series(LineSeries::new(
        vec![(1.0, -0.5), (1.0, n as f64 - 0.5)],
        RED.stroke_width(2),
    ))?;

    root.present()
        .with_context(|| format!("writing {}", path.display()))?;
    log::info!("Ratio bars saved: {}", path.display());
    Ok(())
}

/// Vertical bar per outlier gene: number of flagged conditions it deviates in.
pub fn outlier_bars(path: &Path, outliers: &OutlierGenes, text: ChartText) -> Result<()> {
    if outliers.is_empty() {
        log::warn!("No outlier genes; skipping {}", path.display());
        return Ok(());
    }
    let labels: Vec<String> = outliers.0.iter().map(|o| o.gene.clone()).collect();
    let n = labels.len();
    let y_max = outliers.0.iter().map(|o| o.conditions).max().unwrap_or(0) as f64 + 1.0;

    let width = (200 + 40 * n as u32).max(600);
    let root = BitMapBackend::new(path, (width, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(text.title, ("sans-serif", 18))
        .x_label_area_size(110)
        .y_label_area_size(60)
        .build_cartesian_2d(category_axis(n), 0.0..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|_| String::new())
        .y_label_formatter(&|v| format!("{v:.0}"))
        .x_desc(text.x_desc)
        .y_desc(text.y_desc)
        .draw()?;

    let color = subunit_color(Subunit::ThirtyS);
    chart.draw_series(outliers.0.iter().enumerate().map(|(i, o)| {
        let x = i as f64;
        Rectangle::new(
            [(x - 0.4, 0.0), (x + 0.4, o.conditions as f64)],
            color.filled(),
        )
    }))?;

    let ticks: Vec<(i32, i32)> = (0..n)
        .map(|i| chart.backend_coord(&(i as f64, 0.0)))
        .collect();
    draw_rotated_labels(&root, &ticks, &labels)?;

    root.present()
        .with_context(|| format!("writing {}", path.display()))?;
    log::info!("Outlier bars saved: {}", path.display());
    Ok(())
}
