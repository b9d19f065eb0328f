//! Chart models built from a [`Breakdown`] and their PNG rendering.
//!
//! Rendering goes through the plotters bitmap backend into a scoped
//! temporary file whose bytes are read back, so callers only ever handle
//! in-memory PNG data. A chart without data renders a plain placeholder
//! image.

use std::path::Path;

use log::debug;
use plotters::prelude::*;

use crate::{
    breakdown::{Breakdown, Pivot, YearMonth},
    error::{Error, Result},
};

pub const CHART_WIDTH: u32 = 900;
pub const CHART_HEIGHT: u32 = 540;

type DrawResult<T = ()> = std::result::Result<T, Box<dyn std::error::Error>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    DailyRevenue,
    TopProducts,
    ProductShare,
    DistributorRevenue,
    ProductDistributorHeatmap,
    MonthlyRevenue,
    MarginDistribution,
    RevenueForecast,
}

impl ChartKind {
    pub fn title(self) -> &'static str {
        match self {
            ChartKind::DailyRevenue => "Daily revenue",
            ChartKind::TopProducts => "Top 10 products by revenue",
            ChartKind::ProductShare => "Revenue share by product",
            ChartKind::DistributorRevenue => "Revenue by distributor",
            ChartKind::ProductDistributorHeatmap => "Revenue by product and distributor",
            ChartKind::MonthlyRevenue => "Monthly revenue",
            ChartKind::MarginDistribution => "Margin distribution by product",
            ChartKind::RevenueForecast => "Revenue forecast",
        }
    }

    pub fn file_stem(self) -> &'static str {
        match self {
            ChartKind::DailyRevenue => "daily_revenue",
            ChartKind::TopProducts => "top_products",
            ChartKind::ProductShare => "product_share",
            ChartKind::DistributorRevenue => "distributor_revenue",
            ChartKind::ProductDistributorHeatmap => "product_distributor_heatmap",
            ChartKind::MonthlyRevenue => "monthly_revenue",
            ChartKind::MarginDistribution => "margin_distribution",
            ChartKind::RevenueForecast => "revenue_forecast",
        }
    }
}

/// Five-number summary of one box in a box plot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxStats {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl BoxStats {
    /// Quartiles by linear interpolation between closest ranks. `None` for
    /// an empty slice.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let quantile = |q: f64| {
            let position = q * (sorted.len() - 1) as f64;
            let lower = position.floor() as usize;
            let upper = position.ceil() as usize;
            let weight = position - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        };
        Some(Self {
            min: sorted[0],
            q1: quantile(0.25),
            median: quantile(0.5),
            q3: quantile(0.75),
            max: sorted[sorted.len() - 1],
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartBody {
    Line(Vec<(String, f64)>),
    Bars(Vec<(String, f64)>),
    Pie(Vec<(String, f64)>),
    Heatmap(Pivot),
    BoxPlot(Vec<(String, BoxStats)>),
}

impl ChartBody {
    pub fn is_empty(&self) -> bool {
        match self {
            ChartBody::Line(points) | ChartBody::Bars(points) => points.is_empty(),
            ChartBody::Pie(slices) => pie_fractions(slices).is_empty(),
            ChartBody::Heatmap(pivot) => pivot.is_empty(),
            ChartBody::BoxPlot(groups) => groups.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub kind: ChartKind,
    pub body: ChartBody,
}

/// A rendered chart, ready to be written out or embedded in a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartImage {
    pub kind: ChartKind,
    pub png: Vec<u8>,
}

impl ChartImage {
    pub fn file_name(&self) -> String {
        format!("{}.png", self.kind.file_stem())
    }
}

/// Chart models in report order. The forecast chart is only present when a
/// forecast was produced.
pub fn build_charts(breakdown: &Breakdown, forecast: Option<&[(YearMonth, f64)]>) -> Vec<Chart> {
    let labelled_months = |series: &[(YearMonth, f64)]| {
        series
            .iter()
            .map(|(month, value)| (month.to_string(), *value))
            .collect::<Vec<_>>()
    };
    let mut charts = vec![
        Chart {
            kind: ChartKind::DailyRevenue,
            body: ChartBody::Line(
                breakdown
                    .daily
                    .iter()
                    .map(|(day, value)| (day.format("%Y-%m-%d").to_string(), *value))
                    .collect(),
            ),
        },
        Chart {
            kind: ChartKind::TopProducts,
            body: ChartBody::Bars(breakdown.top_products.clone()),
        },
        Chart {
            kind: ChartKind::ProductShare,
            body: ChartBody::Pie(breakdown.by_product.clone()),
        },
        Chart {
            kind: ChartKind::DistributorRevenue,
            body: ChartBody::Bars(breakdown.by_distributor.clone()),
        },
        Chart {
            kind: ChartKind::ProductDistributorHeatmap,
            body: ChartBody::Heatmap(breakdown.pivot.clone()),
        },
        Chart {
            kind: ChartKind::MonthlyRevenue,
            body: ChartBody::Bars(labelled_months(&breakdown.monthly)),
        },
        Chart {
            kind: ChartKind::MarginDistribution,
            body: ChartBody::BoxPlot(
                breakdown
                    .margins_by_product
                    .iter()
                    .filter_map(|(name, margins)| {
                        BoxStats::from_values(margins).map(|stats| (name.clone(), stats))
                    })
                    .collect(),
            ),
        },
    ];
    if let Some(forecast) = forecast {
        charts.push(Chart {
            kind: ChartKind::RevenueForecast,
            body: ChartBody::Bars(labelled_months(forecast)),
        });
    }
    charts
}

/// Share of each positive slice in the total; non-positive values cannot be
/// drawn as pie slices and are left out.
pub fn pie_fractions(slices: &[(String, f64)]) -> Vec<(&str, f64)> {
    let total: f64 = slices.iter().map(|(_, v)| v.max(0.0)).sum();
    if total <= 0.0 {
        return Vec::new();
    }
    slices
        .iter()
        .filter(|(_, value)| *value > 0.0)
        .map(|(name, value)| (name.as_str(), value / total))
        .collect()
}

pub fn render_all(charts: &[Chart]) -> Result<Vec<ChartImage>> {
    charts
        .iter()
        .map(|chart| {
            render_png(chart).map(|png| ChartImage {
                kind: chart.kind,
                png,
            })
        })
        .collect()
}

pub fn render_png(chart: &Chart) -> Result<Vec<u8>> {
    if chart.body.is_empty() {
        debug!("No data for '{}'; rendering placeholder", chart.kind.title());
        return render_placeholder();
    }
    render_with(chart.kind.title(), |path| draw_chart(path, chart))
}

/// Neutral image used when a chart has nothing to show.
pub fn render_placeholder() -> Result<Vec<u8>> {
    render_with("placeholder", draw_placeholder)
}

fn render_with<F>(name: &str, draw: F) -> Result<Vec<u8>>
where
    F: FnOnce(&Path) -> DrawResult,
{
    let file = tempfile::Builder::new()
        .prefix("sales-report-chart-")
        .suffix(".png")
        .tempfile()?;
    draw(file.path()).map_err(|err| Error::chart(name, err))?;
    let bytes = std::fs::read(file.path())?;
    Ok(bytes)
}

fn draw_placeholder(path: &Path) -> DrawResult {
    let root = BitMapBackend::new(path, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;
    let (w, h) = (CHART_WIDTH as i32, CHART_HEIGHT as i32);
    let frame = RGBColor(200, 200, 200);
    root.draw(&Rectangle::new([(20, 20), (w - 20, h - 20)], frame.stroke_width(2)))?;
    root.draw(&PathElement::new(vec![(20, 20), (w - 20, h - 20)], frame))?;
    root.draw(&PathElement::new(vec![(w - 20, 20), (20, h - 20)], frame))?;
    root.present()?;
    Ok(())
}

fn draw_chart(path: &Path, chart: &Chart) -> DrawResult {
    let root = BitMapBackend::new(path, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;
    let title = chart.kind.title();
    match &chart.body {
        ChartBody::Line(points) => draw_line(&root, title, points)?,
        ChartBody::Bars(bars) => draw_bars(&root, title, bars)?,
        ChartBody::Pie(slices) => draw_pie(&root, title, slices)?,
        ChartBody::Heatmap(pivot) => draw_heatmap(&root, title, pivot)?,
        ChartBody::BoxPlot(groups) => draw_boxplot(&root, title, groups)?,
    }
    root.present()?;
    Ok(())
}

type Area<'a> = DrawingArea<BitMapBackend<'a>, plotters::coord::Shift>;

fn label_at(labels: &[&str], x: f64) -> String {
    let idx = x.round();
    if (x - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).map(|s| s.to_string()).unwrap_or_default()
}

fn value_range(values: impl Iterator<Item = f64>) -> std::ops::Range<f64> {
    let (min, max) = values.fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if (max - min).abs() < f64::EPSILON {
        return min..min + 1.0;
    }
    let pad = (max - min) * 0.08;
    (if min < 0.0 { min - pad } else { 0.0 })..max + pad
}

fn draw_line(root: &Area<'_>, title: &str, points: &[(String, f64)]) -> DrawResult {
    let labels = points.iter().map(|(l, _)| l.as_str()).collect::<Vec<_>>();
    let last = (points.len().max(2) - 1) as f64;
    let formatter = |x: &f64| label_at(&labels, *x);
    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..last, value_range(points.iter().map(|(_, v)| *v)))?;
    chart
        .configure_mesh()
        .x_labels(labels.len().min(8))
        .x_label_formatter(&formatter)
        .y_desc("Revenue")
        .draw()?;
    chart.draw_series(LineSeries::new(
        points.iter().enumerate().map(|(i, (_, v))| (i as f64, *v)),
        BLUE.stroke_width(2),
    ))?;
    chart.draw_series(
        points
            .iter()
            .enumerate()
            .map(|(i, (_, v))| Circle::new((i as f64, *v), 3, BLUE.filled())),
    )?;
    Ok(())
}

fn draw_bars(root: &Area<'_>, title: &str, bars: &[(String, f64)]) -> DrawResult {
    let labels = bars.iter().map(|(l, _)| l.as_str()).collect::<Vec<_>>();
    let formatter = |x: &f64| label_at(&labels, *x);
    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(
            -0.5..(bars.len() as f64 - 0.5),
            value_range(bars.iter().map(|(_, v)| *v)),
        )?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len())
        .x_label_formatter(&formatter)
        .y_desc("Revenue")
        .draw()?;
    chart.draw_series(bars.iter().enumerate().map(|(i, (_, v))| {
        let x = i as f64;
        Rectangle::new([(x - 0.35, 0.0), (x + 0.35, *v)], Palette99::pick(i).filled())
    }))?;
    Ok(())
}

fn draw_pie(root: &Area<'_>, title: &str, slices: &[(String, f64)]) -> DrawResult {
    let area = root.titled(title, ("sans-serif", 24))?;
    let (width, height) = area.dim_in_pixel();
    let radius = (height.min(width / 2) as f64 * 0.42).max(10.0);
    let center = (width as f64 * 0.32, height as f64 * 0.5);
    let mut angle = -std::f64::consts::FRAC_PI_2;
    for (idx, (name, fraction)) in pie_fractions(slices).into_iter().enumerate() {
        let sweep = fraction * std::f64::consts::TAU;
        let steps = ((sweep / 0.02).ceil() as usize).max(2);
        let mut outline = vec![(center.0 as i32, center.1 as i32)];
        outline.extend((0..=steps).map(|step| {
            let a = angle + sweep * step as f64 / steps as f64;
            (
                (center.0 + radius * a.cos()) as i32,
                (center.1 + radius * a.sin()) as i32,
            )
        }));
        area.draw(&Polygon::new(outline, Palette99::pick(idx).filled()))?;
        angle += sweep;

        let y = 30 + idx as i32 * 24;
        let x = (width as f64 * 0.66) as i32;
        if y + 20 < height as i32 {
            area.draw(&Rectangle::new(
                [(x, y), (x + 14, y + 14)],
                Palette99::pick(idx).filled(),
            ))?;
            area.draw(&Text::new(
                format!("{name} ({:.1}%)", fraction * 100.0),
                (x + 22, y),
                ("sans-serif", 15).into_font(),
            ))?;
        }
    }
    Ok(())
}

fn draw_heatmap(root: &Area<'_>, title: &str, pivot: &Pivot) -> DrawResult {
    let products = pivot.products.iter().map(String::as_str).collect::<Vec<_>>();
    let distributors = pivot.distributors.iter().map(String::as_str).collect::<Vec<_>>();
    let x_formatter = |x: &f64| label_at(&distributors, *x - 0.5);
    let y_formatter = |y: &f64| label_at(&products, *y - 0.5);
    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(120)
        .build_cartesian_2d(0.0..distributors.len() as f64, 0.0..products.len() as f64)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(distributors.len() * 2 + 1)
        .y_labels(products.len() * 2 + 1)
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter)
        .draw()?;
    let max = pivot.max_value();
    chart.draw_series(pivot.values.iter().enumerate().flat_map(|(p, row)| {
        row.iter().enumerate().map(move |(d, value)| {
            let intensity = if max > 0.0 { (value.max(0.0) / max).min(1.0) } else { 0.0 };
            let shade = (235.0 - 200.0 * intensity) as u8;
            Rectangle::new(
                [(d as f64, p as f64), (d as f64 + 1.0, p as f64 + 1.0)],
                RGBColor(shade, shade, 255).filled(),
            )
        })
    }))?;
    Ok(())
}

fn draw_boxplot(root: &Area<'_>, title: &str, groups: &[(String, BoxStats)]) -> DrawResult {
    let labels = groups.iter().map(|(l, _)| l.as_str()).collect::<Vec<_>>();
    let formatter = |x: &f64| label_at(&labels, *x);
    let range = value_range(
        groups
            .iter()
            .flat_map(|(_, stats)| [stats.min, stats.max]),
    );
    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5..(groups.len() as f64 - 0.5), range)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(groups.len())
        .x_label_formatter(&formatter)
        .y_desc("Margin")
        .draw()?;
    chart.draw_series(groups.iter().enumerate().map(|(i, (_, s))| {
        let x = i as f64;
        PathElement::new(vec![(x, s.min), (x, s.max)], BLACK)
    }))?;
    chart.draw_series(groups.iter().enumerate().map(|(i, (_, s))| {
        let x = i as f64;
        Rectangle::new([(x - 0.3, s.q1), (x + 0.3, s.q3)], Palette99::pick(i).filled())
    }))?;
    chart.draw_series(groups.iter().enumerate().map(|(i, (_, s))| {
        let x = i as f64;
        PathElement::new(vec![(x - 0.3, s.median), (x + 0.3, s.median)], BLACK.stroke_width(2))
    }))?;
    Ok(())
}
