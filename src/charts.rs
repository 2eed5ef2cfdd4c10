use plotters::coord::Shift;
use plotters::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::allocator::Allocation;
use crate::error::{Result, SplitError};

const SERIES_COLORS: [RGBColor; 3] = [BLUE, RED, GREEN];

/// One named series of a grouped bar chart, one value per category
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub name: String,
    pub values: Vec<f64>,
}

/// Chart description handed to a renderer
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedBarChart {
    pub title: String,
    pub categories: Vec<String>,
    pub series: Vec<ChartSeries>,
}

impl GroupedBarChart {
    /// Standard split %, optimized split % and slot count for every channel
    pub fn from_allocation(allocation: &Allocation) -> Self {
        let channels = &allocation.channels;
        Self {
            title: format!("Channel split optimization: optimization by {}", allocation.optimization_goal),
            categories: channels.iter().map(|c| c.channel.clone()).collect(),
            series: vec![
                ChartSeries {
                    name: "Standard split".to_string(),
                    values: channels.iter().map(|c| c.baseline_share_pct).collect(),
                },
                ChartSeries {
                    name: "Optimized split".to_string(),
                    values: channels.iter().map(|c| c.allocated_share_pct).collect(),
                },
                ChartSeries {
                    name: "Slot count".to_string(),
                    values: channels.iter().map(|c| c.allocated_slots as f64).collect(),
                },
            ],
        }
    }

    /// Largest value over all series, 0.0 for an empty chart
    pub fn max_value(&self) -> f64 {
        self.series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .fold(0.0, f64::max)
    }
}

/// Anything that can draw a grouped bar chart
pub trait ChartRenderer {
    fn render(&self, chart: &GroupedBarChart) -> Result<()>;
}

/// Renders with plotters into a PNG, or an SVG when the path ends in `.svg`
pub struct PlottersRenderer {
    path: PathBuf,
    size: (u32, u32),
}

impl PlottersRenderer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            size: (1200, 600),
        }
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_svg(&self) -> bool {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("svg"))
            .unwrap_or(false)
    }
}

impl ChartRenderer for PlottersRenderer {
    fn render(&self, chart: &GroupedBarChart) -> Result<()> {
        if chart.categories.is_empty() {
            return Err(SplitError::Chart("nothing to draw: no categories".to_string()));
        }
        if let Some(series) = chart.series.iter().find(|s| s.values.len() != chart.categories.len()) {
            return Err(SplitError::Chart(format!(
                "series '{}' has {} values for {} categories",
                series.name,
                series.values.len(),
                chart.categories.len()
            )));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let drawn = if self.is_svg() {
            let root = SVGBackend::new(&self.path, self.size).into_drawing_area();
            draw_grouped_bars(&root, chart)
        } else {
            let root = BitMapBackend::new(&self.path, self.size).into_drawing_area();
            draw_grouped_bars(&root, chart)
        };
        drawn.map_err(|e| SplitError::Chart(e.to_string()))?;

        info!(path = %self.path.display(), "chart saved");
        Ok(())
    }
}

/// Category name for an x position; bars of a category are centered on its index
fn category_label(categories: &[String], x: f64) -> String {
    let index = x.round();
    if (x - index).abs() > 1e-6 || index < 0.0 {
        return String::new();
    }
    categories.get(index as usize).cloned().unwrap_or_default()
}

/// Draw the bars of every series side by side within each category
fn draw_grouped_bars<DB>(root: &DrawingArea<DB, Shift>, chart: &GroupedBarChart) -> std::result::Result<(), Box<dyn std::error::Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let category_count = chart.categories.len();
    let max_value = chart.max_value();
    let y_top = if max_value > 0.0 { max_value * 1.1 } else { 1.0 };

    let mut ctx = ChartBuilder::on(root)
        .caption(&chart.title, ("sans-serif", 28))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..(category_count as f64 - 0.5), 0f64..y_top)?;

    let categories = &chart.categories;
    let label_formatter = |x: &f64| category_label(categories, *x);
    ctx.configure_mesh()
        .disable_x_mesh()
        .x_labels(category_count)
        .x_label_formatter(&label_formatter)
        .y_desc("Share, % / slots")
        .draw()?;

    // Groups take 80% of a category, split evenly between series
    let group_width = 0.8;
    let bar_width = group_width / chart.series.len().max(1) as f64;

    for (series_index, series) in chart.series.iter().enumerate() {
        let color = SERIES_COLORS[series_index % SERIES_COLORS.len()];
        let offset = -group_width / 2.0 + series_index as f64 * bar_width;

        ctx.draw_series(series.values.iter().enumerate().map(|(i, &value)| {
            let x0 = i as f64 + offset;
            Rectangle::new([(x0, 0.0), (x0 + bar_width, value)], color.filled())
        }))?
        .label(series.name.as_str())
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    ctx.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
