//! Prepare line chart data from the loaded table: sort by x, split by the grouping column,
//! and convert to (f64, f64) points.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::*;
use serde::Serialize;
use std::collections::HashMap;

use crate::config::LegendMode;

/// Name given to the single line when no grouping column is selected.
pub const UNGROUPED_SERIES: &str = "";

/// Columns chosen for the chart axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSelection<'a> {
    pub x: &'a str,
    pub y: &'a str,
    pub group: Option<&'a str>,
}

/// How x values map back to labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "categories", rename_all = "lowercase")]
pub enum XAxisKind {
    Numeric,
    /// x is the index into these labels (string x columns)
    Categorical(Vec<String>),
}

/// One drawn line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineChart {
    pub x_label: String,
    pub y_label: String,
    pub group_label: Option<String>,
    pub x_axis: XAxisKind,
    pub series: Vec<LineSeries>,
    pub show_legend: bool,
}

impl LineChart {
    /// (x_min, x_max, y_min, y_max) over all points; None when there are no points.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut points = self.series.iter().flat_map(|s| s.points.iter());
        let &(x0, y0) = points.next()?;
        Some(points.fold((x0, x0, y0, y0), |(x_min, x_max, y_min, y_max), &(x, y)| {
            (x_min.min(x), x_max.max(x), y_min.min(y), y_max.max(y))
        }))
    }
}

/// What the chart area shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ChartView {
    /// Required axes are not selected yet
    Pending,
    /// No usable file, key or data
    Empty,
    Lines(LineChart),
}

impl ChartView {
    /// True when nothing is drawn.
    pub fn is_empty(&self) -> bool {
        !matches!(self, Self::Lines(_))
    }

    pub fn lines(&self) -> Option<&LineChart> {
        match self {
            Self::Lines(chart) => Some(chart),
            _ => None,
        }
    }
}

/// Build a line chart from raw rows: stable sort by x ascending, one series per distinct
/// group value in order of first appearance. Rows with a null or non-finite x/y are skipped.
pub fn build_line_chart(df: &DataFrame, axes: AxisSelection, legend: LegendMode) -> Result<LineChart> {
    for name in [Some(axes.x), Some(axes.y), axes.group].into_iter().flatten() {
        if df.column(name).is_err() {
            return Err(eyre!("column '{}' not in table", name));
        }
    }

    let sorted = df.sort(
        [axes.x],
        SortMultipleOptions::default().with_maintain_order(true),
    )?;

    let (xs, x_axis) = x_values(sorted.column(axes.x)?)?;
    let ys = sorted.column(axes.y)?.cast(&DataType::Float64)?;
    let ys = ys.f64()?;

    let groups: Option<Vec<Option<String>>> = match axes.group {
        Some(name) => {
            let column = sorted.column(name)?.cast(&DataType::String)?;
            let values = column.as_materialized_series().str()?;
            Some(values.iter().map(|v| v.map(str::to_string)).collect())
        }
        None => None,
    };

    let mut series: Vec<LineSeries> = Vec::new();
    let mut index_of: HashMap<String, usize> = HashMap::new();
    if groups.is_none() {
        series.push(LineSeries {
            name: UNGROUPED_SERIES.to_string(),
            points: Vec::new(),
        });
    }

    for (row, y) in ys.iter().enumerate() {
        let slot = match &groups {
            Some(values) => match &values[row] {
                Some(value) => *index_of.entry(value.clone()).or_insert_with(|| {
                    series.push(LineSeries {
                        name: value.clone(),
                        points: Vec::new(),
                    });
                    series.len() - 1
                }),
                None => continue,
            },
            None => 0,
        };
        if let (Some(x), Some(y)) = (xs[row], y) {
            if x.is_finite() && y.is_finite() {
                series[slot].points.push((x, y));
            }
        }
    }

    let show_legend = match legend {
        LegendMode::Auto => axes.group.is_some(),
        LegendMode::Always => true,
        LegendMode::Never => false,
    };

    Ok(LineChart {
        x_label: axes.x.to_string(),
        y_label: axes.y.to_string(),
        group_label: axes.group.map(str::to_string),
        x_axis,
        series,
        show_legend,
    })
}

/// Numeric x values for an already sorted column. String columns become category indices.
fn x_values(column: &Column) -> Result<(Vec<Option<f64>>, XAxisKind)> {
    if column.dtype() == &DataType::String {
        let values = column.as_materialized_series().str()?;
        let mut categories: Vec<String> = Vec::new();
        let xs = values
            .iter()
            .map(|v| {
                v.map(|s| {
                    if categories.last().map(String::as_str) != Some(s) {
                        categories.push(s.to_string());
                    }
                    (categories.len() - 1) as f64
                })
            })
            .collect();
        return Ok((xs, XAxisKind::Categorical(categories)));
    }

    let cast = column.cast(&DataType::Float64)?;
    let xs = cast.f64()?.iter().collect();
    Ok((xs, XAxisKind::Numeric))
}
