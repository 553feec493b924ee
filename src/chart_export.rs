//! Chart rendering to SVG (plotters SVG backend).

use color_eyre::Result;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::chart_data::{ChartView, LineChart, XAxisKind};

/// Line colors, cycled per series.
const PALETTE: [RGBColor; 10] = [
    RGBColor(99, 110, 250),
    RGBColor(239, 85, 59),
    RGBColor(0, 204, 150),
    RGBColor(171, 99, 250),
    RGBColor(255, 161, 90),
    RGBColor(25, 211, 243),
    RGBColor(255, 102, 146),
    RGBColor(182, 232, 128),
    RGBColor(255, 151, 255),
    RGBColor(254, 203, 82),
];

/// Format a tick value for display (compact: integer when whole, else 1–2 decimals).
fn format_tick(v: f64) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    let abs = v.abs();
    if abs >= 100_000.0 || abs <= 0.01 {
        format!("{:e}", v)
    } else if (v - v.round()).abs() < 1e-10 {
        format!("{:.0}", v)
    } else if abs >= 1.0 {
        format!("{:.1}", v)
    } else {
        format!("{:.2}", v)
    }
}

/// Widen a degenerate range so plotters gets a non-empty axis.
fn padded(min: f64, max: f64) -> (f64, f64) {
    if max > min {
        let pad = (max - min) * 0.02;
        (min - pad, max + pad)
    } else {
        (min - 0.5, max + 0.5)
    }
}

/// Render the chart area. Pending and empty charts render as a blank canvas.
pub fn render_svg(view: &ChartView, width: u32, height: u32) -> Result<String> {
    let mut buffer = String::new();
    {
        let root = SVGBackend::with_string(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;
        if let ChartView::Lines(chart) = view {
            draw_lines(&root, chart)?;
        }
        root.present()?;
    }
    Ok(buffer)
}

fn draw_lines(root: &DrawingArea<SVGBackend<'_>, Shift>, chart: &LineChart) -> Result<()> {
    let (x_min, x_max, y_min, y_max) = chart.bounds().unwrap_or((0.0, 1.0, 0.0, 1.0));
    let (x_min, x_max) = padded(x_min, x_max);
    let (y_min, y_max) = padded(y_min, y_max);

    let mut ctx = ChartBuilder::on(root)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    let format_x = |x: &f64| match &chart.x_axis {
        XAxisKind::Numeric => format_tick(*x),
        XAxisKind::Categorical(labels) => {
            let index = x.round();
            if (x - index).abs() < 1e-9 && index >= 0.0 {
                labels.get(index as usize).cloned().unwrap_or_default()
            } else {
                String::new()
            }
        }
    };
    let format_y = |y: &f64| format_tick(*y);

    ctx.configure_mesh()
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .x_label_formatter(&format_x)
        .y_label_formatter(&format_y)
        .draw()?;

    for (idx, series) in chart.series.iter().enumerate() {
        let color = PALETTE[idx % PALETTE.len()];
        let drawn = ctx.draw_series(LineSeries::new(
            series.points.iter().copied(),
            color.stroke_width(2),
        ))?;
        if chart.show_legend {
            let label = if series.name.is_empty() {
                chart.y_label.as_str()
            } else {
                series.name.as_str()
            };
            drawn
                .label(label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }
    }

    if chart.show_legend {
        ctx.configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .position(SeriesLabelPosition::UpperRight)
            .draw()?;
    }

    Ok(())
}
