//! Selection-driven view controller.
//!
//! Owns one session's form state and the values derived from it: the key
//! choices, the axis choices, the loaded table and the chart. Each derived
//! value is registered with the fields it reads and writes, and after every
//! input event only the affected values are recomputed.

use color_eyre::Result;
use log::{debug, error, warn};
use polars::prelude::DataFrame;
use serde::Serialize;
use std::path::Path;

use crate::chart_data::{build_line_chart, AxisSelection, ChartView};
use crate::config::{AppConfig, LegendMode};
use crate::grid::GridPreview;
use crate::reactive::{DependencyGraph, GraphBuilder, Source};
use crate::selection::{Field, InputEvent, SelectionState};
use crate::store;

/// Values computed from the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Derived {
    /// Keys offered for the current path
    Keys,
    /// Axis choices for the current key
    Columns,
    /// The loaded table
    Table,
    Chart,
}

/// Settings that shape how derived values are computed.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewOptions {
    pub placeholder_path: String,
    pub defer_plot: bool,
    pub preview_rows: usize,
    pub legend: LegendMode,
    pub require_group_column: bool,
    pub reload_table_on_path_change: bool,
}

impl From<&AppConfig> for ViewOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            placeholder_path: config.viewer.placeholder_path.clone(),
            defer_plot: config.viewer.defer_plot,
            preview_rows: config.viewer.preview_rows,
            legend: config.chart.legend,
            require_group_column: config.chart.require_group_column,
            reload_table_on_path_change: config.viewer.reload_table_on_path_change,
        }
    }
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Snapshot of everything the page displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View {
    pub selection: SelectionState,
    pub keys: Vec<String>,
    pub columns: Vec<String>,
    pub table: GridPreview,
    pub chart: ChartView,
}

pub struct ViewController {
    options: ViewOptions,
    graph: DependencyGraph<Field, Derived>,
    selection: SelectionState,
    keys: Vec<String>,
    columns: Vec<String>,
    table: DataFrame,
    chart: ChartView,
}

fn dependency_graph(options: &ViewOptions) -> Result<DependencyGraph<Field, Derived>> {
    use Source::{Derived as D, Input as I};

    let mut loader_reads = vec![I(Field::Key)];
    if options.reload_table_on_path_change {
        loader_reads.push(I(Field::Path));
    }
    let mut column_reads = loader_reads.clone();
    column_reads.push(I(Field::Defer));

    GraphBuilder::new()
        .node(Derived::Keys, &[I(Field::Path)], &[Field::Key])
        .node(Derived::Columns, &column_reads, &[Field::X, Field::Y, Field::Z])
        .node(Derived::Table, &loader_reads, &[])
        .node(
            Derived::Chart,
            &[
                I(Field::Path),
                I(Field::Key),
                I(Field::X),
                I(Field::Y),
                I(Field::Z),
                D(Derived::Table),
            ],
            &[],
        )
        .build()
}

impl ViewController {
    /// Create a session. Every derived value is computed once from the initial selection.
    pub fn new(options: ViewOptions, initial_path: Option<&str>) -> Result<Self> {
        let graph = dependency_graph(&options)?;
        let path = initial_path
            .unwrap_or(options.placeholder_path.as_str())
            .to_string();
        let selection = SelectionState::new(path, options.defer_plot);

        let mut controller = Self {
            options,
            graph,
            selection,
            keys: Vec::new(),
            columns: Vec::new(),
            table: DataFrame::empty(),
            chart: ChartView::Pending,
        };
        controller.dispatch(vec![
            Field::Path,
            Field::Key,
            Field::X,
            Field::Y,
            Field::Z,
            Field::Defer,
        ]);
        Ok(controller)
    }

    /// Apply one input event and recompute what depends on it.
    /// Returns the derived values that were recomputed, in order.
    pub fn handle(&mut self, event: InputEvent) -> Vec<Derived> {
        let field = event.field();
        if !self.selection.apply(event) {
            return Vec::new();
        }
        self.dispatch(vec![field])
    }

    fn dispatch(&mut self, changed: Vec<Field>) -> Vec<Derived> {
        let graph = self.graph.clone();
        let recomputed = graph.run(changed, |node| self.recompute(node));
        debug!("recomputed {:?}", recomputed);
        recomputed
    }

    fn recompute(&mut self, node: Derived) -> Vec<Field> {
        match node {
            Derived::Keys => self.refresh_keys(),
            Derived::Columns => self.refresh_columns(),
            Derived::Table => {
                self.reload_table();
                Vec::new()
            }
            Derived::Chart => {
                self.chart = self.render_chart();
                Vec::new()
            }
        }
    }

    fn has_file(&self) -> bool {
        store::is_readable_path(&self.selection.path, &self.options.placeholder_path)
    }

    fn has_source(&self) -> bool {
        self.has_file() && !self.selection.key.is_empty()
    }

    /// List keys for the path. The selected key is kept if still offered, otherwise the
    /// first key (or nothing) is selected.
    fn refresh_keys(&mut self) -> Vec<Field> {
        self.keys = if self.has_file() {
            store::list_keys(Path::new(&self.selection.path)).unwrap_or_else(|e| {
                error!("cannot list keys of {}: {}", self.selection.path, e);
                Vec::new()
            })
        } else {
            Vec::new()
        };

        if self.keys.contains(&self.selection.key) {
            return Vec::new();
        }
        let key = self.keys.first().cloned().unwrap_or_default();
        if self.selection.apply(InputEvent::Key(key)) {
            vec![Field::Key]
        } else {
            Vec::new()
        }
    }

    /// Replace the axis choices. Selections reset to the first column, or to nothing when
    /// plotting is deferred until the axes are picked.
    fn refresh_columns(&mut self) -> Vec<Field> {
        self.columns = if self.has_source() {
            store::read_columns(Path::new(&self.selection.path), &self.selection.key)
                .unwrap_or_else(|e| {
                    error!(
                        "cannot read columns of {} in {}: {}",
                        self.selection.key, self.selection.path, e
                    );
                    Vec::new()
                })
        } else {
            Vec::new()
        };

        let selected = if self.selection.defer {
            String::new()
        } else {
            self.columns.first().cloned().unwrap_or_default()
        };
        self.selection.set_axes(&selected)
    }

    /// Reload the table slot. Load failures are logged and leave an empty table.
    fn reload_table(&mut self) {
        if !self.has_source() {
            self.table = DataFrame::empty();
            return;
        }
        self.table = match store::read_table(Path::new(&self.selection.path), &self.selection.key) {
            Ok(df) => {
                debug!(
                    "loaded {} ({} rows x {} columns)",
                    self.selection.key,
                    df.height(),
                    df.width()
                );
                df
            }
            Err(e) => {
                error!(
                    "failed to load {} from {}: {}",
                    self.selection.key, self.selection.path, e
                );
                DataFrame::empty()
            }
        };
    }

    fn render_chart(&self) -> ChartView {
        let s = &self.selection;
        let group_missing = self.options.require_group_column && s.z.is_empty();
        if s.x.is_empty() || s.y.is_empty() || group_missing {
            return ChartView::Pending;
        }
        if !self.has_source() || self.table.width() == 0 {
            return ChartView::Empty;
        }

        let axes = AxisSelection {
            x: &s.x,
            y: &s.y,
            group: s.group(),
        };
        match build_line_chart(&self.table, axes, self.options.legend) {
            Ok(chart) => ChartView::Lines(chart),
            Err(e) => {
                warn!("cannot plot {} against {}: {}", s.y, s.x, e);
                ChartView::Empty
            }
        }
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn table(&self) -> &DataFrame {
        &self.table
    }

    pub fn chart(&self) -> &ChartView {
        &self.chart
    }

    pub fn view(&self) -> View {
        View {
            selection: self.selection.clone(),
            keys: self.keys.clone(),
            columns: self.columns.clone(),
            table: GridPreview::from_frame(&self.table, self.options.preview_rows),
            chart: self.chart.clone(),
        }
    }
}
