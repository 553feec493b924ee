use hdfview::chart_data::ChartView;
use hdfview::config::LegendMode;
use hdfview::{Derived, InputEvent, ViewController, ViewOptions};

mod common;

fn options(defer_plot: bool) -> ViewOptions {
    ViewOptions {
        defer_plot,
        ..ViewOptions::default()
    }
}

fn open(path: &str, defer_plot: bool) -> ViewController {
    ViewController::new(options(defer_plot), Some(path)).unwrap()
}

#[test]
fn test_missing_file_scenario() {
    let mut controller = open("missing.h5", false);
    assert!(controller.keys().is_empty());
    assert_eq!(controller.table().width(), 0);

    controller.handle(InputEvent::X("time".into()));
    controller.handle(InputEvent::Y("a".into()));
    assert!(controller.chart().is_empty());
    assert_eq!(controller.chart(), &ChartView::Empty);
}

#[test]
fn test_path_edit_lists_keys_and_selects_first() {
    let (_dir, path) = common::data_file();
    let mut controller = ViewController::new(options(true), None).unwrap();
    assert!(controller.keys().is_empty());

    let recomputed = controller.handle(InputEvent::Path(common::path_str(&path)));
    assert_eq!(
        recomputed,
        vec![Derived::Keys, Derived::Columns, Derived::Table, Derived::Chart]
    );
    assert_eq!(controller.keys(), &["/raw", "/t1", "/t2"]);
    assert_eq!(controller.selection().key, "/raw");
}

#[test]
fn test_key_selection_without_defer_picks_first_column() {
    let (_dir, path) = common::data_file();
    let mut controller = open(&common::path_str(&path), false);

    controller.handle(InputEvent::Key("/t1".into()));
    assert_eq!(controller.columns(), &["time", "a", "b", "group"]);
    let s = controller.selection();
    assert_eq!((s.x.as_str(), s.y.as_str(), s.z.as_str()), ("time", "time", "time"));
    assert_eq!(controller.table().height(), common::ROWS);
    assert!(!controller.chart().is_empty());
}

#[test]
fn test_key_selection_with_defer_waits_for_axes() {
    let (_dir, path) = common::data_file();
    let mut controller = open(&common::path_str(&path), true);

    controller.handle(InputEvent::Key("/t1".into()));
    let s = controller.selection();
    assert!(s.x.is_empty() && s.y.is_empty() && s.z.is_empty());
    assert_eq!(controller.chart(), &ChartView::Pending);

    controller.handle(InputEvent::X("time".into()));
    assert_eq!(controller.chart(), &ChartView::Pending);
}

#[test]
fn test_two_axes_draw_one_sorted_line() {
    let (_dir, path) = common::data_file();
    let mut controller = open(&common::path_str(&path), true);
    controller.handle(InputEvent::Key("/t1".into()));
    controller.handle(InputEvent::X("time".into()));
    controller.handle(InputEvent::Y("a".into()));

    let chart = controller.chart().lines().expect("chart");
    assert_eq!(chart.series.len(), 1);
    assert!(!chart.show_legend);
    let xs: Vec<f64> = chart.series[0].points.iter().map(|p| p.0).collect();
    assert_eq!(xs, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert!(chart.series[0].points.iter().all(|(x, y)| *y == x * 10.0));
}

#[test]
fn test_grouping_column_draws_one_line_per_value() {
    let (_dir, path) = common::data_file();
    let mut controller = open(&common::path_str(&path), true);
    controller.handle(InputEvent::Key("/t1".into()));
    controller.handle(InputEvent::X("time".into()));
    controller.handle(InputEvent::Y("a".into()));
    controller.handle(InputEvent::Z("group".into()));

    let chart = controller.chart().lines().expect("chart");
    assert_eq!(chart.series.len(), 3);
    assert!(chart.show_legend);
    for series in &chart.series {
        let xs: Vec<f64> = series.points.iter().map(|p| p.0).collect();
        assert!(xs.windows(2).all(|w| w[0] <= w[1]));
    }
}

#[test]
fn test_string_group_column() {
    let (_dir, path) = common::data_file();
    let mut controller = open(&common::path_str(&path), true);
    controller.handle(InputEvent::Key("/t2".into()));
    controller.handle(InputEvent::X("time".into()));
    controller.handle(InputEvent::Y("a".into()));
    controller.handle(InputEvent::Z("group".into()));

    let chart = controller.chart().lines().expect("chart");
    let names: Vec<&str> = chart.series.iter().map(|s| s.name.as_str()).collect();
    // first appearance after sorting by time: time=1 green, 2 blue, 3 red
    assert_eq!(names, vec!["green", "blue", "red"]);
}

#[test]
fn test_defer_toggle_resets_axes() {
    let (_dir, path) = common::data_file();
    let mut controller = open(&common::path_str(&path), true);
    controller.handle(InputEvent::Key("/t1".into()));
    controller.handle(InputEvent::X("a".into()));

    let recomputed = controller.handle(InputEvent::Defer(false));
    assert_eq!(recomputed, vec![Derived::Columns, Derived::Chart]);
    assert_eq!(controller.selection().x, "time");
}

#[test]
fn test_corrupt_file_lists_no_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_corrupt_file(dir.path());
    let controller = open(&common::path_str(&path), false);
    assert!(controller.keys().is_empty());
    assert_eq!(controller.table().width(), 0);
}

#[test]
fn test_failed_load_resets_table_to_empty() {
    let (_dir, path) = common::data_file();
    let mut controller = open(&common::path_str(&path), false);
    controller.handle(InputEvent::Key("/t1".into()));
    assert!(controller.table().height() > 0);

    controller.handle(InputEvent::Key("/does-not-exist".into()));
    assert_eq!(controller.table().width(), 0);
    assert!(controller.columns().is_empty());
    assert!(controller.chart().is_empty());
}

#[test]
fn test_stale_axis_selection_gives_empty_chart() {
    let (_dir, path) = common::data_file();
    let mut controller = open(&common::path_str(&path), true);
    controller.handle(InputEvent::Key("/t1".into()));
    controller.handle(InputEvent::X("time".into()));
    controller.handle(InputEvent::Y("not-a-column".into()));
    assert_eq!(controller.chart(), &ChartView::Empty);
}

#[test]
fn test_same_key_in_new_file_keeps_table_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let first = common::write_data_file(dir.path());
    let second = common::write_other_file(dir.path());

    let mut controller = open(&common::path_str(&first), false);
    controller.handle(InputEvent::Key("/t1".into()));
    let recomputed = controller.handle(InputEvent::Path(common::path_str(&second)));

    assert_eq!(recomputed, vec![Derived::Keys, Derived::Chart]);
    assert_eq!(controller.selection().key, "/t1");
    assert_eq!(controller.table().height(), common::ROWS);
}

#[test]
fn test_same_key_in_new_file_reloads_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let first = common::write_data_file(dir.path());
    let second = common::write_other_file(dir.path());

    let opts = ViewOptions {
        defer_plot: false,
        reload_table_on_path_change: true,
        ..ViewOptions::default()
    };
    let mut controller = ViewController::new(opts, Some(&common::path_str(&first))).unwrap();
    controller.handle(InputEvent::Key("/t1".into()));
    controller.handle(InputEvent::Path(common::path_str(&second)));

    assert_eq!(controller.table().height(), 2);
    assert_eq!(controller.columns(), &["x", "y"]);
    assert_eq!(controller.selection().x, "x");
}

#[test]
fn test_require_group_column_holds_chart() {
    let (_dir, path) = common::data_file();
    let opts = ViewOptions {
        require_group_column: true,
        legend: LegendMode::Always,
        ..ViewOptions::default()
    };
    let mut controller = ViewController::new(opts, Some(&common::path_str(&path))).unwrap();
    controller.handle(InputEvent::Key("/t1".into()));
    controller.handle(InputEvent::X("time".into()));
    controller.handle(InputEvent::Y("a".into()));
    assert_eq!(controller.chart(), &ChartView::Pending);

    controller.handle(InputEvent::Z("group".into()));
    assert!(controller.chart().lines().expect("chart").show_legend);
}

#[test]
fn test_view_snapshot_limits_preview() {
    let (_dir, path) = common::data_file();
    let opts = ViewOptions {
        preview_rows: 2,
        ..ViewOptions::default()
    };
    let mut controller = ViewController::new(opts, Some(&common::path_str(&path))).unwrap();
    controller.handle(InputEvent::Key("/t1".into()));

    let view = controller.view();
    assert_eq!(view.table.rows.len(), 2);
    assert_eq!(view.table.total_rows, common::ROWS);
    assert_eq!(view.table.columns, vec!["time", "a", "b", "group"]);
}

#[test]
fn test_single_key_file_selects_its_only_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_other_file(dir.path());
    let controller = open(&common::path_str(&path), false);

    assert_eq!(controller.keys(), &["/t1"]);
    assert_eq!(controller.selection().key, "/t1");
    assert_eq!(controller.selection().x, "x");
    assert_eq!(controller.table().height(), 2);
}
