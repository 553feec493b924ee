#![allow(dead_code)]

use hdf5::types::{FixedAscii, VarLenUnicode};
use hdf5::{File, Group, H5Type, Location};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const ROWS: usize = 6;

fn write_1d<T: H5Type>(group: &Group, name: &str, values: &[T]) {
    group
        .new_dataset::<T>()
        .shape(values.len())
        .create(name)
        .unwrap()
        .write_raw(values)
        .unwrap();
}

fn write_2d<T: H5Type>(group: &Group, name: &str, rows: usize, cols: usize, values: &[T]) {
    group
        .new_dataset::<T>()
        .shape((rows, cols))
        .create(name)
        .unwrap()
        .write_raw(values)
        .unwrap();
}

pub fn strings(values: &[&str]) -> Vec<VarLenUnicode> {
    values.iter().map(|v| v.parse().unwrap()).collect()
}

pub fn fixed<const N: usize>(values: &[&str]) -> Vec<FixedAscii<N>> {
    values
        .iter()
        .map(|v| FixedAscii::<N>::from_ascii(v).unwrap())
        .collect()
}

/// Scalar fixed-length string attribute, the way PyTables stores pickled values.
fn write_text_attr(location: &Location, name: &str, text: &str) {
    location
        .new_attr::<FixedAscii<256>>()
        .create(name)
        .unwrap()
        .write_scalar(&FixedAscii::<256>::from_ascii(text).unwrap())
        .unwrap();
}

/// Row-major matrix from columns.
fn interleave<T: Copy>(columns: &[&[T]]) -> Vec<T> {
    let rows = columns[0].len();
    (0..rows)
        .flat_map(|r| columns.iter().map(move |c| c[r]))
        .collect()
}

pub fn time() -> Vec<f64> {
    vec![3.0, 1.0, 2.0, 6.0, 5.0, 4.0]
}

pub fn a() -> Vec<f64> {
    vec![30.0, 10.0, 20.0, 60.0, 50.0, 40.0]
}

pub fn b() -> Vec<f64> {
    vec![0.3, 0.1, 0.2, 0.6, 0.5, 0.4]
}

pub fn group_ids() -> Vec<i64> {
    vec![0, 1, 2, 0, 1, 2]
}

/// pandas "fixed" frame: float block [time, a, b], int block [group]
pub fn write_pandas_frame(file: &File, key: &str) {
    let group = file.create_group(key).unwrap();
    write_1d(&group, "axis0", &strings(&["time", "a", "b", "group"]));
    write_1d(&group, "axis1", &(0..ROWS as i64).collect::<Vec<_>>());

    write_1d(&group, "block0_items", &strings(&["time", "a", "b"]));
    let floats = interleave(&[time().as_slice(), a().as_slice(), b().as_slice()]);
    write_2d(&group, "block0_values", ROWS, 3, &floats);

    write_1d(&group, "block1_items", &strings(&["group"]));
    write_2d(&group, "block1_values", ROWS, 1, &group_ids());
}

pub fn labels() -> Vec<&'static str> {
    vec!["one", "two", "three", "four", "five", "six"]
}

/// One row of a pandas table-format frame: two float columns and one int
/// column in value blocks, plus a string data column.
#[derive(H5Type, Clone)]
#[repr(C)]
pub struct TableRow {
    index: i64,
    values_block_0: [f64; 2],
    values_block_1: [i64; 1],
    label: FixedAscii<8>,
}

/// pandas "table" frame. The frame's column order is time, label, a, group.
pub fn write_pandas_table(file: &File, key: &str) {
    let group = file.create_group(key).unwrap();
    let (time, a, ids) = (time(), a(), group_ids());
    let rows: Vec<TableRow> = (0..ROWS)
        .map(|i| TableRow {
            index: i as i64,
            values_block_0: [time[i], a[i]],
            values_block_1: [ids[i]],
            label: FixedAscii::from_ascii(labels()[i]).unwrap(),
        })
        .collect();
    write_1d(&group, "table", &rows);
    group.create_group("_i_table").unwrap();

    let table = group.dataset("table").unwrap();
    write_text_attr(&table, "values_block_0_kind", "(lp0\nVtime\np1\naVa\np2\na.");
    write_text_attr(&table, "values_block_1_kind", "(lp0\nVgroup\np1\na.");
    write_text_attr(&table, "label_kind", "(lp0\nVlabel\np1\na.");
    write_text_attr(&group, "pandas_type", "frame_table");
    write_text_attr(
        &group,
        "non_index_axes",
        "(lp0\n(I1\n(lp1\nVtime\np2\naVlabel\np3\naVa\np4\naVgroup\np5\natp6\na.",
    );
}

/// pandas "fixed" frame whose names are fixed-length byte strings:
/// float block [time, a], int block [group], string block [label].
pub fn write_fixed_name_frame(file: &File, key: &str) {
    let group = file.create_group(key).unwrap();
    write_1d(&group, "axis0", &fixed::<8>(&["time", "a", "group", "label"]));
    write_1d(&group, "axis1", &(0..ROWS as i64).collect::<Vec<_>>());

    write_1d(&group, "block0_items", &fixed::<8>(&["time", "a"]));
    let floats = interleave(&[time().as_slice(), a().as_slice()]);
    write_2d(&group, "block0_values", ROWS, 2, &floats);

    write_1d(&group, "block1_items", &fixed::<8>(&["group"]));
    write_2d(&group, "block1_values", ROWS, 1, &group_ids());

    write_1d(&group, "block2_items", &fixed::<8>(&["label"]));
    write_2d(&group, "block2_values", ROWS, 1, &fixed::<16>(&labels()));
}

/// Text longer than any small fixed capacity.
pub fn long_note() -> String {
    "0123456789".repeat(150)
}

/// Group of 1-D datasets, one per column
pub fn write_column_group(file: &File, key: &str) {
    let group = file.create_group(key).unwrap();
    write_1d(&group, "time", &time());
    write_1d(&group, "a", &a());
    write_1d(
        &group,
        "group",
        &strings(&["red", "green", "blue", "red", "green", "blue"]),
    );
}

/// `data.h5` with `/t1` (pandas frame), `/t2` (column group) and `/raw` (2-D dataset).
pub fn write_data_file(dir: &Path) -> PathBuf {
    let path = dir.join("data.h5");
    let file = File::create(&path).unwrap();
    write_pandas_frame(&file, "t1");
    write_column_group(&file, "t2");
    write_2d(&file, "raw", 3, 2, &[1i64, 2, 3, 4, 5, 6]);
    path
}

/// A second file reusing the key `/t1` with different contents.
pub fn write_other_file(dir: &Path) -> PathBuf {
    let path = dir.join("other.h5");
    let file = File::create(&path).unwrap();
    let group = file.create_group("t1").unwrap();
    write_1d(&group, "x", &[1.0_f64, 2.0]);
    write_1d(&group, "y", &[5.0_f64, 6.0]);
    path
}

/// `formats.h5` with `/t3` (pandas table), `/t4` (fixed frame with fixed-length
/// names) and `/notes` (2048-byte strings).
pub fn write_formats_file(dir: &Path) -> PathBuf {
    let path = dir.join("formats.h5");
    let file = File::create(&path).unwrap();
    write_pandas_table(&file, "t3");
    write_fixed_name_frame(&file, "t4");
    let notes = long_note();
    write_1d(&file, "notes", &fixed::<2048>(&["short", notes.as_str()]));
    path
}

/// A file that exists but is not HDF5.
pub fn write_corrupt_file(dir: &Path) -> PathBuf {
    let path = dir.join("corrupt.h5");
    std::fs::write(&path, b"this is not an hdf5 container").unwrap();
    path
}

/// Temp dir holding `data.h5`; keep the dir alive for the test's duration.
pub fn data_file() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_data_file(dir.path());
    (dir, path)
}

pub fn formats_file() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_formats_file(dir.path());
    (dir, path)
}

pub fn path_str(path: &Path) -> String {
    path.display().to_string()
}
