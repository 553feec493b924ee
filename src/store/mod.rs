//! Read-only access to tables stored in HDF5 files.
//!
//! A "key" names one top-level member of the file. Keys are reported with a
//! leading `/` and accepted with or without it. Four layouts are understood
//! under a key:
//!
//! * pandas "table" frames (a compound `table` dataset),
//! * pandas "fixed" frames (`axis0`, `blockN_items`, `blockN_values`),
//! * column groups: a group of equal-length 1-D datasets, one per column,
//! * a bare 1-D dataset (one column) or 2-D dataset (columns `0..n`).
//!
//! Column groups list their members in link creation order when the group
//! tracks it, and in name order otherwise.

mod pickle;
mod raw;
mod table_format;

use color_eyre::eyre::eyre;
use color_eyre::Result;
use hdf5::types::{TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{Dataset, File, Group, LinkInfo};
use polars::prelude::*;
use std::path::Path;

/// True when `path` names an existing file the viewer should try to open.
pub fn is_readable_path(path: &str, placeholder: &str) -> bool {
    !path.is_empty() && path != placeholder && Path::new(path).exists()
}

/// Strip the leading `/` a key is displayed with.
pub fn normalize_key(key: &str) -> &str {
    key.trim_start_matches('/')
}

/// List the top-level keys of an HDF5 file, in the file's member order.
pub fn list_keys(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let keys = file
        .member_names()?
        .into_iter()
        .map(|name| format!("/{}", name))
        .collect();
    Ok(keys)
}

/// Read only the column names of the table stored under `key`.
pub fn read_columns(path: &Path, key: &str) -> Result<Vec<String>> {
    let file = File::open(path)?;
    match open_table(&file, key)? {
        TableLayout::PandasTable(group) => table_format::column_names(&group),
        TableLayout::PandasFixed(group) => read_strings(&group.dataset("axis0")?),
        TableLayout::ColumnGroup(group) => column_group_members(&group),
        TableLayout::Dataset(dataset) => Ok(dataset_column_names(&dataset, key)),
    }
}

/// Read the full table stored under `key`.
pub fn read_table(path: &Path, key: &str) -> Result<DataFrame> {
    let file = File::open(path)?;
    let columns = match open_table(&file, key)? {
        TableLayout::PandasTable(group) => table_format::read_columns(&group)?,
        TableLayout::PandasFixed(group) => read_pandas_fixed(&group)?,
        TableLayout::ColumnGroup(group) => read_column_group(&group)?,
        TableLayout::Dataset(dataset) => read_bare_dataset(&dataset, key)?,
    };
    Ok(DataFrame::new(columns)?)
}

enum TableLayout {
    PandasTable(Group),
    PandasFixed(Group),
    ColumnGroup(Group),
    Dataset(Dataset),
}

fn open_table(file: &File, key: &str) -> Result<TableLayout> {
    let name = normalize_key(key);
    if name.is_empty() || !file.link_exists(name) {
        return Err(eyre!("key '{}' not found", key));
    }

    if let Ok(group) = file.group(name) {
        if table_format::is_table_format(&group) {
            return Ok(TableLayout::PandasTable(group));
        }
        if group.link_exists("axis0") && group.link_exists("block0_values") {
            return Ok(TableLayout::PandasFixed(group));
        }
        return Ok(TableLayout::ColumnGroup(group));
    }

    let dataset = file.dataset(name)?;
    match dataset.ndim() {
        1 | 2 => Ok(TableLayout::Dataset(dataset)),
        n => Err(eyre!("key '{}' holds a {}-dimensional dataset", key, n)),
    }
}

/// Values of one dataset, flattened in row-major order.
#[derive(Debug, Clone, PartialEq)]
enum Values {
    Float(Vec<f64>),
    Int(Vec<i64>),
    UInt(Vec<u64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

impl Values {
    fn read(dataset: &Dataset) -> Result<Self> {
        let values = match dataset.dtype()?.to_descriptor()? {
            TypeDescriptor::Float(_) => Self::Float(dataset.read_raw::<f64>()?),
            TypeDescriptor::Integer(_) => Self::Int(dataset.read_raw::<i64>()?),
            TypeDescriptor::Unsigned(_) => Self::UInt(dataset.read_raw::<u64>()?),
            TypeDescriptor::Boolean => Self::Bool(dataset.read_raw::<bool>()?),
            TypeDescriptor::FixedAscii(_)
            | TypeDescriptor::FixedUnicode(_)
            | TypeDescriptor::VarLenAscii
            | TypeDescriptor::VarLenUnicode => Self::Str(read_strings(dataset)?),
            other => {
                return Err(eyre!(
                    "dataset '{}' has unsupported element type {:?}",
                    dataset.name(),
                    other
                ))
            }
        };
        Ok(values)
    }

    /// Column `index` of a row-major matrix with `width` columns.
    fn column(&self, index: usize, width: usize) -> Self {
        fn strided<T: Clone>(values: &[T], index: usize, width: usize) -> Vec<T> {
            values.iter().skip(index).step_by(width).cloned().collect()
        }
        match self {
            Self::Float(v) => Self::Float(strided(v, index, width)),
            Self::Int(v) => Self::Int(strided(v, index, width)),
            Self::UInt(v) => Self::UInt(strided(v, index, width)),
            Self::Bool(v) => Self::Bool(strided(v, index, width)),
            Self::Str(v) => Self::Str(strided(v, index, width)),
        }
    }

    fn into_column(self, name: &str) -> Column {
        let name = PlSmallStr::from(name);
        let series = match self {
            Self::Float(v) => Series::new(name, v),
            Self::Int(v) => Series::new(name, v),
            Self::UInt(v) => Series::new(name, v),
            Self::Bool(v) => Series::new(name, v),
            Self::Str(v) => Series::new(name, v),
        };
        series.into_column()
    }
}

fn read_strings(dataset: &Dataset) -> Result<Vec<String>> {
    let strings = match dataset.dtype()?.to_descriptor()? {
        TypeDescriptor::VarLenUnicode => dataset
            .read_raw::<VarLenUnicode>()?
            .iter()
            .map(|s| s.as_str().to_string())
            .collect(),
        TypeDescriptor::VarLenAscii => dataset
            .read_raw::<VarLenAscii>()?
            .iter()
            .map(|s| s.as_str().to_string())
            .collect(),
        layout @ (TypeDescriptor::FixedAscii(width) | TypeDescriptor::FixedUnicode(width)) => {
            raw::fixed_strings(&raw::dataset_bytes(dataset, &layout)?, width)
        }
        other => {
            return Err(eyre!(
                "dataset '{}' does not hold strings ({:?})",
                dataset.name(),
                other
            ))
        }
    };
    Ok(strings)
}

fn read_pandas_fixed(group: &Group) -> Result<Vec<Column>> {
    let names = read_strings(&group.dataset("axis0")?)?;
    let mut columns: Vec<Option<Column>> = vec![None; names.len()];

    let mut block = 0;
    while group.link_exists(&format!("block{}_values", block)) {
        let items = read_strings(&group.dataset(&format!("block{}_items", block))?)?;
        let values_ds = group.dataset(&format!("block{}_values", block))?;
        let values = Values::read(&values_ds)?;
        // blocks are stored transposed: rows x items
        let width = match values_ds.shape().as_slice() {
            [_, w] => *w,
            _ => 1,
        };
        if width != items.len() {
            return Err(eyre!(
                "block{} has {} columns but {} item names",
                block,
                width,
                items.len()
            ));
        }
        for (j, item) in items.iter().enumerate() {
            let position = names
                .iter()
                .position(|name| name == item)
                .ok_or_else(|| eyre!("block{} item '{}' is not in axis0", block, item))?;
            columns[position] = Some(values.column(j, width).into_column(item));
        }
        block += 1;
    }

    names
        .iter()
        .zip(columns)
        .map(|(name, column)| column.ok_or_else(|| eyre!("column '{}' has no data block", name)))
        .collect()
}

/// Member names with their link creation order, when the group records it.
fn links(group: &Group) -> Result<Vec<(String, Option<i64>)>> {
    let links = group.iter_visit_default(
        Vec::new(),
        |_, name, info: LinkInfo, acc: &mut Vec<(String, Option<i64>)>| {
            acc.push((name.to_string(), info.creation_order));
            true
        },
    )?;
    Ok(links)
}

fn column_group_members(group: &Group) -> Result<Vec<String>> {
    let mut links = links(group)?;
    if links.iter().all(|(_, order)| order.is_some()) {
        links.sort_by_key(|(_, order)| *order);
    }

    let mut names = Vec::new();
    for (name, _) in links {
        let dataset = group
            .dataset(&name)
            .map_err(|_| eyre!("'{}' in group '{}' is not a dataset", name, group.name()))?;
        if dataset.ndim() != 1 {
            return Err(eyre!(
                "column '{}' in group '{}' is not one-dimensional",
                name,
                group.name()
            ));
        }
        names.push(name);
    }
    Ok(names)
}

fn read_column_group(group: &Group) -> Result<Vec<Column>> {
    let names = column_group_members(group)?;
    let mut columns = Vec::with_capacity(names.len());
    for name in &names {
        let values = Values::read(&group.dataset(name)?)?;
        columns.push(values.into_column(name));
    }
    if let Some(first) = columns.first() {
        let height = first.len();
        if let Some(bad) = columns.iter().find(|c| c.len() != height) {
            return Err(eyre!(
                "column '{}' has {} rows, expected {}",
                bad.name(),
                bad.len(),
                height
            ));
        }
    }
    Ok(columns)
}

fn dataset_column_names(dataset: &Dataset, key: &str) -> Vec<String> {
    match dataset.shape().as_slice() {
        [_, width] => (0..*width).map(|i| i.to_string()).collect(),
        _ => vec![normalize_key(key).to_string()],
    }
}

fn read_bare_dataset(dataset: &Dataset, key: &str) -> Result<Vec<Column>> {
    let names = dataset_column_names(dataset, key);
    let values = Values::read(dataset)?;
    let width = names.len();
    Ok(names
        .iter()
        .enumerate()
        .map(|(i, name)| values.column(i, width).into_column(name))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_leading_slash() {
        assert_eq!(normalize_key("/t1"), "t1");
        assert_eq!(normalize_key("t1"), "t1");
        assert_eq!(normalize_key(""), "");
    }

    #[test]
    fn placeholder_and_missing_paths_are_not_readable() {
        assert!(!is_readable_path("", "path/to/hdf5"));
        assert!(!is_readable_path("path/to/hdf5", "path/to/hdf5"));
        assert!(!is_readable_path("missing.h5", "path/to/hdf5"));
    }

    #[test]
    fn column_takes_strided_values() {
        let values = Values::Int(vec![1, 10, 2, 20, 3, 30]);
        assert_eq!(values.column(0, 2), Values::Int(vec![1, 2, 3]));
        assert_eq!(values.column(1, 2), Values::Int(vec![10, 20, 30]));
    }

    #[test]
    fn single_column_is_identity() {
        let values = Values::Str(vec!["a".into(), "b".into()]);
        assert_eq!(values.column(0, 1), values);
    }
}
