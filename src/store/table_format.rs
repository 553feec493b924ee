//! pandas frames written with `format="table"`.
//!
//! The frame is a group holding a one-dimensional compound dataset `table`,
//! usually beside an `_i_table` index group. Apart from `index`, every field of
//! a row is either a `values_block_N` array spanning several columns or a data
//! column named after itself. Block column names are pickled into the
//! `values_block_N_kind` attribute of `table`, and the group's `non_index_axes`
//! attribute gives the frame's column order.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use hdf5::types::{CompoundField, CompoundType, TypeDescriptor};
use hdf5::{Dataset, Group};
use log::debug;
use polars::prelude::Column;

use super::pickle;
use super::raw::{self, Scalar};

const TABLE: &str = "table";
const INDEX_FIELD: &str = "index";
const BLOCK_PREFIX: &str = "values_block_";

/// True when `group` holds a pandas table-format frame.
pub fn is_table_format(group: &Group) -> bool {
    group.link_exists(TABLE)
        && group
            .dataset(TABLE)
            .is_ok_and(|table| table.ndim() == 1 && compound_type(&table).is_ok())
}

fn compound_type(table: &Dataset) -> Result<CompoundType> {
    match table.dtype()?.to_descriptor()? {
        TypeDescriptor::Compound(compound) => Ok(compound),
        other => Err(eyre!("'{}' is not a compound table ({})", table.name(), other)),
    }
}

/// A stored row field and the frame columns it holds.
struct FieldColumns {
    field: String,
    scalar: Scalar,
    /// Stored as an array type rather than a single scalar
    array: bool,
    names: Vec<String>,
}

impl FieldColumns {
    /// Layout this field is read into.
    fn layout(&self) -> TypeDescriptor {
        if self.array {
            TypeDescriptor::FixedArray(Box::new(self.scalar.layout()), self.names.len())
        } else {
            self.scalar.layout()
        }
    }
}

fn field_columns(table: &Dataset, field: &CompoundField) -> Result<FieldColumns> {
    let (element, count, array) = match &field.ty {
        TypeDescriptor::FixedArray(inner, count) => (inner.as_ref(), *count, true),
        other => (other, 1, false),
    };
    let scalar = Scalar::from_descriptor(element)
        .map_err(|e| eyre!("field '{}' of '{}': {}", field.name, table.name(), e))?;

    let names = if field.name.starts_with(BLOCK_PREFIX) {
        block_names(table, &field.name, count)
    } else if count == 1 {
        vec![field.name.clone()]
    } else {
        (0..count).map(|i| format!("{}_{}", field.name, i)).collect()
    };
    Ok(FieldColumns {
        field: field.name.clone(),
        scalar,
        array,
        names,
    })
}

/// Column names of a values block, from its pickled `_kind` attribute.
fn block_names(table: &Dataset, block: &str, count: usize) -> Vec<String> {
    let kind = format!("{}_kind", block);
    let names = table
        .attr(&kind)
        .ok()
        .and_then(|attr| raw::attr_text(&attr).ok())
        .and_then(|text| pickle::strings(&text));
    match names {
        Some(names) if names.len() == count => names,
        _ => {
            debug!("no usable {} on '{}', numbering block columns", kind, table.name());
            (0..count).map(|i| format!("{}_{}", block, i)).collect()
        }
    }
}

/// Row fields in storage order, without the index.
fn fields(table: &Dataset) -> Result<Vec<FieldColumns>> {
    let mut stored = compound_type(table)?.fields;
    stored.sort_by_key(|f| f.index);
    stored
        .iter()
        .filter(|f| f.name != INDEX_FIELD)
        .map(|f| field_columns(table, f))
        .collect()
}

/// The frame's column order, when `non_index_axes` names exactly the stored columns.
fn frame_order(group: &Group, stored: &[String]) -> Option<Vec<String>> {
    let text = raw::attr_text(&group.attr("non_index_axes").ok()?).ok()?;
    let order = pickle::strings(&text)?;
    let mut sorted_order = order.clone();
    let mut sorted_stored = stored.to_vec();
    sorted_order.sort();
    sorted_stored.sort();
    (sorted_order == sorted_stored).then_some(order)
}

pub fn column_names(group: &Group) -> Result<Vec<String>> {
    let table = group.dataset(TABLE)?;
    let stored: Vec<String> = fields(&table)?
        .into_iter()
        .flat_map(|f| f.names)
        .collect();
    Ok(frame_order(group, &stored).unwrap_or(stored))
}

pub fn read_columns(group: &Group) -> Result<Vec<Column>> {
    let table = group.dataset(TABLE)?;
    let fields = fields(&table)?;
    if fields.is_empty() {
        return Ok(Vec::new());
    }

    let layout = CompoundType {
        fields: fields
            .iter()
            .enumerate()
            .map(|(index, f)| CompoundField::new(&f.field, f.layout(), 0, index))
            .collect(),
        size: 0,
    }
    .to_packed_repr();
    let stride = layout.size;
    let bytes = raw::dataset_bytes(&table, &TypeDescriptor::Compound(layout.clone()))?;

    let mut columns = Vec::new();
    for (f, stored) in fields.iter().zip(&layout.fields) {
        let width = f.scalar.size();
        for (i, name) in f.names.iter().enumerate() {
            let values = f.scalar.column(&bytes, stride, stored.offset + i * width);
            columns.push(values.into_column(name));
        }
    }

    let stored: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();
    if let Some(order) = frame_order(group, &stored) {
        columns.sort_by_key(|c| order.iter().position(|name| name == c.name().as_str()));
    }
    Ok(columns)
}
