//! Column projection for the active view
//!
//! Merges the schema with the view's layout entries into the ordered column
//! list, and translates persisted filters and sorts from column ids to the
//! column names the evaluators work with.

use std::collections::HashMap;

use log::warn;

use crate::models::{
    Column, ColumnFilter, ColumnId, ColumnLayout, Filter, SortKey, SortRecord, View,
    ViewColumnDraft,
};

/// A column as placed by the active view
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedColumn {
    /// Schema definition
    pub column: Column,

    /// Whether the column is shown
    pub visible: bool,

    /// Width configured for the view
    pub width_px: Option<u32>,

    /// Index in the view's column order
    pub index: usize,
}

/// Every column of the table in the active view's order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    columns: Vec<OrderedColumn>,
}

impl Projection {
    /// Order `columns` by the view's layouts
    ///
    /// Columns with a layout come first, by `position_num` (layouts without
    /// a position after those with one, ties in schema order). Columns
    /// without a layout follow in schema order and are visible.
    pub fn build(columns: &[Column], layouts: &[ColumnLayout]) -> Self {
        let by_column: HashMap<ColumnId, &ColumnLayout> =
            layouts.iter().map(|l| (l.column_id, l)).collect();

        let mut placed: Vec<(usize, &Column, &ColumnLayout)> = Vec::new();
        let mut rest: Vec<&Column> = Vec::new();

        for (schema_index, column) in columns.iter().enumerate() {
            match by_column.get(&column.id) {
                Some(layout) => placed.push((schema_index, column, layout)),
                None => rest.push(column),
            }
        }

        placed.sort_by_key(|(schema_index, _, layout)| {
            (layout.position.is_none(), layout.position, *schema_index)
        });

        let columns = placed
            .into_iter()
            .map(|(_, column, layout)| (column, layout.visible, layout.width_px))
            .chain(rest.into_iter().map(|column| (column, true, None)))
            .enumerate()
            .map(|(index, (column, visible, width_px))| OrderedColumn {
                column: column.clone(),
                visible,
                width_px,
                index,
            })
            .collect();

        Projection { columns }
    }

    /// All columns, hidden ones included, in view order
    pub fn columns(&self) -> &[OrderedColumn] {
        &self.columns
    }

    /// Shown columns in view order
    pub fn visible_columns(&self) -> Vec<OrderedColumn> {
        self.columns.iter().filter(|c| c.visible).cloned().collect()
    }

    /// Visibility per column name; columns without a layout are visible
    pub fn column_visibility(&self) -> HashMap<String, bool> {
        self.columns
            .iter()
            .map(|c| (c.column.name.clone(), c.visible))
            .collect()
    }

    /// Column names in view order
    pub fn ordered_column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.column.name.clone()).collect()
    }
}

/// Persisted filters translated to column names
///
/// Filters on columns missing from the schema are dropped.
pub fn active_filters(columns: &[Column], filters: &[ColumnFilter]) -> Vec<Filter> {
    filters
        .iter()
        .filter_map(|f| match columns.iter().find(|c| c.id == f.column_id) {
            Some(column) => Some(Filter {
                column: column.name.clone(),
                condition: f.condition,
                value: f.value.clone(),
            }),
            None => {
                warn!("Filter {} references unknown column {}, skipped", f.id, f.column_id);
                None
            }
        })
        .collect()
}

/// Sort chain of a view
///
/// Sort entries are the model; the view's legacy `sort_by` /
/// `sort_direction` pair is read only when there are no entries and
/// `legacy_fallback` is set.
pub fn sort_chain(columns: &[Column], view: &View, sorts: &[SortRecord], legacy_fallback: bool) -> Vec<SortKey> {
    let name_of = |id: ColumnId| columns.iter().find(|c| c.id == id).map(|c| c.name.clone());

    if sorts.is_empty() {
        if !legacy_fallback {
            return Vec::new();
        }
        return view
            .sort_by
            .and_then(name_of)
            .map(|column| {
                vec![SortKey {
                    column,
                    direction: view.sort_direction.unwrap_or_default(),
                }]
            })
            .unwrap_or_default();
    }

    sorts
        .iter()
        .filter_map(|s| {
            name_of(s.column_id).map(|column| SortKey {
                column,
                direction: s.direction,
            })
        })
        .collect()
}

/// A layout write needed to apply a column move
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutChange {
    /// The column has no layout entry yet
    Create(ViewColumnDraft),

    /// The column's layout entry gets a new position
    Update(ColumnLayout),
}

impl LayoutChange {
    /// Column the change applies to
    pub fn column_id(&self) -> ColumnId {
        match self {
            LayoutChange::Create(draft) => draft.column_id,
            LayoutChange::Update(layout) => layout.column_id,
        }
    }
}

/// Layout writes that move `column_id` to `to_index` in the view order
///
/// Positions are renumbered `0..n` over the whole order and only columns
/// whose position changes are written. Filter entries are never touched.
pub fn plan_column_move(
    view_id: i64,
    columns: &[Column],
    layouts: &[ColumnLayout],
    column_id: ColumnId,
    to_index: usize,
) -> Option<Vec<LayoutChange>> {
    let projection = Projection::build(columns, layouts);
    let mut order: Vec<&OrderedColumn> = projection.columns().iter().collect();

    let from = order.iter().position(|c| c.column.id == column_id)?;
    let moved = order.remove(from);
    order.insert(to_index.min(order.len()), moved);

    let changes = order
        .iter()
        .enumerate()
        .filter_map(|(index, placed)| {
            let position = index as i64;
            match layouts.iter().find(|l| l.column_id == placed.column.id) {
                Some(layout) if layout.position == Some(position) => None,
                Some(layout) => Some(LayoutChange::Update(ColumnLayout {
                    position: Some(position),
                    ..layout.clone()
                })),
                None => Some(LayoutChange::Create(ViewColumnDraft::layout(
                    view_id,
                    placed.column.id,
                    placed.visible,
                    Some(position),
                    None,
                ))),
            }
        })
        .collect();

    Some(changes)
}
