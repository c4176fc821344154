//! Table field model
//!
//! Columns plus rows of cell controls. The form draws straight from `rows`,
//! so a removed row disappears from the screen and the output together.

use crate::errors::{AppError, AppResult};
use crate::model::field::FieldControl;
use crate::model::output::FieldChange;
use crate::model::schema::{ColumnDefinition, FieldDefinition};
use serde_json::{Map, Value};
use tracing::warn;

/// One row: a cell control per data column, in column order
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub cells: Vec<FieldControl>,
}

impl TableRow {
    fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .cells
            .iter()
            .map(|cell| (cell.key().to_string(), cell.value()))
            .collect();
        Value::Object(map)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableModel {
    key: String,
    columns: Vec<ColumnDefinition>,
    rows: Vec<TableRow>,
    cursor_row: usize,
    cursor_col: usize,
}

impl TableModel {
    pub fn new(def: &FieldDefinition) -> AppResult<Self> {
        Ok(Self {
            key: def.key.clone(),
            columns: def.columns()?,
            rows: Vec::new(),
            cursor_row: 0,
            cursor_col: 0,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Data-bearing columns
    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    /// Columns as drawn, with the delete-row action column last
    pub fn display_columns(&self) -> Vec<ColumnDefinition> {
        let mut columns = self.columns.clone();
        columns.push(ColumnDefinition::action());
        columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn table_rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Row dicts keyed by column key
    pub fn rows(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| match row.to_value() {
                Value::Object(map) => map,
                _ => Map::new(),
            })
            .collect()
    }

    pub fn value(&self) -> Value {
        Value::Array(self.rows().into_iter().map(Value::Object).collect())
    }

    /// The change carrying the whole row list
    pub fn change(&self) -> FieldChange {
        FieldChange::new(self.key.clone(), self.value())
    }

    fn build_row(&self, initial: Option<&Map<String, Value>>) -> AppResult<TableRow> {
        let mut cells = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let Some(def) = column.as_field() else {
                continue;
            };
            let mut cell = FieldControl::build(&def)?;
            if let Some(value) = initial.and_then(|m| m.get(&column.key)) {
                cell.load_value(value)?;
            }
            cells.push(cell);
        }
        Ok(TableRow { cells })
    }

    pub fn add_row(&mut self, initial: Option<&Map<String, Value>>) -> AppResult<FieldChange> {
        let row = self.build_row(initial)?;
        self.rows.push(row);
        self.cursor_row = self.rows.len() - 1;
        Ok(self.change())
    }

    pub fn remove_row(&mut self, index: usize) -> AppResult<FieldChange> {
        if index >= self.rows.len() {
            return Err(AppError::Wiring(format!(
                "row {} out of range for table '{}' ({} rows)",
                index,
                self.key,
                self.rows.len()
            )));
        }
        self.rows.remove(index);
        self.clamp_cursor();
        Ok(self.change())
    }

    pub fn set_cell(&mut self, row: usize, key: &str, value: &Value) -> AppResult<FieldChange> {
        let cell = self.cell_by_key_mut(row, key)?;
        cell.load_value(value)?;
        Ok(self.change())
    }

    fn cell_by_key_mut(&mut self, row: usize, key: &str) -> AppResult<&mut FieldControl> {
        let row_count = self.rows.len();
        let table_key = self.key.clone();
        let Some(table_row) = self.rows.get_mut(row) else {
            return Err(AppError::Wiring(format!(
                "row {} out of range for table '{}' ({} rows)",
                row, table_key, row_count
            )));
        };
        table_row
            .cells
            .iter_mut()
            .find(|c| c.key() == key)
            .ok_or_else(|| {
                AppError::Wiring(format!("table '{}' has no column '{}'", table_key, key))
            })
    }

    pub fn clear(&mut self) -> FieldChange {
        self.rows.clear();
        self.cursor_row = 0;
        self.change()
    }

    /// Replace all rows
    pub fn populate(&mut self, rows: &[Map<String, Value>]) -> AppResult<FieldChange> {
        self.rows.clear();
        for row in rows {
            let built = self.build_row(Some(row))?;
            self.rows.push(built);
        }
        self.cursor_row = 0;
        Ok(self.change())
    }

    /// Sync from a stored list of row dicts; non-list values clear the table
    pub fn load_value(&mut self, value: &Value) -> AppResult<FieldChange> {
        let rows: Vec<Map<String, Value>> = match value {
            Value::Array(items) => items
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .collect(),
            _ => Vec::new(),
        };
        self.populate(&rows)
    }

    // ─── Cursor ─────────────────────────────────────────────────────────

    /// `(row, column)`; the column index counts the action column too
    pub fn cursor(&self) -> (usize, usize) {
        (self.cursor_row, self.cursor_col)
    }

    pub fn move_cursor(&mut self, d_row: isize, d_col: isize) {
        let rows = self.rows.len();
        let cols = self.columns.len() + 1;
        if rows > 0 {
            self.cursor_row = self.cursor_row.saturating_add_signed(d_row).min(rows - 1);
        }
        self.cursor_col = self.cursor_col.saturating_add_signed(d_col).min(cols - 1);
    }

    pub fn cursor_on_action(&self) -> bool {
        self.cursor_col == self.columns.len()
    }

    /// Cell control under the cursor, `None` on the action column or an empty table
    pub fn cursor_cell_mut(&mut self) -> Option<&mut FieldControl> {
        let col = self.cursor_col;
        self.rows
            .get_mut(self.cursor_row)
            .and_then(|row| row.cells.get_mut(col))
    }

    fn clamp_cursor(&mut self) {
        self.cursor_row = self.cursor_row.min(self.rows.len().saturating_sub(1));
    }
}

/// Turn query result rows into row dicts for a table
///
/// Binds by name when every result column is a declared column key, falls back
/// to position when the counts match, otherwise refuses.
pub fn bind_result_rows(
    columns: &[ColumnDefinition],
    result_columns: &[String],
    rows: &[Vec<Value>],
) -> AppResult<Vec<Map<String, Value>>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let data_columns: Vec<&ColumnDefinition> = columns.iter().filter(|c| !c.is_action()).collect();

    let by_name = !result_columns.is_empty()
        && result_columns
            .iter()
            .all(|name| data_columns.iter().any(|c| &c.key == name));

    let keys: Vec<String> = if by_name {
        result_columns.to_vec()
    } else if result_columns.len() == data_columns.len() {
        warn!(
            "binding {} result columns by position: {:?}",
            result_columns.len(),
            result_columns
        );
        data_columns.iter().map(|c| c.key.clone()).collect()
    } else {
        let declared: Vec<&str> = data_columns.iter().map(|c| c.key.as_str()).collect();
        return Err(AppError::Query(format!(
            "result columns {:?} do not match table columns {:?}",
            result_columns, declared
        )));
    };

    Ok(rows
        .iter()
        .map(|row| {
            keys.iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect::<Map<String, Value>>()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::schema::FieldType;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn table_def() -> FieldDefinition {
        FieldDefinition::new("fields", FieldType::Table, "Fields").with_values(vec![
            json!({"key": "name", "name": "Name", "type": "text"}),
            json!({"key": "type", "name": "Type", "type": "select", "values": ["table", "view"]}),
            json!({"key": "active", "name": "Active", "type": "boolean"}),
        ])
    }

    fn row(name: &str) -> Map<String, Value> {
        json!({"name": name}).as_object().cloned().unwrap()
    }

    #[test]
    fn test_add_add_remove_first() {
        let mut table = TableModel::new(&table_def()).unwrap();
        table.add_row(Some(&row("first"))).unwrap();
        table.add_row(Some(&row("second"))).unwrap();
        let change = table.remove_row(0).unwrap();

        assert_eq!(table.row_count(), 1);
        assert_eq!(table.table_rows().len(), table.rows().len());
        assert_eq!(
            change.value,
            json!([{"name": "second", "type": "table", "active": 0}])
        );
    }

    #[test]
    fn test_remove_out_of_range_is_error() {
        let mut table = TableModel::new(&table_def()).unwrap();
        assert!(table.remove_row(0).is_err());
        table.add_row(None).unwrap();
        assert!(table.set_cell(3, "name", &json!("x")).is_err());
        assert!(table.set_cell(0, "nope", &json!("x")).is_err());
    }

    #[test]
    fn test_set_cell_coerces_through_cell_control() {
        let mut table = TableModel::new(&table_def()).unwrap();
        table.add_row(None).unwrap();
        table.set_cell(0, "active", &json!("t")).unwrap();
        let change = table.set_cell(0, "type", &json!("view")).unwrap();
        assert_eq!(change.key, "fields");
        assert_eq!(
            change.value,
            json!([{"name": "", "type": "view", "active": 1}])
        );
    }

    #[test]
    fn test_display_columns_end_with_action() {
        let table = TableModel::new(&table_def()).unwrap();
        let columns = table.display_columns();
        assert_eq!(columns.len(), 4);
        assert!(columns[3].is_action());
        assert!(!table.columns().iter().any(|c| c.is_action()));
    }

    #[test]
    fn test_clear_and_populate() {
        let mut table = TableModel::new(&table_def()).unwrap();
        table.populate(&[row("a"), row("b")]).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.clear().value, json!([]));
    }

    #[test]
    fn test_cursor_stays_inside_grid() {
        let mut table = TableModel::new(&table_def()).unwrap();
        table.add_row(None).unwrap();
        table.add_row(None).unwrap();
        table.move_cursor(5, 9);
        assert_eq!(table.cursor(), (1, 3));
        assert!(table.cursor_on_action());
        assert!(table.cursor_cell_mut().is_none());
        table.move_cursor(-5, -9);
        assert_eq!(table.cursor(), (0, 0));
        assert!(table.cursor_cell_mut().is_some());
    }

    #[test]
    fn test_bind_by_name() {
        let table = TableModel::new(&table_def()).unwrap();
        let rows = bind_result_rows(
            table.columns(),
            &["active".to_string(), "name".to_string()],
            &[vec![json!("t"), json!("id")]],
        )
        .unwrap();
        assert_eq!(rows[0].get("name"), Some(&json!("id")));
        assert_eq!(rows[0].get("active"), Some(&json!("t")));
    }

    #[test]
    fn test_bind_by_position_when_counts_match() {
        let table = TableModel::new(&table_def()).unwrap();
        let rows = bind_result_rows(
            table.columns(),
            &["column_name".to_string(), "kind".to_string(), "enabled".to_string()],
            &[vec![json!("id"), json!("view"), json!("1")]],
        )
        .unwrap();
        assert_eq!(
            Value::Object(rows[0].clone()),
            json!({"name": "id", "type": "view", "active": "1"})
        );
    }

    #[test]
    fn test_bind_mismatch_is_query_error() {
        let table = TableModel::new(&table_def()).unwrap();
        let err = bind_result_rows(
            table.columns(),
            &["column_name".to_string()],
            &[vec![json!("id")]],
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Query(_)));
    }

    #[test]
    fn test_bind_no_rows_clears() {
        let table = TableModel::new(&table_def()).unwrap();
        assert!(bind_result_rows(table.columns(), &[], &[]).unwrap().is_empty());
    }
}
