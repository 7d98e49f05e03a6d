use crate::statement::{Binder, Operand, Order, Statement};
use std::{cmp::Ordering, collections::BTreeMap, sync::Arc};
use tether_core::{
    Error, Params, QueryError, QueryResult, Result, RowLabeled, RowNames, RowsAffected, Value,
};

/// Column holding the auto incremented identifier of every table.
pub const KEY_COLUMN: &str = "id";

#[derive(Default, Debug, Clone)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    last_id: i64,
}

impl Table {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|v| v == name)
    }

    fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(i) = self.column(name) {
            return i;
        }
        self.columns.push(name.to_owned());
        for row in &mut self.rows {
            row.push(Value::Null);
        }
        self.columns.len() - 1
    }
}

/// SQL equality: `NULL` never matches, other values compare by their textual form.
fn matches(stored: &Value, value: &Value) -> bool {
    !stored.is_null() && !value.is_null() && stored.to_string() == value.to_string()
}

fn unknown_column(column: &str, clause: &str) -> Error {
    QueryError::new("42S22", format!("Unknown column '{column}' in '{clause}'")).into()
}

/// `NULL` sorts first, numbers numerically, anything else by text.
fn compare(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }
    let (a, b) = (a.to_string(), b.to_string());
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => a.cmp(&b),
    }
}

/// Tables of one memory database, created on first insert.
#[derive(Default, Debug, Clone)]
pub struct Database {
    name: String,
    tables: BTreeMap<String, Table>,
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: Default::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    fn missing_table(&self, table: &str) -> QueryError {
        QueryError::new(
            "42S02",
            format!("Table '{}.{}' doesn't exist", self.name, table),
        )
    }

    fn existing(&self, table: &str) -> Result<&Table> {
        self.tables
            .get(table)
            .ok_or_else(|| self.missing_table(table).into())
    }

    pub(crate) fn execute(&mut self, statement: Statement, params: &Params) -> Result<Vec<QueryResult>> {
        let rows = match statement {
            Statement::Select {
                table,
                columns,
                filter,
                order,
                limit,
            } => self.select(&table, columns, &filter, &order, limit, params)?,
            Statement::Insert {
                table,
                columns,
                values,
                update,
            } => return Ok(vec![self.insert(table, &columns, &values, update, params)?.into()]),
            Statement::Delete { table, filter } => {
                return Ok(vec![self.delete(&table, &filter, params)?.into()]);
            }
            Statement::ShowTables => self.show_tables(),
            Statement::Describe { table } => self.describe(&table)?,
        };
        Ok(rows.into_iter().map(QueryResult::Row).collect())
    }

    fn show_tables(&self) -> Vec<RowLabeled> {
        let labels: RowNames = Arc::new([format!("Tables_in_{}", self.name)]);
        self.tables
            .keys()
            .map(|v| RowLabeled::new(labels.clone(), Box::new([Value::Varchar(v.clone())])))
            .collect()
    }

    fn describe(&self, table: &str) -> Result<Vec<RowLabeled>> {
        let table = self.existing(table)?;
        let labels: RowNames = ["Field", "Type", "Null", "Key", "Default", "Extra"]
            .into_iter()
            .map(String::from)
            .collect();
        Ok(table
            .columns
            .iter()
            .map(|column| {
                let key = column == KEY_COLUMN;
                RowLabeled::new(
                    labels.clone(),
                    Box::new([
                        Value::Varchar(column.clone()),
                        "text".into(),
                        (if key { "NO" } else { "YES" }).into(),
                        (if key { "PRI" } else { "" }).into(),
                        Value::Null,
                        (if key { "auto_increment" } else { "" }).into(),
                    ]),
                )
            })
            .collect())
    }

    /// Column index and bound value of every `WHERE` predicate.
    fn bind_filter(
        table: &Table,
        filter: &[(String, Operand)],
        binder: &mut Binder,
    ) -> Result<Vec<(usize, Value)>> {
        filter
            .iter()
            .map(|(column, operand)| {
                let Some(i) = table.column(column) else {
                    return Err(unknown_column(column, "where clause"));
                };
                Ok((i, binder.bind(operand)?))
            })
            .collect()
    }

    fn select(
        &self,
        table: &str,
        columns: Option<Vec<String>>,
        filter: &[(String, Operand)],
        order: &[(String, Order)],
        limit: Option<(u64, u64)>,
        params: &Params,
    ) -> Result<Vec<RowLabeled>> {
        let table = self.existing(table)?;
        let filter = Self::bind_filter(table, filter, &mut Binder::new(params))?;
        let projection = match columns {
            None => (0..table.columns.len()).collect::<Vec<_>>(),
            Some(columns) => columns
                .iter()
                .map(|column| {
                    table
                        .column(column)
                        .ok_or_else(|| unknown_column(column, "field list"))
                })
                .collect::<Result<Vec<_>>>()?,
        };
        let order = order
            .iter()
            .map(|(column, mode)| {
                table
                    .column(column)
                    .map(|i| (i, *mode))
                    .ok_or_else(|| unknown_column(column, "order clause"))
            })
            .collect::<Result<Vec<_>>>()?;
        let mut rows = table
            .rows
            .iter()
            .filter(|row| filter.iter().all(|(i, v)| matches(&row[*i], v)))
            .collect::<Vec<_>>();
        rows.sort_by(|a, b| {
            order
                .iter()
                .map(|(i, mode)| match mode {
                    Order::Asc => compare(&a[*i], &b[*i]),
                    Order::Desc => compare(&b[*i], &a[*i]),
                })
                .find(|v| v.is_ne())
                .unwrap_or(Ordering::Equal)
        });
        let (offset, count) = limit.unwrap_or((0, u64::MAX));
        let labels: RowNames = projection
            .iter()
            .map(|i| table.columns[*i].clone())
            .collect();
        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(count.min(usize::MAX as u64) as usize)
            .map(|row| {
                RowLabeled::new(
                    labels.clone(),
                    projection.iter().map(|i| row[*i].clone()).collect(),
                )
            })
            .collect())
    }

    /// Insert one row. A row whose key already exists is updated when `update` is not empty
    /// and rejected otherwise. A missing key is generated.
    fn insert(
        &mut self,
        table: String,
        columns: &[String],
        values: &[Operand],
        update: Vec<(String, Operand)>,
        params: &Params,
    ) -> Result<RowsAffected> {
        let mut binder = Binder::new(params);
        let values = values
            .iter()
            .map(|v| binder.bind(v))
            .collect::<Result<Vec<_>>>()?;
        let update = update
            .into_iter()
            .map(|(column, operand)| Ok((column, binder.bind(&operand)?)))
            .collect::<Result<Vec<_>>>()?;
        let table = self.tables.entry(table).or_default();
        let key = columns
            .iter()
            .position(|v| v == KEY_COLUMN)
            .map(|i| &values[i]);
        let existing = match (key, table.column(KEY_COLUMN)) {
            (Some(key), Some(column)) => table.rows.iter().position(|v| matches(&v[column], key)),
            _ => None,
        };
        if let (Some(existing), Some(key)) = (existing, key) {
            if update.is_empty() {
                return Err(QueryError::new(
                    "23000",
                    format!("Duplicate entry '{key}' for key 'PRIMARY'"),
                )
                .into());
            }
            for (column, value) in update {
                let i = table.ensure_column(&column);
                table.rows[existing][i] = value;
            }
            return Ok(RowsAffected {
                rows_affected: 2,
                last_affected_id: None,
            });
        }
        let indices = columns
            .iter()
            .map(|v| table.ensure_column(v))
            .collect::<Vec<_>>();
        let mut row = vec![Value::Null; table.columns.len()];
        for (i, value) in indices.into_iter().zip(values) {
            row[i] = value;
        }
        let mut last_affected_id = None;
        match table.column(KEY_COLUMN) {
            Some(key) if row[key].is_null() => {
                table.last_id += 1;
                row[key] = Value::Int64(table.last_id);
                last_affected_id = Some(table.last_id);
            }
            Some(key) => {
                if let Ok(id) = row[key].to_string().parse::<i64>() {
                    table.last_id = table.last_id.max(id);
                }
            }
            None => {}
        }
        table.rows.push(row);
        Ok(RowsAffected {
            rows_affected: 1,
            last_affected_id,
        })
    }

    fn delete(
        &mut self,
        table: &str,
        filter: &[(String, Operand)],
        params: &Params,
    ) -> Result<RowsAffected> {
        let missing = self.missing_table(table);
        let Some(table) = self.tables.get_mut(table) else {
            return Err(missing.into());
        };
        let filter = Self::bind_filter(table, filter, &mut Binder::new(params))?;
        let before = table.rows.len();
        table
            .rows
            .retain(|row| !filter.iter().all(|(i, v)| matches(&row[*i], v)));
        Ok(RowsAffected {
            rows_affected: (before - table.rows.len()) as u64,
            last_affected_id: None,
        })
    }
}
