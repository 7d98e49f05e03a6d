use crate::separated_by;
use std::fmt::{self, Display, Formatter};

/// Incrementally assembled SQL statement.
///
/// Fragments are kept in groups and compiled in a fixed order (operation, where, order, limit,
/// literal) regardless of the order the builder methods were called in. Fragments are never
/// removed, the same query can be compiled any number of times.
///
/// `where_eq` predicates use `?` positional placeholders, `insert` columns use `:name` named
/// placeholders.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Query {
    operation: Vec<String>,
    conditions: Vec<String>,
    order: Vec<String>,
    limit: Vec<String>,
    literal: Vec<String>,
}

impl Query {
    /// Seed a query with a raw base statement.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: vec![operation.into()],
            ..Default::default()
        }
    }

    /// `SELECT * FROM table`
    pub fn select(table: impl Display) -> Self {
        Self::new(format!("SELECT * FROM {table}"))
    }

    /// `SELECT f1, f2 FROM table`
    pub fn select_fields(table: impl Display, fields: &[&str]) -> Self {
        let mut out = String::from("SELECT ");
        separated_by(&mut out, fields, |out, v| out.push_str(v), ", ");
        out.push_str(" FROM ");
        out.push_str(&table.to_string());
        Self::new(out)
    }

    pub fn delete(table: impl Display) -> Self {
        Self::new(format!("DELETE FROM {table}"))
    }

    /// `INSERT INTO table (c1, c2) VALUES(:c1, :c2)`, followed by
    /// `ON DUPLICATE KEY UPDATE c = :c, ...` when `update` is not empty.
    pub fn insert(table: impl Display, columns: &[&str], update: &[&str]) -> Self {
        let mut out = format!("INSERT INTO {table} (");
        separated_by(&mut out, columns, |out, v| out.push_str(v), ", ");
        out.push_str(") VALUES(");
        separated_by(
            &mut out,
            columns,
            |out, v| {
                out.push(':');
                out.push_str(v);
            },
            ", ",
        );
        out.push(')');
        if !update.is_empty() {
            out.push_str(" ON DUPLICATE KEY UPDATE ");
            separated_by(
                &mut out,
                update,
                |out, v| {
                    out.push_str(v);
                    out.push_str(" = :");
                    out.push_str(v);
                },
                ", ",
            );
        }
        Self::new(out)
    }

    pub fn describe(table: impl Display) -> Self {
        Self::new(format!("DESCRIBE {table}"))
    }

    pub fn show_tables() -> Self {
        Self::new("SHOW TABLES")
    }

    /// Append one `column = ?` predicate per column, the first one introduced by `WHERE` and
    /// the following ones by `AND`.
    pub fn where_eq(mut self, columns: &[&str]) -> Self {
        for column in columns {
            let keyword = if self.conditions.is_empty() {
                "WHERE"
            } else {
                "AND"
            };
            self.conditions.push(format!("{keyword} {column} = ?"));
        }
        self
    }

    /// `ORDER BY column MODE`, mode is upper-cased and may be empty.
    pub fn order(mut self, column: &str, mode: &str) -> Self {
        self.order
            .push(format!("ORDER BY {column} {}", mode.to_uppercase()));
        self
    }

    /// `ORDER BY c1 MODE1, c2 MODE2`, preserving the order of `columns`.
    pub fn order_by(mut self, columns: &[(&str, &str)]) -> Self {
        let mut out = String::from("ORDER BY ");
        separated_by(
            &mut out,
            columns,
            |out, (column, mode)| {
                out.push_str(column);
                out.push(' ');
                out.push_str(&mode.to_uppercase());
            },
            ", ",
        );
        self.order.push(out);
        self
    }

    /// `LIMIT count`
    pub fn limit(mut self, count: u64) -> Self {
        self.limit.push(format!("LIMIT {count}"));
        self
    }

    /// `LIMIT start, count`
    pub fn limit_offset(mut self, start: u64, count: u64) -> Self {
        self.limit.push(format!("LIMIT {start}, {count}"));
        self
    }

    /// Append raw SQL after every other fragment.
    pub fn literal(mut self, sql: impl Into<String>) -> Self {
        self.literal.push(sql.into());
        self
    }

    /// Statement text with whitespace runs collapsed to a single space.
    pub fn compile(&self) -> String {
        let mut out = String::with_capacity(128);
        for fragment in [
            &self.operation,
            &self.conditions,
            &self.order,
            &self.limit,
            &self.literal,
        ]
        .into_iter()
        .flatten()
        {
            for word in fragment.split_whitespace() {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(word);
            }
        }
        out
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compile())
    }
}

impl From<Query> for String {
    fn from(value: Query) -> Self {
        value.compile()
    }
}

impl From<&Query> for String {
    fn from(value: &Query) -> Self {
        value.compile()
    }
}
