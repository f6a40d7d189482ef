//! Parameterized SELECT statements.
//!
//! A [`Select`] describes what to read; [`Statement`] is the rendered Oracle
//! SQL plus its binds. Values only ever travel as binds: the SQL text holds
//! `:name` placeholders and nothing supplied by a caller.

use chrono::NaiveDate;

use crate::schema::{ColumnSpec, Table};
use crate::types::ColumnInfo;

/// Oracle format mask for date-only binds.
pub const DATE_BIND_FORMAT: &str = "YYYY-MM-DD";

/// Escape character used by `LIKE` predicates.
pub const LIKE_ESCAPE: char = '\\';

/// A value bound to a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindValue {
    Text(String),
    Integer(i64),
    /// Bound as `YYYY-MM-DD` text through `TO_DATE`.
    Date(NaiveDate),
}

/// Named bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bind {
    /// Placeholder name without the leading colon.
    pub name: &'static str,
    pub value: BindValue,
}

/// A condition on one column against one bind. Conditions are AND-ed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// `column = :bind`
    Eq {
        column: &'static str,
        bind: &'static str,
    },
    /// `column LIKE :bind ESCAPE '\'`
    Like {
        column: &'static str,
        bind: &'static str,
    },
    /// `column >= TO_DATE(:bind, 'YYYY-MM-DD')`
    OnOrAfter {
        column: &'static str,
        bind: &'static str,
    },
    /// `column < TO_DATE(:bind, 'YYYY-MM-DD')`
    Before {
        column: &'static str,
        bind: &'static str,
    },
}

impl Predicate {
    pub fn column(&self) -> &'static str {
        match *self {
            Predicate::Eq { column, .. }
            | Predicate::Like { column, .. }
            | Predicate::OnOrAfter { column, .. }
            | Predicate::Before { column, .. } => column,
        }
    }

    pub fn bind(&self) -> &'static str {
        match *self {
            Predicate::Eq { bind, .. }
            | Predicate::Like { bind, .. }
            | Predicate::OnOrAfter { bind, .. }
            | Predicate::Before { bind, .. } => bind,
        }
    }

    fn render(&self, sql: &mut String) {
        match *self {
            Predicate::Eq { column, bind } => {
                sql.push_str(&format!("{} = :{}", column, bind));
            }
            Predicate::Like { column, bind } => {
                sql.push_str(&format!("{} LIKE :{} ESCAPE '{}'", column, bind, LIKE_ESCAPE));
            }
            Predicate::OnOrAfter { column, bind } => {
                sql.push_str(&format!(
                    "{} >= TO_DATE(:{}, '{}')",
                    column, bind, DATE_BIND_FORMAT
                ));
            }
            Predicate::Before { column, bind } => {
                sql.push_str(&format!(
                    "{} < TO_DATE(:{}, '{}')",
                    column, bind, DATE_BIND_FORMAT
                ));
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Builder for a single-table SELECT.
#[derive(Debug, Clone)]
pub struct Select {
    table: &'static Table,
    columns: &'static [ColumnSpec],
    predicates: Vec<Predicate>,
    order_by: Option<(&'static str, SortOrder)>,
    limit: Option<&'static str>,
    binds: Vec<Bind>,
}

impl Select {
    /// Start a SELECT of `columns` from `table`.
    pub fn new(table: &'static Table, columns: &'static [ColumnSpec]) -> Self {
        Self {
            table,
            columns,
            predicates: Vec::new(),
            order_by: None,
            limit: None,
            binds: Vec::new(),
        }
    }

    fn with_bind(mut self, predicate: Predicate, value: BindValue) -> Self {
        self.binds.push(Bind {
            name: predicate.bind(),
            value,
        });
        self.predicates.push(predicate);
        self
    }

    /// `column = :bind`
    pub fn filter_eq(self, column: &'static str, bind: &'static str, value: BindValue) -> Self {
        self.with_bind(Predicate::Eq { column, bind }, value)
    }

    /// `column LIKE :bind`, `pattern` is bound verbatim.
    pub fn filter_like(self, column: &'static str, bind: &'static str, pattern: String) -> Self {
        self.with_bind(Predicate::Like { column, bind }, BindValue::Text(pattern))
    }

    /// `column >= day` at midnight.
    pub fn filter_on_or_after(self, column: &'static str, bind: &'static str, day: NaiveDate) -> Self {
        self.with_bind(Predicate::OnOrAfter { column, bind }, BindValue::Date(day))
    }

    /// `column < day` at midnight.
    pub fn filter_before(self, column: &'static str, bind: &'static str, day: NaiveDate) -> Self {
        self.with_bind(Predicate::Before { column, bind }, BindValue::Date(day))
    }

    pub fn order_by(mut self, column: &'static str, order: SortOrder) -> Self {
        self.order_by = Some((column, order));
        self
    }

    /// Return at most `rows` rows, counted after ordering.
    pub fn fetch_first(mut self, bind: &'static str, rows: u32) -> Self {
        self.limit = Some(bind);
        self.binds.push(Bind {
            name: bind,
            value: BindValue::Integer(i64::from(rows)),
        });
        self
    }

    pub fn table(&self) -> &'static Table {
        self.table
    }

    pub fn columns(&self) -> &'static [ColumnSpec] {
        self.columns
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn ordering(&self) -> Option<(&'static str, SortOrder)> {
        self.order_by
    }

    pub fn limit_bind(&self) -> Option<&'static str> {
        self.limit
    }

    /// Render the SQL text.
    fn render(&self) -> String {
        let mut sql = String::from("SELECT ");
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&format!("{} AS {}", col.source, col.alias));
        }
        sql.push_str(" FROM ");
        sql.push_str(self.table.name);

        for (i, predicate) in self.predicates.iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            predicate.render(&mut sql);
        }

        if let Some((column, order)) = self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(column);
            if order == SortOrder::Desc {
                sql.push_str(" DESC");
            }
        }

        if let Some(bind) = self.limit {
            sql.push_str(&format!(" FETCH FIRST :{} ROWS ONLY", bind));
        }

        sql
    }

    /// Finish the statement.
    pub fn build(self) -> Statement {
        let sql = self.render();
        Statement { select: self, sql }
    }
}

/// A rendered statement with its binds.
#[derive(Debug, Clone)]
pub struct Statement {
    select: Select,
    sql: String,
}

impl Statement {
    /// SQL text with `:name` placeholders.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Binds in placeholder order.
    pub fn binds(&self) -> &[Bind] {
        &self.select.binds
    }

    /// Value bound to `name`.
    pub fn bind(&self, name: &str) -> Option<&BindValue> {
        self.select
            .binds
            .iter()
            .find(|b| b.name == name)
            .map(|b| &b.value)
    }

    /// Table the statement reads, for error context.
    pub fn table_name(&self) -> &'static str {
        self.select.table.name
    }

    pub fn select(&self) -> &Select {
        &self.select
    }

    pub fn columns(&self) -> &'static [ColumnSpec] {
        self.select.columns
    }

    /// Column info for records produced by this statement.
    pub fn column_info(&self) -> ColumnInfo {
        ColumnInfo::new(self.select.columns.iter().map(|c| c.alias))
    }
}

/// Escape `%`, `_` and the escape character itself for use in a `LIKE`
/// pattern with `ESCAPE '\'`.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch == '%' || ch == '_' || ch == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(ch);
    }
    escaped
}
