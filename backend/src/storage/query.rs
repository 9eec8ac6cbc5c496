//! Parameter-bound `WHERE` clause construction
//!
//! Every value goes through `push_bind`; only static column names and
//! fixed SQL fragments are spliced into the text.

use shared::DateRange;
use sqlx::{Encode, QueryBuilder, Sqlite, Type};

pub struct SqlFilter<'a> {
    builder: QueryBuilder<'a, Sqlite>,
    has_where: bool,
}

impl<'a> SqlFilter<'a> {
    pub fn new(select: &str) -> Self {
        Self {
            builder: QueryBuilder::new(select),
            has_where: false,
        }
    }

    fn clause(&mut self) -> &mut QueryBuilder<'a, Sqlite> {
        self.builder
            .push(if self.has_where { " AND " } else { " WHERE " });
        self.has_where = true;
        &mut self.builder
    }

    pub fn eq<T>(&mut self, column: &'static str, value: T) -> &mut Self
    where
        T: 'a + Encode<'a, Sqlite> + Send + Type<Sqlite>,
    {
        self.clause().push(column).push(" = ").push_bind(value);
        self
    }

    pub fn eq_opt<T>(&mut self, column: &'static str, value: Option<T>) -> &mut Self
    where
        T: 'a + Encode<'a, Sqlite> + Send + Type<Sqlite>,
    {
        if let Some(value) = value {
            self.eq(column, value);
        }
        self
    }

    /// `column IN (...)`; an empty list adds no condition
    pub fn in_list(&mut self, column: &'static str, values: &'a [String]) -> &mut Self {
        if values.is_empty() {
            return self;
        }
        let builder = self.clause();
        builder.push(column).push(" IN (");
        let mut separated = builder.separated(", ");
        for value in values {
            separated.push_bind(value.as_str());
        }
        separated.push_unseparated(")");
        self
    }

    /// Substring match on any of `columns`; a blank term adds no condition
    pub fn search(&mut self, columns: &[&'static str], term: Option<&str>) -> &mut Self {
        let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) else {
            return self;
        };
        let pattern = format!("%{}%", term);
        let builder = self.clause();
        builder.push("(");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                builder.push(" OR ");
            }
            builder.push(*column).push(" LIKE ").push_bind(pattern.clone());
        }
        builder.push(")");
        self
    }

    /// Inclusive date window on a `YYYY-MM-DD` column
    pub fn date_range(&mut self, column: &'static str, range: Option<DateRange>) -> &mut Self {
        if let Some(range) = range {
            self.clause()
                .push(column)
                .push(" >= ")
                .push_bind(range.start)
                .push(" AND ")
                .push(column)
                .push(" <= ")
                .push_bind(range.end);
        }
        self
    }

    /// Bind a value for a placeholder inside a fixed fragment, e.g. a join condition
    pub fn push_bind<T>(&mut self, value: T) -> &mut Self
    where
        T: 'a + Encode<'a, Sqlite> + Send + Type<Sqlite>,
    {
        self.builder.push_bind(value);
        self
    }

    /// Append a fixed fragment such as an `ORDER BY`
    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.builder.push(sql);
        self
    }

    pub fn finish(self) -> QueryBuilder<'a, Sqlite> {
        self.builder
    }
}
