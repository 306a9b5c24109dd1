//! Row query builder for the backend's REST row API.
//!
//! A `Query` names a table, the columns (and embedded joins) to select, and a
//! list of filters, then renders to the `?select=...&col=op.value` parameter
//! form the row API understands.

use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq(String, String),
    Gte(String, String),
    Lte(String, String),
    In(String, Vec<String>),
}

impl Filter {
    fn to_param(&self) -> (String, String) {
        match self {
            Filter::Eq(col, v) => (col.clone(), format!("eq.{}", v)),
            Filter::Gte(col, v) => (col.clone(), format!("gte.{}", v)),
            Filter::Lte(col, v) => (col.clone(), format!("lte.{}", v)),
            Filter::In(col, values) => (col.clone(), format!("in.({})", values.join(","))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    table: String,
    select: String,
    filters: Vec<Filter>,
    order: Option<(String, bool)>,
    limit: Option<usize>,
}

impl Query {
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            table: name.into(),
            select: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    /// Columns to return; embedded joins use `child(*)` syntax.
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = columns.into();
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Display) -> Self {
        self.filters.push(Filter::Eq(column.into(), value.to_string()));
        self
    }

    pub fn gte(mut self, column: impl Into<String>, value: impl Display) -> Self {
        self.filters.push(Filter::Gte(column.into(), value.to_string()));
        self
    }

    pub fn lte(mut self, column: impl Into<String>, value: impl Display) -> Self {
        self.filters.push(Filter::Lte(column.into(), value.to_string()));
        self
    }

    pub fn in_list<V: Display>(mut self, column: impl Into<String>, values: &[V]) -> Self {
        let values = values.iter().map(|v| v.to_string()).collect();
        self.filters.push(Filter::In(column.into(), values));
        self
    }

    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some((column.into(), ascending));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Render as query-string pairs. Repeated columns (e.g. a date range) are
    /// emitted as repeated parameters.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.select.clone())];
        params.extend(self.filters.iter().map(Filter::to_param));
        if let Some((ref col, ascending)) = self.order {
            let dir = if ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{}", col, dir)));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }

    /// Only the filter pairs, for PATCH requests where select/order/limit
    /// don't apply.
    pub fn filter_params(&self) -> Vec<(String, String)> {
        self.filters.iter().map(Filter::to_param).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_params() {
        let q = Query::table("attendance")
            .eq("student_id", "s1")
            .gte("date", "2024-01-01")
            .lte("date", "2024-01-31")
            .order("date", false)
            .limit(30);

        assert_eq!(q.table_name(), "attendance");
        assert_eq!(
            q.to_params(),
            vec![
                ("select".to_string(), "*".to_string()),
                ("student_id".to_string(), "eq.s1".to_string()),
                ("date".to_string(), "gte.2024-01-01".to_string()),
                ("date".to_string(), "lte.2024-01-31".to_string()),
                ("order".to_string(), "date.desc".to_string()),
                ("limit".to_string(), "30".to_string()),
            ]
        );
    }

    #[test]
    fn test_in_filter_and_join_select() {
        let q = Query::table("assignments")
            .select("*,assignment_submissions(*)")
            .in_list("class_id", &["c1", "c2"]);
        let params = q.to_params();
        assert_eq!(params[0].1, "*,assignment_submissions(*)");
        assert_eq!(params[1], ("class_id".to_string(), "in.(c1,c2)".to_string()));
        assert_eq!(q.filter_params().len(), 1);
    }
}
