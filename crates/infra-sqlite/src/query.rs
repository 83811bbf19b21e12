// Query Builder - parameterized SQL from ordered named values

use batchdesk_core::domain::{JobKind, JobStatus};
use std::fmt;

/// Scalar bound to a placeholder
///
/// Integers and floats stay numeric. Everything else is carried as text
/// (booleans become "true"/"false", enums their display names).
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "null"),
            SqlValue::Int(v) => write!(f, "{}", v),
            SqlValue::Float(v) => write!(f, "{}", v),
            SqlValue::Text(v) => write!(f, "'{}'", v),
        }
    }
}

macro_rules! sql_int {
    ($($t:ty),*) => {
        $(impl From<$t> for SqlValue {
            fn from(v: $t) -> Self {
                SqlValue::Int(i64::from(v))
            }
        })*
    };
}

sql_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        SqlValue::Float(f64::from(v))
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<JobKind> for SqlValue {
    fn from(v: JobKind) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<JobStatus> for SqlValue {
    fn from(v: JobStatus) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// One column binding
#[derive(Debug, Clone, PartialEq)]
pub struct NamedValue {
    pub name: String,
    pub value: SqlValue,
}

/// Ordered column bindings; order decides placeholder numbering
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueSet(Vec<NamedValue>);

impl ValueSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<SqlValue>) {
        self.0.push(NamedValue {
            name: name.into(),
            value: value.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedValue> {
        self.0.iter()
    }

    fn values(&self) -> impl Iterator<Item = SqlValue> + '_ {
        self.0.iter().map(|nv| nv.value.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Insert,
    Update { params: usize },
    Delete,
    Select,
}

/// SQL text plus its arguments, in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<SqlValue>,
    pub kind: StatementKind,
}

impl Statement {
    /// Number of `$n` placeholders in the SQL text
    pub fn placeholder_count(&self) -> usize {
        let bytes = self.sql.as_bytes();
        bytes
            .iter()
            .enumerate()
            .filter(|(i, b)| {
                **b == b'$' && bytes.get(i + 1).map_or(false, |next| next.is_ascii_digit())
            })
            .count()
    }
}

/// `insert into t (a, b) values ($1, $2)`; no values gives `default values`
pub fn insert(table: &str, values: &ValueSet) -> Statement {
    let sql = if values.is_empty() {
        format!("insert into {} default values", table)
    } else {
        let names: Vec<&str> = values.iter().map(|nv| nv.name.as_str()).collect();
        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("${}", i)).collect();
        format!(
            "insert into {} ({}) values ({})",
            table,
            names.join(", "),
            placeholders.join(", ")
        )
    };
    Statement {
        sql,
        args: values.values().collect(),
        kind: StatementKind::Insert,
    }
}

/// Insert plus `returning <pk>`
pub fn insert_returning(table: &str, primary_key: &str, values: &ValueSet) -> Statement {
    let mut statement = insert(table, values);
    statement.sql.push_str(" returning ");
    statement.sql.push_str(primary_key);
    statement
}

/// `update t set a = $1 where 1=1 and f = $2`; numbering runs params then filters
pub fn update(table: &str, params: &ValueSet, filters: &ValueSet) -> Statement {
    let set: Vec<String> = params
        .iter()
        .enumerate()
        .map(|(i, nv)| format!("{} = ${}", nv.name, i + 1))
        .collect();
    let mut sql = format!("update {} set {} where 1=1", table, set.join(", "));
    push_filters(&mut sql, filters, params.len());

    Statement {
        sql,
        args: params.values().chain(filters.values()).collect(),
        kind: StatementKind::Update {
            params: params.len(),
        },
    }
}

/// `delete from t where 1=1 and f = $1`; no filters empties the table
pub fn delete(table: &str, filters: &ValueSet) -> Statement {
    let mut sql = format!("delete from {} where 1=1", table);
    push_filters(&mut sql, filters, 0);
    Statement {
        sql,
        args: filters.values().collect(),
        kind: StatementKind::Delete,
    }
}

/// Caller-written SQL; only the arguments are marshaled
pub fn select(sql: impl Into<String>, args: &ValueSet) -> Statement {
    Statement {
        sql: sql.into(),
        args: args.values().collect(),
        kind: StatementKind::Select,
    }
}

fn push_filters(sql: &mut String, filters: &ValueSet, offset: usize) {
    for (i, nv) in filters.iter().enumerate() {
        sql.push_str(&format!(" and {} = ${}", nv.name, offset + i + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_numbering_and_args() {
        let values = ValueSet::new().with("job_id", 7_i64).with("position", 3_i64);
        let stmt = insert("job_items", &values);

        assert_eq!(stmt.sql, "insert into job_items (job_id, position) values ($1, $2)");
        assert_eq!(stmt.args, vec![SqlValue::Int(7), SqlValue::Int(3)]);
        assert_eq!(stmt.kind, StatementKind::Insert);
    }

    #[test]
    fn test_insert_empty_uses_default_values() {
        let stmt = insert("jobs", &ValueSet::new());
        assert_eq!(stmt.sql, "insert into jobs default values");
        assert!(stmt.args.is_empty());
    }

    #[test]
    fn test_insert_returning_appends_pk() {
        let values = ValueSet::new().with("kind", JobKind::Sync);
        let stmt = insert_returning("jobs", "id", &values);
        assert_eq!(stmt.sql, "insert into jobs (kind) values ($1) returning id");
        assert_eq!(stmt.args, vec![SqlValue::Text("sync".to_string())]);
    }

    #[test]
    fn test_update_params_then_filters() {
        let params = ValueSet::new()
            .with("status", JobStatus::Finished)
            .with("ended_at", 99_i64);
        let filters = ValueSet::new().with("id", 4_i64).with("kind", "async");
        let stmt = update("jobs", &params, &filters);

        assert_eq!(
            stmt.sql,
            "update jobs set status = $1, ended_at = $2 where 1=1 and id = $3 and kind = $4"
        );
        assert_eq!(stmt.placeholder_count(), params.len() + filters.len());
        assert_eq!(
            stmt.args,
            vec![
                SqlValue::Text("Finished".to_string()),
                SqlValue::Int(99),
                SqlValue::Int(4),
                SqlValue::Text("async".to_string()),
            ]
        );
        assert_eq!(stmt.kind, StatementKind::Update { params: 2 });
    }

    #[test]
    fn test_update_numbering_across_shapes() {
        for n_params in 1..=4_usize {
            for n_filters in 0..=3_usize {
                let mut params = ValueSet::new();
                for i in 1..=n_params {
                    params.push(format!("p{}", i), i as i64);
                }
                let mut filters = ValueSet::new();
                for j in 1..=n_filters {
                    filters.push(format!("f{}", j), 100 + j as i64);
                }
                let stmt = update("t", &params, &filters);
                let case = format!("{} params, {} filters", n_params, n_filters);

                assert_eq!(stmt.placeholder_count(), n_params + n_filters, "{}", case);
                for i in 1..=n_params {
                    assert!(stmt.sql.contains(&format!("p{} = ${}", i, i)), "{}: {}", case, stmt.sql);
                }
                for j in 1..=n_filters {
                    let expected = format!(" and f{} = ${}", j, n_params + j);
                    assert!(stmt.sql.contains(&expected), "{}: {}", case, stmt.sql);
                }

                let expected_args: Vec<SqlValue> = (1..=n_params)
                    .map(|i| SqlValue::Int(i as i64))
                    .chain((1..=n_filters).map(|j| SqlValue::Int(100 + j as i64)))
                    .collect();
                assert_eq!(stmt.args, expected_args, "{}", case);
                assert_eq!(stmt.kind, StatementKind::Update { params: n_params }, "{}", case);
            }
        }
    }

    #[test]
    fn test_delete_without_filters_hits_whole_table() {
        let stmt = delete("job_items", &ValueSet::new());
        assert_eq!(stmt.sql, "delete from job_items where 1=1");
        assert_eq!(stmt.placeholder_count(), 0);

        let stmt = delete("accounts", &ValueSet::new().with("id", 5_i64));
        assert_eq!(stmt.sql, "delete from accounts where 1=1 and id = $1");
    }

    #[test]
    fn test_value_coercion() {
        assert_eq!(SqlValue::from(true), SqlValue::Text("true".to_string()));
        assert_eq!(SqlValue::from(2.5_f64), SqlValue::Float(2.5));
        assert_eq!(SqlValue::from(3_u32), SqlValue::Int(3));
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(8_i64)), SqlValue::Int(8));
        assert_eq!(SqlValue::from(JobStatus::Error), SqlValue::Text("Error".to_string()));
    }

    #[test]
    fn test_select_keeps_sql_verbatim() {
        let stmt = select(
            "select id from jobs where id = $1",
            &ValueSet::new().with("id", 1_i64),
        );
        assert_eq!(stmt.sql, "select id from jobs where id = $1");
        assert_eq!(stmt.args, vec![SqlValue::Int(1)]);
    }
}
