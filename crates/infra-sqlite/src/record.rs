// Row mapping: column-name indexed Record -> typed entity

use crate::error::map_sqlx_error;
use crate::query::SqlValue;
use batchdesk_core::error::{AppError, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};
use std::collections::HashMap;
use std::str::FromStr;

/// One result row keyed by column name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: HashMap<String, SqlValue>,
}

impl Record {
    pub fn insert(&mut self, column: impl Into<String>, value: SqlValue) {
        self.values.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.values.get(column)
    }

    fn require(&self, column: &str) -> Result<&SqlValue> {
        self.get(column)
            .ok_or_else(|| AppError::Query(format!("Column not found: {}", column)))
    }

    pub fn int(&self, column: &str) -> Result<i64> {
        self.opt_int(column)?
            .ok_or_else(|| AppError::Query(format!("Column {} is null", column)))
    }

    pub fn opt_int(&self, column: &str) -> Result<Option<i64>> {
        match self.require(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Int(v) => Ok(Some(*v)),
            other => Err(mismatch(column, "integer", other)),
        }
    }

    /// Text column; NULL reads as an empty string
    pub fn text(&self, column: &str) -> Result<String> {
        match self.require(column)? {
            SqlValue::Null => Ok(String::new()),
            SqlValue::Text(v) => Ok(v.clone()),
            other => Err(mismatch(column, "text", other)),
        }
    }

    /// Text column parsed through `FromStr` (enums stored by display name)
    pub fn parse<T>(&self, column: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.text(column)?;
        raw.parse()
            .map_err(|e: T::Err| AppError::Query(format!("Column {}: {}", column, e)))
    }

    /// Build from a sqlx row, taking each value's storage class as-is
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let mut record = Record::default();
        for (i, column) in row.columns().iter().enumerate() {
            let raw = row.try_get_raw(i).map_err(map_sqlx_error)?;
            let value = if raw.is_null() {
                SqlValue::Null
            } else {
                match raw.type_info().name() {
                    "INTEGER" => SqlValue::Int(row.try_get_unchecked::<i64, _>(i).map_err(map_sqlx_error)?),
                    "REAL" => SqlValue::Float(row.try_get_unchecked::<f64, _>(i).map_err(map_sqlx_error)?),
                    "TEXT" => SqlValue::Text(row.try_get_unchecked::<String, _>(i).map_err(map_sqlx_error)?),
                    other => {
                        return Err(AppError::Query(format!(
                            "Unsupported column type {} for {}",
                            other,
                            column.name()
                        )))
                    }
                }
            };
            record.insert(column.name(), value);
        }
        Ok(record)
    }
}

fn mismatch(column: &str, expected: &str, found: &SqlValue) -> AppError {
    AppError::Query(format!(
        "Column {} expected {}, found {}",
        column, expected, found
    ))
}

/// Typed value built from a Record
pub trait FromRecord: Sized {
    fn from_record(record: &Record) -> Result<Self>;
}

/// Table layout of a persisted entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySchema {
    pub table: &'static str,
    pub primary_key: &'static str,
    pub columns: &'static [&'static str],
}

impl EntitySchema {
    /// `select <columns> from <table>`
    pub fn select_all(&self) -> String {
        format!("select {} from {}", self.columns.join(", "), self.table)
    }

    /// `select <columns> from <table> where <pk> = $1`
    pub fn select_by_pk(&self) -> String {
        format!("{} where {} = $1", self.select_all(), self.primary_key)
    }
}

/// Persisted entity with a known schema
pub trait Entity: FromRecord {
    const SCHEMA: EntitySchema;
}
