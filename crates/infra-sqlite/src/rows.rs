// Entity mappings for the batchdesk tables

use crate::record::{Entity, EntitySchema, FromRecord, Record};
use batchdesk_core::domain::{Account, ChildItem, Job};
use batchdesk_core::error::Result;

pub const JOBS: EntitySchema = EntitySchema {
    table: "jobs",
    primary_key: "id",
    columns: &["id", "kind", "quantity", "status", "started_at", "ended_at"],
};

pub const JOB_ITEMS: EntitySchema = EntitySchema {
    table: "job_items",
    primary_key: "id",
    columns: &["id", "job_id", "position"],
};

pub const ACCOUNTS: EntitySchema = EntitySchema {
    table: "accounts",
    primary_key: "id",
    columns: &["id", "email", "password", "role"],
};

impl FromRecord for Job {
    fn from_record(record: &Record) -> Result<Self> {
        Ok(Job {
            id: record.int("id")?,
            kind: record.parse("kind")?,
            quantity: record.int("quantity")?,
            status: record.parse("status")?,
            started_at: record.int("started_at")?,
            ended_at: record.opt_int("ended_at")?,
            items: Vec::new(),
        })
    }
}

impl Entity for Job {
    const SCHEMA: EntitySchema = JOBS;
}

impl FromRecord for ChildItem {
    fn from_record(record: &Record) -> Result<Self> {
        Ok(ChildItem {
            id: record.int("id")?,
            parent_id: record.int("job_id")?,
            position: record.int("position")?,
        })
    }
}

impl Entity for ChildItem {
    const SCHEMA: EntitySchema = JOB_ITEMS;
}

impl FromRecord for Account {
    fn from_record(record: &Record) -> Result<Self> {
        Ok(Account {
            id: record.int("id")?,
            email: record.text("email")?,
            password: record.text("password")?,
            role: record.text("role")?,
            token: None,
        })
    }
}

impl Entity for Account {
    const SCHEMA: EntitySchema = ACCOUNTS;
}

/// `select count(*) as n ...`
#[derive(Debug)]
pub struct Count(pub i64);

impl FromRecord for Count {
    fn from_record(record: &Record) -> Result<Self> {
        Ok(Count(record.int("n")?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SqlValue;
    use batchdesk_core::domain::{JobKind, JobStatus};

    #[test]
    fn test_job_from_record() {
        let mut record = Record::default();
        record.insert("id", SqlValue::Int(1));
        record.insert("kind", SqlValue::Text("async".to_string()));
        record.insert("quantity", SqlValue::Int(10));
        record.insert("status", SqlValue::Text("Running".to_string()));
        record.insert("started_at", SqlValue::Int(100));
        record.insert("ended_at", SqlValue::Null);

        let job = Job::from_record(&record).unwrap();
        assert_eq!(job.kind, JobKind::Async);
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.ended_at, None);
        assert!(job.items.is_empty());
    }

    #[test]
    fn test_unknown_status_is_a_mapping_error() {
        let mut record = Record::default();
        record.insert("id", SqlValue::Int(1));
        record.insert("kind", SqlValue::Text("sync".to_string()));
        record.insert("quantity", SqlValue::Int(1));
        record.insert("status", SqlValue::Text("Paused".to_string()));
        record.insert("started_at", SqlValue::Int(1));
        record.insert("ended_at", SqlValue::Null);

        assert!(Job::from_record(&record).is_err());
    }
}
