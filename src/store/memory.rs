use std::collections::{BTreeMap, HashMap};

use crate::error::SeedError;
use crate::model::{RowId, RowInsert, SqlValue};
use crate::store::traits::SeedSession;

type Table = BTreeMap<RowId, Vec<SqlValue>>;
type Tables = HashMap<String, Table>;
type RowPredicate = Box<dyn Fn(&[SqlValue]) -> bool + Send + Sync>;
/// Highest id per table when a savepoint was taken; rows are only ever
/// appended, so rolling back means dropping everything above it.
type Watermarks = HashMap<String, RowId>;

/// In-memory `SeedSession` that mimics Postgres transaction behaviour.
///
/// Ids come from a per-table counter that is never rolled back, like a
/// SERIAL sequence. A rejected row fails its whole statement and poisons the
/// open transaction until `rollback` or `rollback_to_savepoint`.
pub struct MemorySession {
    committed: Tables,
    working: Option<Tables>,
    savepoints: Vec<(String, Watermarks)>,
    failed: bool,
    columns: HashMap<String, &'static [&'static str]>,
    next_ids: HashMap<String, RowId>,
    round_trips: usize,
    executed: Vec<String>,
    rejections: Vec<(String, RowPredicate)>,
    begins_left: Option<usize>,
    rollbacks: usize,
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySession {
    pub fn new() -> Self {
        Self {
            committed: HashMap::new(),
            working: None,
            savepoints: Vec::new(),
            failed: false,
            columns: HashMap::new(),
            next_ids: HashMap::new(),
            round_trips: 0,
            executed: Vec::new(),
            rejections: Vec::new(),
            begins_left: None,
            rollbacks: 0,
        }
    }

    /// Fail any INSERT into `table` that contains a row matching `predicate`.
    pub fn reject_when<F>(&mut self, table: &str, predicate: F)
    where
        F: Fn(&[SqlValue]) -> bool + Send + Sync + 'static,
    {
        self.rejections.push((table.to_string(), Box::new(predicate)));
    }

    /// Let `count` more BEGINs succeed, then fail every later one as if the
    /// connection had dropped.
    pub fn fail_begin_after(&mut self, count: usize) {
        self.begins_left = Some(count);
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks
    }

    /// INSERT statements sent so far.
    pub fn round_trips(&self) -> usize {
        self.round_trips
    }

    pub fn executed_statements(&self) -> &[String] {
        &self.executed
    }

    pub fn in_transaction(&self) -> bool {
        self.working.is_some()
    }

    pub fn committed_count(&self, table: &str) -> usize {
        self.committed.get(table).map(|t| t.len()).unwrap_or(0)
    }

    pub fn committed_rows(&self, table: &str) -> Vec<&Vec<SqlValue>> {
        self.committed
            .get(table)
            .map(|t| t.values().collect())
            .unwrap_or_default()
    }

    pub fn committed_row(&self, table: &str, id: RowId) -> Option<&Vec<SqlValue>> {
        self.committed.get(table).and_then(|t| t.get(&id))
    }

    pub fn committed_ids(&self, table: &str) -> Vec<RowId> {
        self.committed
            .get(table)
            .map(|t| t.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Every committed value of `column` in `table`, in id order.
    pub fn committed_column(&self, table: &str, column: &str) -> Vec<SqlValue> {
        let Some(position) = self
            .columns
            .get(table)
            .and_then(|cols| cols.iter().position(|c| *c == column))
        else {
            return Vec::new();
        };
        self.committed
            .get(table)
            .map(|t| t.values().map(|row| row[position].clone()).collect())
            .unwrap_or_default()
    }

    fn ensure_usable(&self) -> Result<(), SeedError> {
        if self.failed {
            return Err(SeedError::Transaction(
                "current transaction is aborted, commands ignored until end of transaction block"
                    .to_string(),
            ));
        }
        Ok(())
    }

    fn tables_mut(&mut self) -> &mut Tables {
        match self.working.as_mut() {
            Some(working) => working,
            None => &mut self.committed,
        }
    }

    fn fail(&mut self, err: SeedError) -> SeedError {
        if self.working.is_some() {
            self.failed = true;
        }
        err
    }
}

#[async_trait::async_trait]
impl SeedSession for MemorySession {
    async fn begin(&mut self) -> Result<(), SeedError> {
        match self.begins_left {
            Some(0) => {
                return Err(SeedError::Connectivity("connection reset by peer".to_string()))
            }
            Some(ref mut left) => *left -= 1,
            None => {}
        }
        if self.working.is_some() {
            return Err(SeedError::Transaction(
                "there is already a transaction in progress".to_string(),
            ));
        }
        self.working = Some(self.committed.clone());
        self.failed = false;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SeedError> {
        let Some(working) = self.working.take() else {
            return Err(SeedError::Transaction(
                "there is no transaction in progress".to_string(),
            ));
        };
        self.savepoints.clear();
        if self.failed {
            self.failed = false;
            return Err(SeedError::Transaction(
                "transaction was aborted and has been rolled back".to_string(),
            ));
        }
        self.committed = working;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), SeedError> {
        self.rollbacks += 1;
        self.working = None;
        self.savepoints.clear();
        self.failed = false;
        Ok(())
    }

    async fn savepoint(&mut self, name: &str) -> Result<(), SeedError> {
        self.ensure_usable()?;
        let Some(working) = self.working.as_ref() else {
            return Err(SeedError::Transaction(
                "SAVEPOINT can only be used in transaction blocks".to_string(),
            ));
        };
        let marks = working
            .iter()
            .map(|(table, rows)| (table.clone(), rows.keys().next_back().copied().unwrap_or(0)))
            .collect();
        self.savepoints.push((name.to_string(), marks));
        Ok(())
    }

    async fn release_savepoint(&mut self, name: &str) -> Result<(), SeedError> {
        self.ensure_usable()?;
        let position = self
            .savepoints
            .iter()
            .rposition(|(n, _)| n == name)
            .ok_or_else(|| SeedError::Transaction(format!("savepoint \"{}\" does not exist", name)))?;
        self.savepoints.truncate(position);
        Ok(())
    }

    async fn rollback_to_savepoint(&mut self, name: &str) -> Result<(), SeedError> {
        let position = self
            .savepoints
            .iter()
            .rposition(|(n, _)| n == name)
            .ok_or_else(|| SeedError::Transaction(format!("savepoint \"{}\" does not exist", name)))?;
        self.savepoints.truncate(position + 1);
        let marks = &self.savepoints[position].1;
        if let Some(working) = self.working.as_mut() {
            for (table, rows) in working.iter_mut() {
                let mark = marks.get(table).copied().unwrap_or(0);
                rows.retain(|id, _| *id <= mark);
            }
        }
        self.failed = false;
        Ok(())
    }

    async fn insert_rows(&mut self, insert: &RowInsert) -> Result<Vec<RowId>, SeedError> {
        self.round_trips += 1;
        self.ensure_usable()?;
        self.columns.insert(insert.table.to_string(), insert.columns);

        if let Some(row) = insert
            .rows
            .iter()
            .find(|row| row.len() != insert.fields_per_row())
        {
            let err = SeedError::Transaction(format!(
                "{} expects {} values per row, got {}",
                insert.table,
                insert.fields_per_row(),
                row.len()
            ));
            return Err(self.fail(err));
        }

        let rejected = self.rejections.iter().any(|(table, predicate)| {
            table == insert.table && insert.rows.iter().any(|row| predicate(row))
        });
        if rejected {
            let err = SeedError::constraint(insert.table, "row rejected by constraint");
            return Err(self.fail(err));
        }

        let first_id = {
            let next = self.next_ids.entry(insert.table.to_string()).or_insert(1);
            let first = *next;
            *next += insert.len() as RowId;
            first
        };

        let table = self.tables_mut().entry(insert.table.to_string()).or_default();
        let mut ids = Vec::with_capacity(insert.len());
        for (offset, row) in insert.rows.iter().enumerate() {
            let id = first_id + offset as RowId;
            table.insert(id, row.clone());
            ids.push(id);
        }
        Ok(ids)
    }

    async fn execute(&mut self, sql: &str) -> Result<(), SeedError> {
        self.ensure_usable()?;
        self.executed.push(sql.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewBrand;

    fn brand(name: &str) -> RowInsert {
        RowInsert::of(&[NewBrand {
            name: name.to_string(),
        }])
    }

    #[tokio::test]
    async fn test_rollback_discards_uncommitted_rows() {
        let mut session = MemorySession::new();
        session.begin().await.unwrap();
        session.insert_rows(&brand("A")).await.unwrap();
        session.rollback().await.unwrap();
        assert_eq!(session.committed_count("brands"), 0);

        session.begin().await.unwrap();
        let ids = session.insert_rows(&brand("B")).await.unwrap();
        session.commit().await.unwrap();
        // sequence values are not reused after rollback
        assert_eq!(ids, vec![2]);
        assert_eq!(session.committed_count("brands"), 1);
    }

    #[tokio::test]
    async fn test_failed_statement_poisons_transaction() {
        let mut session = MemorySession::new();
        session.reject_when("brands", |row| row[0].as_text() == Some("bad"));
        session.begin().await.unwrap();
        session.insert_rows(&brand("ok")).await.unwrap();
        assert!(session.insert_rows(&brand("bad")).await.is_err());

        let err = session.insert_rows(&brand("later")).await.unwrap_err();
        assert!(matches!(err, SeedError::Transaction(_)));
        assert!(session.commit().await.is_err());
        assert_eq!(session.committed_count("brands"), 0);
    }

    #[tokio::test]
    async fn test_savepoint_recovers_from_failure() {
        let mut session = MemorySession::new();
        session.reject_when("brands", |row| row[0].as_text() == Some("bad"));
        session.begin().await.unwrap();
        session.insert_rows(&brand("first")).await.unwrap();

        session.savepoint("row").await.unwrap();
        assert!(session.insert_rows(&brand("bad")).await.is_err());
        session.rollback_to_savepoint("row").await.unwrap();
        session.release_savepoint("row").await.unwrap();

        session.insert_rows(&brand("second")).await.unwrap();
        session.commit().await.unwrap();
        assert_eq!(
            session.committed_column("brands", "name"),
            vec![SqlValue::text("first"), SqlValue::text("second")]
        );
    }
}
