use itertools::Itertools;

use crate::error::SeedError;
use crate::model::{InsertRow, RowId, RowInsert};
use crate::store::SeedSession;

/// PostgreSQL's limit on bind parameters in one statement.
pub const MAX_BIND_PARAMS: usize = u16::MAX as usize;

/// 1-based placeholder number for field `field` of row `row`.
pub fn placeholder_index(row: usize, field: usize, fields_per_row: usize) -> usize {
    row * fields_per_row + field + 1
}

/// `($1,$2,$3), ($4,$5,$6), ...` for `row_count` rows.
pub fn values_clause(row_count: usize, fields_per_row: usize) -> String {
    (0..row_count)
        .map(|row| {
            let fields = (0..fields_per_row)
                .map(|field| format!("${}", placeholder_index(row, field, fields_per_row)))
                .join(",");
            format!("({})", fields)
        })
        .join(", ")
}

/// Multi-row INSERT returning generated ids.
pub fn insert_sql(insert: &RowInsert) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES {} RETURNING id",
        insert.table,
        insert.columns.join(", "),
        values_clause(insert.len(), insert.fields_per_row())
    )
}

/// Number of round trips `insert_all` issues for `rows` rows.
pub fn round_trips(rows: usize, batch_size: usize) -> usize {
    rows.div_ceil(batch_size.max(1))
}

/// Insert `rows` in chunks of at most `batch_size`, one statement per chunk.
///
/// Returns the generated ids in input order. The first failing chunk stops
/// the write and its error is returned; chunks already written stay in the
/// surrounding transaction.
pub async fn insert_all<S, R>(
    session: &mut S,
    rows: &[R],
    batch_size: usize,
) -> Result<Vec<RowId>, SeedError>
where
    S: SeedSession + ?Sized,
    R: InsertRow,
{
    let batch_size = batch_size.max(1);
    let params_per_chunk = batch_size.min(rows.len()) * R::COLUMNS.len();
    if params_per_chunk > MAX_BIND_PARAMS {
        return Err(SeedError::Config(format!(
            "{} batches of {} rows need {} bind parameters (max {})",
            R::TABLE,
            batch_size,
            params_per_chunk,
            MAX_BIND_PARAMS
        )));
    }
    let total_batches = round_trips(rows.len(), batch_size);
    let mut ids = Vec::with_capacity(rows.len());

    for (index, chunk) in rows.chunks(batch_size).enumerate() {
        let insert = RowInsert::of(chunk);
        let chunk_ids = session.insert_rows(&insert).await.map_err(|e| {
            log::error!(
                "Batch {}/{} into {} failed ({} rows): {}",
                index + 1,
                total_batches,
                R::TABLE,
                chunk.len(),
                e
            );
            e
        })?;

        if chunk_ids.len() != chunk.len() {
            return Err(SeedError::Transaction(format!(
                "{} returned {} ids for {} rows",
                R::TABLE,
                chunk_ids.len(),
                chunk.len()
            )));
        }
        ids.extend(chunk_ids);

        if total_batches > 1 {
            log::info!(
                "  {} batch {}/{}: {}/{} rows",
                R::TABLE,
                index + 1,
                total_batches,
                ids.len(),
                rows.len()
            );
        }
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewBrand, SqlValue};
    use crate::store::MemorySession;
    use std::collections::HashSet;

    fn brands(n: usize) -> Vec<NewBrand> {
        (0..n)
            .map(|i| NewBrand {
                name: format!("Brand {}", i),
            })
            .collect()
    }

    #[test]
    fn test_placeholder_indices_are_unique_and_dense() {
        for fields in 1..=16 {
            let rows = 500 / fields + 1;
            let mut seen = HashSet::new();
            for i in 0..rows {
                for j in 0..fields {
                    assert!(
                        seen.insert(placeholder_index(i, j, fields)),
                        "duplicate placeholder for row {} field {}",
                        i,
                        j
                    );
                }
            }
            let max = seen.iter().copied().max().unwrap();
            assert_eq!(max, rows * fields);
            assert_eq!(seen.len(), rows * fields);
        }
    }

    #[test]
    fn test_values_clause_layout() {
        assert_eq!(values_clause(2, 3), "($1,$2,$3), ($4,$5,$6)");
        assert_eq!(values_clause(1, 1), "($1)");
        assert_eq!(values_clause(0, 4), "");
    }

    #[test]
    fn test_insert_sql() {
        let insert = RowInsert {
            table: "sub_brands",
            columns: &["brand_id", "name"],
            rows: vec![
                vec![SqlValue::int(1), SqlValue::text("North")],
                vec![SqlValue::int(1), SqlValue::text("South")],
            ],
        };
        assert_eq!(
            insert_sql(&insert),
            "INSERT INTO sub_brands (brand_id, name) VALUES ($1,$2), ($3,$4) RETURNING id"
        );
    }

    #[test]
    fn test_round_trips() {
        assert_eq!(round_trips(0, 500), 0);
        assert_eq!(round_trips(1, 500), 1);
        assert_eq!(round_trips(500, 500), 1);
        assert_eq!(round_trips(501, 500), 2);
        assert_eq!(round_trips(1234, 100), 13);
    }

    #[tokio::test]
    async fn test_insert_all_round_trips_and_order() {
        for (rows, batch) in [(0usize, 10usize), (7, 10), (10, 10), (23, 10), (1001, 500)] {
            let mut session = MemorySession::new();
            session.begin().await.unwrap();
            let ids = insert_all(&mut session, &brands(rows), batch).await.unwrap();
            session.commit().await.unwrap();

            assert_eq!(ids.len(), rows);
            assert_eq!(session.round_trips(), round_trips(rows, batch));
            // ids are handed out sequentially, so input order means ascending
            assert!(ids.windows(2).all(|w| w[0] < w[1]));

            let stored = session.committed_rows("brands");
            for (position, id) in ids.iter().enumerate() {
                let row = session.committed_row("brands", *id).unwrap();
                assert_eq!(row[0], SqlValue::text(format!("Brand {}", position)));
            }
            assert_eq!(stored.len(), rows);
        }
    }

    #[tokio::test]
    async fn test_insert_all_stops_at_failing_batch() {
        let mut session = MemorySession::new();
        session.reject_when("brands", |row| row[0].as_text() == Some("Brand 15"));
        session.begin().await.unwrap();

        let err = insert_all(&mut session, &brands(30), 10).await.unwrap_err();
        assert!(err.is_constraint());
        // first batch succeeded, second failed, third never sent
        assert_eq!(session.round_trips(), 2);
    }

    #[tokio::test]
    async fn test_oversized_batch_is_rejected_before_sending() {
        let mut session = MemorySession::new();
        session.begin().await.unwrap();

        let err = insert_all(&mut session, &brands(MAX_BIND_PARAMS + 1), MAX_BIND_PARAMS + 1)
            .await
            .unwrap_err();
        assert!(matches!(err, SeedError::Config(_)));
        assert_eq!(session.round_trips(), 0);

        // a large batch size is fine while the rows themselves fit
        let ids = insert_all(&mut session, &brands(3), 1_000_000).await.unwrap();
        assert_eq!(ids.len(), 3);
    }
}
