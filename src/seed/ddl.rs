use crate::error::SeedError;
use crate::store::SeedSession;

/// Reference DDL for every table the pipeline writes.
pub const SCHEMA_SQL: &str = include_str!("../../migrations/0001_schema.sql");

/// Secondary indexes for the analytics queries, built after the bulk load.
pub const INDEX_STATEMENTS: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_sales_created_at ON sales (created_at)",
    "CREATE INDEX IF NOT EXISTS idx_sales_store_id ON sales (store_id)",
    "CREATE INDEX IF NOT EXISTS idx_sales_channel_id ON sales (channel_id)",
    "CREATE INDEX IF NOT EXISTS idx_sales_customer_id ON sales (customer_id)",
    "CREATE INDEX IF NOT EXISTS idx_sales_status ON sales (sale_status_desc)",
    "CREATE INDEX IF NOT EXISTS idx_product_sales_sale_id ON product_sales (sale_id)",
    "CREATE INDEX IF NOT EXISTS idx_product_sales_product_id ON product_sales (product_id)",
    "CREATE INDEX IF NOT EXISTS idx_item_product_sales_product_sale_id ON item_product_sales (product_sale_id)",
];

pub async fn init_schema<S>(session: &mut S) -> Result<(), SeedError>
where
    S: SeedSession + ?Sized,
{
    log::info!("Applying schema...");
    session.execute(SCHEMA_SQL).await?;
    log::info!("✓ Schema ready");
    Ok(())
}

pub async fn create_indexes<S>(session: &mut S) -> Result<(), SeedError>
where
    S: SeedSession + ?Sized,
{
    log::info!("Creating {} indexes...", INDEX_STATEMENTS.len());
    for statement in INDEX_STATEMENTS {
        session.execute(statement).await.map_err(|e| {
            log::error!("Index statement failed: {} ({})", statement, e);
            e
        })?;
    }
    log::info!("✓ Indexes created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySession;

    #[test]
    fn test_schema_covers_written_tables() {
        for table in [
            "brands",
            "sub_brands",
            "channels",
            "categories",
            "products",
            "items",
            "option_groups",
            "stores",
            "customers",
            "sales",
            "product_sales",
            "item_product_sales",
        ] {
            let needle = format!("CREATE TABLE IF NOT EXISTS {} (", table);
            assert!(SCHEMA_SQL.contains(&needle), "missing table {}", table);
        }
    }

    #[tokio::test]
    async fn test_indexes_are_idempotent_statements() {
        let mut session = MemorySession::new();
        create_indexes(&mut session).await.unwrap();
        assert_eq!(session.executed_statements().len(), INDEX_STATEMENTS.len());
        assert!(session
            .executed_statements()
            .iter()
            .all(|s| s.starts_with("CREATE INDEX IF NOT EXISTS")));
    }
}
