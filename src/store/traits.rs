use crate::error::SeedError;
use crate::model::{
    AverageTicketRow, ChannelSummary, DailySummary, DeliveryPerformanceRow, InactiveCustomerRow,
    LowMarginProductRow, PopularProductRow, RowId, RowInsert, StoreSummary,
};
use anyhow::Result;

/// One checked-out connection used for an entire seeding run.
///
/// Every phase receives the session explicitly. Statements issued between
/// `begin` and `commit`/`rollback` belong to the open transaction; after a
/// failed statement the transaction only accepts `rollback` or
/// `rollback_to_savepoint`.
#[async_trait::async_trait]
pub trait SeedSession: Send {
    async fn begin(&mut self) -> Result<(), SeedError>;
    async fn commit(&mut self) -> Result<(), SeedError>;
    async fn rollback(&mut self) -> Result<(), SeedError>;

    async fn savepoint(&mut self, name: &str) -> Result<(), SeedError>;
    async fn release_savepoint(&mut self, name: &str) -> Result<(), SeedError>;
    async fn rollback_to_savepoint(&mut self, name: &str) -> Result<(), SeedError>;

    /// Execute one multi-row INSERT and return the generated ids in row order.
    /// This is exactly one round trip.
    async fn insert_rows(&mut self, insert: &RowInsert) -> Result<Vec<RowId>, SeedError>;

    /// Execute a statement that returns no rows (DDL, index creation).
    async fn execute(&mut self, sql: &str) -> Result<(), SeedError>;
}

/// Read-only aggregation queries behind the HTTP API.
#[async_trait::async_trait]
pub trait AnalyticsStore: Send + Sync {
    async fn list_stores(&self) -> Result<Vec<StoreSummary>>;
    async fn list_channels(&self) -> Result<Vec<ChannelSummary>>;
    async fn daily_summary(&self) -> Result<DailySummary>;
    async fn popular_products(
        &self,
        channel: &str,
        days: i32,
        limit: i64,
    ) -> Result<Vec<PopularProductRow>>;
    async fn average_ticket(&self, days: i32) -> Result<Vec<AverageTicketRow>>;
    async fn low_margin_products(&self, days: i32, limit: i64) -> Result<Vec<LowMarginProductRow>>;
    async fn delivery_performance(&self, days: i32) -> Result<Vec<DeliveryPerformanceRow>>;
    async fn inactive_customers(
        &self,
        min_orders: i64,
        inactive_days: i32,
        limit: i64,
    ) -> Result<Vec<InactiveCustomerRow>>;
}
