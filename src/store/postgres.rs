use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{PgConnection, PgPool, Postgres, Row};

use crate::config::DatabaseConfig;
use crate::error::SeedError;
use crate::model::{
    percentage_change, weekday_name, AverageTicketRow, ChannelSummary, DailySummary,
    DeliveryPerformanceRow, InactiveCustomerRow, LowMarginProductRow, PopularProductRow, RowId,
    RowInsert, SqlValue, StoreSummary,
};
use crate::seed::batch::insert_sql;
use crate::store::traits::{AnalyticsStore, SeedSession};

/// Share of the average unit price assumed to be cost.
pub const ESTIMATED_COST_RATIO: f64 = 0.6;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a connection pool and verify the database is reachable.
    pub async fn connect(
        options: PgConnectOptions,
        config: &DatabaseConfig,
    ) -> Result<Self, SeedError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| SeedError::Connectivity(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check out the single connection a seeding run works on.
    pub async fn seed_session(&self) -> Result<PgSeedSession, SeedError> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| SeedError::Connectivity(e.to_string()))?;
        Ok(PgSeedSession {
            conn: Some(conn),
            in_transaction: false,
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// `SeedSession` over one pooled connection.
///
/// Dropping the session while a transaction is still open detaches the
/// connection from the pool and closes it, which makes the server roll the
/// transaction back instead of handing a dirty connection to the next user.
pub struct PgSeedSession {
    conn: Option<PoolConnection<Postgres>>,
    in_transaction: bool,
}

impl PgSeedSession {
    fn conn(&mut self) -> Result<&mut PgConnection, SeedError> {
        self.conn
            .as_deref_mut()
            .ok_or_else(|| SeedError::Connectivity("connection already released".to_string()))
    }

    async fn simple(&mut self, sql: &str) -> Result<(), SeedError> {
        let conn = self.conn()?;
        sqlx::Executor::execute(conn, sql)
            .await
            .map_err(|e| SeedError::from_sqlx("transaction", e))?;
        Ok(())
    }
}

impl Drop for PgSeedSession {
    fn drop(&mut self) {
        if self.in_transaction {
            if let Some(conn) = self.conn.take() {
                log::warn!("Seed session dropped inside a transaction, closing connection");
                drop(conn.detach());
            }
        }
    }
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &'q SqlValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.as_deref()),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Date(v) => query.bind(*v),
        SqlValue::Timestamp(v) => query.bind(*v),
    }
}

#[async_trait::async_trait]
impl SeedSession for PgSeedSession {
    async fn begin(&mut self) -> Result<(), SeedError> {
        self.simple("BEGIN").await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SeedError> {
        let result = self.simple("COMMIT").await;
        self.in_transaction = false;
        result
    }

    async fn rollback(&mut self) -> Result<(), SeedError> {
        let result = self.simple("ROLLBACK").await;
        self.in_transaction = false;
        result
    }

    async fn savepoint(&mut self, name: &str) -> Result<(), SeedError> {
        self.simple(&format!("SAVEPOINT {}", name)).await
    }

    async fn release_savepoint(&mut self, name: &str) -> Result<(), SeedError> {
        self.simple(&format!("RELEASE SAVEPOINT {}", name)).await
    }

    async fn rollback_to_savepoint(&mut self, name: &str) -> Result<(), SeedError> {
        self.simple(&format!("ROLLBACK TO SAVEPOINT {}", name)).await
    }

    async fn insert_rows(&mut self, insert: &RowInsert) -> Result<Vec<RowId>, SeedError> {
        if insert.is_empty() {
            return Ok(Vec::new());
        }
        let sql = insert_sql(insert);
        let query = insert
            .params()
            .fold(sqlx::query(&sql), |query, value| bind_value(query, value));

        let conn = self.conn()?;
        let rows = query
            .fetch_all(conn)
            .await
            .map_err(|e| SeedError::from_sqlx(insert.table, e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<RowId, _>("id")
                    .map_err(|e| SeedError::from_sqlx(insert.table, e))
            })
            .collect()
    }

    async fn execute(&mut self, sql: &str) -> Result<(), SeedError> {
        self.simple(sql).await
    }
}

// ---------------------------------------------------------------------------
// Analytics queries
// ---------------------------------------------------------------------------

const DAILY_SUMMARY_SQL: &str = r#"
    SELECT
        COUNT(*) FILTER (WHERE s.created_at::date = CURRENT_DATE) AS orders_today,
        COALESCE(SUM(s.total_amount) FILTER (WHERE s.created_at::date = CURRENT_DATE), 0)::float8 AS revenue_today,
        COUNT(*) FILTER (WHERE s.created_at::date = CURRENT_DATE - 1) AS orders_yesterday,
        COALESCE(SUM(s.total_amount) FILTER (WHERE s.created_at::date = CURRENT_DATE - 1), 0)::float8 AS revenue_yesterday,
        (SELECT c.name FROM sales s2
            JOIN channels c ON c.id = s2.channel_id
            WHERE s2.created_at::date = CURRENT_DATE
              AND s2.sale_status_desc = 'COMPLETED'
            GROUP BY c.name
            ORDER BY COUNT(*) DESC
            LIMIT 1) AS top_channel_today,
        COUNT(*) FILTER (WHERE s.sale_status_desc = 'CANCELLED' AND s.created_at::date = CURRENT_DATE) AS cancellations_today,
        COALESCE(AVG(s.total_amount) FILTER (WHERE s.created_at::date = CURRENT_DATE AND s.sale_status_desc = 'COMPLETED'), 0)::float8 AS average_ticket_today
    FROM sales s
    WHERE s.created_at >= CURRENT_DATE - 1
"#;

const POPULAR_PRODUCTS_SQL: &str = r#"
    SELECT
        p.id AS product_id,
        p.name AS product,
        COUNT(DISTINCT s.id) AS total_orders,
        COALESCE(SUM(ps.quantity), 0)::int8 AS total_units,
        COALESCE(SUM(ps.quantity) FILTER (
            WHERE EXTRACT(DOW FROM s.created_at) = 4
              AND EXTRACT(HOUR FROM s.created_at) BETWEEN 18 AND 23
        ), 0)::int8 AS thursday_evening_units
    FROM product_sales ps
    JOIN products p ON p.id = ps.product_id
    JOIN sales s ON s.id = ps.sale_id
    JOIN channels c ON c.id = s.channel_id
    WHERE s.sale_status_desc = 'COMPLETED'
      AND c.name ILIKE '%' || $1 || '%'
      AND s.created_at >= NOW() - make_interval(days => $2)
    GROUP BY p.id, p.name
    ORDER BY thursday_evening_units DESC, total_units DESC
    LIMIT $3
"#;

const AVERAGE_TICKET_SQL: &str = r#"
    SELECT
        c.name AS channel,
        st.name AS store,
        COUNT(*) AS total_orders,
        ROUND(AVG(s.total_amount)::numeric, 2)::float8 AS average_ticket,
        COALESCE(SUM(s.total_amount), 0)::float8 AS total_revenue,
        (SELECT ROUND(AVG(s2.total_amount)::numeric, 2)::float8
            FROM sales s2
            WHERE s2.channel_id = c.id
              AND s2.sale_status_desc = 'COMPLETED'
              AND s2.created_at >= NOW() - make_interval(days => $1 * 2)
              AND s2.created_at < NOW() - make_interval(days => $1)) AS previous_average_ticket
    FROM sales s
    JOIN channels c ON c.id = s.channel_id
    JOIN stores st ON st.id = s.store_id
    WHERE s.sale_status_desc = 'COMPLETED'
      AND s.created_at >= NOW() - make_interval(days => $1)
    GROUP BY c.id, c.name, st.id, st.name
    ORDER BY average_ticket DESC
"#;

const LOW_MARGIN_PRODUCTS_SQL: &str = r#"
    SELECT
        p.name AS product,
        cat.name AS category,
        COUNT(*) AS total_orders,
        COALESCE(SUM(ps.quantity), 0)::int8 AS units_sold,
        ROUND(AVG(ps.total_price / NULLIF(ps.quantity, 0))::numeric, 2)::float8 AS average_unit_price
    FROM product_sales ps
    JOIN products p ON p.id = ps.product_id
    JOIN categories cat ON cat.id = p.category_id
    JOIN sales s ON s.id = ps.sale_id
    WHERE s.sale_status_desc = 'COMPLETED'
      AND s.created_at >= NOW() - make_interval(days => $1)
    GROUP BY p.name, cat.name
    HAVING COUNT(*) >= 3
    ORDER BY average_unit_price ASC
    LIMIT $2
"#;

const DELIVERY_PERFORMANCE_SQL: &str = r#"
    SELECT
        EXTRACT(DOW FROM s.created_at)::int4 AS weekday_number,
        EXTRACT(HOUR FROM s.created_at)::int4 AS hour,
        c.name AS channel,
        ROUND(AVG(s.delivery_seconds) / 60.0, 1)::float8 AS average_minutes,
        COUNT(*) AS deliveries,
        ROUND((PERCENTILE_CONT(0.8) WITHIN GROUP (ORDER BY s.delivery_seconds) / 60.0)::numeric, 1)::float8 AS p80_minutes
    FROM sales s
    JOIN channels c ON c.id = s.channel_id
    WHERE s.sale_status_desc = 'COMPLETED'
      AND s.delivery_seconds IS NOT NULL
      AND s.created_at >= NOW() - make_interval(days => $1)
    GROUP BY 1, 2, c.name
    ORDER BY 1, 2, c.name
"#;

const INACTIVE_CUSTOMERS_SQL: &str = r#"
    WITH loyal AS (
        SELECT
            c.id,
            c.customer_name,
            c.phone_number,
            c.email,
            COUNT(DISTINCT s.id) AS total_orders,
            COALESCE(SUM(s.total_amount), 0)::float8 AS total_spent,
            MAX(s.created_at) AS last_purchase,
            ROUND(AVG(s.total_amount)::numeric, 2)::float8 AS average_ticket
        FROM customers c
        JOIN sales s ON s.customer_id = c.id
        WHERE s.sale_status_desc = 'COMPLETED'
        GROUP BY c.id, c.customer_name, c.phone_number, c.email
        HAVING COUNT(DISTINCT s.id) >= $1
    )
    SELECT
        id, customer_name, phone_number, email, total_orders, total_spent,
        last_purchase, average_ticket,
        EXTRACT(DAY FROM (NOW()::timestamp - last_purchase))::int8 AS days_inactive
    FROM loyal
    WHERE last_purchase <= NOW()::timestamp - make_interval(days => $2)
    ORDER BY days_inactive DESC, total_orders DESC
    LIMIT $3
"#;

fn low_margin_row(row: &PgRow) -> Result<LowMarginProductRow> {
    let average_unit_price: f64 = row.try_get::<Option<f64>, _>("average_unit_price")?.unwrap_or(0.0);
    let estimated_cost = round_to(average_unit_price * ESTIMATED_COST_RATIO, 2);
    let estimated_margin = round_to(average_unit_price - estimated_cost, 2);
    let margin_percent = if average_unit_price > 0.0 {
        round_to(estimated_margin / average_unit_price * 100.0, 1)
    } else {
        0.0
    };

    Ok(LowMarginProductRow {
        product: row.try_get("product")?,
        category: row.try_get("category")?,
        total_orders: row.try_get("total_orders")?,
        units_sold: row.try_get("units_sold")?,
        average_unit_price,
        estimated_cost,
        estimated_margin,
        margin_percent,
    })
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[async_trait::async_trait]
impl AnalyticsStore for PostgresStore {
    async fn list_stores(&self) -> Result<Vec<StoreSummary>> {
        let rows = sqlx::query("SELECT id, name, city FROM stores WHERE is_active ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list stores")?;

        rows.iter()
            .map(|row| -> Result<StoreSummary> {
                Ok(StoreSummary {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    city: row.try_get("city")?,
                })
            })
            .collect()
    }

    async fn list_channels(&self) -> Result<Vec<ChannelSummary>> {
        let rows = sqlx::query("SELECT id, name, type::text AS channel_type FROM channels ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list channels")?;

        rows.iter()
            .map(|row| -> Result<ChannelSummary> {
                Ok(ChannelSummary {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    channel_type: row.try_get("channel_type")?,
                })
            })
            .collect()
    }

    async fn daily_summary(&self) -> Result<DailySummary> {
        let row = sqlx::query(DAILY_SUMMARY_SQL)
            .fetch_one(&self.pool)
            .await
            .context("Failed to compute daily summary")?;

        Ok(DailySummary {
            orders_today: row.try_get("orders_today")?,
            revenue_today: row.try_get("revenue_today")?,
            orders_yesterday: row.try_get("orders_yesterday")?,
            revenue_yesterday: row.try_get("revenue_yesterday")?,
            top_channel_today: row.try_get("top_channel_today")?,
            cancellations_today: row.try_get("cancellations_today")?,
            average_ticket_today: row.try_get("average_ticket_today")?,
        })
    }

    async fn popular_products(
        &self,
        channel: &str,
        days: i32,
        limit: i64,
    ) -> Result<Vec<PopularProductRow>> {
        let rows = sqlx::query(POPULAR_PRODUCTS_SQL)
            .bind(channel)
            .bind(days)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch popular products")?;

        rows.iter()
            .map(|row| -> Result<PopularProductRow> {
                Ok(PopularProductRow {
                    product_id: row.try_get("product_id")?,
                    product: row.try_get("product")?,
                    total_orders: row.try_get("total_orders")?,
                    total_units: row.try_get("total_units")?,
                    thursday_evening_units: row.try_get("thursday_evening_units")?,
                })
            })
            .collect()
    }

    async fn average_ticket(&self, days: i32) -> Result<Vec<AverageTicketRow>> {
        let rows = sqlx::query(AVERAGE_TICKET_SQL)
            .bind(days)
            .fetch_all(&self.pool)
            .await
            .context("Failed to analyse average ticket")?;

        rows.iter()
            .map(|row| -> Result<AverageTicketRow> {
                let average_ticket: f64 = row.try_get::<Option<f64>, _>("average_ticket")?.unwrap_or(0.0);
                let previous_average_ticket: Option<f64> = row.try_get("previous_average_ticket")?;
                Ok(AverageTicketRow {
                    channel: row.try_get("channel")?,
                    store: row.try_get("store")?,
                    total_orders: row.try_get("total_orders")?,
                    average_ticket,
                    total_revenue: row.try_get("total_revenue")?,
                    previous_average_ticket,
                    change_percent: percentage_change(average_ticket, previous_average_ticket),
                })
            })
            .collect()
    }

    async fn low_margin_products(&self, days: i32, limit: i64) -> Result<Vec<LowMarginProductRow>> {
        let rows = sqlx::query(LOW_MARGIN_PRODUCTS_SQL)
            .bind(days)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .context("Failed to analyse product margins")?;

        rows.iter().map(low_margin_row).collect()
    }

    async fn delivery_performance(&self, days: i32) -> Result<Vec<DeliveryPerformanceRow>> {
        let rows = sqlx::query(DELIVERY_PERFORMANCE_SQL)
            .bind(days)
            .fetch_all(&self.pool)
            .await
            .context("Failed to analyse delivery performance")?;

        rows.iter()
            .map(|row| -> Result<DeliveryPerformanceRow> {
                let weekday_number: i32 = row.try_get("weekday_number")?;
                Ok(DeliveryPerformanceRow {
                    weekday: weekday_name(weekday_number).to_string(),
                    weekday_number,
                    hour: row.try_get("hour")?,
                    channel: row.try_get("channel")?,
                    average_minutes: row.try_get::<Option<f64>, _>("average_minutes")?.unwrap_or(0.0),
                    deliveries: row.try_get("deliveries")?,
                    p80_minutes: row.try_get::<Option<f64>, _>("p80_minutes")?.unwrap_or(0.0),
                })
            })
            .collect()
    }

    async fn inactive_customers(
        &self,
        min_orders: i64,
        inactive_days: i32,
        limit: i64,
    ) -> Result<Vec<InactiveCustomerRow>> {
        let rows = sqlx::query(INACTIVE_CUSTOMERS_SQL)
            .bind(min_orders)
            .bind(inactive_days)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .context("Failed to find inactive customers")?;

        rows.iter()
            .map(|row| -> Result<InactiveCustomerRow> {
                Ok(InactiveCustomerRow {
                    id: row.try_get("id")?,
                    customer: row.try_get("customer_name")?,
                    phone: row.try_get("phone_number")?,
                    email: row.try_get("email")?,
                    total_orders: row.try_get("total_orders")?,
                    total_spent: row.try_get("total_spent")?,
                    last_purchase: row.try_get("last_purchase")?,
                    average_ticket: row.try_get::<Option<f64>, _>("average_ticket")?.unwrap_or(0.0),
                    days_inactive: row.try_get("days_inactive")?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(12.3456, 2), 12.35);
        assert_eq!(round_to(40.04, 1), 40.0);
    }
}
