use std::fmt;

use chrono::NaiveDateTime;
use rand::Rng;
use serde::Serialize;

use crate::config::SeedConfig;
use crate::error::SeedError;
use crate::seed::base::{generate_catalog, generate_stores, insert_stores, load_base_data};
use crate::seed::customers::{generate_customers, insert_customers};
use crate::seed::ddl::create_indexes;
use crate::seed::sales::{generate_sales, SaleContext, SaleFactory, SalesWindow};
use crate::seed::sampler::{HourSampler, HOUR_WEIGHTS};
use crate::seed::volume::VolumeModulator;
use crate::store::SeedSession;

/// States of a seeding run.
///
/// `BaseData` and `StoresAndCatalog` share one transaction; `Customers` and
/// `SalesAndIndexes` each run in their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedPhase {
    BaseData,
    StoresAndCatalog,
    Customers,
    SalesAndIndexes,
    Done,
    Aborted,
}

impl SeedPhase {
    pub fn next(self) -> SeedPhase {
        match self {
            SeedPhase::BaseData => SeedPhase::StoresAndCatalog,
            SeedPhase::StoresAndCatalog => SeedPhase::Customers,
            SeedPhase::Customers => SeedPhase::SalesAndIndexes,
            SeedPhase::SalesAndIndexes => SeedPhase::Done,
            SeedPhase::Done => SeedPhase::Done,
            SeedPhase::Aborted => SeedPhase::Aborted,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SeedPhase::Done | SeedPhase::Aborted)
    }

    /// Leaving this phase commits the open transaction.
    fn commits_on_exit(self) -> bool {
        matches!(
            self,
            SeedPhase::StoresAndCatalog | SeedPhase::Customers | SeedPhase::SalesAndIndexes
        )
    }

    /// Entering this phase opens a new transaction.
    fn opens_transaction(self) -> bool {
        matches!(
            self,
            SeedPhase::BaseData | SeedPhase::Customers | SeedPhase::SalesAndIndexes
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeedPhase::BaseData => "base_data",
            SeedPhase::StoresAndCatalog => "stores_and_catalog",
            SeedPhase::Customers => "customers",
            SeedPhase::SalesAndIndexes => "sales_and_indexes",
            SeedPhase::Done => "done",
            SeedPhase::Aborted => "aborted",
        }
    }
}

impl fmt::Display for SeedPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs of one run, fixed before the first phase starts.
#[derive(Debug, Clone)]
pub struct SeedPlan {
    pub config: SeedConfig,
    /// Reference "now": the sales window ends on this date.
    pub now: NaiveDateTime,
    pub hour_weights: [f64; 24],
}

impl SeedPlan {
    pub fn new(config: SeedConfig, now: NaiveDateTime) -> Self {
        Self {
            config,
            now,
            hour_weights: HOUR_WEIGHTS,
        }
    }

    pub fn window(&self) -> SalesWindow {
        SalesWindow::last_months(self.now.date(), self.config.months)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedReport {
    pub stores: usize,
    pub products: usize,
    pub items: usize,
    pub customers: usize,
    pub sales_inserted: usize,
    pub sales_skipped: usize,
    pub days: usize,
    pub final_phase: SeedPhase,
}

impl Default for SeedReport {
    fn default() -> Self {
        Self {
            stores: 0,
            products: 0,
            items: 0,
            customers: 0,
            sales_inserted: 0,
            sales_skipped: 0,
            days: 0,
            final_phase: SeedPhase::BaseData,
        }
    }
}

/// Drives the phases over one session, committing or rolling back per
/// transaction.
pub struct SeedOrchestrator<'s, S: ?Sized, R> {
    session: &'s mut S,
    rng: R,
    plan: SeedPlan,
    phase: SeedPhase,
    in_transaction: bool,
}

impl<'s, S, R> SeedOrchestrator<'s, S, R>
where
    S: SeedSession + ?Sized,
    R: Rng,
{
    pub fn new(session: &'s mut S, rng: R, plan: SeedPlan) -> Self {
        Self {
            session,
            rng,
            plan,
            phase: SeedPhase::BaseData,
            in_transaction: false,
        }
    }

    pub fn state(&self) -> SeedPhase {
        self.phase
    }

    /// Run every phase. On failure the open transaction is rolled back, the
    /// state becomes `Aborted` and the error names the failing phase.
    ///
    /// Configuration and sampling errors are raised before any transaction.
    pub async fn run(&mut self) -> Result<SeedReport, SeedError> {
        self.plan.config.validate()?;
        let factory = SaleFactory {
            sampler: HourSampler::new(self.plan.hour_weights)?,
            modulator: VolumeModulator::new(
                self.plan.config.min_daily_sales,
                self.plan.config.max_daily_sales,
            ),
            anonymous_ratio: self.plan.config.anonymous_ratio,
        };

        let mut report = SeedReport::default();
        match self.run_phases(&factory, &mut report).await {
            Ok(()) => {
                report.final_phase = self.phase;
                log::info!(
                    "✓ Seeding complete: {} stores, {} products, {} items, {} customers, {} sales over {} days ({} skipped)",
                    report.stores,
                    report.products,
                    report.items,
                    report.customers,
                    report.sales_inserted,
                    report.days,
                    report.sales_skipped
                );
                Ok(report)
            }
            Err(e) => {
                let failed = self.phase;
                if self.in_transaction {
                    log::error!("Phase {} failed, rolling back: {}", failed, e);
                    if let Err(rollback) = self.session.rollback().await {
                        log::error!("Rollback of phase {} failed: {}", failed, rollback);
                    }
                    self.in_transaction = false;
                } else {
                    log::error!("Phase {} failed before its transaction opened: {}", failed, e);
                }
                self.phase = SeedPhase::Aborted;
                Err(SeedError::PhaseAborted {
                    phase: failed,
                    source: Box::new(e),
                })
            }
        }
    }

    async fn run_phases(
        &mut self,
        factory: &SaleFactory,
        report: &mut SeedReport,
    ) -> Result<(), SeedError> {
        let config = self.plan.config.clone();
        let now = self.plan.now;

        log::info!("Phase {}", self.phase);
        self.session.begin().await?;
        self.in_transaction = true;
        let base = load_base_data(&mut *self.session).await?;

        self.advance().await?;
        let stores = generate_stores(&mut self.rng, &base, config.stores, now);
        let stores = insert_stores(&mut *self.session, &stores).await?;
        let catalog = generate_catalog(
            &mut *self.session,
            &mut self.rng,
            &base,
            config.products,
            config.items,
        )
        .await?;
        report.stores = stores.len();
        report.products = catalog.products.len();
        report.items = catalog.items.len();

        self.advance().await?;
        let customers = generate_customers(&mut self.rng, config.customers, now);
        let customer_ids =
            insert_customers(&mut *self.session, &customers, config.customer_batch_size).await?;
        report.customers = customer_ids.len();

        self.advance().await?;
        let window = self.plan.window();
        let ctx = SaleContext {
            stores: &stores,
            channels: &base.channels,
            catalog: &catalog,
            customers: &customer_ids,
        };
        let sales = generate_sales(
            &mut *self.session,
            &mut self.rng,
            factory,
            &ctx,
            window,
            config.sales_batch_size,
        )
        .await?;
        report.sales_inserted = sales.inserted;
        report.sales_skipped = sales.skipped;
        report.days = window.day_count();
        create_indexes(&mut *self.session).await?;

        self.advance().await
    }

    /// Move to the next phase, committing and opening transactions as the
    /// phase boundaries require.
    async fn advance(&mut self) -> Result<(), SeedError> {
        if self.phase.commits_on_exit() {
            self.session.commit().await?;
            self.in_transaction = false;
            log::info!("✓ Committed phase {}", self.phase);
        }
        let next = self.phase.next();
        self.phase = next;
        if next.opens_transaction() {
            self.session.begin().await?;
            self.in_transaction = true;
        }
        if !next.is_terminal() {
            log::info!("Phase {}", next);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySession;
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn plan() -> SeedPlan {
        let now = NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap();
        SeedPlan::new(
            SeedConfig {
                stores: 3,
                products: 10,
                items: 6,
                customers: 20,
                months: 0,
                ..SeedConfig::default()
            },
            now,
        )
    }

    #[test]
    fn test_phase_order() {
        let mut phase = SeedPhase::BaseData;
        let mut seen = vec![phase];
        while !phase.is_terminal() {
            phase = phase.next();
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![
                SeedPhase::BaseData,
                SeedPhase::StoresAndCatalog,
                SeedPhase::Customers,
                SeedPhase::SalesAndIndexes,
                SeedPhase::Done
            ]
        );
        assert_eq!(SeedPhase::Aborted.next(), SeedPhase::Aborted);
        assert_eq!(SeedPhase::StoresAndCatalog.to_string(), "stores_and_catalog");
    }

    #[tokio::test]
    async fn test_run_reaches_done() {
        let mut session = MemorySession::new();
        let rng = ChaCha8Rng::seed_from_u64(1);
        let mut orchestrator = SeedOrchestrator::new(&mut session, rng, plan());
        let report = orchestrator.run().await.unwrap();
        assert_eq!(orchestrator.state(), SeedPhase::Done);

        assert_eq!(report.final_phase, SeedPhase::Done);
        assert_eq!(report.stores, 3);
        assert_eq!(report.customers, 20);
        assert_eq!(report.days, 1);
        assert!(report.sales_inserted >= 1);
        assert_eq!(report.sales_skipped, 0);

        assert!(!session.in_transaction());
        assert_eq!(session.committed_count("sales"), report.sales_inserted);
    }

    #[tokio::test]
    async fn test_invalid_weights_fail_before_any_phase() {
        let mut session = MemorySession::new();
        let mut plan = plan();
        plan.hour_weights = [0.0; 24];
        let mut orchestrator =
            SeedOrchestrator::new(&mut session, ChaCha8Rng::seed_from_u64(1), plan);
        let err = orchestrator.run().await.unwrap_err();
        assert!(matches!(err, SeedError::Sampling(_)));
        assert_eq!(orchestrator.state(), SeedPhase::BaseData);
        assert_eq!(session.round_trips(), 0);
    }

    #[tokio::test]
    async fn test_catalog_failure_rolls_back_base_data() {
        let mut session = MemorySession::new();
        session.reject_when("products", |_| true);
        let mut orchestrator =
            SeedOrchestrator::new(&mut session, ChaCha8Rng::seed_from_u64(1), plan());
        let err = orchestrator.run().await.unwrap_err();

        assert_eq!(err.phase(), Some(SeedPhase::StoresAndCatalog));
        assert_eq!(orchestrator.state(), SeedPhase::Aborted);
        // base data shares the catalog transaction
        assert_eq!(session.committed_count("brands"), 0);
        assert_eq!(session.committed_count("stores"), 0);
    }

    #[tokio::test]
    async fn test_customer_failure_keeps_catalog() {
        let mut session = MemorySession::new();
        session.reject_when("customers", |_| true);
        let mut orchestrator =
            SeedOrchestrator::new(&mut session, ChaCha8Rng::seed_from_u64(4), plan());
        let err = orchestrator.run().await.unwrap_err();

        assert_eq!(err.phase(), Some(SeedPhase::Customers));
        assert!(err.is_constraint());
        assert_eq!(session.committed_count("stores"), 3);
        assert_eq!(session.committed_count("products"), 10);
        assert_eq!(session.committed_count("customers"), 0);
        assert_eq!(session.committed_count("sales"), 0);
        assert!(session.executed_statements().is_empty());
    }

    #[tokio::test]
    async fn test_failed_begin_names_the_unopened_phase() {
        let mut session = MemorySession::new();
        // the first transaction opens, the customers one does not
        session.fail_begin_after(1);
        let mut orchestrator =
            SeedOrchestrator::new(&mut session, ChaCha8Rng::seed_from_u64(2), plan());
        let err = orchestrator.run().await.unwrap_err();

        assert_eq!(err.phase(), Some(SeedPhase::Customers));
        assert_eq!(orchestrator.state(), SeedPhase::Aborted);
        assert_eq!(session.rollbacks(), 0);
        assert_eq!(session.committed_count("stores"), 3);
        assert_eq!(session.committed_count("customers"), 0);
    }
}
