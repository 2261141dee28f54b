use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use sales_analytics::config::SeedConfig;
use sales_analytics::model::SqlValue;
use sales_analytics::seed::{SeedOrchestrator, SeedPhase, SeedPlan, VolumeModulator};
use sales_analytics::store::MemorySession;

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 31)
        .unwrap()
        .and_hms_opt(22, 0, 0)
        .unwrap()
}

fn plan() -> SeedPlan {
    SeedPlan::new(
        SeedConfig {
            stores: 10,
            customers: 200,
            months: 1,
            ..SeedConfig::default()
        },
        now(),
    )
}

fn sales_per_day(session: &MemorySession) -> BTreeMap<NaiveDate, usize> {
    let mut days = BTreeMap::new();
    for value in session.committed_column("sales", "created_at") {
        let at = value.as_timestamp().expect("created_at is a timestamp");
        *days.entry(at.date()).or_insert(0) += 1;
    }
    days
}

#[tokio::test]
async fn test_one_month_of_sales_stays_within_daily_bounds() {
    let mut session = MemorySession::new();
    let plan = plan();
    let window = plan.window();
    let report = SeedOrchestrator::new(&mut session, ChaCha8Rng::seed_from_u64(2024), plan)
        .run()
        .await
        .expect("seeding succeeds");

    assert_eq!(report.final_phase, SeedPhase::Done);
    assert_eq!(report.stores, 10);
    assert_eq!(report.customers, 200);
    assert_eq!(session.committed_count("customers"), 200);

    let max = VolumeModulator::default().max_daily_sales();
    assert_eq!(max, 105);

    let days = sales_per_day(&session);
    assert_eq!(days.len(), window.day_count());
    for (day, count) in &days {
        assert!(window.contains(day.and_hms_opt(12, 0, 0).unwrap()));
        assert!(
            (1..=max).contains(count),
            "{} sales on {}",
            count,
            day
        );
    }
    assert_eq!(days.values().sum::<usize>(), report.sales_inserted);
    assert_eq!(report.sales_skipped, 0);
}

#[tokio::test]
async fn test_malformed_customer_aborts_customer_phase() {
    let mut session = MemorySession::new();
    // emails end in the record index, so exactly one row of the batch matches
    session.reject_when("customers", |row| {
        row[1].as_text().is_some_and(|email| email.contains("137@"))
    });

    let mut orchestrator =
        SeedOrchestrator::new(&mut session, ChaCha8Rng::seed_from_u64(7), plan());
    let err = orchestrator.run().await.unwrap_err();
    assert_eq!(orchestrator.state(), SeedPhase::Aborted);

    assert_eq!(err.phase(), Some(SeedPhase::Customers));
    assert!(err.is_constraint());
    assert!(err.to_string().starts_with("phase customers aborted"));

    // the first transaction was already committed
    assert_eq!(session.committed_count("stores"), 10);
    assert_eq!(session.committed_count("customers"), 0);
    assert_eq!(session.committed_count("sales"), 0);
    assert!(!session.in_transaction());
}

#[tokio::test]
async fn test_rejected_sales_are_skipped_and_the_rest_commit() {
    let mut session = MemorySession::new();
    session.reject_when("sales", |row| row[0] == SqlValue::int(3));

    let report = SeedOrchestrator::new(&mut session, ChaCha8Rng::seed_from_u64(11), plan())
        .run()
        .await
        .expect("skipped sales do not abort the run");

    assert_eq!(report.final_phase, SeedPhase::Done);
    assert!(report.sales_skipped > 0);
    assert_eq!(session.committed_count("sales"), report.sales_inserted);
    assert!(session
        .committed_column("sales", "store_id")
        .iter()
        .all(|store| store.as_int() != Some(3)));

    // every committed line item belongs to a committed sale
    let sale_ids = session.committed_ids("sales");
    for sale_id in session.committed_column("product_sales", "sale_id") {
        assert!(sale_ids.contains(&sale_id.as_int().unwrap()));
    }
}

#[tokio::test]
async fn test_same_seed_same_data() {
    let mut first = MemorySession::new();
    let mut second = MemorySession::new();
    SeedOrchestrator::new(&mut first, ChaCha8Rng::seed_from_u64(99), plan())
        .run()
        .await
        .unwrap();
    SeedOrchestrator::new(&mut second, ChaCha8Rng::seed_from_u64(99), plan())
        .run()
        .await
        .unwrap();

    assert_eq!(
        first.committed_column("sales", "created_at"),
        second.committed_column("sales", "created_at")
    );
    assert_eq!(
        first.committed_column("customers", "email"),
        second.committed_column("customers", "email")
    );
}
