use chrono::{Duration, NaiveDateTime};
use rand::Rng;

use crate::error::SeedError;
use crate::model::{NewCustomer, RegistrationOrigin, RowId};
use crate::seed::batch::insert_all;
use crate::seed::words::{self, pick};
use crate::store::SeedSession;

/// Build `count` customer records.
///
/// Customers are not tied to a store or sub-brand. Emails carry the record
/// index so they stay unique within a run.
pub fn generate_customers<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    now: NaiveDateTime,
) -> Vec<NewCustomer> {
    let today = now.date();
    (0..count)
        .map(|index| {
            let name = words::full_name(rng);
            let email = format!(
                "{}{}@{}",
                words::email_local_part(&name),
                index + 1,
                pick(rng, words::EMAIL_DOMAINS)
            );
            let age_days = rng.random_range(18 * 365..=75 * 365);

            NewCustomer {
                customer_name: name,
                email,
                phone_number: format!(
                    "+55 {} 9{:04}-{:04}",
                    rng.random_range(11..=99),
                    rng.random_range(0..10_000),
                    rng.random_range(0..10_000)
                ),
                cpf: rng
                    .random_range(10_000_000_000u64..=99_999_999_999)
                    .to_string(),
                birth_date: today - Duration::days(age_days),
                gender: pick(rng, words::GENDERS).to_string(),
                store_id: None,
                sub_brand_id: None,
                registration_origin: *pick(rng, &RegistrationOrigin::ALL),
                agree_terms: rng.random_bool(0.5),
                receive_promotions_email: rng.random_bool(0.3),
                receive_promotions_sms: rng.random_bool(0.1),
                created_at: now - Duration::seconds(rng.random_range(0..2 * 365 * 86_400)),
            }
        })
        .collect()
}

/// Insert customers in batches of `batch_size`.
///
/// Any failing batch is returned as an error; the caller owns the
/// transaction and rolls the whole phase back.
pub async fn insert_customers<S>(
    session: &mut S,
    customers: &[NewCustomer],
    batch_size: usize,
) -> Result<Vec<RowId>, SeedError>
where
    S: SeedSession + ?Sized,
{
    log::info!(
        "Generating {} customers (batches of {})...",
        customers.len(),
        batch_size
    );
    let ids = insert_all(session, customers, batch_size).await?;
    log::info!("✓ {} customers created", ids.len());
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SqlValue;
    use crate::store::MemorySession;
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_generated_fields_are_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let customers = generate_customers(&mut rng, 300, now());
        assert_eq!(customers.len(), 300);

        let today = now().date();
        for customer in &customers {
            let age_years = (today - customer.birth_date).num_days() / 365;
            assert!((18..=75).contains(&age_years), "age {}", age_years);
            assert_eq!(customer.cpf.len(), 11);
            assert!(customer.cpf.chars().all(|c| c.is_ascii_digit()));
            assert!(customer.created_at <= now());
            assert!(customer.created_at >= now() - Duration::days(2 * 365));
            assert!(customer.store_id.is_none() && customer.sub_brand_id.is_none());
        }

        let mut emails: Vec<&str> = customers.iter().map(|c| c.email.as_str()).collect();
        emails.sort();
        emails.dedup();
        assert_eq!(emails.len(), 300);
    }

    #[tokio::test]
    async fn test_one_malformed_customer_aborts_the_batch() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut customers = generate_customers(&mut rng, 500, now());
        customers[250].customer_name = String::new();

        let mut session = MemorySession::new();
        session.reject_when("customers", |row| {
            matches!(&row[0], SqlValue::Text(Some(name)) if name.is_empty())
        });

        session.begin().await.unwrap();
        let err = insert_customers(&mut session, &customers, 500)
            .await
            .unwrap_err();
        assert!(err.is_constraint());
        session.rollback().await.unwrap();

        assert_eq!(session.committed_count("customers"), 0);
        assert_eq!(session.round_trips(), 1);
    }

    #[tokio::test]
    async fn test_customers_batched_by_size() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let customers = generate_customers(&mut rng, 1_200, now());

        let mut session = MemorySession::new();
        session.begin().await.unwrap();
        let ids = insert_customers(&mut session, &customers, 500)
            .await
            .unwrap();
        session.commit().await.unwrap();

        assert_eq!(ids.len(), 1_200);
        assert_eq!(session.round_trips(), 3);
    }
}
