use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;

use crate::error::SeedError;
use crate::model::{
    round_cents, ChannelKind, LineCustomization, NewItemProductSale, NewProductSale, NewSale,
    RowId, RowInsert, SaleLine, SaleStatus,
};
use crate::seed::base::{Catalog, ChannelRef, StoreRef};
use crate::seed::sampler::HourSampler;
use crate::seed::volume::VolumeModulator;
use crate::store::SeedSession;

const SALE_SAVEPOINT: &str = "sale";
const CANCELLED_RATIO: f64 = 0.05;
const SALE_ORIGIN: &str = "POS";

/// Inclusive calendar range sales are generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SalesWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SalesWindow {
    /// The `months` calendar months ending at `end`.
    pub fn last_months(end: NaiveDate, months: u32) -> Self {
        let start = end
            .checked_sub_months(chrono::Months::new(months))
            .unwrap_or(end);
        Self { start, end }
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }

    pub fn day_count(&self) -> usize {
        ((self.end - self.start).num_days() + 1).max(0) as usize
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        (self.start..=self.end).contains(&at.date())
    }
}

/// Everything a sale can reference, resolved by earlier phases.
#[derive(Debug, Clone, Copy)]
pub struct SaleContext<'a> {
    pub stores: &'a [StoreRef],
    pub channels: &'a [ChannelRef],
    pub catalog: &'a Catalog,
    pub customers: &'a [RowId],
}

impl SaleContext<'_> {
    pub fn validate(&self) -> Result<(), SeedError> {
        if self.stores.is_empty() || self.channels.is_empty() || self.catalog.products.is_empty() {
            return Err(SeedError::Config(
                "sales need at least one store, channel and product".to_string(),
            ));
        }
        Ok(())
    }
}

/// Shapes individual sales: when they happen and what they contain.
#[derive(Debug, Clone)]
pub struct SaleFactory {
    pub sampler: HourSampler,
    pub modulator: VolumeModulator,
    pub anonymous_ratio: f64,
}

impl SaleFactory {
    /// Sales for one calendar day, in timestamp order.
    pub fn sales_for_day<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        ctx: &SaleContext<'_>,
        date: NaiveDate,
    ) -> Result<Vec<NewSale>, SeedError> {
        let count = self.modulator.daily_sales(date, rng);
        let mut sales = (0..count)
            .map(|_| {
                let hour = self.sampler.sample(rng);
                let seconds = hour * 3600 + rng.random_range(0..3600);
                let time =
                    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0).unwrap_or_default();
                self.build_sale(rng, ctx, date.and_time(time))
            })
            .collect::<Result<Vec<_>, _>>()?;
        sales.sort_by_key(|sale| sale.created_at);
        Ok(sales)
    }

    pub fn build_sale<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        ctx: &SaleContext<'_>,
        created_at: NaiveDateTime,
    ) -> Result<NewSale, SeedError> {
        let store = *ctx
            .stores
            .choose(rng)
            .ok_or_else(|| SeedError::Config("no stores to sell from".to_string()))?;
        let channel = *ctx
            .channels
            .choose(rng)
            .ok_or_else(|| SeedError::Config("no sales channels".to_string()))?;
        let customer_id = if rng.random_bool(1.0 - self.anonymous_ratio) {
            ctx.customers.choose(rng).copied()
        } else {
            None
        };

        let lines = (0..rng.random_range(1..=3))
            .map(|_| build_line(rng, ctx.catalog))
            .collect::<Result<Vec<_>, _>>()?;
        let total_amount_items = round_cents(lines.iter().map(|l| l.total_price).sum());

        let total_discount = if rng.random_bool(0.2) {
            round_cents(total_amount_items * rng.random_range(0.05..0.15))
        } else {
            0.0
        };

        let delivery = channel.kind == ChannelKind::Delivery;
        let delivery_fee = if delivery && rng.random_bool(0.7) {
            round_cents(rng.random_range(4.0..12.0))
        } else {
            0.0
        };

        // dinner rush slows the couriers down
        let rush = if (18..=21).contains(&created_at.hour()) {
            rng.random_range(0..=900)
        } else {
            0
        };
        let delivery_seconds = delivery.then(|| rng.random_range(900..=3600) + rush);

        let status = if rng.random_bool(CANCELLED_RATIO) {
            SaleStatus::Cancelled
        } else {
            SaleStatus::Completed
        };

        Ok(NewSale {
            store_id: store.id,
            sub_brand_id: store.sub_brand_id,
            customer_id,
            channel_id: channel.id,
            created_at,
            status,
            total_amount_items,
            total_discount,
            delivery_fee,
            total_amount: round_cents(total_amount_items - total_discount + delivery_fee),
            production_seconds: rng.random_range(300..=1800),
            delivery_seconds,
            people_quantity: if delivery {
                1
            } else {
                rng.random_range(1..=4)
            },
            origin: SALE_ORIGIN.to_string(),
            lines,
        })
    }
}

fn build_line<R: Rng + ?Sized>(rng: &mut R, catalog: &Catalog) -> Result<SaleLine, SeedError> {
    let product = catalog
        .products
        .choose(rng)
        .ok_or_else(|| SeedError::Config("catalog has no products".to_string()))?;
    let quantity = rng.random_range(1..=3);

    let mut customizations = Vec::new();
    if rng.random_bool(0.4) {
        for _ in 0..rng.random_range(1..=2) {
            let Some(group) = catalog.option_groups.choose(rng) else {
                break;
            };
            if let Some(item) = catalog.items_for(group).choose(rng) {
                customizations.push(LineCustomization {
                    item_id: item.id,
                    option_group_id: group.id,
                    quantity: 1,
                    additional_price: item.price,
                });
            }
        }
    }

    let extras: f64 = customizations.iter().map(LineCustomization::amount).sum();
    Ok(SaleLine {
        product_id: product.id,
        quantity,
        base_price: product.base_price,
        total_price: round_cents((product.base_price + extras) * quantity as f64),
        customizations,
    })
}

/// Write one sale with its product lines and customizations.
///
/// Three statements at most: the sale, its lines, their customizations.
pub async fn insert_sale<S>(session: &mut S, sale: &NewSale) -> Result<RowId, SeedError>
where
    S: SeedSession + ?Sized,
{
    let sale_id = session
        .insert_rows(&RowInsert::of(std::slice::from_ref(sale)))
        .await?
        .first()
        .copied()
        .ok_or_else(|| SeedError::Transaction("sales insert returned no id".to_string()))?;

    if sale.lines.is_empty() {
        return Ok(sale_id);
    }

    let product_sales: Vec<NewProductSale> = sale
        .lines
        .iter()
        .map(|line| NewProductSale {
            sale_id,
            product_id: line.product_id,
            quantity: line.quantity,
            base_price: line.base_price,
            total_price: line.total_price,
        })
        .collect();
    let line_ids = session.insert_rows(&RowInsert::of(&product_sales)).await?;
    if line_ids.len() != product_sales.len() {
        return Err(SeedError::Transaction(format!(
            "product_sales returned {} ids for {} lines",
            line_ids.len(),
            product_sales.len()
        )));
    }

    let customizations: Vec<NewItemProductSale> = sale
        .lines
        .iter()
        .zip(line_ids)
        .flat_map(|(line, product_sale_id)| {
            line.customizations
                .iter()
                .map(move |c| NewItemProductSale {
                    product_sale_id,
                    item_id: c.item_id,
                    option_group_id: c.option_group_id,
                    quantity: c.quantity,
                    additional_price: c.additional_price,
                    amount: c.amount(),
                })
        })
        .collect();
    if !customizations.is_empty() {
        session
            .insert_rows(&RowInsert::of(&customizations))
            .await?;
    }

    Ok(sale_id)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SalesBatchReport {
    pub inserted: usize,
    pub skipped: usize,
}

impl SalesBatchReport {
    pub fn absorb(&mut self, other: SalesBatchReport) {
        self.inserted += other.inserted;
        self.skipped += other.skipped;
    }
}

/// Insert sales one by one, each under its own savepoint.
///
/// A sale that fails is rolled back to its savepoint, logged and skipped;
/// the rest of the batch continues. Lost connectivity and savepoint
/// failures stop the batch.
pub async fn insert_sales_batch<S>(
    session: &mut S,
    sales: &[NewSale],
) -> Result<SalesBatchReport, SeedError>
where
    S: SeedSession + ?Sized,
{
    let mut report = SalesBatchReport::default();
    for sale in sales {
        session.savepoint(SALE_SAVEPOINT).await?;
        match insert_sale(session, sale).await {
            Ok(_) => {
                session.release_savepoint(SALE_SAVEPOINT).await?;
                report.inserted += 1;
            }
            Err(e @ SeedError::Connectivity(_)) => return Err(e),
            Err(e) => {
                log::warn!(
                    "Skipping sale at {} (store {}): {}",
                    sale.created_at,
                    sale.store_id,
                    e
                );
                session.rollback_to_savepoint(SALE_SAVEPOINT).await?;
                session.release_savepoint(SALE_SAVEPOINT).await?;
                report.skipped += 1;
            }
        }
    }
    Ok(report)
}

/// Generate and write every day of `window`, flushing every `batch_size` sales.
pub async fn generate_sales<S, R>(
    session: &mut S,
    rng: &mut R,
    factory: &SaleFactory,
    ctx: &SaleContext<'_>,
    window: SalesWindow,
    batch_size: usize,
) -> Result<SalesBatchReport, SeedError>
where
    S: SeedSession + ?Sized,
    R: Rng + ?Sized,
{
    ctx.validate()?;
    let batch_size = batch_size.max(1);
    log::info!(
        "Generating sales from {} to {} ({} days)...",
        window.start,
        window.end,
        window.day_count()
    );

    let mut report = SalesBatchReport::default();
    let mut pending: Vec<NewSale> = Vec::with_capacity(batch_size);
    for date in window.days() {
        let day = factory.sales_for_day(rng, ctx, date)?;
        log::info!(
            "  {} ({}): {} sales",
            date,
            date.format("%a"),
            day.len()
        );
        for sale in day {
            pending.push(sale);
            if pending.len() >= batch_size {
                report.absorb(insert_sales_batch(session, &pending).await?);
                pending.clear();
            }
        }
    }
    if !pending.is_empty() {
        report.absorb(insert_sales_batch(session, &pending).await?);
    }

    if report.skipped > 0 {
        log::warn!("{} sales skipped after insert errors", report.skipped);
    }
    log::info!("✓ {} sales created", report.inserted);
    Ok(report)
}
