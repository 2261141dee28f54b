use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::Rng;

use crate::error::SeedError;
use crate::model::{
    round_cents, CategoryKind, ChannelKind, NewBrand, NewCategory, NewChannel, NewItem,
    NewOptionGroup, NewProduct, NewStore, NewSubBrand, RowId,
};
use crate::seed::batch::insert_all;
use crate::seed::words::{self, pick};
use crate::store::SeedSession;

const STORE_BATCH_SIZE: usize = 100;
const CATALOG_BATCH_SIZE: usize = 200;

/// Geographic center stores are scattered around (greater São Paulo).
const CENTER_LATITUDE: f64 = -23.5;
const CENTER_LONGITUDE: f64 = -46.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelRef {
    pub id: RowId,
    pub kind: ChannelKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionGroupRef {
    pub id: RowId,
    /// Index into `words::ITEM_CATEGORIES`
    pub item_category: usize,
}

/// Ids of the reference rows every later phase depends on.
#[derive(Debug, Clone)]
pub struct BaseData {
    pub brand_id: RowId,
    pub sub_brand_ids: Vec<RowId>,
    pub channels: Vec<ChannelRef>,
    /// Aligned with `words::PRODUCT_CATEGORIES`
    pub product_category_ids: Vec<RowId>,
    /// Aligned with `words::ITEM_CATEGORIES`
    pub item_category_ids: Vec<RowId>,
    pub option_groups: Vec<OptionGroupRef>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreRef {
    pub id: RowId,
    pub sub_brand_id: RowId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogProduct {
    pub id: RowId,
    pub sub_brand_id: RowId,
    pub base_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogItem {
    pub id: RowId,
    pub item_category: usize,
    pub price: f64,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    pub products: Vec<CatalogProduct>,
    pub items: Vec<CatalogItem>,
    pub option_groups: Vec<OptionGroupRef>,
}

impl Catalog {
    /// Items that may be attached through `group`.
    pub fn items_for(&self, group: &OptionGroupRef) -> Vec<&CatalogItem> {
        self.items
            .iter()
            .filter(|item| item.item_category == group.item_category)
            .collect()
    }
}

/// Insert brand, sub-brands, channels, categories and option groups.
pub async fn load_base_data<S>(session: &mut S) -> Result<BaseData, SeedError>
where
    S: SeedSession + ?Sized,
{
    log::info!("Loading base data...");

    let brand = NewBrand {
        name: words::BRAND_NAME.to_string(),
    };
    let brand_id = single_id(insert_all(session, &[brand], 1).await?, "brands")?;

    let sub_brands: Vec<NewSubBrand> = words::SUB_BRANDS
        .iter()
        .map(|name| NewSubBrand {
            brand_id,
            name: name.to_string(),
        })
        .collect();
    let sub_brand_ids = insert_all(session, &sub_brands, sub_brands.len()).await?;

    let channels: Vec<NewChannel> = words::CHANNELS
        .iter()
        .map(|(name, description, delivery)| NewChannel {
            brand_id,
            name: name.to_string(),
            description: description.to_string(),
            kind: if *delivery {
                ChannelKind::Delivery
            } else {
                ChannelKind::Presential
            },
        })
        .collect();
    let channel_ids = insert_all(session, &channels, channels.len()).await?;
    let channels = channel_ids
        .into_iter()
        .zip(channels.iter())
        .map(|(id, channel)| ChannelRef {
            id,
            kind: channel.kind,
        })
        .collect();

    let product_categories: Vec<NewCategory> = words::PRODUCT_CATEGORIES
        .iter()
        .map(|(name, _)| NewCategory {
            brand_id,
            sub_brand_id: None,
            name: name.to_string(),
            kind: CategoryKind::Product,
        })
        .collect();
    let product_category_ids =
        insert_all(session, &product_categories, product_categories.len()).await?;

    let item_categories: Vec<NewCategory> = words::ITEM_CATEGORIES
        .iter()
        .map(|(name, _)| NewCategory {
            brand_id,
            sub_brand_id: None,
            name: name.to_string(),
            kind: CategoryKind::Item,
        })
        .collect();
    let item_category_ids = insert_all(session, &item_categories, item_categories.len()).await?;

    let option_groups: Vec<NewOptionGroup> = words::OPTION_GROUPS
        .iter()
        .map(|(name, category)| NewOptionGroup {
            brand_id,
            sub_brand_id: None,
            category_id: item_category_ids[*category],
            name: name.to_string(),
        })
        .collect();
    let option_group_ids = insert_all(session, &option_groups, option_groups.len()).await?;
    let option_groups = option_group_ids
        .into_iter()
        .zip(words::OPTION_GROUPS.iter())
        .map(|(id, (_, item_category))| OptionGroupRef {
            id,
            item_category: *item_category,
        })
        .collect();

    let base = BaseData {
        brand_id,
        sub_brand_ids,
        channels,
        product_category_ids,
        item_category_ids,
        option_groups,
    };
    log::info!(
        "✓ Base data: 1 brand, {} sub-brands, {} channels, {} option groups",
        base.sub_brand_ids.len(),
        base.channels.len(),
        base.option_groups.len()
    );
    Ok(base)
}

fn single_id(ids: Vec<RowId>, table: &str) -> Result<RowId, SeedError> {
    ids.first()
        .copied()
        .ok_or_else(|| SeedError::Transaction(format!("{} insert returned no id", table)))
}

/// Coordinates are rounded to 6 decimals (about 10 cm).
fn perturb(center: f64, spread: f64, rng: &mut (impl Rng + ?Sized)) -> f64 {
    let value = center + rng.random_range(-spread..spread);
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Build `count` stores spread over the sub-brands.
pub fn generate_stores<R: Rng + ?Sized>(
    rng: &mut R,
    base: &BaseData,
    count: usize,
    now: NaiveDateTime,
) -> Vec<NewStore> {
    let today: NaiveDate = now.date();
    (0..count)
        .map(|_| {
            let (city, state) = *pick(rng, words::CITIES);
            let sub_brand_id = *pick(rng, &base.sub_brand_ids);
            NewStore {
                brand_id: base.brand_id,
                sub_brand_id,
                name: format!("{} {} - {}", pick(rng, words::STORE_PREFIXES), city, pick(rng, words::DISTRICTS)),
                city: city.to_string(),
                state: state.to_string(),
                district: pick(rng, words::DISTRICTS).to_string(),
                address_street: pick(rng, words::STREETS).to_string(),
                address_number: rng.random_range(10..=9999),
                zipcode: format!(
                    "{:05}-{:03}",
                    rng.random_range(0..100_000),
                    rng.random_range(0..1_000)
                ),
                latitude: perturb(CENTER_LATITUDE, 2.0, rng),
                longitude: perturb(CENTER_LONGITUDE, 3.0, rng),
                is_active: rng.random_bool(0.9),
                is_own: rng.random_bool(0.3),
                is_holding: rng.random_bool(0.2),
                creation_date: today - Duration::days(rng.random_range(0..3 * 365)),
                created_at: now,
            }
        })
        .collect()
}

pub async fn insert_stores<S>(session: &mut S, stores: &[NewStore]) -> Result<Vec<StoreRef>, SeedError>
where
    S: SeedSession + ?Sized,
{
    log::info!("Generating {} stores...", stores.len());
    let ids = insert_all(session, stores, STORE_BATCH_SIZE).await?;
    log::info!("✓ {} stores created", ids.len());
    Ok(ids
        .into_iter()
        .zip(stores.iter())
        .map(|(id, store)| StoreRef {
            id,
            sub_brand_id: store.sub_brand_id,
        })
        .collect())
}

fn price_range(category: &str) -> (f64, f64) {
    match category {
        "Burgers" => (25.0, 45.0),
        "Pizzas" => (40.0, 80.0),
        "Drinks" => (6.0, 15.0),
        "Desserts" => (12.0, 25.0),
        "Sides" => (10.0, 22.0),
        "Combos" => (45.0, 90.0),
        _ => (10.0, 30.0),
    }
}

/// Flattened `(category index, name)` pairs; names get a numeric suffix
/// once the vocabulary is exhausted so every name stays distinct.
fn catalog_names(categories: &[(&str, &[&str])], count: usize) -> Vec<(usize, String)> {
    let flat: Vec<(usize, &str)> = categories
        .iter()
        .enumerate()
        .flat_map(|(index, (_, names))| names.iter().map(move |name| (index, *name)))
        .collect();
    if flat.is_empty() {
        return Vec::new();
    }
    (0..count)
        .map(|i| {
            let (category, name) = flat[i % flat.len()];
            let round = i / flat.len();
            if round == 0 {
                (category, name.to_string())
            } else {
                (category, format!("{} ({})", name, round + 1))
            }
        })
        .collect()
}

fn pos_uuid<R: Rng + ?Sized>(rng: &mut R) -> String {
    uuid::Builder::from_random_bytes(rng.random()).into_uuid().to_string()
}

/// Create products and items for random sub-brands.
pub async fn generate_catalog<S, R>(
    session: &mut S,
    rng: &mut R,
    base: &BaseData,
    product_count: usize,
    item_count: usize,
) -> Result<Catalog, SeedError>
where
    S: SeedSession + ?Sized,
    R: Rng + ?Sized,
{
    log::info!(
        "Generating {} products and {} items...",
        product_count,
        item_count
    );

    let mut product_prices = Vec::with_capacity(product_count);
    let products: Vec<NewProduct> = catalog_names(words::PRODUCT_CATEGORIES, product_count)
        .into_iter()
        .map(|(category, name)| {
            let (low, high) = price_range(words::PRODUCT_CATEGORIES[category].0);
            product_prices.push(round_cents(rng.random_range(low..high)));
            NewProduct {
                brand_id: base.brand_id,
                sub_brand_id: *pick(rng, &base.sub_brand_ids),
                category_id: base.product_category_ids[category],
                name,
                pos_uuid: pos_uuid(rng),
            }
        })
        .collect();
    let product_ids = insert_all(session, &products, CATALOG_BATCH_SIZE).await?;

    let item_names = catalog_names(words::ITEM_CATEGORIES, item_count);
    let items: Vec<NewItem> = item_names
        .iter()
        .map(|(category, name)| NewItem {
            brand_id: base.brand_id,
            sub_brand_id: *pick(rng, &base.sub_brand_ids),
            category_id: base.item_category_ids[*category],
            name: name.clone(),
            pos_uuid: pos_uuid(rng),
        })
        .collect();
    let item_ids = insert_all(session, &items, CATALOG_BATCH_SIZE).await?;

    let catalog = Catalog {
        products: product_ids
            .into_iter()
            .zip(products.iter().zip(product_prices))
            .map(|(id, (product, base_price))| CatalogProduct {
                id,
                sub_brand_id: product.sub_brand_id,
                base_price,
            })
            .collect(),
        items: item_ids
            .into_iter()
            .zip(item_names.iter())
            .map(|(id, (item_category, _))| CatalogItem {
                id,
                item_category: *item_category,
                price: round_cents(rng.random_range(2.0..8.0)),
            })
            .collect(),
        option_groups: base.option_groups.clone(),
    };

    log::info!(
        "✓ {} products, {} items, {} option groups",
        catalog.products.len(),
        catalog.items.len(),
        catalog.option_groups.len()
    );
    Ok(catalog)
}
