use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::model::row::{InsertRow, SqlValue};

/// Primary keys are Postgres SERIAL columns.
pub type RowId = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelKind {
    /// Counter / in-person sale
    Presential,
    /// Delivery platform or own delivery
    Delivery,
}

impl ChannelKind {
    pub fn code(&self) -> &'static str {
        match self {
            ChannelKind::Presential => "P",
            ChannelKind::Delivery => "D",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryKind {
    Product,
    Item,
}

impl CategoryKind {
    pub fn code(&self) -> &'static str {
        match self {
            CategoryKind::Product => "P",
            CategoryKind::Item => "I",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationOrigin {
    QrCode,
    Link,
    Balcony,
    Pos,
}

impl RegistrationOrigin {
    pub const ALL: [RegistrationOrigin; 4] = [
        RegistrationOrigin::QrCode,
        RegistrationOrigin::Link,
        RegistrationOrigin::Balcony,
        RegistrationOrigin::Pos,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationOrigin::QrCode => "qr_code",
            RegistrationOrigin::Link => "link",
            RegistrationOrigin::Balcony => "balcony",
            RegistrationOrigin::Pos => "pos",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SaleStatus {
    Completed,
    Cancelled,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "COMPLETED",
            SaleStatus::Cancelled => "CANCELLED",
        }
    }
}

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewBrand {
    pub name: String,
}

impl InsertRow for NewBrand {
    const TABLE: &'static str = "brands";
    const COLUMNS: &'static [&'static str] = &["name"];

    fn values(&self) -> Vec<SqlValue> {
        vec![SqlValue::text(&self.name)]
    }
}

#[derive(Debug, Clone)]
pub struct NewSubBrand {
    pub brand_id: RowId,
    pub name: String,
}

impl InsertRow for NewSubBrand {
    const TABLE: &'static str = "sub_brands";
    const COLUMNS: &'static [&'static str] = &["brand_id", "name"];

    fn values(&self) -> Vec<SqlValue> {
        vec![SqlValue::int(self.brand_id), SqlValue::text(&self.name)]
    }
}

#[derive(Debug, Clone)]
pub struct NewChannel {
    pub brand_id: RowId,
    pub name: String,
    pub description: String,
    pub kind: ChannelKind,
}

impl InsertRow for NewChannel {
    const TABLE: &'static str = "channels";
    const COLUMNS: &'static [&'static str] = &["brand_id", "name", "description", "type"];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::int(self.brand_id),
            SqlValue::text(&self.name),
            SqlValue::text(&self.description),
            SqlValue::text(self.kind.code()),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub brand_id: RowId,
    pub sub_brand_id: Option<RowId>,
    pub name: String,
    pub kind: CategoryKind,
}

impl InsertRow for NewCategory {
    const TABLE: &'static str = "categories";
    const COLUMNS: &'static [&'static str] = &["brand_id", "sub_brand_id", "name", "type"];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::int(self.brand_id),
            SqlValue::Int(self.sub_brand_id),
            SqlValue::text(&self.name),
            SqlValue::text(self.kind.code()),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct NewOptionGroup {
    pub brand_id: RowId,
    pub sub_brand_id: Option<RowId>,
    pub category_id: RowId,
    pub name: String,
}

impl InsertRow for NewOptionGroup {
    const TABLE: &'static str = "option_groups";
    const COLUMNS: &'static [&'static str] = &["brand_id", "sub_brand_id", "category_id", "name"];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::int(self.brand_id),
            SqlValue::Int(self.sub_brand_id),
            SqlValue::int(self.category_id),
            SqlValue::text(&self.name),
        ]
    }
}

// ---------------------------------------------------------------------------
// Stores and catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewStore {
    pub brand_id: RowId,
    pub sub_brand_id: RowId,
    pub name: String,
    pub city: String,
    pub state: String,
    pub district: String,
    pub address_street: String,
    pub address_number: i32,
    pub zipcode: String,
    pub latitude: f64,
    pub longitude: f64,
    pub is_active: bool,
    pub is_own: bool,
    pub is_holding: bool,
    pub creation_date: NaiveDate,
    pub created_at: NaiveDateTime,
}

impl InsertRow for NewStore {
    const TABLE: &'static str = "stores";
    const COLUMNS: &'static [&'static str] = &[
        "brand_id",
        "sub_brand_id",
        "name",
        "city",
        "state",
        "district",
        "address_street",
        "address_number",
        "zipcode",
        "latitude",
        "longitude",
        "is_active",
        "is_own",
        "is_holding",
        "creation_date",
        "created_at",
    ];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::int(self.brand_id),
            SqlValue::int(self.sub_brand_id),
            SqlValue::text(&self.name),
            SqlValue::text(&self.city),
            SqlValue::text(&self.state),
            SqlValue::text(&self.district),
            SqlValue::text(&self.address_street),
            SqlValue::int(self.address_number),
            SqlValue::text(&self.zipcode),
            SqlValue::float(self.latitude),
            SqlValue::float(self.longitude),
            SqlValue::Bool(self.is_active),
            SqlValue::Bool(self.is_own),
            SqlValue::Bool(self.is_holding),
            SqlValue::Date(self.creation_date),
            SqlValue::Timestamp(self.created_at),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub brand_id: RowId,
    pub sub_brand_id: RowId,
    pub category_id: RowId,
    pub name: String,
    pub pos_uuid: String,
}

impl InsertRow for NewProduct {
    const TABLE: &'static str = "products";
    const COLUMNS: &'static [&'static str] =
        &["brand_id", "sub_brand_id", "category_id", "name", "pos_uuid"];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::int(self.brand_id),
            SqlValue::int(self.sub_brand_id),
            SqlValue::int(self.category_id),
            SqlValue::text(&self.name),
            SqlValue::text(&self.pos_uuid),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct NewItem {
    pub brand_id: RowId,
    pub sub_brand_id: RowId,
    pub category_id: RowId,
    pub name: String,
    pub pos_uuid: String,
}

impl InsertRow for NewItem {
    const TABLE: &'static str = "items";
    const COLUMNS: &'static [&'static str] =
        &["brand_id", "sub_brand_id", "category_id", "name", "pos_uuid"];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::int(self.brand_id),
            SqlValue::int(self.sub_brand_id),
            SqlValue::int(self.category_id),
            SqlValue::text(&self.name),
            SqlValue::text(&self.pos_uuid),
        ]
    }
}

// ---------------------------------------------------------------------------
// Customers and sales
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub customer_name: String,
    pub email: String,
    pub phone_number: String,
    pub cpf: String,
    pub birth_date: NaiveDate,
    pub gender: String,
    pub store_id: Option<RowId>,
    pub sub_brand_id: Option<RowId>,
    pub registration_origin: RegistrationOrigin,
    pub agree_terms: bool,
    pub receive_promotions_email: bool,
    pub receive_promotions_sms: bool,
    pub created_at: NaiveDateTime,
}

impl InsertRow for NewCustomer {
    const TABLE: &'static str = "customers";
    const COLUMNS: &'static [&'static str] = &[
        "customer_name",
        "email",
        "phone_number",
        "cpf",
        "birth_date",
        "gender",
        "store_id",
        "sub_brand_id",
        "registration_origin",
        "agree_terms",
        "receive_promotions_email",
        "receive_promotions_sms",
        "created_at",
    ];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::text(&self.customer_name),
            SqlValue::text(&self.email),
            SqlValue::text(&self.phone_number),
            SqlValue::text(&self.cpf),
            SqlValue::Date(self.birth_date),
            SqlValue::text(&self.gender),
            SqlValue::Int(self.store_id),
            SqlValue::Int(self.sub_brand_id),
            SqlValue::text(self.registration_origin.as_str()),
            SqlValue::Bool(self.agree_terms),
            SqlValue::Bool(self.receive_promotions_email),
            SqlValue::Bool(self.receive_promotions_sms),
            SqlValue::Timestamp(self.created_at),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct NewSale {
    pub store_id: RowId,
    pub sub_brand_id: RowId,
    pub customer_id: Option<RowId>,
    pub channel_id: RowId,
    pub created_at: NaiveDateTime,
    pub status: SaleStatus,
    pub total_amount_items: f64,
    pub total_discount: f64,
    pub delivery_fee: f64,
    pub total_amount: f64,
    pub production_seconds: i32,
    pub delivery_seconds: Option<i32>,
    pub people_quantity: i32,
    pub origin: String,
    /// Line items written together with the sale.
    pub lines: Vec<SaleLine>,
}

impl InsertRow for NewSale {
    const TABLE: &'static str = "sales";
    const COLUMNS: &'static [&'static str] = &[
        "store_id",
        "sub_brand_id",
        "customer_id",
        "channel_id",
        "created_at",
        "sale_status_desc",
        "total_amount_items",
        "total_discount",
        "delivery_fee",
        "total_amount",
        "value_paid",
        "production_seconds",
        "delivery_seconds",
        "people_quantity",
        "origin",
    ];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::int(self.store_id),
            SqlValue::int(self.sub_brand_id),
            SqlValue::Int(self.customer_id),
            SqlValue::int(self.channel_id),
            SqlValue::Timestamp(self.created_at),
            SqlValue::text(self.status.as_str()),
            SqlValue::float(self.total_amount_items),
            SqlValue::float(self.total_discount),
            SqlValue::float(self.delivery_fee),
            SqlValue::float(self.total_amount),
            SqlValue::float(self.total_amount),
            SqlValue::int(self.production_seconds),
            SqlValue::Int(self.delivery_seconds),
            SqlValue::int(self.people_quantity),
            SqlValue::text(&self.origin),
        ]
    }
}

/// A product line plus its customizations, before ids are known.
#[derive(Debug, Clone)]
pub struct SaleLine {
    pub product_id: RowId,
    pub quantity: i32,
    pub base_price: f64,
    pub total_price: f64,
    pub customizations: Vec<LineCustomization>,
}

#[derive(Debug, Clone)]
pub struct LineCustomization {
    pub item_id: RowId,
    pub option_group_id: RowId,
    pub quantity: i32,
    pub additional_price: f64,
}

impl LineCustomization {
    pub fn amount(&self) -> f64 {
        round_cents(self.additional_price * self.quantity as f64)
    }
}

#[derive(Debug, Clone)]
pub struct NewProductSale {
    pub sale_id: RowId,
    pub product_id: RowId,
    pub quantity: i32,
    pub base_price: f64,
    pub total_price: f64,
}

impl InsertRow for NewProductSale {
    const TABLE: &'static str = "product_sales";
    const COLUMNS: &'static [&'static str] =
        &["sale_id", "product_id", "quantity", "base_price", "total_price"];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::int(self.sale_id),
            SqlValue::int(self.product_id),
            SqlValue::int(self.quantity),
            SqlValue::float(self.base_price),
            SqlValue::float(self.total_price),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct NewItemProductSale {
    pub product_sale_id: RowId,
    pub item_id: RowId,
    pub option_group_id: RowId,
    pub quantity: i32,
    pub additional_price: f64,
    pub amount: f64,
}

impl InsertRow for NewItemProductSale {
    const TABLE: &'static str = "item_product_sales";
    const COLUMNS: &'static [&'static str] = &[
        "product_sale_id",
        "item_id",
        "option_group_id",
        "quantity",
        "additional_price",
        "price",
        "amount",
    ];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::int(self.product_sale_id),
            SqlValue::int(self.item_id),
            SqlValue::int(self.option_group_id),
            SqlValue::int(self.quantity),
            SqlValue::float(self.additional_price),
            SqlValue::float(self.additional_price),
            SqlValue::float(self.amount),
        ]
    }
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
