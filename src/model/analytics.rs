use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::model::RowId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSummary {
    pub id: RowId,
    pub name: String,
    pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub id: RowId,
    pub name: String,
    pub channel_type: String,
}

/// Today vs. yesterday headline numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub orders_today: i64,
    pub revenue_today: f64,
    pub orders_yesterday: i64,
    pub revenue_yesterday: f64,
    pub top_channel_today: Option<String>,
    pub cancellations_today: i64,
    pub average_ticket_today: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularProductRow {
    pub product_id: RowId,
    pub product: String,
    pub total_orders: i64,
    pub total_units: i64,
    /// Units sold on Thursdays between 18h and 23h
    pub thursday_evening_units: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageTicketRow {
    pub channel: String,
    pub store: String,
    pub total_orders: i64,
    pub average_ticket: f64,
    pub total_revenue: f64,
    pub previous_average_ticket: Option<f64>,
    pub change_percent: i64,
}

impl AverageTicketRow {
    /// Fill `change_percent` from the current and previous average ticket.
    pub fn with_change(mut self) -> Self {
        self.change_percent = percentage_change(self.average_ticket, self.previous_average_ticket);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowMarginProductRow {
    pub product: String,
    pub category: String,
    pub total_orders: i64,
    pub units_sold: i64,
    pub average_unit_price: f64,
    pub estimated_cost: f64,
    pub estimated_margin: f64,
    pub margin_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPerformanceRow {
    pub weekday: String,
    pub weekday_number: i32,
    pub hour: i32,
    pub channel: String,
    pub average_minutes: f64,
    pub deliveries: i64,
    pub p80_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InactiveCustomerRow {
    pub id: RowId,
    pub customer: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub total_orders: i64,
    pub total_spent: f64,
    pub last_purchase: NaiveDateTime,
    pub average_ticket: f64,
    pub days_inactive: i64,
}

/// Rounded percentage change; 0 when there is no usable previous value.
pub fn percentage_change(current: f64, previous: Option<f64>) -> i64 {
    match previous {
        Some(prev) if prev != 0.0 => (((current - prev) / prev) * 100.0).round() as i64,
        _ => 0,
    }
}

/// Postgres `EXTRACT(DOW …)` numbering, Sunday = 0.
pub fn weekday_name(dow: i32) -> &'static str {
    match dow {
        0 => "Sunday",
        1 => "Monday",
        2 => "Tuesday",
        3 => "Wednesday",
        4 => "Thursday",
        5 => "Friday",
        6 => "Saturday",
        _ => "Unknown",
    }
}
