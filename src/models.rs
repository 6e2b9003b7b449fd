use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cash_flow::SessionBook;
use crate::ledger::Ledger;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub category: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    pub price: Decimal,
    pub category: String,
    pub image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateProduct {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub category: String,
    pub image: String,
}

/// A product as it was when it was added to an order. Later catalog edits never reach it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OrderLine {
    pub product_id: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl OrderLine {
    pub fn from_product(product: &Product) -> Self {
        OrderLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.price,
            quantity: 1,
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum OrderKind {
    DineIn,
    Takeaway,
}

impl OrderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderKind::DineIn => "dineIn",
            OrderKind::Takeaway => "takeaway",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethodId {
    Cash,
    Credit,
    Debit,
    Vr,
    Pix,
}

impl PaymentMethodId {
    pub const ALL: [PaymentMethodId; 5] = [
        PaymentMethodId::Cash,
        PaymentMethodId::Credit,
        PaymentMethodId::Debit,
        PaymentMethodId::Vr,
        PaymentMethodId::Pix,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethodId::Cash => "cash",
            PaymentMethodId::Credit => "credit",
            PaymentMethodId::Debit => "debit",
            PaymentMethodId::Vr => "vr",
            PaymentMethodId::Pix => "pix",
        }
    }
}

impl fmt::Display for PaymentMethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethodId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethodId::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| format!("unknown payment method: {s}"))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Order {
    pub id: String,
    pub lines: Vec<OrderLine>,
    pub kind: OrderKind,
    pub status: OrderStatus,
    pub total: Decimal,
    pub payment_method: Option<PaymentMethodId>,
    pub created_at: DateTime<Utc>,
    pub table_number: Option<u32>,
    pub customer_name: Option<String>,
    pub order_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PaymentInput {
    pub method: PaymentMethodId,
    /// Cash handed over by the customer; `None` means exact change.
    pub cash_received: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CompletedSale {
    pub order: Order,
    pub change: Decimal,
}

/// Key of a payment aggregate. Orders without a payment method land in `Other`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(into = "String", try_from = "String")]
pub enum PaymentBucket {
    Method(PaymentMethodId),
    Other,
}

impl PaymentBucket {
    pub fn for_order(order: &Order) -> Self {
        order
            .payment_method
            .map_or(PaymentBucket::Other, PaymentBucket::Method)
    }
}

impl fmt::Display for PaymentBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentBucket::Method(method) => method.fmt(f),
            PaymentBucket::Other => f.write_str("other"),
        }
    }
}

impl From<PaymentBucket> for String {
    fn from(bucket: PaymentBucket) -> Self {
        bucket.to_string()
    }
}

impl TryFrom<String> for PaymentBucket {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "other" {
            return Ok(PaymentBucket::Other);
        }
        value.parse().map(PaymentBucket::Method)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct BucketTotal {
    pub count: u32,
    pub total: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct PaymentTotals {
    pub buckets: BTreeMap<PaymentBucket, BucketTotal>,
}

impl PaymentTotals {
    pub fn record(&mut self, order: &Order) {
        let entry = self.buckets.entry(PaymentBucket::for_order(order)).or_default();
        entry.count += 1;
        entry.total += order.total;
    }

    pub fn get(&self, bucket: PaymentBucket) -> Option<&BucketTotal> {
        self.buckets.get(&bucket)
    }

    /// Total recorded for a payment method, zero when nothing was sold with it.
    pub fn amount_for(&self, method: PaymentMethodId) -> Decimal {
        self.get(PaymentBucket::Method(method))
            .map_or(Decimal::ZERO, |bucket| bucket.total)
    }

    pub fn total_sales(&self) -> Decimal {
        self.buckets.values().map(|bucket| bucket.total).sum()
    }

    pub fn order_count(&self) -> u32 {
        self.buckets.values().map(|bucket| bucket.count).sum()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CashFlowSession {
    pub id: String,
    pub opened_at: DateTime<Utc>,
    pub initial_amount: Decimal,
    pub final_amount: Decimal,
    pub closed_at: Option<DateTime<Utc>>,
    pub cashier_name: Option<String>,
    pub reported_amounts: Option<BTreeMap<PaymentMethodId, Decimal>>,
    pub total_sales: Option<Decimal>,
    #[serde(default)]
    pub closing_totals: Option<PaymentTotals>,
}

impl CashFlowSession {
    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CloseCashFlow {
    pub session_id: String,
    pub cashier_name: String,
    pub reported_amounts: BTreeMap<PaymentMethodId, Decimal>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
    Pt,
    Ru,
    Zh,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Brl,
    Rub,
    Cny,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PaymentMethod {
    pub id: PaymentMethodId,
    pub name: String,
    pub enabled: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct RestaurantInfo {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RestaurantInfoPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub language: Language,
    pub currency: Currency,
    pub payment_methods: Vec<PaymentMethod>,
    pub categories: Vec<String>,
    pub restaurant: RestaurantInfo,
}

impl Default for Settings {
    fn default() -> Self {
        let method = |id, name: &str| PaymentMethod {
            id,
            name: name.to_string(),
            enabled: true,
        };

        Settings {
            language: Language::En,
            currency: Currency::Usd,
            payment_methods: vec![
                method(PaymentMethodId::Cash, "Cash"),
                method(PaymentMethodId::Credit, "Credit Card"),
                method(PaymentMethodId::Debit, "Debit Card"),
                method(PaymentMethodId::Vr, "VR"),
                method(PaymentMethodId::Pix, "PIX"),
            ],
            categories: vec!["food".to_string(), "drink".to_string()],
            restaurant: RestaurantInfo::default(),
        }
    }
}

/// Everything the till persists, written back whole after every mutation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Snapshot {
    pub version: u32,
    pub products: Vec<Product>,
    pub orders: Ledger,
    pub cash_flows: SessionBook,
    pub settings: Settings,
}

impl Default for Snapshot {
    fn default() -> Self {
        Snapshot {
            version: SNAPSHOT_VERSION,
            products: Vec::new(),
            orders: Ledger::default(),
            cash_flows: SessionBook::default(),
            settings: Settings::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: String,
    pub total_revenue: Decimal,
    pub total_orders: i32,
    pub orders: Vec<Order>,
}
