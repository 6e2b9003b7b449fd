//! Data handed to the receipt printer. Layout and markup belong to the renderer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::cash_flow::{reconcile, Discrepancy};
use crate::draft::DraftOrder;
use crate::error::{Error, Result};
use crate::models::{
    CashFlowSession, Order, OrderKind, OrderLine, PaymentBucket, PaymentTotals, RestaurantInfo,
    Settings,
};

/// Restaurant identity as printed; the access password is left out.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ReceiptHeader {
    pub name: String,
    pub address: String,
    pub phone: String,
}

impl From<&RestaurantInfo> for ReceiptHeader {
    fn from(info: &RestaurantInfo) -> Self {
        ReceiptHeader {
            name: info.name.clone(),
            address: info.address.clone(),
            phone: info.phone.clone(),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ReceiptLine {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl From<&OrderLine> for ReceiptLine {
    fn from(line: &OrderLine) -> Self {
        ReceiptLine {
            name: line.name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total: line.line_total(),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct OrderReceipt {
    pub restaurant: ReceiptHeader,
    pub currency_symbol: &'static str,
    pub order_id: String,
    pub order_code: Option<String>,
    pub kind: OrderKind,
    pub table_number: Option<u32>,
    pub customer_name: Option<String>,
    pub lines: Vec<ReceiptLine>,
    pub total: Decimal,
    pub payment_method: Option<String>,
    /// `None` for a preview of an order that has not been paid yet.
    pub created_at: Option<DateTime<Utc>>,
}

pub fn order_receipt(order: &Order, settings: &Settings) -> OrderReceipt {
    OrderReceipt {
        restaurant: ReceiptHeader::from(&settings.restaurant),
        currency_symbol: settings.currency_symbol(),
        order_id: order.id.clone(),
        order_code: order.order_code.clone(),
        kind: order.kind,
        table_number: order.table_number,
        customer_name: order.customer_name.clone(),
        lines: order.lines.iter().map(ReceiptLine::from).collect(),
        total: order.total,
        payment_method: order.payment_method.map(|m| settings.payment_method_name(m)),
        created_at: Some(order.created_at),
    }
}

/// Preview slip for an order still being built.
pub fn draft_receipt(draft: &DraftOrder, settings: &Settings) -> Result<OrderReceipt> {
    let ctx = draft.context().ok_or(Error::InvalidTransition {
        action: "print a preview",
        state: draft.state().name(),
    })?;

    Ok(OrderReceipt {
        restaurant: ReceiptHeader::from(&settings.restaurant),
        currency_symbol: settings.currency_symbol(),
        order_id: draft.id().to_string(),
        order_code: None,
        kind: ctx.kind(),
        table_number: ctx.table_number(),
        customer_name: ctx.customer_name().map(str::to_string),
        lines: draft.lines().iter().map(ReceiptLine::from).collect(),
        total: draft.total(),
        payment_method: None,
        created_at: None,
    })
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ClosingTotalLine {
    pub bucket: PaymentBucket,
    pub label: String,
    pub count: u32,
    pub total: Decimal,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ClosingReceipt {
    pub restaurant: ReceiptHeader,
    pub currency_symbol: &'static str,
    pub session_id: String,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub cashier_name: Option<String>,
    pub initial_amount: Decimal,
    pub totals: Vec<ClosingTotalLine>,
    pub total_sales: Decimal,
    pub reconciliation: Vec<Discrepancy>,
}

fn bucket_label(bucket: PaymentBucket, settings: &Settings) -> String {
    match bucket {
        PaymentBucket::Method(method) => settings.payment_method_name(method),
        PaymentBucket::Other => "Other".to_string(),
    }
}

/// End-of-shift slip for a closed session, built only from what was frozen at close.
pub fn closing_receipt(session: &CashFlowSession, settings: &Settings) -> Result<ClosingReceipt> {
    let closed_at = session.closed_at.ok_or_else(|| Error::SessionStillOpen {
        id: session.id.clone(),
    })?;
    let totals: PaymentTotals = session.closing_totals.clone().unwrap_or_default();
    let reported = session.reported_amounts.clone().unwrap_or_default();
    let methods: Vec<_> = reported.keys().copied().collect();

    Ok(ClosingReceipt {
        restaurant: ReceiptHeader::from(&settings.restaurant),
        currency_symbol: settings.currency_symbol(),
        session_id: session.id.clone(),
        opened_at: session.opened_at,
        closed_at,
        cashier_name: session.cashier_name.clone(),
        initial_amount: session.initial_amount,
        totals: totals
            .buckets
            .iter()
            .map(|(bucket, total)| ClosingTotalLine {
                bucket: *bucket,
                label: bucket_label(*bucket, settings),
                count: total.count,
                total: total.total,
            })
            .collect(),
        total_sales: session.total_sales.unwrap_or_else(|| totals.total_sales()),
        reconciliation: reconcile(&methods, &reported, &totals),
    })
}
