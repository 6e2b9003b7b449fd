use chrono::{Local, NaiveDate, TimeZone};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::DaySummary;
use crate::pos::Pos;
use crate::receipt::{self, ClosingReceipt, OrderReceipt};

pub fn get_day_summary(pos: &Pos, date: Option<NaiveDate>) -> Result<DaySummary> {
    get_day_summary_in(pos, date, &Local)
}

/// Day summary with the calendar day taken in `tz`. Orders of every status are
/// counted, newest first.
pub fn get_day_summary_in<Tz: TimeZone>(
    pos: &Pos,
    date: Option<NaiveDate>,
    tz: &Tz,
) -> Result<DaySummary> {
    pos.require_signed_in()?;
    let date = date.unwrap_or_else(|| pos.now().with_timezone(tz).date_naive());

    let mut orders: Vec<_> = pos.state().orders.orders_on(date, tz).cloned().collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let total_revenue: Decimal = orders.iter().map(|o| o.total).sum();
    debug!(%date, orders = orders.len(), "Day summary computed");

    Ok(DaySummary {
        date: date.format("%Y-%m-%d").to_string(),
        total_revenue,
        total_orders: orders.len() as i32,
        orders,
    })
}

pub fn order_receipt(pos: &Pos, order_id: &str) -> Result<OrderReceipt> {
    pos.require_signed_in()?;
    let order = pos
        .state()
        .orders
        .get(order_id)
        .ok_or_else(|| Error::not_found("Order", order_id))?;
    Ok(receipt::order_receipt(order, pos.settings()))
}

pub fn draft_receipt(pos: &Pos, draft_id: &str) -> Result<OrderReceipt> {
    pos.require_signed_in()?;
    receipt::draft_receipt(pos.draft(draft_id)?, pos.settings())
}

pub fn closing_receipt(pos: &Pos, session_id: &str) -> Result<ClosingReceipt> {
    pos.require_signed_in()?;
    let session = pos
        .state()
        .cash_flows
        .get(session_id)
        .ok_or_else(|| Error::not_found("Cash flow session", session_id))?;
    receipt::closing_receipt(session, pos.settings())
}
