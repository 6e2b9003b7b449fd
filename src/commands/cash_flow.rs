use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::cash_flow::{compute_totals, reconcile, Discrepancy};
use crate::error::{Error, Result};
use crate::models::{CashFlowSession, CloseCashFlow, PaymentMethodId, PaymentTotals};
use crate::pos::Pos;

/// Live figures for the closing dialog of the open session.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ClosingPreview {
    pub session_id: String,
    pub totals: PaymentTotals,
    pub total_sales: Decimal,
    pub reconciliation: Vec<Discrepancy>,
}

fn enabled_method_ids(pos: &Pos) -> Vec<PaymentMethodId> {
    pos.settings().enabled_payment_methods().map(|m| m.id).collect()
}

pub fn get_active_cash_flow(pos: &Pos) -> Result<Option<CashFlowSession>> {
    pos.require_signed_in()?;
    Ok(pos.state().cash_flows.active().cloned())
}

pub fn open_cash_flow(pos: &mut Pos, initial_amount: Decimal) -> Result<CashFlowSession> {
    pos.require_signed_in()?;
    let id = Uuid::new_v4().to_string();
    let session = pos.commit(|state, now| {
        state
            .cash_flows
            .open(id, initial_amount, now)
            .cloned()
    })?;

    info!(session_id = %session.id, initial_amount = %initial_amount, "Cash flow opened");
    Ok(session)
}

pub fn get_cash_flow_totals(pos: &Pos, session_id: &str) -> Result<PaymentTotals> {
    pos.require_signed_in()?;
    let state = pos.state();
    let session = state
        .cash_flows
        .get(session_id)
        .ok_or_else(|| Error::not_found("Cash flow session", session_id))?;
    Ok(compute_totals(session, &state.orders, pos.now()))
}

/// Compares what the cashier has counted so far with the ledger, without closing.
pub fn preview_closing(
    pos: &Pos,
    reported: &BTreeMap<PaymentMethodId, Decimal>,
) -> Result<ClosingPreview> {
    pos.require_signed_in()?;
    let state = pos.state();
    let session = state
        .cash_flows
        .active()
        .ok_or_else(|| Error::not_found("Cash flow session", "open"))?;
    let totals = compute_totals(session, &state.orders, pos.now());

    Ok(ClosingPreview {
        session_id: session.id.clone(),
        total_sales: totals.total_sales(),
        reconciliation: reconcile(&enabled_method_ids(pos), reported, &totals),
        totals,
    })
}

/// Closes the open session. Totals are computed and frozen in the same commit.
pub fn close_cash_flow(pos: &mut Pos, close: CloseCashFlow) -> Result<CashFlowSession> {
    pos.require_signed_in()?;
    let enabled = enabled_method_ids(pos);
    let session = pos.commit(|state, now| {
        state
            .cash_flows
            .close(
                &close.session_id,
                &close.cashier_name,
                close.reported_amounts.clone(),
                &state.orders,
                &enabled,
                now,
            )
            .cloned()
    })?;

    info!(
        session_id = %session.id,
        cashier = session.cashier_name.as_deref().unwrap_or_default(),
        total_sales = %session.total_sales.unwrap_or_default(),
        "Cash flow closed"
    );
    Ok(session)
}

/// Sessions of the last `window_days` (the configured window when `None`).
pub fn get_recent_cash_flows(pos: &Pos, window_days: Option<u32>) -> Result<Vec<CashFlowSession>> {
    pos.require_signed_in()?;
    let window_days = window_days.unwrap_or_else(|| pos.recent_window_days());
    Ok(pos
        .state()
        .cash_flows
        .list_recent(window_days, pos.now())
        .into_iter()
        .cloned()
        .collect())
}
