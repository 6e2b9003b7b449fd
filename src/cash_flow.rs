//! Cash drawer sessions.
//!
//! At most one session is open at a time. While open, its totals are derived
//! from the ledger on every request; closing freezes them, together with the
//! cashier's counted amounts, and a closed session never changes again.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ValidationError};
use crate::ledger::Ledger;
use crate::models::{CashFlowSession, PaymentMethodId, PaymentTotals};
use crate::money::require_non_negative;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct SessionBook {
    sessions: Vec<CashFlowSession>,
}

impl SessionBook {
    pub fn active(&self) -> Option<&CashFlowSession> {
        self.sessions.iter().find(|s| s.is_open())
    }

    pub fn get(&self, id: &str) -> Option<&CashFlowSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CashFlowSession> {
        self.sessions.iter()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn open(
        &mut self,
        id: String,
        initial_amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<&CashFlowSession> {
        if let Some(active) = self.active() {
            return Err(Error::SessionAlreadyOpen {
                id: active.id.clone(),
            });
        }
        require_non_negative("initial amount", initial_amount)?;

        self.sessions.push(CashFlowSession {
            id,
            opened_at: at,
            initial_amount,
            final_amount: initial_amount,
            closed_at: None,
            cashier_name: None,
            reported_amounts: None,
            total_sales: None,
            closing_totals: None,
        });
        Ok(&self.sessions[self.sessions.len() - 1])
    }

    /// Closes the open session `id` at `at`.
    ///
    /// Totals are taken from `ledger` at the close instant and frozen with the
    /// reported amounts. Reported amounts must name enabled methods only;
    /// enabled methods left out are recorded as zero.
    pub fn close(
        &mut self,
        id: &str,
        cashier_name: &str,
        reported: BTreeMap<PaymentMethodId, Decimal>,
        ledger: &Ledger,
        enabled_methods: &[PaymentMethodId],
        at: DateTime<Utc>,
    ) -> Result<&CashFlowSession> {
        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.id == id && s.is_open())
            .ok_or_else(|| Error::SessionNotOpen { id: id.to_string() })?;

        let cashier_name = cashier_name.trim();
        if cashier_name.is_empty() {
            return Err(ValidationError::EmptyField("cashier name").into());
        }

        let mut reported_amounts = BTreeMap::new();
        for method in enabled_methods {
            reported_amounts.insert(*method, Decimal::ZERO);
        }
        for (method, amount) in reported {
            if !enabled_methods.contains(&method) {
                return Err(ValidationError::PaymentMethodUnavailable(method.to_string()).into());
            }
            require_non_negative("reported amount", amount)?;
            reported_amounts.insert(method, amount);
        }

        let totals = totals_in_window(ledger, session.opened_at, at);

        session.closed_at = Some(at);
        session.cashier_name = Some(cashier_name.to_string());
        session.reported_amounts = Some(reported_amounts);
        session.total_sales = Some(totals.total_sales());
        session.closing_totals = Some(totals);
        Ok(session)
    }

    /// Sessions opened within the last `window_days`: the open one first, then
    /// closed ones with the most recently closed first.
    pub fn list_recent(&self, window_days: u32, now: DateTime<Utc>) -> Vec<&CashFlowSession> {
        let since = now - Duration::days(i64::from(window_days));
        let recent = self.sessions.iter().filter(|s| s.opened_at >= since);

        let mut open: Vec<&CashFlowSession> = recent.clone().filter(|s| s.is_open()).collect();
        let mut closed: Vec<&CashFlowSession> = recent.filter(|s| !s.is_open()).collect();
        closed.sort_by(|a, b| b.closed_at.cmp(&a.closed_at));

        open.append(&mut closed);
        open
    }
}

fn totals_in_window(ledger: &Ledger, from: DateTime<Utc>, to: DateTime<Utc>) -> PaymentTotals {
    let mut totals = PaymentTotals::default();
    for order in ledger.completed_between(from, to) {
        totals.record(order);
    }
    totals
}

/// Per-method totals of a session.
///
/// Closed sessions report what was frozen at close. Open sessions aggregate the
/// completed orders created between opening and `now`, recomputed every call.
pub fn compute_totals(session: &CashFlowSession, ledger: &Ledger, now: DateTime<Utc>) -> PaymentTotals {
    if let Some(frozen) = &session.closing_totals {
        return frozen.clone();
    }
    totals_in_window(ledger, session.opened_at, session.closed_at.unwrap_or(now))
}

/// Positive when the cashier counted more than the ledger accounts for.
pub fn difference(reported: Decimal, actual: Decimal) -> Decimal {
    reported - actual
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiscrepancyKind {
    Overage,
    Shortage,
    Exact,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Discrepancy {
    pub method: PaymentMethodId,
    pub reported: Decimal,
    pub actual: Decimal,
    pub difference: Decimal,
}

impl Discrepancy {
    pub fn new(method: PaymentMethodId, reported: Decimal, actual: Decimal) -> Self {
        Discrepancy {
            method,
            reported,
            actual,
            difference: difference(reported, actual),
        }
    }

    pub fn kind(&self) -> DiscrepancyKind {
        if self.difference.is_zero() {
            DiscrepancyKind::Exact
        } else if self.difference.is_sign_positive() {
            DiscrepancyKind::Overage
        } else {
            DiscrepancyKind::Shortage
        }
    }
}

/// One line per method in `methods`, comparing counted cash against the ledger.
/// Informational: a mismatch never blocks closing.
pub fn reconcile(
    methods: &[PaymentMethodId],
    reported: &BTreeMap<PaymentMethodId, Decimal>,
    totals: &PaymentTotals,
) -> Vec<Discrepancy> {
    methods
        .iter()
        .map(|method| {
            let counted = reported.get(method).copied().unwrap_or(Decimal::ZERO);
            Discrepancy::new(*method, counted, totals.amount_for(*method))
        })
        .collect()
}
