use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ValidationError};
use crate::models::{Order, OrderStatus};

/// Finalized orders, in the order they were appended. Orders are never deleted.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct Ledger {
    orders: Vec<Order>,
}

impl Ledger {
    /// Appends without any dedup; callers append each completed draft exactly once.
    pub fn append(&mut self, order: Order) {
        self.orders.push(order);
    }

    /// Replaces the order with the same id. A completed order stays completed
    /// and keeps its total.
    pub fn update(&mut self, order: Order) -> Result<()> {
        let existing = self
            .orders
            .iter_mut()
            .find(|o| o.id == order.id)
            .ok_or_else(|| Error::not_found("Order", &order.id))?;

        if existing.status == OrderStatus::Completed {
            if order.status != OrderStatus::Completed {
                return Err(ValidationError::CompletedOrderReopened(order.id).into());
            }
            if existing.total != order.total {
                return Err(ValidationError::CompletedTotalChanged(order.id).into());
            }
        }

        *existing = order;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Orders whose creation falls on `date` as a calendar day in `tz`.
    /// 23:59 and 00:01 are different days even within one shift.
    pub fn orders_on<'a, Tz: TimeZone>(
        &'a self,
        date: NaiveDate,
        tz: &'a Tz,
    ) -> impl Iterator<Item = &'a Order> + 'a {
        self.orders
            .iter()
            .filter(move |o| o.created_at.with_timezone(tz).date_naive() == date)
    }

    pub fn pending(&self) -> impl Iterator<Item = &Order> {
        self.orders
            .iter()
            .filter(|o| o.status == OrderStatus::Pending)
    }

    /// Completed orders created within `[from, to]`, both ends inclusive.
    pub fn completed_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(move |o| {
            o.status == OrderStatus::Completed && o.created_at >= from && o.created_at <= to
        })
    }
}
