//! Order entry state machine.
//!
//! A draft walks `SelectingType -> CollectingDetails -> Building -> Paying ->
//! Completed`. It can be cancelled while collecting details or building, and a
//! dismissed payment dialog returns it from `Paying` to `Building`. Every
//! guarded transition either succeeds or leaves the draft exactly as it was.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ValidationError};
use crate::models::{
    CompletedSale, Order, OrderKind, OrderLine, OrderStatus, PaymentInput, PaymentMethodId,
    Product, Settings,
};
use crate::money::{change_due, order_total};

const ORDER_CODE_LEN: usize = 6;
const ORDER_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Short pickup code printed on takeaway receipts.
///
/// Cosmetic only: codes are random and never checked against earlier orders,
/// so two takeaway orders can share one.
pub fn generate_order_code(rng: &mut impl Rng) -> String {
    (0..ORDER_CODE_LEN)
        .map(|_| ORDER_CODE_CHARSET[rng.gen_range(0..ORDER_CODE_CHARSET.len())] as char)
        .collect()
}

/// What the operator typed into the details form.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct OrderDetails {
    pub table_number: Option<u32>,
    pub customer_name: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub enum OrderContext {
    DineIn {
        table_number: u32,
        customer_name: Option<String>,
    },
    Takeaway {
        customer_name: String,
    },
}

impl OrderContext {
    fn validate(kind: OrderKind, details: OrderDetails) -> std::result::Result<Self, ValidationError> {
        let customer_name = details
            .customer_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        match kind {
            OrderKind::DineIn => match details.table_number {
                Some(table_number) if table_number > 0 => Ok(OrderContext::DineIn {
                    table_number,
                    customer_name,
                }),
                _ => Err(ValidationError::MissingTableNumber),
            },
            OrderKind::Takeaway => customer_name
                .map(|customer_name| OrderContext::Takeaway { customer_name })
                .ok_or(ValidationError::MissingCustomerName),
        }
    }

    pub fn kind(&self) -> OrderKind {
        match self {
            OrderContext::DineIn { .. } => OrderKind::DineIn,
            OrderContext::Takeaway { .. } => OrderKind::Takeaway,
        }
    }

    pub fn table_number(&self) -> Option<u32> {
        match self {
            OrderContext::DineIn { table_number, .. } => Some(*table_number),
            OrderContext::Takeaway { .. } => None,
        }
    }

    pub fn customer_name(&self) -> Option<&str> {
        match self {
            OrderContext::DineIn { customer_name, .. } => customer_name.as_deref(),
            OrderContext::Takeaway { customer_name } => Some(customer_name),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub enum DraftState {
    SelectingType,
    CollectingDetails { kind: OrderKind },
    Building(OrderContext),
    Paying(OrderContext),
    Completed,
    Cancelled,
}

impl DraftState {
    pub fn name(&self) -> &'static str {
        match self {
            DraftState::SelectingType => "selecting a type",
            DraftState::CollectingDetails { .. } => "collecting details",
            DraftState::Building(_) => "building",
            DraftState::Paying(_) => "paying",
            DraftState::Completed => "completed",
            DraftState::Cancelled => "cancelled",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, DraftState::Completed | DraftState::Cancelled)
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct DraftOrder {
    id: String,
    lines: Vec<OrderLine>,
    state: DraftState,
}

impl DraftOrder {
    pub fn new(id: impl Into<String>) -> Self {
        DraftOrder {
            id: id.into(),
            lines: Vec::new(),
            state: DraftState::SelectingType,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn state(&self) -> &DraftState {
        &self.state
    }

    pub fn context(&self) -> Option<&OrderContext> {
        match &self.state {
            DraftState::Building(ctx) | DraftState::Paying(ctx) => Some(ctx),
            _ => None,
        }
    }

    pub fn total(&self) -> Decimal {
        order_total(&self.lines)
    }

    fn rejected(&self, action: &'static str) -> Error {
        Error::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }

    /// Picks dine-in or takeaway. The kind can still be changed until details are confirmed.
    pub fn select_type(&mut self, kind: OrderKind) -> Result<()> {
        match self.state {
            DraftState::SelectingType | DraftState::CollectingDetails { .. } => {
                self.state = DraftState::CollectingDetails { kind };
                Ok(())
            }
            _ => Err(self.rejected("select the order type")),
        }
    }

    pub fn submit_details(&mut self, details: OrderDetails) -> Result<()> {
        let DraftState::CollectingDetails { kind } = self.state else {
            return Err(self.rejected("submit order details"));
        };
        let context = OrderContext::validate(kind, details)?;
        self.state = DraftState::Building(context);
        Ok(())
    }

    /// Adds one unit of `product`. A product already on the order gets its quantity bumped.
    pub fn add_product(&mut self, product: &Product) -> Result<&OrderLine> {
        if !matches!(self.state, DraftState::Building(_)) {
            return Err(self.rejected("add items"));
        }

        let index = match self.lines.iter().position(|l| l.product_id == product.id) {
            Some(index) => {
                self.lines[index].quantity += 1;
                index
            }
            None => {
                self.lines.push(OrderLine::from_product(product));
                self.lines.len() - 1
            }
        };
        Ok(&self.lines[index])
    }

    /// Drops the whole line for `product_id`, whatever its quantity.
    pub fn remove_product(&mut self, product_id: &str) -> Result<OrderLine> {
        if !matches!(self.state, DraftState::Building(_)) {
            return Err(self.rejected("remove items"));
        }

        let index = self
            .lines
            .iter()
            .position(|l| l.product_id == product_id)
            .ok_or_else(|| Error::not_found("Order line", product_id))?;
        Ok(self.lines.remove(index))
    }

    /// Moves to payment and returns the amount due.
    pub fn begin_payment(&mut self) -> Result<Decimal> {
        let DraftState::Building(ctx) = &self.state else {
            return Err(self.rejected("start payment"));
        };
        if self.lines.is_empty() {
            return Err(ValidationError::EmptyOrder.into());
        }
        self.state = DraftState::Paying(ctx.clone());
        Ok(self.total())
    }

    pub fn leave_payment(&mut self) -> Result<()> {
        let DraftState::Paying(ctx) = &self.state else {
            return Err(self.rejected("leave payment"));
        };
        self.state = DraftState::Building(ctx.clone());
        Ok(())
    }

    /// Takes payment and produces the finalized order for the ledger.
    pub fn complete(
        &mut self,
        payment: &PaymentInput,
        settings: &Settings,
        at: DateTime<Utc>,
        rng: &mut impl Rng,
    ) -> Result<CompletedSale> {
        let DraftState::Paying(ctx) = &self.state else {
            return Err(self.rejected("complete payment"));
        };

        if !settings.is_payment_method_enabled(payment.method) {
            return Err(ValidationError::PaymentMethodUnavailable(payment.method.to_string()).into());
        }

        let total = self.total();
        let change = match payment.method {
            PaymentMethodId::Cash => change_due(payment.cash_received.unwrap_or(total), total)?,
            _ => Decimal::ZERO,
        };

        let kind = ctx.kind();
        let order = Order {
            id: self.id.clone(),
            lines: self.lines.clone(),
            kind,
            status: OrderStatus::Completed,
            total,
            payment_method: Some(payment.method),
            created_at: at,
            table_number: ctx.table_number(),
            customer_name: ctx.customer_name().map(str::to_string),
            order_code: (kind == OrderKind::Takeaway).then(|| generate_order_code(rng)),
        };

        self.state = DraftState::Completed;
        Ok(CompletedSale { order, change })
    }

    /// Abandons the draft. Nothing reaches the ledger.
    pub fn cancel(&mut self) -> Result<()> {
        match self.state {
            DraftState::CollectingDetails { .. } | DraftState::Building(_) => {
                self.lines.clear();
                self.state = DraftState::Cancelled;
                Ok(())
            }
            _ => Err(self.rejected("cancel the order")),
        }
    }
}
