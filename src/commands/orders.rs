use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog;
use crate::draft::{DraftOrder, OrderDetails};
use crate::error::{Error, Result};
use crate::models::{CompletedSale, Order, OrderKind, PaymentInput, PaymentMethod};
use crate::pos::Pos;

/// What the payment dialog needs to show.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PaymentPrompt {
    pub order_id: String,
    pub total: Decimal,
    pub methods: Vec<PaymentMethod>,
}

/// Opens a new draft and returns its id, which becomes the order id once paid.
pub fn start_order(pos: &mut Pos) -> Result<String> {
    pos.require_signed_in()?;
    let id = Uuid::new_v4().to_string();
    pos.insert_draft(DraftOrder::new(id.clone()));
    info!(order_id = %id, "Order started");
    Ok(id)
}

pub fn get_draft(pos: &Pos, order_id: &str) -> Result<DraftOrder> {
    pos.require_signed_in()?;
    pos.draft(order_id).cloned()
}

pub fn get_drafts(pos: &Pos) -> Result<Vec<DraftOrder>> {
    pos.require_signed_in()?;
    Ok(pos.drafts().to_vec())
}

fn rejected(order_id: &str, err: Error) -> Error {
    warn!(order_id, error = %err, "Order action rejected");
    err
}

pub fn select_order_type(pos: &mut Pos, order_id: &str, kind: OrderKind) -> Result<DraftOrder> {
    pos.require_signed_in()?;
    let draft = pos.draft_mut(order_id)?;
    draft
        .select_type(kind)
        .map_err(|e| rejected(order_id, e))?;
    Ok(draft.clone())
}

pub fn submit_order_details(
    pos: &mut Pos,
    order_id: &str,
    details: OrderDetails,
) -> Result<DraftOrder> {
    pos.require_signed_in()?;
    let draft = pos.draft_mut(order_id)?;
    draft
        .submit_details(details)
        .map_err(|e| rejected(order_id, e))?;
    Ok(draft.clone())
}

pub fn add_to_order(pos: &mut Pos, order_id: &str, product_id: &str) -> Result<DraftOrder> {
    pos.require_signed_in()?;
    let product = catalog::find_product(&pos.state().products, product_id)
        .cloned()
        .ok_or_else(|| Error::not_found("Product", product_id))?;

    let draft = pos.draft_mut(order_id)?;
    draft
        .add_product(&product)
        .map_err(|e| rejected(order_id, e))?;
    Ok(draft.clone())
}

pub fn remove_from_order(pos: &mut Pos, order_id: &str, product_id: &str) -> Result<DraftOrder> {
    pos.require_signed_in()?;
    let draft = pos.draft_mut(order_id)?;
    draft
        .remove_product(product_id)
        .map_err(|e| rejected(order_id, e))?;
    Ok(draft.clone())
}

pub fn begin_payment(pos: &mut Pos, order_id: &str) -> Result<PaymentPrompt> {
    pos.require_signed_in()?;
    let total = pos
        .draft_mut(order_id)?
        .begin_payment()
        .map_err(|e| rejected(order_id, e))?;

    Ok(PaymentPrompt {
        order_id: order_id.to_string(),
        total,
        methods: pos.settings().enabled_payment_methods().cloned().collect(),
    })
}

/// The payment dialog was dismissed; items can be changed again.
pub fn leave_payment(pos: &mut Pos, order_id: &str) -> Result<DraftOrder> {
    pos.require_signed_in()?;
    let draft = pos.draft_mut(order_id)?;
    draft.leave_payment().map_err(|e| rejected(order_id, e))?;
    Ok(draft.clone())
}

/// Takes payment, appends the finished order to the ledger and retires the draft.
///
/// The draft stays in `Paying` if the payment is refused or the ledger cannot be saved.
pub fn complete_order(pos: &mut Pos, order_id: &str, payment: PaymentInput) -> Result<CompletedSale> {
    pos.require_signed_in()?;
    let now = pos.now();
    let mut draft = pos.draft(order_id)?.clone();
    let sale = draft
        .complete(&payment, pos.settings(), now, &mut rand::thread_rng())
        .map_err(|e| rejected(order_id, e))?;

    pos.commit(|state, _| {
        state.orders.append(sale.order.clone());
        Ok(())
    })?;
    pos.replace_draft(draft);

    info!(
        order_id,
        total = %sale.order.total,
        method = %payment.method,
        change = %sale.change,
        code = sale.order.order_code.as_deref().unwrap_or("-"),
        "Order completed"
    );
    Ok(sale)
}

pub fn cancel_order(pos: &mut Pos, order_id: &str) -> Result<()> {
    pos.require_signed_in()?;
    let mut draft = pos.draft(order_id)?.clone();
    draft.cancel().map_err(|e| rejected(order_id, e))?;
    pos.replace_draft(draft);
    info!(order_id, "Order cancelled");
    Ok(())
}

pub fn get_order(pos: &Pos, id: &str) -> Result<Order> {
    pos.require_signed_in()?;
    pos.state()
        .orders
        .get(id)
        .cloned()
        .ok_or_else(|| Error::not_found("Order", id))
}

pub fn get_active_orders(pos: &Pos) -> Result<Vec<Order>> {
    pos.require_signed_in()?;
    Ok(pos.state().orders.pending().cloned().collect())
}

pub fn update_order(pos: &mut Pos, order: Order) -> Result<Order> {
    pos.require_signed_in()?;
    pos.commit(|state, _| state.orders.update(order.clone()))?;
    info!(order_id = %order.id, status = ?order.status, "Order updated");
    Ok(order)
}
