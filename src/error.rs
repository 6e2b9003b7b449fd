use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("A cash flow session is already open ({id})")]
    SessionAlreadyOpen { id: String },

    #[error("Cash flow session {id} is not the open session")]
    SessionNotOpen { id: String },

    #[error("Cash flow session {id} has not been closed yet")]
    SessionStillOpen { id: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Cannot {action} while the order is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Sign in to use the till")]
    NotSignedIn,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Input problems the operator can fix and retry. Nothing is mutated when one is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("A table number is required for dine-in orders")]
    MissingTableNumber,

    #[error("A customer name is required for takeaway orders")]
    MissingCustomerName,

    #[error("An order needs at least one item before payment")]
    EmptyOrder,

    #[error("Cash received {received} is less than the order total {total}")]
    InsufficientCash { received: Decimal, total: Decimal },

    #[error("Payment method {0} is not enabled")]
    PaymentMethodUnavailable(String),

    #[error("{field} cannot be negative, got {amount}")]
    NegativeAmount { field: &'static str, amount: Decimal },

    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    #[error("Category {0} does not exist")]
    UnknownCategory(String),

    #[error("A product with id {0} already exists")]
    DuplicateProduct(String),

    #[error("Category {0} already exists")]
    DuplicateCategory(String),

    #[error("The total of completed order {0} cannot change")]
    CompletedTotalChanged(String),

    #[error("Completed order {0} cannot go back to pending")]
    CompletedOrderReopened(String),
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
