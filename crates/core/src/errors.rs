use thiserror::Error;

use crate::domain::order::{OrderId, OrderStatus};
use crate::domain::transaction::TransactionKind;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("{} is not possible while the order is {status}", .kind.noun())]
    IneligibleOrderStatus { kind: TransactionKind, status: OrderStatus },
    #[error("order {0} was not found")]
    UnknownOrder(OrderId),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}
