//! Payment state machine.
//!
//! A payment starts `UNPAID` and moves forward exactly once, either to `PAID`
//! or to `CANCELLED`. Both are terminal; no edge leads back to `UNPAID`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentState {
    #[default]
    Unpaid,
    Paid,
    Cancelled,
}

/// An event that drives a persisted payment to its next state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEvent {
    /// Settle the payment at the given (possibly back-dated) instant.
    MarkPaid(NaiveDateTime),
    Cancel,
}

/// Why an event was rejected in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IllegalTransition {
    /// `MarkPaid` outside of `UNPAID`.
    NotUnpaid,
    /// `Cancel` on a `CANCELLED` payment.
    AlreadyCancelled,
    /// `Cancel` on a `PAID` payment.
    AlreadyPaid,
}

impl PaymentState {
    /// Returns the state reached by applying `event`, or the reason the edge
    /// does not exist.
    pub fn next(self, event: &PaymentEvent) -> Result<PaymentState, IllegalTransition> {
        match (self, event) {
            (PaymentState::Unpaid, PaymentEvent::MarkPaid(_)) => Ok(PaymentState::Paid),
            (PaymentState::Unpaid, PaymentEvent::Cancel) => Ok(PaymentState::Cancelled),
            (_, PaymentEvent::MarkPaid(_)) => Err(IllegalTransition::NotUnpaid),
            (PaymentState::Cancelled, PaymentEvent::Cancel) => {
                Err(IllegalTransition::AlreadyCancelled)
            }
            (PaymentState::Paid, PaymentEvent::Cancel) => Err(IllegalTransition::AlreadyPaid),
        }
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentState::Unpaid => "UNPAID",
            PaymentState::Paid => "PAID",
            PaymentState::Cancelled => "CANCELLED",
        };
        f.write_str(name)
    }
}
