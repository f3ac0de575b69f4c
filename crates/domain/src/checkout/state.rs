//! Checkout state machine.

use serde::{Deserialize, Serialize};

/// The state of a checkout in its lifecycle.
///
/// State transitions:
/// ```text
/// Created ──┬──► Authorized ──► Persisted
///           └──► Failed
/// ```
///
/// `Authorized` is durable: a checkout found in that state after a restart
/// was paid but its order may not have been written yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckoutState {
    /// Draft priced and journaled, payment not yet answered.
    #[default]
    Created,

    /// Payment service reported the charge as paid.
    Authorized,

    /// Order row and lines written (terminal state).
    Persisted,

    /// Payment declined or unreachable (terminal state).
    Failed,
}

impl CheckoutState {
    /// Returns true if a payment authorization can be recorded in this state.
    pub fn can_authorize(&self) -> bool {
        matches!(self, CheckoutState::Created)
    }

    /// Returns true if a payment failure can be recorded in this state.
    pub fn can_fail(&self) -> bool {
        matches!(self, CheckoutState::Created)
    }

    /// Returns true if the order can be persisted in this state.
    pub fn can_persist(&self) -> bool {
        matches!(self, CheckoutState::Authorized)
    }

    /// Returns true if the checkout was paid but not yet persisted.
    pub fn needs_recovery(&self) -> bool {
        matches!(self, CheckoutState::Authorized)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutState::Persisted | CheckoutState::Failed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Created => "Created",
            CheckoutState::Authorized => "Authorized",
            CheckoutState::Persisted => "Persisted",
            CheckoutState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
