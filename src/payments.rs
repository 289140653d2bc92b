//! Simulated payment gateway.
//!
//! Stands in for the external charge API. Credentials are injected at
//! construction; there is no process-wide gateway state.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{OrderError, Result};

#[derive(Clone, Debug)]
pub struct PaymentGateway {
    secret_key: String,
}

impl PaymentGateway {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self { secret_key: secret_key.into() }
    }

    /// Creates a charge for the order total and returns the external
    /// charge id. Stripe-style decline test tokens fail the charge.
    pub fn charge(&self, order_id: Uuid, amount: Decimal, token: &str) -> Result<String> {
        if self.secret_key.is_empty() {
            return Err(OrderError::PaymentDeclined("payment gateway not configured".into()));
        }
        if token.is_empty() {
            return Err(OrderError::PaymentDeclined("missing card token".into()));
        }
        if token.starts_with("tok_chargeDeclined") {
            return Err(OrderError::PaymentDeclined("card was declined".into()));
        }
        let charge_id = format!("ch_{}", Uuid::new_v4().simple());
        tracing::info!(%order_id, %amount, charge_id, "simulated charge created");
        Ok(charge_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charge_returns_external_charge_id() {
        let gateway = PaymentGateway::new("sk_test_simulated");
        let charge_id =
            gateway.charge(Uuid::new_v4(), Decimal::new(30000, 2), "tok_visa").unwrap();
        assert!(charge_id.starts_with("ch_"));
    }

    #[test]
    fn decline_token_fails_the_charge() {
        let gateway = PaymentGateway::new("sk_test_simulated");
        let err = gateway
            .charge(Uuid::new_v4(), Decimal::new(30000, 2), "tok_chargeDeclined")
            .unwrap_err();
        assert!(matches!(err, OrderError::PaymentDeclined(_)));
    }

    #[test]
    fn unconfigured_gateway_rejects_charges() {
        let gateway = PaymentGateway::new("");
        assert!(gateway.charge(Uuid::new_v4(), Decimal::ONE, "tok_visa").is_err());
    }
}
