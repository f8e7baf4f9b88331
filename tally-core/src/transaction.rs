//! Sales transaction as seen by the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::currency::Money;
use crate::time::{normalize, normalize_with_unit, EpochUnit};

/// A sale. Amounts missing upstream count as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Epoch number, seconds or milliseconds
    pub created_at: f64,
    /// Unit of `created_at` when the source knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch_unit: Option<EpochUnit>,
    #[serde(default)]
    pub net_amount: Option<f64>,
    #[serde(default)]
    pub affiliate_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
}

impl Transaction {
    pub fn new(created_at: f64) -> Self {
        Self {
            created_at,
            ..Self::default()
        }
    }

    pub fn with_unit(mut self, unit: EpochUnit) -> Self {
        self.epoch_unit = Some(unit);
        self
    }

    pub fn with_net_amount(mut self, amount: f64) -> Self {
        self.net_amount = Some(amount);
        self
    }

    pub fn with_affiliate_amount(mut self, amount: f64) -> Self {
        self.affiliate_amount = Some(amount);
        self
    }

    pub fn with_product(mut self, name: impl Into<String>) -> Self {
        self.product = Some(name.into());
        self
    }

    /// When the sale happened, or `None` if the timestamp is unusable.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self.epoch_unit {
            Some(unit) => normalize_with_unit(self.created_at, unit),
            None => normalize(self.created_at),
        }
    }

    pub fn net(&self) -> Money {
        self.net_amount.map(Money::from_amount).unwrap_or_default()
    }

    pub fn affiliate(&self) -> Money {
        self.affiliate_amount.map(Money::from_amount).unwrap_or_default()
    }
}
