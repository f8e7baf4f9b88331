use chrono::SecondsFormat;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tally_core::{Calendar, EpochUnit, TimeWindow, Transaction};

/// Body of `POST /api/transactions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionsRequest {
    pub ordered_at_ini: String,
    pub ordered_at_end: String,
}

impl TransactionsRequest {
    /// Bounds as full UTC ISO instants: start of the first day and end of the
    /// last, both read in `calendar`.
    pub fn for_window(window: &TimeWindow, calendar: &Calendar) -> Self {
        let (start, end) = window.request_bounds(calendar);
        Self {
            ordered_at_ini: start.to_rfc3339_opts(SecondsFormat::Millis, true),
            ordered_at_end: end.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransactionsResponse {
    /// One entry per row; `None` for a row that could not be read.
    /// `null`, a missing field or a non-array all mean no sales.
    #[serde(default, deserialize_with = "lenient_rows")]
    pub data: Vec<Option<RawTransaction>>,
    /// Unreadable totals are treated as absent
    #[serde(default, deserialize_with = "lenient_totals")]
    pub totals: Option<ServerTotals>,
}

/// Totals computed by the server, when it sends them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerTotals {
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_transactions: Option<u64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub total_net_amount: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawTransaction {
    #[serde(default)]
    pub dates: Option<RawDates>,
    #[serde(default)]
    pub calculation_details: Option<CalculationDetails>,
    #[serde(default)]
    pub product: Option<RawProduct>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawDates {
    #[serde(default, deserialize_with = "lenient_number")]
    pub created_at: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CalculationDetails {
    #[serde(default, deserialize_with = "lenient_number")]
    pub net_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub net_affiliate_value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawProduct {
    #[serde(default)]
    pub name: Option<String>,
}

/// Numbers may arrive as JSON numbers, numeric strings or null.
/// Anything unreadable is treated as absent.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }))
}

/// Counts as JSON integers, integral floats or numeric strings.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }))
}

fn lenient_totals<'de, D>(deserializer: D) -> Result<Option<ServerTotals>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

fn lenient_rows<'de, D>(deserializer: D) -> Result<Vec<Option<RawTransaction>>, D::Error>
where
    D: Deserializer<'de>,
{
    let rows = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(rows)) => rows,
        _ => return Ok(Vec::new()),
    };
    Ok(rows
        .into_iter()
        .map(|row| serde_json::from_value(row).ok())
        .collect())
}

impl RawTransaction {
    /// `None` when the row has no creation timestamp.
    pub fn into_transaction(self, epoch_unit: Option<EpochUnit>) -> Option<Transaction> {
        let created_at = self.dates?.created_at?;
        let details = self.calculation_details.unwrap_or_default();
        Some(Transaction {
            created_at,
            epoch_unit,
            net_amount: details.net_amount,
            affiliate_amount: details.net_affiliate_value,
            product: self.product.and_then(|p| p.name),
        })
    }
}

/// One successful fetch, converted for the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedBatch {
    pub transactions: Vec<Transaction>,
    pub server_totals: Option<ServerTotals>,
    /// Rows dropped as unreadable or for lack of a timestamp
    pub dropped: usize,
}

impl TransactionsResponse {
    pub fn into_batch(self, epoch_unit: Option<EpochUnit>) -> FetchedBatch {
        let total = self.data.len();
        let transactions: Vec<Transaction> = self
            .data
            .into_iter()
            .flatten()
            .filter_map(|row| row.into_transaction(epoch_unit))
            .collect();
        FetchedBatch {
            dropped: total - transactions.len(),
            transactions,
            server_totals: self.totals,
        }
    }
}
