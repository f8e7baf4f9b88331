//! Sales per product, for the intraday view.

use serde::Serialize;
use std::collections::HashMap;
use tally_core::{buckets::place, Calendar, Money, TimeWindow, Transaction};

const UNNAMED_PRODUCT: &str = "(no product)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSales {
    pub name: String,
    pub count: u64,
    pub net_amount: Money,
}

/// Group in-window sales by product name, biggest net amount first.
pub fn product_breakdown(
    transactions: &[Transaction],
    window: &TimeWindow,
    calendar: &Calendar,
) -> Vec<ProductSales> {
    let mut groups: HashMap<&str, (u64, Money)> = HashMap::new();

    for tx in transactions {
        if place(tx, window, calendar).is_none() {
            continue;
        }
        let name = tx.product.as_deref().unwrap_or(UNNAMED_PRODUCT);
        let entry = groups.entry(name).or_default();
        entry.0 += 1;
        entry.1 += tx.net();
    }

    let mut out: Vec<ProductSales> = groups
        .into_iter()
        .map(|(name, (count, net_amount))| ProductSales {
            name: name.to_string(),
            count,
            net_amount,
        })
        .collect();

    out.sort_by(|a, b| {
        b.net_amount
            .cmp(&a.net_amount)
            .then_with(|| a.name.cmp(&b.name))
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_groups_and_sorts_by_amount() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 20).unwrap();
        let ts = |h: u32| day.and_hms_opt(h, 0, 0).unwrap().and_utc().timestamp() as f64;
        let txns = vec![
            Transaction::new(ts(9)).with_net_amount(50.0).with_product("Ebook"),
            Transaction::new(ts(10)).with_net_amount(300.0).with_product("Curso"),
            Transaction::new(ts(11)).with_net_amount(50.0).with_product("Ebook"),
            Transaction::new(ts(12)).with_net_amount(100.0),
            // Yesterday: ignored.
            Transaction::new(ts(12) - 86_400.0).with_net_amount(999.0).with_product("Curso"),
        ];

        let out = product_breakdown(&txns, &TimeWindow::single_day(day), &Calendar::default());
        let names: Vec<&str> = out.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Curso", "(no product)", "Ebook"]);
        assert_eq!(out[0].count, 1);
        assert_eq!(out[2].count, 2);
        assert_eq!(out[2].net_amount, Money::from_minor(10_000));
    }
}
