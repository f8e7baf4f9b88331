//! tally-report: dashboards built from fetched sales, and the state that holds them.

pub mod dashboard;
pub mod products;
pub mod state;

pub use dashboard::{reconcile, Report, ReportContext, View, DAILY_LOOKBACK_DAYS};
pub use products::{product_breakdown, ProductSales};
pub use state::{Applied, ReportState};
