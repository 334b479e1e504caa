pub mod aggregator;
pub mod backtester;
pub mod evaluator;
pub mod price_resolver;
pub mod quotes;
pub mod sqlite_store;

pub use backtester::{BacktestError, BacktestRunner, RunnerSettings};
pub use price_resolver::{PriceResolver, PriceSource};
pub use sqlite_store::{SqliteStore, StoreError};
