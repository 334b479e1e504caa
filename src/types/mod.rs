pub mod backtest;
pub mod price;
pub mod signal;

pub use backtest::*;
pub use price::*;
pub use signal::*;
