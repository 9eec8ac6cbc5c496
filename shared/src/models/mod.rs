//! Domain models for the booker ledger

mod company;
mod daily_entry;
mod dashboard;
mod monthly_target;
mod order;
mod order_booker;
mod product;
mod product_sales;
mod report;

pub use company::*;
pub use daily_entry::*;
pub use dashboard::*;
pub use monthly_target::*;
pub use order::*;
pub use order_booker::*;
pub use product::*;
pub use product_sales::*;
pub use report::*;
