//! Shared domain crate for the booker ledger
//!
//! Entity models, the ledger arithmetic and validation rules used by both the
//! backend and the webview (via WASM).

pub mod calculations;
pub mod models;
pub mod types;
pub mod validation;

pub use calculations::*;
pub use models::*;
pub use types::*;
pub use validation::*;
