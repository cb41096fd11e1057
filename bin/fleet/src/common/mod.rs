mod error;
mod logging;
mod variant;
mod wallets;

pub use error::*;
pub use logging::*;
pub use variant::*;
pub use wallets::*;
