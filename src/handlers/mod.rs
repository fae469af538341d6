pub mod health;
pub mod broadcast;
pub mod diagnostics;
pub mod metrics;

pub use health::*;
pub use broadcast::*;
pub use diagnostics::*;
