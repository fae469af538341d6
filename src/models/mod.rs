pub mod health;
pub mod error;
pub mod diagnostics;
pub mod queue_message;
pub mod ws_frames;
pub mod metrics;

pub use health::*;
pub use error::*;
pub use diagnostics::*;
pub use queue_message::*;
pub use ws_frames::*;
pub use metrics::*;
