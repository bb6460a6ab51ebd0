pub mod general;
pub mod typical_days;

// Re-export commonly used items for convenience
pub use general::{Result, RunConfig, TdError};
pub use typical_days::Pipeline;
