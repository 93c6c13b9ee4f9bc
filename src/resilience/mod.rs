mod executor;
mod hooks;
mod policy;

pub use executor::ResilientExecutor;
pub use hooks::{RetryContext, RetryEvents};
pub use policy::{RetryPolicy, RetryPolicyOverrides};
