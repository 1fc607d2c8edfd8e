//! Aggregation of live on-chain state across every deployed instance of a
//! contract type.
//!
//! The pipeline: resolve the contract's template record, ask the ledger what
//! bytecode the template instance runs, enumerate every account running that
//! bytecode, then fan out one staggered fetch task per instance. Each task
//! attaches a state accessor and decodes the declared variables, retrying
//! transient failures up to a hard ceiling; every task settles with either a
//! snapshot or a tagged failure, and the aggregator returns the outcomes in
//! completion order once all of them have settled.

mod accessor;
mod aggregate;
mod decode;
mod error;
mod fanout;

#[cfg(test)]
mod tests;

pub use accessor::{AttachContract, ContractAccessor, StorageAttacher};
pub use aggregate::StateAggregator;
pub use error::{FetchError, StateError};
pub use fanout::FetchOutcome;

#[cfg(any(test, feature = "testing"))]
pub use accessor::MockAttachContract;
