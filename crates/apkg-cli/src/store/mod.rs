pub mod actor;

pub use actor::{LedgerHandle, StoreError};
