pub mod catalog;
pub mod io;
pub mod layout;
pub mod ledger;
pub mod place;
pub mod reporter;
pub mod resolver;

pub use io::write_atomic;
pub use layout::Layout;
pub use ledger::{Installed, LedgerError, LedgerStore};
pub use reporter::{NullReporter, Reporter};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("apkg-core/", env!("CARGO_PKG_VERSION"));
