pub mod list;
pub mod output;

pub use apkg_core::Reporter;
pub use output::Output;
