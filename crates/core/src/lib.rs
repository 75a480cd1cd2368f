//! `provjera-core`: shared value types.
//!
//! Readers in `provjera-io` produce [`RawSheet`]s, the reconciliation engine
//! consumes them and hands back [`Table`]s for the emitters.

pub mod cell;
pub mod sheet;
pub mod table;

pub use cell::Cell;
pub use sheet::RawSheet;
pub use table::Table;
