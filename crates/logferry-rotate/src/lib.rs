//! logferry Rotate - day-partitioned log storage
//!
//! Consumes a merged log stream and appends it to one file per UTC day,
//! keeping a stable `<prefix>.current` pointer at the active file so tools
//! can tail the log without knowing the date.

pub mod rotator;

pub use rotator::Rotator;
