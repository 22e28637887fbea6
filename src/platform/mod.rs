//! OS-specific side effects

pub mod background;

pub use background::{BackgroundError, BackgroundSetter, SystemBackground};
