pub mod format;
pub mod gauge;
pub mod logging;
