pub use phase::*;

mod phase;
