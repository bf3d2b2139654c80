#![allow(dead_code)]

mod body;
mod chain;
mod clock;
mod logging;
mod store;

pub use body::*;
pub use chain::*;
pub use clock::*;
pub use logging::*;
pub use store::*;
