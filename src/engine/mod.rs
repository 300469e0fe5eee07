pub mod delegation;
pub mod lifecycle;
pub mod tally;

pub use delegation::*;
pub use lifecycle::*;
pub use tally::*;
