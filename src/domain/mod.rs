mod balance;
mod expense;
mod money;
mod record;
mod settlement;

pub use balance::*;
pub use expense::*;
pub use money::*;
pub use record::*;
pub use settlement::*;
