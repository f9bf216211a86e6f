pub mod condition;
pub mod interaction;
pub mod medication;

pub use condition::*;
pub use interaction::*;
pub use medication::*;
