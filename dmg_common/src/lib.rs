mod money;

pub mod op;
mod secret;

mod helpers;

pub use helpers::parse_boolean_flag;
pub use money::{Money, MoneyConversionError};
pub use secret::Secret;
