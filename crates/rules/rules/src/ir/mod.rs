pub mod expr;
pub mod optimize;
pub mod rule;
