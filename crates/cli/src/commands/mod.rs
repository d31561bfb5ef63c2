pub mod health;
pub mod predict;
pub mod range;
