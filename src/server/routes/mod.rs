pub mod health;
pub mod validation;
