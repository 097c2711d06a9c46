pub mod amex;
pub mod generic;
