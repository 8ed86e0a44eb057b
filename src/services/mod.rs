pub mod assignments;
pub mod errors;
pub mod reports;
