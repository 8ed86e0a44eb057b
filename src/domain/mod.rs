pub mod authorization;
pub mod models;
pub mod transitions;
