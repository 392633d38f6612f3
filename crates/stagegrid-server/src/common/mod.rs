pub mod performance;
pub mod stage;
