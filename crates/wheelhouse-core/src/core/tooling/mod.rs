pub mod outcome;
pub mod progress;
