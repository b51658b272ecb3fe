pub mod cv;
pub mod generation;
pub mod job;
