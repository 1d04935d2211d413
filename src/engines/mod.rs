mod experiment;
mod train;

pub use experiment::run_experiment;
pub use train::Trainer;
