pub mod logging;
pub mod util;

pub mod networks;
pub mod components;
pub mod agents;
pub mod configs;

pub mod envs;
pub mod engines;
pub mod cli;

pub use agents::RunMode;
