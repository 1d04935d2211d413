mod agent;
mod train;

pub use agent::{
    AgentConfig,
    NetworkConfig,
};
pub use train::TrainConfig;
