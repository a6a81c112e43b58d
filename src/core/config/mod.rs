pub mod model;
pub mod store;

pub use model::{GameConfig, GameSection, RunnerConfig};
pub use store::ConfigStore;
