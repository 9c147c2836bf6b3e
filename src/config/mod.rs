pub mod traits;
pub mod evolution;
pub mod mutation;
pub mod sandbox;
pub mod fitness;
pub mod manager;

pub use manager::{ConfigManager, AppConfig};
pub use evolution::EvolutionConfig;
pub use mutation::MutationConfig;
pub use sandbox::SandboxConfig;
pub use fitness::FitnessConfig;
pub use traits::ConfigSection;
