pub mod chromosome;
pub mod operators;
pub mod evolution_engine;
pub mod progress;
pub mod report;

pub use chromosome::Chromosome;
pub use operators::{MutationRecord, Mutator};
pub use evolution_engine::{EvolutionEngine, EvolutionOutcome, ProgressCallback, TrialStats};
pub use progress::{ChannelProgressCallback, ConsoleProgressCallback, ProgressMessage};
pub use report::{ReportStats, RunReport};
