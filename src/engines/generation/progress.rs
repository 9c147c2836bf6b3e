use super::evolution_engine::ProgressCallback;
use super::operators::MutationRecord;

pub struct ConsoleProgressCallback;

impl ProgressCallback for ConsoleProgressCallback {
    fn on_generation_start(&mut self, generation: usize, population_size: usize) {
        log::info!(
            "Generation {} starting with {} chromosome(s)",
            generation + 1,
            population_size
        );
    }

    fn on_survivor(&mut self, generation: usize, chromosome: usize, trial: usize, mutation: &MutationRecord) {
        log::info!(
            "  Generation {}: chromosome {} trial {} survived with [{}] at line {}",
            generation + 1,
            chromosome,
            trial,
            mutation.gene,
            mutation.line
        );
    }

    fn on_generation_complete(&mut self, generation: usize, survivors: usize, population_size: usize) {
        if survivors == 0 {
            log::info!(
                "Generation {} complete. No survivors, keeping {} chromosome(s)",
                generation + 1,
                population_size
            );
        } else {
            log::info!(
                "Generation {} complete. {} survivor(s)",
                generation + 1,
                survivors
            );
        }
    }
}

// Forwards progress to another thread
pub struct ChannelProgressCallback {
    sender: std::sync::mpsc::Sender<ProgressMessage>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressMessage {
    GenerationStart { generation: usize, population_size: usize },
    Survivor { generation: usize, chromosome: usize, trial: usize, line: usize, gene: String },
    GenerationComplete { generation: usize, survivors: usize, population_size: usize },
}

impl ChannelProgressCallback {
    pub fn new(sender: std::sync::mpsc::Sender<ProgressMessage>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelProgressCallback {
    fn on_generation_start(&mut self, generation: usize, population_size: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationStart {
            generation,
            population_size,
        });
    }

    fn on_survivor(&mut self, generation: usize, chromosome: usize, trial: usize, mutation: &MutationRecord) {
        let _ = self.sender.send(ProgressMessage::Survivor {
            generation,
            chromosome,
            trial,
            line: mutation.line,
            gene: mutation.gene.to_hex(),
        });
    }

    fn on_generation_complete(&mut self, generation: usize, survivors: usize, population_size: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationComplete {
            generation,
            survivors,
            population_size,
        });
    }
}
