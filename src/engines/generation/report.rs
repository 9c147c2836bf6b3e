use super::evolution_engine::{EvolutionOutcome, TrialStats};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Serializable summary of one evolution run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: String,
    pub finished_at: String,
    pub rng_seed: Option<u64>,
    pub generations: usize,
    pub seed_lines: usize,
    pub final_lines: usize,
    pub inserted: usize,
    pub population_size: usize,
    pub final_value: Option<u64>,
    pub final_fault: Option<String>,
    pub stats: ReportStats,
    pub chromosome: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportStats {
    pub trials: usize,
    pub fit: usize,
    pub wrong_value: usize,
    pub arithmetic_faults: usize,
    pub timeouts: usize,
    pub crashes: usize,
    pub other_faults: usize,
}

impl From<&TrialStats> for ReportStats {
    fn from(stats: &TrialStats) -> Self {
        Self {
            trials: stats.trials,
            fit: stats.fit,
            wrong_value: stats.wrong_value,
            arithmetic_faults: stats.arithmetic_faults,
            timeouts: stats.timeouts,
            crashes: stats.crashes,
            other_faults: stats.other_faults,
        }
    }
}

impl RunReport {
    pub fn new(outcome: &EvolutionOutcome, started_at: String, rng_seed: Option<u64>) -> Self {
        let (final_value, final_fault) = match &outcome.final_value {
            Ok(value) => (Some(*value), None),
            Err(fault) => (None, Some(fault.to_string())),
        };

        Self {
            started_at,
            finished_at: chrono::Utc::now().to_rfc3339(),
            rng_seed,
            generations: outcome.generations,
            seed_lines: outcome.seed_len,
            final_lines: outcome.best.len(),
            inserted: outcome.inserted,
            population_size: outcome.population.len(),
            final_value,
            final_fault,
            stats: ReportStats::from(&outcome.stats),
            chromosome: outcome.best.to_hex_lines(),
        }
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::evaluation::Fault;
    use crate::engines::generation::Chromosome;
    use crate::isa::InstructionTable;

    fn outcome(final_value: std::result::Result<u64, Fault>) -> EvolutionOutcome {
        let best = Chromosome::decode(&[0x55, 0x5D, 0xC3], &InstructionTable::new()).unwrap();
        EvolutionOutcome {
            population: vec![best.clone()],
            best,
            generations: 4,
            seed_len: 2,
            inserted: 1,
            final_value,
            stats: TrialStats { trials: 20, fit: 1, wrong_value: 19, ..Default::default() },
        }
    }

    #[test]
    fn test_report_from_outcome() {
        let report = RunReport::new(&outcome(Ok(6)), chrono::Utc::now().to_rfc3339(), Some(3));

        assert_eq!(report.final_value, Some(6));
        assert_eq!(report.final_fault, None);
        assert_eq!(report.final_lines, 3);
        assert_eq!(report.chromosome, vec!["55", "5D", "C3"]);
        assert_eq!(report.stats.trials, 20);
        assert!(chrono::DateTime::parse_from_rfc3339(&report.finished_at).is_ok());
    }

    #[test]
    fn test_report_records_fault() {
        let report = RunReport::new(&outcome(Err(Fault::ArithmeticFault)), String::new(), None);
        assert_eq!(report.final_value, None);
        assert_eq!(report.final_fault.as_deref(), Some("Arithmetic fault"));
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = RunReport::new(&outcome(Ok(6)), String::new(), Some(1));

        report.write_json(&path).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["final_value"], 6);
        assert_eq!(parsed["inserted"], 1);
        assert_eq!(parsed["chromosome"][2], "C3");
    }
}
