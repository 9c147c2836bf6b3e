/// Decides whether a trial's return value counts as fit
pub trait FitnessOracle {
    fn is_fit(&self, value: u64) -> bool;
}

impl<F> FitnessOracle for F
where
    F: Fn(u64) -> bool,
{
    fn is_fit(&self, value: u64) -> bool {
        self(value)
    }
}

/// Fit when the candidate returns exactly this value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedValue(pub u64);

impl FitnessOracle for ExpectedValue {
    fn is_fit(&self, value: u64) -> bool {
        value == self.0
    }
}
