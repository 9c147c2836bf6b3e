pub mod exec_page;
pub mod fitness;
pub mod sandbox;

pub use exec_page::{live_pages, system_page_size, ExecutablePage};
pub use fitness::{ExpectedValue, FitnessOracle};
pub use sandbox::{Executor, Fault, Sandbox};
