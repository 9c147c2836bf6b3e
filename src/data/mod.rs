pub mod connectors;

pub use connectors::HexConnector;
