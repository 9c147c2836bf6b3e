mod hex;

pub use hex::HexConnector;
