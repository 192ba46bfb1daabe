//! The BMP Controller (spec §4.5): one serial worker per BMP draining its
//! boards' queued power and blacklist changes against a hardware
//! transceiver.

pub mod controller;
pub mod error;
pub mod transceiver;
pub mod worker;

pub use controller::BmpController;
pub use error::{BmpError, Result};
pub use transceiver::{DummyTransceiver, Transceiver, TransceiverError, TxResult};
pub use worker::BmpWorker;
