//! The hardware seam (spec §4.5): everything a BMP worker needs to say to
//! a real BMP, abstracted so the engine can run against a `DummyTransceiver`
//! in tests and in `transceiver.dummy` mode.

use async_trait::async_trait;
use spalloc_model::{LinkInitFlags, Physical};
use std::fmt;

#[derive(Debug)]
pub struct TransceiverError(pub String);

impl fmt::Display for TransceiverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for TransceiverError {}

pub type TxResult<T> = std::result::Result<T, TransceiverError>;

/// One attempt of each operation; retry counts and back-off live in the
/// worker, not here, so a transceiver implementation stays a thin wire
/// adapter.
#[async_trait]
pub trait Transceiver: Send + Sync {
    async fn set_power(&self, boards: &[Physical], on: bool) -> TxResult<()>;

    async fn configure_link_init(&self, board: Physical, flags: LinkInitFlags) -> TxResult<()>;

    /// Probe an FPGA after power-on/link-init; `Ok(true)` means the FPGA
    /// came up, `Ok(false)` means it didn't but the link itself is alive
    /// (worth another attempt, possibly with `fpga_reload`).
    async fn verify_fpga(&self, board: Physical) -> TxResult<bool>;

    async fn read_blacklist(&self, board: Physical) -> TxResult<()>;

    async fn write_blacklist(&self, board: Physical) -> TxResult<()>;
}

/// Simulates a working BMP: every call succeeds immediately. Used by
/// `transceiver.dummy = true` and by tests (spec §8's scenarios run
/// against this, never real hardware).
#[derive(Debug, Default)]
pub struct DummyTransceiver;

#[async_trait]
impl Transceiver for DummyTransceiver {
    async fn set_power(&self, _boards: &[Physical], _on: bool) -> TxResult<()> {
        Ok(())
    }

    async fn configure_link_init(&self, _board: Physical, _flags: LinkInitFlags) -> TxResult<()> {
        Ok(())
    }

    async fn verify_fpga(&self, _board: Physical) -> TxResult<bool> {
        Ok(true)
    }

    async fn read_blacklist(&self, _board: Physical) -> TxResult<()> {
        Ok(())
    }

    async fn write_blacklist(&self, _board: Physical) -> TxResult<()> {
        Ok(())
    }
}
