//! The Machine Loader (spec §4.2): parses a machine description document,
//! validates it, and inserts it into the Catalogue Store.

mod description;
mod error;
mod load;
mod validate;

pub use description::{MachineDescription, MachinesDocument};
pub use error::{LoaderError, Result};
pub use load::load_machine;

use sqlx::PgPool;
use std::path::Path;

/// Parse a TOML machine description document and load every machine it
/// names, returning their assigned ids in document order.
pub async fn load_document(pool: &PgPool, toml_text: &str) -> Result<Vec<spalloc_model::MachineId>> {
    let doc: MachinesDocument =
        toml::from_str(toml_text).map_err(|e| LoaderError::Parse(e.to_string()))?;
    let mut ids = Vec::with_capacity(doc.machines.len());
    for machine in &doc.machines {
        ids.push(load_machine(pool, machine).await?);
    }
    Ok(ids)
}

pub async fn load_document_file(pool: &PgPool, path: &Path) -> Result<Vec<spalloc_model::MachineId>> {
    let text = std::fs::read_to_string(path).map_err(|e| LoaderError::Parse(e.to_string()))?;
    load_document(pool, &text).await
}
