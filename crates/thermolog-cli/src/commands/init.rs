use std::path::Path;

use thermolog_core::Result;

pub fn run(database: &Path) -> Result<()> {
    super::open_store(database)?;
    println!("Database ready at {}", database.display());
    Ok(())
}
