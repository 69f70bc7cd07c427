//! TOML configuration parsing with file context.

use anyhow::{Context, Result};
use std::path::Path;

/// Parse a TOML file into `T`.
///
/// Read and parse failures both name the file in their context; the
/// underlying IO or TOML error stays available as the cause.
///
/// ```rust,no_run
/// use autowire::config::{AutowireConfig, parse_config};
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// let config: AutowireConfig = parse_config(Path::new("autowire.toml"))?;
/// println!("safe mode: {}", config.safe);
/// # Ok(())
/// # }
/// ```
pub fn parse_config<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: T = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}
