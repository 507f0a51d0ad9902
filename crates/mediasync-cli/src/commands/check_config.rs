use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;

use crate::config::{self, Settings};

/// Load and validate the configuration, then print what a sync would use.
pub fn run(config_path: Option<&Path>) -> Result<()> {
    let settings = config::load_config(config_path)?;
    print!("{}", describe(&settings));
    Ok(())
}

/// Human-readable summary of `settings`. Secrets are left out.
pub fn describe(settings: &Settings) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "remote:   {}", settings.remote.base_url);
    let _ = writeln!(out, "username: {}", settings.remote.username);
    let _ = writeln!(out, "chat id:  {}", settings.telegram.chat_id);

    if settings.mappings.is_empty() {
        let _ = writeln!(out, "no root mappings configured");
    } else {
        let _ = writeln!(out, "root mappings (last match wins):");
        for mapping in &settings.mappings {
            let _ = writeln!(out, "  {} -> {}", mapping.remote_path, mapping.local_path);
        }
    }
    out
}
