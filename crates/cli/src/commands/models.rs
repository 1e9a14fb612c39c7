//! `codewright models` — print the catalog.

use codewright_config::{AppConfig, Catalog};
use codewright_core::Error;

pub fn run() -> Result<(), Error> {
    let config = AppConfig::load().map_err(Error::from)?;
    let catalog = Catalog::builtin();

    println!("{:<36} {:<12} {:<10} {}", "MODEL", "PROVIDER", "REASONING", "");
    for model in catalog.all_models() {
        let marker = if model.id == config.default_model { "(default)" } else { "" };
        println!(
            "{:<36} {:<12} {:<10} {}",
            model.id,
            model.provider,
            if model.supports_reasoning { "yes" } else { "no" },
            marker
        );
    }
    Ok(())
}
