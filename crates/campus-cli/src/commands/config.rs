// Print the effective configuration

use anyhow::Result;
use campus_guards::GuardConfig;

pub fn render(config: &GuardConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

pub fn run(config: &GuardConfig) -> Result<()> {
    print!("{}", render(config)?);
    Ok(())
}
