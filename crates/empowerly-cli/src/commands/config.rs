/// Configuration display
use anyhow::Result;
use empowerly_core::AppConfig;

pub fn handle_config_show(config: &AppConfig) -> Result<()> {
    println!("# {}", AppConfig::default_path()?.display());
    print!("{}", config.to_toml_string()?);
    Ok(())
}

pub fn handle_config_path() -> Result<()> {
    println!("{}", AppConfig::default_path()?.display());
    Ok(())
}
