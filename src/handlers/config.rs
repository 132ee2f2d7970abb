use crate::cli::ConfigAction;
use anyhow::Result;
use console::{Term, style};
use rdjd::config::ConfigManager;
use std::process;

pub async fn handle_config(config_manager: &ConfigManager, action: ConfigAction) -> Result<()> {
    let term = Term::stdout();

    match action {
        ConfigAction::Show => {
            let config_content = toml::to_string_pretty(config_manager.config())?;

            term.write_line(&format!("{} Current configuration:", style("⚙️").cyan()))?;
            term.write_line(&format!(
                "{} {}",
                style("📁").dim(),
                config_manager.config_file().display()
            ))?;
            term.write_line("")?;
            term.write_line(&config_content)?;
        }

        ConfigAction::Path => {
            term.write_line(&config_manager.config_file().display().to_string())?;
        }

        ConfigAction::Validate => {
            term.write_line(&format!(
                "{} Validating configuration...",
                style("🔍").cyan()
            ))?;

            match config_manager.validate() {
                Ok(()) => {
                    term.write_line(&format!("{} Configuration is valid", style("✅").green()))?;
                }
                Err(e) => {
                    term.write_line(&format!(
                        "{} Configuration validation failed:",
                        style("❌").red()
                    ))?;
                    term.write_line(&format!("   {}", e))?;
                    term.write_line(&format!(
                        "{} Edit {} and run this command again",
                        style("💡").yellow(),
                        config_manager.config_file().display()
                    ))?;
                    process::exit(1);
                }
            }
        }

        ConfigAction::Sample => {
            let sample_file = config_manager.create_sample_config()?;

            term.write_line(&format!(
                "{} Sample configuration created at: {:?}",
                style("✅").green(),
                sample_file
            ))?;
        }
    }
    Ok(())
}
