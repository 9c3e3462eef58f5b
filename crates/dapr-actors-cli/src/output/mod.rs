mod formatters;

pub use formatters::*;

use console::{Style, Term};

use crate::config::OutputConfig;
use crate::error::{CliError, CliResult};

/// Main output handler for the CLI
#[derive(Debug)]
pub struct OutputManager {
    config: OutputConfig,
    theme: Theme,
}

impl OutputManager {
    pub fn new(config: OutputConfig) -> Self {
        let term = Term::stdout();
        let theme = Theme::new(config.colors && term.features().colors_supported());

        Self { config, theme }
    }

    /// Print a success message
    pub fn success(&self, message: &str) -> CliResult<()> {
        println!("{} {}", self.theme.success.apply_to("✓"), message);
        Ok(())
    }

    /// Print an error message
    pub fn error(&self, message: &str) -> CliResult<()> {
        eprintln!("{} {}", self.theme.error.apply_to("✗"), message);
        Ok(())
    }

    /// Print an info message
    pub fn info(&self, message: &str) -> CliResult<()> {
        println!("{} {}", self.theme.info.apply_to("ℹ"), message);
        Ok(())
    }

    /// Print a result, either as JSON or in its human readable form
    pub fn output<T>(&self, data: &T, json: bool) -> CliResult<()>
    where
        T: serde::Serialize + OutputFormat,
    {
        if json {
            let text = if self.config.pretty_json {
                serde_json::to_string_pretty(data)
            } else {
                serde_json::to_string(data)
            }
            .map_err(CliError::Serialization)?;
            println!("{}", text);
            Ok(())
        } else {
            data.format_pretty(self)
        }
    }

    /// Get the theme
    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Get the output configuration
    pub fn config(&self) -> &OutputConfig {
        &self.config
    }
}

/// Trait for human readable rendering of command results
pub trait OutputFormat {
    fn format_pretty(&self, output: &OutputManager) -> CliResult<()>;
}

/// Styles for CLI messages; every style is plain when colors are off
#[derive(Debug, Clone)]
pub struct Theme {
    success: Style,
    error: Style,
    info: Style,
    accent: Style,
    muted: Style,
}

impl Theme {
    pub fn new(colors: bool) -> Self {
        let styled = |style: Style| if colors { style } else { Style::new() };
        Self {
            success: styled(Style::new().green().bold()),
            error: styled(Style::new().red().bold()),
            info: styled(Style::new().blue().bold()),
            accent: styled(Style::new().cyan()),
            muted: styled(Style::new().dim()),
        }
    }

    /// Highlight for names the user typed: methods, keys, schedules
    pub fn accent(&self) -> &Style {
        &self.accent
    }

    pub fn muted(&self) -> &Style {
        &self.muted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_theme_adds_no_escapes() {
        let theme = Theme::new(false);
        assert_eq!(theme.accent().apply_to("SaveData").to_string(), "SaveData");
        assert_eq!(theme.success.apply_to("✓").to_string(), "✓");
    }
}
