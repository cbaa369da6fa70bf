use std::path::Path;

use anyhow::Result;

use slackntell_config::{
    SlackntellConfig,
    validate::{self, Severity, ValidationResult},
};

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Load and validate the configuration, print every diagnostic, and report
/// whether it is usable.
pub fn check(explicit: Option<&Path>) -> Result<bool> {
    match explicit
        .map(Path::to_path_buf)
        .or_else(slackntell_config::find_config_file)
    {
        Some(path) => eprintln!("Checking {}\n", path.display()),
        None => eprintln!("No config file found; checking defaults and environment.\n"),
    }

    let config = slackntell_config::load(explicit)?;
    let result = validate::validate(&config);
    print_report(&result);
    Ok(!result.has_errors())
}

/// Load, validate and fail on errors. Warnings are logged.
pub fn load_checked(explicit: Option<&Path>) -> Result<SlackntellConfig> {
    let config = slackntell_config::load(explicit)?;
    let result = validate::validate(&config);
    for d in &result.diagnostics {
        match d.severity {
            Severity::Error => tracing::error!(path = d.path, "{}", d.message),
            Severity::Warning => tracing::warn!(path = d.path, "{}", d.message),
        }
    }
    if result.has_errors() {
        anyhow::bail!(
            "configuration has {} error(s); run `slackntell check` for details",
            result.count(Severity::Error)
        );
    }
    Ok(config)
}

fn print_report(result: &ValidationResult) {
    for d in &result.diagnostics {
        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
        };
        eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if !result.diagnostics.is_empty() {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }
}
