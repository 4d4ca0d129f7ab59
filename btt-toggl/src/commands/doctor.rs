//! Doctor command - Check configuration, icons, cache and Toggl reachability

use anyhow::bail;
use colored::Colorize;
use std::path::Path;

use super::{missing_icons, GlobalOptions, Session};
use crate::cache::{CacheError, StatusCache};
use crate::config::{config_exists, read_config_with_env, validate_config};
use crate::reconciler::Reconciler;
use crate::transport::Transport;
use crate::types::{CurrentEntry, TogglConfig};

struct CheckResult {
    name: String,
    status: CheckStatus,
    message: String,
    required: bool,
    details: Option<String>,
}

enum CheckStatus {
    Pass,
    Fail,
    Warn,
}

impl CheckResult {
    fn pass(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Pass,
            message: message.into(),
            required: true,
            details: None,
        }
    }

    fn fail(name: &str, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Fail,
            message: message.into(),
            required: true,
            details,
        }
    }

    fn warn(name: &str, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Warn,
            message: message.into(),
            required: false,
            details,
        }
    }
}

fn format_result(result: &CheckResult) -> String {
    let icon = match result.status {
        CheckStatus::Pass => "✓".green().to_string(),
        CheckStatus::Fail => "✗".red().to_string(),
        CheckStatus::Warn => "!".yellow().to_string(),
    };

    let required_str = if result.required { "" } else { " (optional)" };
    let required_suffix = required_str.dimmed().to_string();

    let message = match result.status {
        CheckStatus::Fail => result.message.red().to_string(),
        _ => result.message.clone(),
    };

    let mut line = format!("  {} {}: {}{}", icon, result.name, message, required_suffix);

    if let Some(ref details) = result.details {
        if !matches!(result.status, CheckStatus::Pass) {
            line += &format!("\n      {}", details.dimmed());
        }
    }

    line
}

fn check_config_file(path: &Path) -> (CheckResult, Option<TogglConfig>) {
    if !config_exists(path) {
        let result = CheckResult::fail(
            "Config",
            format!("Not found at {}", path.display()),
            Some("Create it, or point --config / BTT_TOGGL_CONFIG at one".into()),
        );
        return (result, None);
    }
    match read_config_with_env(path) {
        Ok(config) => (
            CheckResult::pass("Config", format!("Found at {}", path.display())),
            Some(config),
        ),
        Err(e) => (
            CheckResult::fail("Config", "Parse error", Some(e.to_string())),
            None,
        ),
    }
}

fn check_settings(config: &TogglConfig) -> CheckResult {
    let errors = validate_config(config);
    if errors.is_empty() {
        CheckResult::pass(
            "Settings",
            format!("{} project(s) configured", config.projects.iter().count()),
        )
    } else {
        CheckResult::fail(
            "Settings",
            format!("{} problem(s)", errors.len()),
            Some(errors.join("\n      ")),
        )
    }
}

fn check_icons(config: &TogglConfig) -> CheckResult {
    let missing = missing_icons(config);
    if missing.is_empty() {
        CheckResult::pass("Icons", "Both icon files exist")
    } else {
        CheckResult::fail(
            "Icons",
            format!("{} missing", missing.len()),
            Some(missing.join("\n      ")),
        )
    }
}

fn check_cache(cache: &StatusCache) -> CheckResult {
    let path = cache.path().display().to_string();
    match cache.read_tag("") {
        Ok(_) => CheckResult::pass("Cache", format!("Readable at {path}")),
        Err(CacheError::Read { .. }) if !cache.path().exists() => CheckResult::warn(
            "Cache",
            format!("Not yet written at {path}"),
            Some("Run `btt-toggl status` once to create it".into()),
        ),
        Err(e) => CheckResult::fail(
            "Cache",
            "Unreadable",
            Some(format!("{e}; delete it and run `btt-toggl status`")),
        ),
    }
}

fn check_api<T: Transport>(reconciler: &Reconciler<T>) -> CheckResult {
    match reconciler.current(None) {
        Ok(CurrentEntry::Idle) => CheckResult::pass("Toggl API", "Reachable, nothing running"),
        Ok(CurrentEntry::Running(entry)) => CheckResult::pass(
            "Toggl API",
            format!("Reachable, entry {} running", entry.id),
        ),
        Err(e) => CheckResult::fail("Toggl API", "Request failed", Some(format!("{e:#}"))),
    }
}

pub fn run(opts: &GlobalOptions) -> anyhow::Result<()> {
    println!("{}", "\nbtt-toggl Doctor\n".bold());

    let mut results = Vec::new();
    let config_path = opts.config_path();
    let (config_result, config) = check_config_file(&config_path);
    println!("{}", format_result(&config_result));
    results.push(config_result);

    if let Some(config) = config {
        let session = Session::new(config, opts.no_validation);

        let settings_result = check_settings(&session.config);
        println!("{}", format_result(&settings_result));
        results.push(settings_result);

        let icons_result = check_icons(&session.config);
        println!("{}", format_result(&icons_result));
        results.push(icons_result);

        let cache_result = check_cache(&session.cache());
        println!("{}", format_result(&cache_result));
        results.push(cache_result);

        let api_result = match session.reconciler() {
            Ok(reconciler) => check_api(&reconciler),
            Err(e) => CheckResult::fail("Toggl API", "Client setup failed", Some(e.to_string())),
        };
        println!("{}", format_result(&api_result));
        results.push(api_result);
    }

    println!();
    let failed = results
        .iter()
        .filter(|r| matches!(r.status, CheckStatus::Fail) && r.required)
        .count();
    let warnings = results
        .iter()
        .filter(|r| matches!(r.status, CheckStatus::Warn))
        .count();

    if failed > 0 {
        bail!("{failed} required check(s) failed");
    } else if warnings > 0 {
        println!(
            "{}",
            format!("! All required checks passed, {warnings} warning(s)\n").yellow()
        );
    } else {
        println!("{}", "✓ All checks passed!\n".green());
    }

    Ok(())
}
