//! Version command - show the banking engine and its version

use anyhow::Result;
use colored::Colorize;

use super::with_session;
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let report = with_session("version", false, |session| {
        Ok(serde_json::json!({
            "engine": session.backend_name(),
            "version": session.version().map(|v| v.to_string()),
            "profile": session.profile(),
            "workingDir": session.working_dir().map(|p| p.to_string_lossy().into_owned()),
            "cliVersion": env!("CARGO_PKG_VERSION"),
        }))
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let value = |key: &str| report[key].as_str().unwrap_or("-").to_string();

    let mut table = output::create_table();
    table.add_row(vec!["Engine".to_string(), value("engine")]);
    table.add_row(vec!["Engine version".to_string(), value("version")]);
    table.add_row(vec!["Profile".to_string(), value("profile")]);
    table.add_row(vec!["Working directory".to_string(), value("workingDir")]);

    println!("{} {}", "bankline".bold(), env!("CARGO_PKG_VERSION"));
    println!("{}", table);
    Ok(())
}
