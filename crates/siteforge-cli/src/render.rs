//! Notice log output. Errors print before messages and warnings.

use anyhow::Result;
use console::style;

use siteforge_core::install::InstallReport;

pub fn print_report(report: &InstallReport) {
    let log = &report.log;

    for err in &log.errors {
        println!(
            "{} [{}] {}",
            style("error").red().bold(),
            err.kind().as_str(),
            err
        );
    }
    for message in &log.messages {
        println!("{} {}", style("  ok ").green(), message);
    }
    for warning in &log.warnings {
        println!("{} {}", style("warn ").yellow(), warning);
    }

    match &report.result {
        Ok(site) if !log.has_errors() => {
            println!();
            println!(
                "{} {} installed at {}",
                style("Done:").green().bold(),
                site.host,
                site.path.display()
            );
        }
        Ok(_) => {
            println!();
            println!(
                "{} the site was installed with errors and may not be usable",
                style("Warning:").yellow().bold()
            );
        }
        Err(_) => {
            println!();
            println!(
                "{} no rollback was performed; remove any created database or files manually",
                style("Failed:").red().bold()
            );
        }
    }
}

pub fn print_report_json(report: &InstallReport) -> Result<()> {
    let output = serde_json::json!({
        "schema_version": 1,
        "success": report.is_success(),
        "site": report.result.as_ref().ok(),
        "errors": report.log.errors,
        "messages": report.log.messages,
        "warnings": report.log.warnings,
        "outcomes": report.log.outcomes,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
