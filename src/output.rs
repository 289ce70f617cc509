use colored::Colorize;
use serde::Serialize;

use crate::config::ModCatalog;
use crate::sync::{SyncEvent, SyncReport};

#[derive(Serialize)]
struct JsonOut<T> {
    ok: bool,
    data: T,
}

fn print_json<T: Serialize>(ok: bool, data: T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&JsonOut { ok, data })?);
    Ok(())
}

/// Result of `workshop-sync check`.
#[derive(Debug, Serialize)]
pub struct CheckStatus {
    pub target: String,
    pub username: String,
    pub mods_root_present: bool,
    pub tool_present: bool,
    pub catalog_size: usize,
}

pub fn print_event(event: &SyncEvent<'_>) {
    let line = event.to_string();
    match event {
        SyncEvent::Missing { .. } => println!("{}", line.yellow()),
        SyncEvent::FetchStarted { .. } => println!("{}", line.bold()),
        SyncEvent::FetchOutput(_) => println!("{}", line.dimmed()),
        SyncEvent::Downloaded { .. } | SyncEvent::Moved { .. } => println!("{}", line.green()),
        SyncEvent::DownloadFailed { .. } | SyncEvent::MoveFailed { .. } => {
            println!("{}", line.red())
        }
    }
}

pub fn print_report(json: bool, report: &SyncReport) -> anyhow::Result<()> {
    if json {
        return print_json(report.failed_count() == 0, report);
    }

    if let Some(command) = &report.planned_command {
        println!("Would run: {command}");
    }
    let failed = report.failed_count();
    let summary = format!(
        "{} installed, {} moved, {} failed",
        report.installed_count(),
        report.moved_count(),
        failed
    );
    if failed > 0 {
        println!("{}", summary.red());
    } else {
        println!("{summary}");
    }
    println!("{}", report.load_order);
    println!("Finished.");
    Ok(())
}

pub fn print_load_order(json: bool, catalog: &ModCatalog) -> anyhow::Result<()> {
    if json {
        #[derive(Serialize)]
        struct LoadOrder<'a> {
            load_order: String,
            mods: &'a ModCatalog,
        }
        return print_json(
            true,
            LoadOrder {
                load_order: catalog.load_order(),
                mods: catalog,
            },
        );
    }
    println!("{}", catalog.load_order());
    Ok(())
}

pub fn print_check(json: bool, status: &CheckStatus) -> anyhow::Result<()> {
    if json {
        return print_json(true, status);
    }
    let mark = |ok: bool| if ok { "✓".green() } else { "✗".red() };
    println!("Target: {}", status.target.bold());
    println!("Login: {}", status.username);
    println!("{} mods root present", mark(status.mods_root_present));
    println!("{} fetch tool present", mark(status.tool_present));
    println!("{} mods in catalog", status.catalog_size);
    Ok(())
}
