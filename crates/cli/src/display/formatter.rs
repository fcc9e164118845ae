use lando_dock_core::registry::ScanReport;
use lando_dock_core::{AppDescriptor, AppStatus, ContextFlags, ToolingCommand};

pub fn status_icon(status: AppStatus) -> &'static str {
    match status {
        AppStatus::Running => "🟢",
        AppStatus::Stopped => "⚪",
        AppStatus::Starting | AppStatus::Restarting => "🟡",
        AppStatus::Rebuilding => "🔨",
        AppStatus::Stopping | AppStatus::Destroying => "🔴",
    }
}

/// One line per app, the active one marked
pub fn format_app_line(app: &AppDescriptor, active: bool) -> String {
    let marker = if active { "▶" } else { " " };
    let recipe = app
        .recipe
        .as_deref()
        .map(|r| format!(" [{r}]"))
        .unwrap_or_default();
    format!(
        "{marker} {} {}{} ({}) - {}",
        status_icon(app.status),
        app.name,
        recipe,
        app.status,
        app.definition_path.display()
    )
}

pub fn print_apps(apps: &[&AppDescriptor], active: Option<&AppDescriptor>) {
    if apps.is_empty() {
        println!("ℹ️  No Lando apps found in this workspace");
        return;
    }
    println!("📦 Lando apps:");
    for app in apps {
        let is_active = active.is_some_and(|a| a.definition_path == app.definition_path);
        println!("{}", format_app_line(app, is_active));
    }
}

pub fn print_app_details(app: &AppDescriptor) {
    println!("📦 {} ({})", app.name, app.status);
    if let Some(recipe) = &app.recipe {
        println!("   • recipe: {recipe}");
    }
    if !app.services.is_empty() {
        println!("   🔧 Services:");
        for (name, service) in &app.services {
            match &service.version {
                Some(version) => println!("      • {name}: {}:{version}", service.service_type),
                None => println!("      • {name}: {}", service.service_type),
            }
        }
    }
    if !app.tooling.is_empty() {
        println!("   🧰 Tooling:");
        for tool in &app.tooling {
            let command = match &tool.command {
                ToolingCommand::Single(cmd) => cmd.clone(),
                ToolingCommand::Steps(steps) => steps.join(" && "),
            };
            let service = tool.service.as_deref().unwrap_or("appserver");
            println!("      • {} ({service}): {command}", tool.name);
        }
    }
}

pub fn print_context(flags: &ContextFlags) {
    for (key, value) in flags.entries() {
        println!("{key} = {value}");
    }
}

pub fn print_scan_report(report: &ScanReport) {
    if report.loaded == 0 && report.removed == 0 && report.failed.is_empty() {
        return;
    }
    println!(
        "🔄 Reconciled: {} loaded, {} removed",
        report.loaded, report.removed
    );
    for (dir, reason) in &report.failed {
        println!("   ⚠️  {}: {}", dir.display(), reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_line_marks_active_app() {
        let mut app = AppDescriptor::new("site", "/w/site/.lando.yml");
        app.recipe = Some("drupal11".to_string());
        app.status = AppStatus::Running;

        assert_eq!(
            format_app_line(&app, true),
            "▶ 🟢 site [drupal11] (running) - /w/site/.lando.yml"
        );
        assert!(format_app_line(&app, false).starts_with("  🟢"));
    }
}
