//! `apkg list-installed` formatting

use apkg_core::Installed;
use crossterm::style::Stylize;

/// Render the ledger as aligned `name version` rows, sorted by name.
pub fn render_installed(installed: &Installed) -> Vec<String> {
    let width = installed
        .keys()
        .map(|name| name.len())
        .max()
        .unwrap_or(0)
        .max("name".len());

    let mut lines = Vec::with_capacity(installed.len() + 1);
    lines.push(
        format!("  {:<width$} {}", "name", "version")
            .dark_grey()
            .to_string(),
    );
    for (name, version) in installed {
        lines.push(format!("  {:<width$} {}", name.as_str(), version));
    }
    lines
}

pub fn print_installed(installed: &Installed) {
    if installed.is_empty() {
        println!("No packages installed.");
        return;
    }
    for line in render_installed(installed) {
        println!("{line}");
    }
    let count = installed.len();
    let noun = if count == 1 { "package" } else { "packages" };
    println!();
    println!("{}", format!("  {count} {noun}").dark_grey());
}
