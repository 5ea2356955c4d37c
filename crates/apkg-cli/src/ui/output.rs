//! Terminal reporter
//!
//! Progress and results go to stdout; warnings, errors and failures go to
//! stderr and are printed even when `--quiet` is set.

use apkg_schema::{PackageName, Version};
use crossterm::style::Stylize;

use super::Reporter;

const NAME_WIDTH: usize = 24;

/// Line-oriented, styled [`Reporter`] for the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    quiet: bool,
}

impl Output {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    fn package_line(self, marker: &str, name: &PackageName, version: &Version, detail: &str) {
        if self.quiet {
            return;
        }
        println!(
            "  {marker} {:<NAME_WIDTH$} {} {}",
            name.as_str(),
            version.as_str().dark_grey(),
            detail.dark_grey()
        );
    }
}

impl Reporter for Output {
    fn section(&self, title: &str) {
        if self.quiet {
            return;
        }
        println!();
        println!("{}", title.bold());
    }

    fn downloading(&self, name: &PackageName, version: &Version, current: u64, total: Option<u64>) {
        // One line per package; per-chunk updates are too noisy for a log.
        if current != 0 {
            return;
        }
        let size = total.map(format_size).unwrap_or_default();
        self.package_line(&"↓".cyan().to_string(), name, version, &size);
    }

    fn extracting(&self, name: &PackageName, version: &Version) {
        tracing::debug!(package = %name, version = %version, "extracting");
    }

    fn installing(&self, name: &PackageName, version: &Version) {
        tracing::debug!(package = %name, version = %version, "placing");
    }

    fn removing(&self, name: &PackageName, version: &Version) {
        self.package_line(&"-".red().to_string(), name, version, "");
    }

    fn done(&self, name: &PackageName, version: &Version, detail: &str) {
        self.package_line(&"✓".green().to_string(), name, version, detail);
    }

    fn failed(&self, name: &PackageName, version: &Version, reason: &str) {
        eprintln!(
            "  {} {:<NAME_WIDTH$} {} {}",
            "✗".red(),
            name.as_str(),
            version.as_str().dark_grey(),
            reason.red()
        );
    }

    fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {msg}");
        }
    }

    fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.green());
        }
    }

    fn warning(&self, msg: &str) {
        eprintln!("  {} {msg}", "warning:".yellow().bold());
    }

    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        if self.quiet {
            return;
        }
        println!();
        let noun = if count == 1 { "package" } else { "packages" };
        println!(
            "{}",
            format!("{count} {noun} {action} in {elapsed_secs:.1}s").bold()
        );
    }

    fn summary_plain(&self, count: usize, status: &str) {
        if self.quiet {
            return;
        }
        println!();
        let noun = if count == 1 { "package" } else { "packages" };
        println!("{}", format!("{count} {noun} {status}").bold());
    }
}

/// Human-readable byte count.
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
