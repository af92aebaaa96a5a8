//! Column-aligned rendering for `hangar list`.

use super::theme::{Theme, truncate};
use crossterm::style::Stylize;

pub fn print_list_header(title: &str) {
    let theme = Theme::default();
    println!();
    println!("  {}", title.with(theme.colors.header));
    println!();
}

/// One catalog row: name, version, summary. Installed mods get a marker.
pub fn print_mod_row(name: &str, version: &str, summary: &str, installed: bool) {
    let theme = Theme::default();

    let marker = if installed {
        theme.icons.success.with(theme.colors.success)
    } else {
        " ".with(theme.colors.secondary)
    };
    let name_part = format!(
        "{:<width$}",
        truncate(name, theme.layout.name_width),
        width = theme.layout.name_width
    );
    let version_part = format!(
        "{:<width$}",
        truncate(version, theme.layout.version_width),
        width = theme.layout.version_width
    );

    println!(
        "{marker} {} {} {}",
        name_part.with(theme.colors.mod_name),
        version_part.with(theme.colors.version),
        summary.with(theme.colors.secondary)
    );
}

/// One install record: id, file count, date or pending state.
pub fn print_install_row(id: &str, files: Option<usize>, date: &str) {
    let theme = Theme::default();

    let (icon, detail) = match files {
        Some(count) => (
            theme.icons.success.with(theme.colors.success),
            format!("{count} files, {date}"),
        ),
        None => (
            theme.icons.pending.with(theme.colors.warning),
            "interrupted".to_string(),
        ),
    };
    let id_part = format!("{:<width$}", id, width = theme.layout.name_width + theme.layout.version_width);
    println!(
        "{icon} {} {}",
        id_part.with(theme.colors.mod_name),
        detail.with(theme.colors.secondary)
    );
}

pub fn print_list_footer(count: usize, noun: &str) {
    println!();
    println!("  {}", format!("{count} {noun}").dark_grey());
}

/// `label  value` line used by `info`, `status` and `config`.
pub fn print_field(label: &str, value: &str) {
    let theme = Theme::default();
    println!(
        "  {} {}",
        format!("{label:<width$}", width = theme.layout.label_width).with(theme.colors.header),
        value
    );
}
