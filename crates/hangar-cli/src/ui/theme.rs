//! UI Theme - colors, icons and column widths shared by every command.

use crossterm::style::Color;

#[derive(Debug, Clone, Default)]
pub struct Theme {
    pub colors: ColorScheme,
    pub icons: Icons,
    pub layout: Layout,
}

/// Color scheme for UI elements
#[derive(Debug, Clone)]
pub struct ColorScheme {
    /// Mod names (primary content)
    pub mod_name: Color,
    pub version: Color,
    /// Summaries, sizes and dates
    pub secondary: Color,
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    /// In-flight operations
    pub active: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            mod_name: Color::Cyan,
            version: Color::White,
            secondary: Color::DarkGrey,
            header: Color::DarkGrey,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            active: Color::Blue,
        }
    }
}

/// Status icons for different states
#[derive(Debug, Clone)]
pub struct Icons {
    pub pending: &'static str,
    pub active: &'static str,
    pub success: &'static str,
    pub error: &'static str,
    pub warning: &'static str,
    pub info: &'static str,
}

impl Default for Icons {
    fn default() -> Self {
        Self {
            pending: "○",
            active: "●",
            success: "✓",
            error: "✗",
            warning: "⚠",
            info: "ℹ",
        }
    }
}

/// Column widths for tabular output
#[derive(Debug, Clone)]
pub struct Layout {
    pub name_width: usize,
    pub version_width: usize,
    pub label_width: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            name_width: 28,
            version_width: 14,
            label_width: 14,
        }
    }
}

/// Format bytes for human-readable display
pub fn format_size(bytes: u64) -> String {
    let kb = bytes as f64 / 1024.0;
    let mb = kb / 1024.0;
    if mb >= 1024.0 {
        format!("{:.1} GB", mb / 1024.0)
    } else if kb >= 1024.0 {
        format!("{mb:.1} MB")
    } else if kb >= 1.0 {
        format!("{kb:.1} KB")
    } else {
        format!("{bytes} B")
    }
}

/// Cut `text` to at most `width` characters, marking the cut with `…`.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}
