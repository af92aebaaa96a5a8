//! Terminal reporter.
//!
//! Progress callbacks arrive often (every 100 KiB of a download, every few
//! hundred catalog entries); lines are printed only when a mod's progress
//! crosses the next tenth.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crossterm::style::Stylize;
use hangar_core::Reporter;
use hangar_schema::ModId;

use super::theme::{Theme, format_size};

#[derive(Debug, Default)]
pub struct Output {
    theme: Theme,
    /// Last printed tenth per progress stream; `None` keys the catalog refresh.
    printed: Mutex<HashMap<Option<ModId>, u8>>,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `fraction` reached a tenth not printed yet for `key`.
    fn crosses_step(&self, key: Option<&ModId>, fraction: f64) -> bool {
        let step = (fraction.clamp(0.0, 1.0) * 10.0).floor() as u8;
        let mut printed = self.printed.lock().unwrap_or_else(PoisonError::into_inner);
        let last = printed.entry(key.cloned()).or_insert(u8::MAX);
        if *last != u8::MAX && step <= *last {
            return false;
        }
        *last = step;
        true
    }

    fn forget(&self, key: Option<&ModId>) {
        self.printed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key.cloned());
    }

    fn mod_line(&self, icon: &str, id: &ModId, detail: &str) {
        println!(
            "  {} {} {}",
            icon,
            id.as_str().with(self.theme.colors.mod_name),
            detail.with(self.theme.colors.secondary)
        );
    }
}

impl Reporter for Output {
    fn section(&self, title: &str) {
        println!();
        println!("{}", title.bold());
    }

    fn refreshing(&self, fraction: f64) {
        if !self.crosses_step(None, fraction) {
            return;
        }
        let percent = (fraction * 100.0).round();
        println!(
            "  {} {}",
            self.theme.icons.active.with(self.theme.colors.active),
            format!("Refreshing repository {percent:.0}%").with(self.theme.colors.secondary)
        );
        if fraction >= 1.0 {
            self.forget(None);
        }
    }

    fn downloading(&self, id: &ModId, current: u64, total: Option<u64>) {
        let detail = match total {
            Some(total) if total > 0 => {
                if !self.crosses_step(Some(id), current as f64 / total as f64) {
                    return;
                }
                format!("downloading {} / {}", format_size(current), format_size(total))
            }
            _ => {
                if current != 0 {
                    return;
                }
                "downloading".to_string()
            }
        };
        let icon = self.theme.icons.active.with(self.theme.colors.active).to_string();
        self.mod_line(&icon, id, &detail);
    }

    fn extracting(&self, id: &ModId) {
        self.forget(Some(id));
        let icon = self.theme.icons.active.with(self.theme.colors.active).to_string();
        self.mod_line(&icon, id, "extracting");
    }

    fn installing(&self, id: &ModId, current: usize, total: usize) {
        if current != total {
            return;
        }
        let icon = self.theme.icons.active.with(self.theme.colors.active).to_string();
        self.mod_line(&icon, id, &format!("copied {total} files"));
    }

    fn removing(&self, id: &ModId) {
        let icon = self.theme.icons.active.with(self.theme.colors.active).to_string();
        self.mod_line(&icon, id, "removing");
    }

    fn done(&self, id: &ModId, detail: &str) {
        let icon = self.theme.icons.success.with(self.theme.colors.success).to_string();
        self.mod_line(&icon, id, detail);
    }

    fn failed(&self, id: &ModId, reason: &str) {
        self.forget(Some(id));
        let icon = self.theme.icons.error.with(self.theme.colors.error).to_string();
        println!(
            "  {} {} {}",
            icon,
            id.as_str().with(self.theme.colors.mod_name),
            reason.with(self.theme.colors.error)
        );
    }

    fn info(&self, msg: &str) {
        println!("  {} {}", self.theme.icons.info.with(self.theme.colors.header), msg);
    }

    fn success(&self, msg: &str) {
        println!(
            "  {} {}",
            self.theme.icons.success.with(self.theme.colors.success),
            msg
        );
    }

    fn warning(&self, msg: &str) {
        eprintln!(
            "  {} {}",
            self.theme.icons.warning.with(self.theme.colors.warning),
            msg.with(self.theme.colors.warning)
        );
    }

    fn error(&self, msg: &str) {
        eprintln!(
            "  {} {}",
            self.theme.icons.error.with(self.theme.colors.error),
            msg.with(self.theme.colors.error)
        );
    }

    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        let msg = format!(
            "{} mod{} {} in {:.1}s",
            count,
            if count == 1 { "" } else { "s" },
            action,
            elapsed_secs
        );
        println!();
        println!("{}", msg.with(self.theme.colors.success));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_prints_once_per_tenth() {
        let output = Output::new();
        let id = ModId::from_raw("A---1.0");

        assert!(output.crosses_step(Some(&id), 0.0));
        assert!(!output.crosses_step(Some(&id), 0.05));
        assert!(output.crosses_step(Some(&id), 0.12));
        assert!(!output.crosses_step(Some(&id), 0.19));
        assert!(output.crosses_step(Some(&id), 1.0));

        // Streams are tracked separately.
        assert!(output.crosses_step(None, 0.5));
    }

    #[test]
    fn test_forget_restarts_stream() {
        let output = Output::new();
        assert!(output.crosses_step(None, 1.0));
        output.forget(None);
        assert!(output.crosses_step(None, 0.0));
    }
}
