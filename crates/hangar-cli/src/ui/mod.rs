//! Terminal output.

pub mod list;
pub mod output;
pub mod theme;

pub use output::Output;
pub use theme::{Theme, format_size};

use std::io::{self, BufRead, Write};

/// Ask a yes/no question on stdin. An empty answer takes `default`.
pub fn confirm(prompt: &str, default: bool) -> io::Result<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    print!("{prompt} {hint} ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(parse_answer(&input, default))
}

fn parse_answer(input: &str, default: bool) -> bool {
    match input.trim().to_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    }
}
