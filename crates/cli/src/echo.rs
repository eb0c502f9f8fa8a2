use owo_colors::OwoColorize;
use tabex_core::{Extraction, HtmlStats, ModelProfile, TokenUsage, UsageReport};

use crate::VERSION;

/// Utilization above which the TPM limit is close enough to warn about.
const TPM_WARN_PERCENT: f64 = 80.0;
const TPM_INFO_PERCENT: f64 = 50.0;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "Tabex".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Extract tables from web pages\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

/// Print a dimmed label with a bright value
pub fn print_field(label: &str, value: &str) {
    eprintln!("  {} {}", format!("{}:", label).dimmed(), value.bright_white());
}

/// Print page statistics to stdout
pub fn print_stats(stats: &HtmlStats) {
    println!("{:<14} {}", "Elements:", stats.element_count);
    println!("{:<14} {}", "Text length:", stats.text_length);
    println!("{:<14} {}", "Links:", stats.link_count);
    println!("{:<14} {}", "Images:", stats.image_count);
    println!("{:<14} {}", "Tables:", stats.table_count);
    println!("{:<14} {}", "Cleaned size:", format_size(stats.cleaned_length));
}

/// Print a summary of a successful extraction
pub fn print_extraction_details(extraction: &Extraction) {
    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Extraction Details".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());
    print_field("Rows", &extraction.table.len().to_string());
    print_field("Columns", &extraction.columns().join(", "));
    print_field("Content", &extraction.reduction.to_string());
    if let Some(description) = &extraction.description {
        print_field("Description", description);
    }
    eprintln!();
    print_usage(&extraction.usage);
}

/// Print token usage with TPM utilization
pub fn print_usage(usage: &UsageReport) {
    match usage {
        UsageReport::Reported(tokens) if tokens.total_tokens > 0 => print_token_usage(tokens),
        UsageReport::Error { message } => print_warning(&format!("Token usage unavailable: {}", message)),
        _ => {
            if let Some(limit) = usage.tpm_limit().filter(|limit| *limit > 0) {
                print_field("TPM limit", &format_count(limit as u64));
            }
        }
    }
}

fn print_token_usage(tokens: &TokenUsage) {
    print_field("Total tokens", &format_count(tokens.total_tokens));
    print_field("Input tokens", &format_count(tokens.prompt_tokens));
    print_field("Output tokens", &format_count(tokens.completion_tokens));

    if tokens.tpm_limit == 0 {
        return;
    }

    let utilization = tokens.utilization();
    print_field("TPM usage", &format!("{:.1}% of {}", utilization, format_count(tokens.tpm_limit as u64)));

    if utilization > TPM_WARN_PERCENT {
        print_warning(&format!(
            "High token usage: {:.1}% of TPM limit. Consider using a model with a higher TPM limit.",
            utilization
        ));
    } else if utilization > TPM_INFO_PERCENT {
        print_info(&format!("Moderate token usage: {:.1}% of TPM limit.", utilization));
    }
}

/// Print the model registry as an aligned table
pub fn print_models<'a>(models: impl Iterator<Item = (&'a str, ModelProfile)>, default_model: &str) {
    println!("{:<28} {:>12} {:>8}", "MODEL", "MAX TOKENS", "TPM");
    for (name, profile) in models {
        let marker = if name == default_model { " (default)" } else { "" };
        println!(
            "{:<28} {:>12} {:>8}{}",
            name, profile.max_input_tokens, profile.tokens_per_minute, marker
        );
    }
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a count with thousands separators
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
    }
}
