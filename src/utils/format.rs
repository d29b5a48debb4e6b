//! Display helpers for sizes and savings.

const UNITS: [&str; 4] = ["B", "kB", "MB", "GB"];

/// Formats a byte count for the file list. Unknown sizes render as `?`,
/// a known zero as `0 B`.
pub fn to_human_readable_size(size: Option<u64>) -> String {
    let Some(size) = size else {
        return "?".to_string();
    };
    if size < 1024 {
        return format!("{} B", size);
    }
    let exponent = ((size as f64).ln() / 1024f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    format!("{:.1} {}", size as f64 / 1024f64.powi(exponent as i32), UNITS[exponent])
}

/// Savings percentage `(original - size) / original * 100`.
///
/// `None` when the original size is unknown or zero.
pub fn savings_percentage(original_size: Option<u64>, size: u64) -> Option<f64> {
    match original_size {
        Some(original) if original > 0 => {
            Some((original as f64 - size as f64) / original as f64 * 100.0)
        }
        _ => None,
    }
}

/// Formats savings as a whole percentage, `?` when unknown.
pub fn to_savings_label(savings: Option<f64>) -> String {
    savings.map_or_else(|| "?".to_string(), |s| format!("{:.0}%", s))
}
