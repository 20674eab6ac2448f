use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Placeholder for any value that could not be read.
pub const NOT_AVAILABLE: &str = "N/A";

/// Whole mebibytes, rounded down.
pub fn bytes_to_mib(bytes: u64) -> u64 {
    bytes / 1024 / 1024
}

/// Format an optional byte count as `"<n>MiB"`.
pub fn format_mib(bytes: Option<u64>) -> String {
    match bytes {
        Some(bytes) => format!("{}MiB", bytes_to_mib(bytes)),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Degrees get a unit only when there is a reading.
pub fn format_temperature(celsius: Option<f64>) -> String {
    match celsius {
        Some(c) => format!("{:.1}°C", c),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_power(watts: Option<f64>) -> String {
    match watts {
        Some(w) => format!("{:.1}W", w),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Power caps are shown as whole watts.
pub fn format_power_cap(watts: Option<f64>) -> String {
    match watts {
        Some(w) => format!("{}W", w.trunc() as u64),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_percent<T: std::fmt::Display>(value: Option<T>) -> String {
    match value {
        Some(v) => format!("{}%", v),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_cpu_percent(value: Option<f32>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Cut `s` to at most `max_width` display columns.
pub fn truncate(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut out = String::new();
    let mut width = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if width + w > max_width {
            break;
        }
        width += w;
        out.push(c);
    }
    out
}

/// Left-align in `width` columns. Longer text is kept whole.
pub fn pad_right(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(s.width());
    format!("{}{}", s, " ".repeat(fill))
}

/// Right-align in `width` columns. Longer text is kept whole.
pub fn pad_left(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(s.width());
    format!("{}{}", " ".repeat(fill), s)
}

/// Center in `width` columns; odd padding puts the extra space on the right.
pub fn center(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(s.width());
    let left = fill / 2;
    format!("{}{}{}", " ".repeat(left), s, " ".repeat(fill - left))
}
