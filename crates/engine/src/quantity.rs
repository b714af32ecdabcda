//! Kubernetes resource-quantity codec
//!
//! Parses heterogeneous quantity strings from the API server ("250m",
//! "512Mi", "1500000n") into canonical units (CPU cores as f64, memory
//! bytes as u64) and formats them back for display.
//!
//! Parsing is total: an empty or unparseable string degrades to zero,
//! mirroring "missing metric" rather than "corrupt metric". Nothing in
//! this module errors, allocates state, or suspends.

/// Parse a CPU quantity string into whole cores.
///
/// Recognized suffixes: `n` (nanocores), `u` (microcores), `m`
/// (millicores). An unsuffixed numeric string is already whole cores.
/// Output of [`format_cpu`] (a `cores` suffix) is accepted so that
/// formatted values round-trip.
pub fn parse_cpu(input: &str) -> f64 {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_suffix("cores")
        .map(str::trim_end)
        .unwrap_or(trimmed);
    if trimmed.is_empty() {
        return 0.0;
    }

    if let Some(value) = trimmed.strip_suffix('n') {
        return value.parse::<f64>().map(|n| n / 1e9).unwrap_or(0.0);
    }
    if let Some(value) = trimmed.strip_suffix('u') {
        return value.parse::<f64>().map(|n| n / 1e6).unwrap_or(0.0);
    }
    if let Some(value) = trimmed.strip_suffix('m') {
        return value.parse::<f64>().map(|n| n / 1e3).unwrap_or(0.0);
    }
    trimmed.parse::<f64>().unwrap_or(0.0)
}

/// Memory suffix table. Binary suffixes must be matched before their
/// single-letter decimal counterparts ("Ki" before "K").
const MEMORY_SUFFIXES: &[(&str, f64)] = &[
    ("Ki", 1024.0),
    ("Mi", 1024.0 * 1024.0),
    ("Gi", 1024.0 * 1024.0 * 1024.0),
    ("Ti", 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("K", 1e3),
    ("M", 1e6),
    ("G", 1e9),
    ("T", 1e12),
];

/// Parse a memory quantity string into bytes.
///
/// Recognized suffixes: binary `Ki/Mi/Gi/Ti` (powers of 1024) and
/// decimal `K/M/G/T` (powers of 1000). Unsuffixed input is raw bytes.
/// Fractional values ("1.5Gi") are allowed.
pub fn parse_memory(input: &str) -> u64 {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return 0;
    }

    for (suffix, factor) in MEMORY_SUFFIXES {
        if let Some(value) = trimmed.strip_suffix(suffix) {
            return value
                .trim_end()
                .parse::<f64>()
                .map(|n| (n * factor) as u64)
                .unwrap_or(0);
        }
    }
    trimmed
        .parse::<u64>()
        .or_else(|_| trimmed.parse::<f64>().map(|n| n as u64))
        .unwrap_or(0)
}

/// Format CPU cores for display.
///
/// Below one core the value renders in millicores with no decimal
/// ("150m"); from one core up it renders with one decimal place and a
/// `cores` suffix ("4.5 cores").
pub fn format_cpu(cores: f64) -> String {
    if cores < 1.0 {
        format!("{:.0}m", cores * 1000.0)
    } else {
        format!("{:.1} cores", cores)
    }
}

const MEMORY_UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

/// Format bytes for display using the largest binary unit with a
/// formatted value of at least 1 ("1073741824" bytes -> "1.0 GB").
pub fn format_memory(bytes: u64) -> String {
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < MEMORY_UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, MEMORY_UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, MEMORY_UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cpu_suffixes() {
        assert_eq!(parse_cpu("150m"), 0.15);
        assert_eq!(parse_cpu("500000000n"), 0.5);
        assert_eq!(parse_cpu("500000u"), 0.5);
        assert_eq!(parse_cpu("2"), 2.0);
        assert_eq!(parse_cpu("1.5"), 1.5);
    }

    #[test]
    fn test_parse_cpu_degrades_to_zero() {
        assert_eq!(parse_cpu(""), 0.0);
        assert_eq!(parse_cpu("garbage"), 0.0);
        assert_eq!(parse_cpu("12xyz"), 0.0);
    }

    #[test]
    fn test_parse_memory_binary_suffixes() {
        assert_eq!(parse_memory("1Ki"), 1024);
        assert_eq!(parse_memory("1Mi"), 1024 * 1024);
        assert_eq!(parse_memory("1Gi"), 1_073_741_824);
        assert_eq!(parse_memory("1Ti"), 1_099_511_627_776);
        assert_eq!(parse_memory("1.5Gi"), 1_610_612_736);
    }

    #[test]
    fn test_parse_memory_decimal_suffixes() {
        assert_eq!(parse_memory("1K"), 1000);
        assert_eq!(parse_memory("1M"), 1_000_000);
        assert_eq!(parse_memory("2G"), 2_000_000_000);
        assert_eq!(parse_memory("1T"), 1_000_000_000_000);
    }

    #[test]
    fn test_parse_memory_raw_bytes_and_garbage() {
        assert_eq!(parse_memory("4096"), 4096);
        assert_eq!(parse_memory(""), 0);
        assert_eq!(parse_memory("garbage"), 0);
    }

    #[test]
    fn test_format_cpu() {
        assert_eq!(format_cpu(0.15), "150m");
        assert_eq!(format_cpu(0.0), "0m");
        assert_eq!(format_cpu(1.0), "1.0 cores");
        assert_eq!(format_cpu(4.5), "4.5 cores");
    }

    #[test]
    fn test_format_memory() {
        assert_eq!(format_memory(1_073_741_824), "1.0 GB");
        assert_eq!(format_memory(512), "512 B");
        assert_eq!(format_memory(1536), "1.5 KB");
        assert_eq!(format_memory(8 * 1024 * 1024 * 1024), "8.0 GB");
    }

    #[test]
    fn test_cpu_round_trip() {
        for cores in [0.0, 0.001, 0.15, 1.0, 4.5] {
            let parsed = parse_cpu(&format_cpu(cores));
            assert!(
                (parsed - cores).abs() < 1e-9,
                "round trip of {} gave {}",
                cores,
                parsed
            );
        }
    }
}
