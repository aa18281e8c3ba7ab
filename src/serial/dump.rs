//! Hex + ASCII rendering of raw serial traffic

/// Render `data` as `"<key> <n> bytes: 41 42 |AB|"`
///
/// Non-printable bytes show as `.` in the ASCII column.
pub fn format_bytes(data: &[u8], key: &str) -> String {
    format!("{} {} bytes: {} |{}|", key, data.len(), hex(data), ascii(data))
}

/// Space separated lowercase hex
pub fn hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Printable ASCII, `.` for everything else
pub fn ascii(data: &[u8]) -> String {
    data.iter()
        .map(|&b| if (32..=126).contains(&b) { b as char } else { '.' })
        .collect()
}

/// Write a dump line to stderr
pub fn dump_bytes(data: &[u8], key: &str) {
    eprintln!("{}", format_bytes(data, key));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(
            format_bytes(b"Hi\x0b", "RX"),
            "RX 3 bytes: 48 69 0b |Hi.|"
        );
    }

    #[test]
    fn test_empty() {
        assert_eq!(format_bytes(b"", "AK"), "AK 0 bytes:  ||");
    }

    #[test]
    fn test_ascii_column() {
        assert_eq!(ascii(&[0x00, 0x20, 0x7e, 0x7f]), ". ~.");
    }
}
