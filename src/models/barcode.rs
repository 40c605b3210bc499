/// Normalizes a raw barcode string to digits only.
///
/// Trims surrounding whitespace, removes a trailing `.0` left behind by
/// float-typed spreadsheet exports, then drops every non-digit character.
/// The result may be empty.
pub fn normalize_barcode(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    trimmed.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Normalizes an optional barcode field, treating empty results as absent.
pub fn parse_code(raw: Option<&str>) -> Option<String> {
    raw.map(normalize_barcode).filter(|code| !code.is_empty())
}
