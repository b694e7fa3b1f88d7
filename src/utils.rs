/// Mean rounded half away from zero; 0 when there is nothing to divide by
pub fn rounded_mean(total: u64, count: u64) -> u64 {
    if count == 0 {
        return 0;
    }
    (total as f64 / count as f64).round() as u64
}

/// Convert a string to a sanitized filename
pub fn sanitize_filename(name: &str) -> String {
    // Remove protocol and replace invalid filename characters
    let mut name = name.replace("http://", "").replace("https://", "");
    name = name.replace(['/', '\\', ':', '?', '&', '=', '#', '%', '*', '"', '<', '>', '|'], "_");

    // Limit filename length
    if name.len() > 100 {
        name.chars().take(100).collect()
    } else {
        name
    }
}
