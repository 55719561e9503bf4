pub mod draft;
pub mod groups;
pub mod import;
pub mod init;
pub mod submit;
pub mod validate;

/// Shorten `s` to at most `max` characters for table cells.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    let flat = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
