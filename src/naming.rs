//! Remote name resolution for collision avoidance.

use once_cell::sync::Lazy;
use regex::Regex;

/// Matches a stem already carrying a numeric suffix, e.g. `lot42-7`
static NUMBERED_STEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<base>.+)-(?P<num>\d+)$").expect("static pattern is valid"));

/// Returns the next candidate name after `name`.
///
/// `a.dat` becomes `a-1.dat`, `a-1.dat` becomes `a-2.dat`, and so on. Any
/// leading directory part is kept as is; the stem and extension are split
/// on the final dot of the last path component.
///
/// # Example
/// ```
/// use tdsrelay::naming::next_name;
/// assert_eq!(next_name("a-9.dat"), "a-10.dat");
/// ```
pub fn next_name(name: &str) -> String {
    let (dir, file) = match name.rfind(['/', '\\']) {
        Some(idx) => name.split_at(idx + 1),
        None => ("", name),
    };

    // A leading dot marks a hidden file, not an extension.
    let (stem, ext) = match file.rfind('.') {
        Some(idx) if idx > 0 => file.split_at(idx),
        _ => (file, ""),
    };

    let next_stem = NUMBERED_STEM
        .captures(stem)
        .and_then(|caps| {
            let num: u128 = caps["num"].parse().ok()?;
            Some(format!("{}-{}", &caps["base"], num.checked_add(1)?))
        })
        .unwrap_or_else(|| format!("{}-1", stem));

    format!("{}{}{}", dir, next_stem, ext)
}
