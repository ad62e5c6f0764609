/// Interprets a menu choice against `count` candidates.
///
/// Returns the zero-based index of the chosen candidate. `0`, anything outside
/// `1..=count`, and non-numeric input all mean "cancel".
pub fn parse_selection(input: &str, count: usize) -> Option<usize> {
    let choice = input.trim().parse::<usize>().ok()?;
    if (1..=count).contains(&choice) {
        Some(choice - 1)
    } else {
        None
    }
}

/// Only an explicit `y`/`yes` confirms; empty input declines.
pub fn parse_confirmation(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
