//! Text rendering utilities for human-friendly error messages.
//!
//! Provides helpers to shorten Rust type names and to suggest
//! configured names that are close to a misspelled one.

/// Shortens a fully qualified type name for display.
///
/// ```
/// use haqn_support::rendering::shorten_type_name;
///
/// let short = shorten_type_name("my_app::fixtures::SomeImpl");
/// assert_eq!(short, "SomeImpl");
///
/// let short = shorten_type_name("core::option::Option<alloc::boxed::Box<my_app::SomeImpl>>");
/// assert_eq!(short, "Option<Box<SomeImpl>>");
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    let mut chars = full_name.chars().peekable();
    let mut current_segment = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                current_segment.clear();
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | ';' | '&' => {
                result.push_str(&current_segment);
                result.push(ch);
                current_segment.clear();
            }
            _ => {
                current_segment.push(ch);
            }
        }
    }

    result.push_str(&current_segment);
    result
}

/// Returns the last segment of a dotted or `::`-separated name.
///
/// Configuration keys are usually written Java style
/// (`org.example.SomeInterface`) while Rust paths use `::`.
///
/// ```
/// use haqn_support::rendering::last_segment;
///
/// assert_eq!(last_segment("org.example.SomeInterface"), "SomeInterface");
/// assert_eq!(last_segment("demo::fixtures::SomeImpl"), "SomeImpl");
/// assert_eq!(last_segment("Plain"), "Plain");
/// ```
pub fn last_segment(name: &str) -> &str {
    let after_colons = name.rsplit("::").next().unwrap_or(name);
    after_colons.rsplit('.').next().unwrap_or(after_colons)
}

/// Generates a "did you mean?" suggestion based on the available names.
///
/// Compares the requested name against available names and returns
/// close matches, best first.
pub fn suggest_similar(
    requested: &str,
    available: &[&str],
    max_suggestions: usize,
) -> Vec<String> {
    let requested_lower = requested.to_lowercase();
    let requested_short = last_segment(requested).to_lowercase();

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .filter_map(|&name| {
            if name == requested {
                return None;
            }

            let name_lower = name.to_lowercase();
            let name_short = last_segment(name).to_lowercase();

            // Case-insensitive identity beats everything else
            if name_lower == requested_lower {
                return Some((name, 200));
            }

            if name_lower.contains(&requested_lower)
                || requested_lower.contains(&name_lower)
            {
                return Some((name, 100));
            }

            if name_short == requested_short {
                return Some((name, 90));
            }

            if name_short.contains(&requested_short)
                || requested_short.contains(&name_short)
            {
                return Some((name, 80));
            }

            let common = name_short
                .chars()
                .zip(requested_short.chars())
                .take_while(|(a, b)| a == b)
                .count();

            if common >= 3 {
                return Some((name, common * 10));
            }

            None
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}
