//! Placeholder extraction and substitution for `{name}` tokens

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

/// Placeholder name to value. Built fresh for every event.
pub type PlaceholderMap = HashMap<String, String>;

lazy_static! {
    /// A `{` up to the next `}` on the same line; everything between is the name
    static ref PLACEHOLDER: Regex = Regex::new(r"\{([^\r\n]*?)\}").unwrap();
}

/// Placeholder names in order of appearance, duplicates included
pub fn extract_placeholders(text: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Replace every `{name}` whose name is in `placeholders` with its value.
///
/// Unknown placeholders are left as the literal `{name}` token. Substituted
/// values are not scanned again.
pub fn substitute(text: &str, placeholders: &PlaceholderMap) -> String {
    let mut rendered = String::with_capacity(text.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(text) {
        let (Some(token), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if let Some(value) = placeholders.get(name.as_str()) {
            rendered.push_str(&text[last..token.start()]);
            rendered.push_str(value);
            last = token.end();
        }
    }

    rendered.push_str(&text[last..]);
    rendered
}
