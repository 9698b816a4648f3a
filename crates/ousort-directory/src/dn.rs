//! Distinguished-name helpers.
//!
//! Comparison is component-wise and case-insensitive; whitespace around
//! separators is ignored. Escaped commas (`\,`) stay inside their component.

/// Split a distinguished name into trimmed components.
#[must_use]
pub fn components(dn: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for ch in dn.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' => {
                current.push(ch);
                escaped = true;
            }
            ',' => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    let last = current.trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last.to_string());
    }
    parts.retain(|part| !part.is_empty());
    parts
}

/// Canonical comparison form: components lowercased and rejoined.
#[must_use]
pub fn normalize(dn: &str) -> String {
    components(dn)
        .iter()
        .map(|part| normalize_component(part))
        .collect::<Vec<_>>()
        .join(",")
}

fn normalize_component(part: &str) -> String {
    match part.split_once('=') {
        Some((attr, value)) => format!(
            "{}={}",
            attr.trim().to_ascii_lowercase(),
            value.trim().to_lowercase()
        ),
        None => part.trim().to_lowercase(),
    }
}

/// Whether `path` lies strictly beneath `container`.
///
/// Nested containers count: an object in `OU=Sub,OU=A,...` is under `OU=A,...`.
#[must_use]
pub fn is_under(path: &str, container: &str) -> bool {
    let path_parts: Vec<String> = components(path)
        .iter()
        .map(|part| normalize_component(part))
        .collect();
    let container_parts: Vec<String> = components(container)
        .iter()
        .map(|part| normalize_component(part))
        .collect();
    if container_parts.is_empty() || path_parts.len() <= container_parts.len() {
        return false;
    }
    path_parts.ends_with(&container_parts)
}

/// First component (`CN=PC1` for `CN=PC1,OU=A,DC=x`).
#[must_use]
pub fn rdn(dn: &str) -> Option<String> {
    components(dn).into_iter().next()
}
