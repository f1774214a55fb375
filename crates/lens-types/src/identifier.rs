//! Index-model identifier derivation.
//!
//! An identifier is derived from a fully-qualified type name. The simple
//! name is snake-cased and, when the type sits at least two namespace
//! segments deep, the immediate enclosing segment is appended unless the
//! snake-cased name already contains it:
//!
//! - `Modules\HelpCenter\Topic` -> `topic_help_center`
//! - `Modules\Faq\Topic` -> `topic_faq`
//! - `App\User` -> `user`
//!
//! Two types sharing both the simple name and the enclosing segment
//! (`Billing\Shared\Topic`, `Support\Shared\Topic`) still resolve to the
//! same identifier. Callers registering such pairs must rename one of them.

use crate::error::LensError;

/// Namespace separators accepted in qualified names.
pub const NAMESPACE_SEPARATORS: [&str; 2] = ["\\", "::"];

/// Split a qualified type name into its non-empty segments.
///
/// Both `\` and `::` separate segments; leading separators are ignored.
pub fn namespace_segments(qualified: &str) -> Vec<String> {
    qualified
        .replace("::", "\\")
        .split('\\')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Whether a name carries at least one namespace separator.
pub fn is_qualified(name: &str) -> bool {
    NAMESPACE_SEPARATORS.iter().any(|sep| name.contains(sep))
}

/// The last segment of a qualified name.
pub fn simple_name(qualified: &str) -> String {
    namespace_segments(qualified).pop().unwrap_or_default()
}

/// Lower-snake-case a type name.
///
/// A separator goes before every ASCII uppercase letter except the first
/// character, so acronyms split per letter (`HTMLPage` -> `h_t_m_l_page`).
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Resolve a qualified type name to its index-model identifier.
///
/// Pure and deterministic. An empty or separator-only name resolves to an
/// empty string, which [`validate_identifier`] rejects.
pub fn resolve(qualified: &str) -> String {
    let mut segments = namespace_segments(qualified);
    let Some(simple) = segments.pop() else {
        return String::new();
    };

    let mut identifier = snake_case(&simple);

    if segments.len() >= 2 {
        if let Some(enclosing) = segments.last() {
            let suffix = snake_case(enclosing);
            if !suffix.is_empty() && !identifier.contains(&suffix) {
                identifier.push('_');
                identifier.push_str(&suffix);
            }
        }
    }

    identifier
}

/// Normalize a user-supplied index-model name.
///
/// Qualified names are resolved, camel-case simple names are snake-cased
/// and anything else is lower-cased. `IndexedUser`, `indexed_user` and
/// `INDEXED_USER` all become `indexed_user`.
pub fn sanitize_index_model(name: &str) -> String {
    let trimmed = name.trim();
    if is_qualified(trimmed) {
        return resolve(trimmed);
    }
    let has_lower = trimmed.chars().any(|c| c.is_ascii_lowercase());
    if has_lower {
        snake_case(trimmed)
    } else {
        trimmed.to_ascii_lowercase()
    }
}

/// Check that an identifier can be used as a storage key component.
pub fn validate_identifier(identifier: &str) -> Result<(), LensError> {
    if identifier.is_empty() {
        return Err(LensError::InvalidInput(
            "index model identifier is empty".to_string(),
        ));
    }
    if identifier.contains(':') || identifier.chars().any(char::is_whitespace) {
        return Err(LensError::InvalidInput(format!(
            "index model identifier '{}' may not contain ':' or whitespace",
            identifier
        )));
    }
    Ok(())
}
