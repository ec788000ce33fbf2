use std::borrow::Cow;

/// Uppercase every standalone `a` token in a first-names field.
///
/// Imports often turn a middle initial "A." into a lowercase `a`. Whitespace
/// is preserved exactly; tokens like `al` or `a.` are left alone.
pub fn normalize_first_names(first_names: &str) -> Cow<'_, str> {
    if !first_names.split_whitespace().any(|token| token == "a") {
        return Cow::Borrowed(first_names);
    }

    let mut out = String::with_capacity(first_names.len());
    for piece in first_names.split_inclusive(char::is_whitespace) {
        let token = piece.trim_end_matches(char::is_whitespace);
        out.push_str(if token == "a" { "A" } else { token });
        out.push_str(&piece[token.len()..]);
    }
    Cow::Owned(out)
}
