//! Filesystem-safe names for folders and image files.

/// Longest name we emit; leaves room for a timestamp suffix and extension.
pub const MAX_NAME_LEN: usize = 100;

/// Replace every character outside `[A-Za-z0-9_.-]` with `_`.
///
/// Never returns an empty string.
///
/// ```
/// use pagegrab_web::sanitize;
///
/// assert_eq!(sanitize("My Page: v2/final"), "My_Page__v2_final");
/// assert_eq!(sanitize(""), "_");
/// ```
pub fn sanitize(name: &str) -> String {
    let mut out: String = name
        .chars()
        .take(MAX_NAME_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() {
        out.push('_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_safe(s: &str) -> bool {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    }

    #[test]
    fn keeps_allowed_characters() {
        assert_eq!(sanitize("report-2024_v1.2"), "report-2024_v1.2");
    }

    #[test]
    fn replaces_each_disallowed_char() {
        assert_eq!(sanitize("a b/c\\d?e"), "a_b_c_d_e");
        assert_eq!(sanitize("프로그램 소개"), "_______");
    }

    #[test]
    fn output_is_always_safe_and_non_empty() {
        let inputs = [
            "",
            " ",
            "////",
            "제목",
            "emoji 🎉 title",
            "tab\tnew\nline",
            "..",
            "normal",
        ];
        for input in inputs {
            let out = sanitize(input);
            assert!(is_safe(&out), "{input:?} -> {out:?}");
        }
    }

    #[test]
    fn long_names_are_capped() {
        let long = "x".repeat(500);
        assert_eq!(sanitize(&long).len(), MAX_NAME_LEN);
    }
}
