//! Canonicalisation of raw `sources` entries.
//!
//! Sourcemap paths arrive in many shapes (`webpack:///./src/a.ts`,
//! `C:\build\src\a.ts`, `../../node_modules/x.js`). Everything here is a pure
//! string transform; containment is enforced later by [`crate::anchor`].

/// URI prefixes stripped from the front of a source path. Only the first match is removed.
const URI_PREFIXES: [&str; 5] = ["webpack:///", "webpack://", "file:///", "file://", "vscode://"];

/// Placeholder used for segments that cannot be materialised as-is.
pub const UNNAMED_SEGMENT: &str = "unnamed";

/// Normalise a raw source path while keeping its leading `../` run intact.
///
/// Rules, applied in order:
/// 1. trim surrounding whitespace;
/// 2. strip one known URI prefix (`webpack:///`, `webpack://`, `file:///`, `file://`, `vscode://`);
/// 3. convert `\` to `/`;
/// 4. strip leading `/` and a drive marker such as `C:`;
/// 5. collapse repeated `/`.
///
/// `.` and `..` segments are left where they are.
pub fn normalize(raw: &str) -> String {
    let mut p = raw.trim();
    if let Some(rest) = URI_PREFIXES.iter().find_map(|pref| p.strip_prefix(pref)) {
        p = rest;
    }

    let mut p = p.replace('\\', "/");
    p = p.trim_start_matches('/').to_string();

    let bytes = p.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        p = p[2..].trim_start_matches('/').to_string();
    }

    while p.contains("//") {
        p = p.replace("//", "/");
    }
    p
}

/// Count the leading run of `../` segments. The input is left untouched.
pub fn count_leading_ups(path: &str) -> usize {
    let mut rest = path;
    let mut n = 0;
    while let Some(r) = rest.strip_prefix("../") {
        rest = r;
        n += 1;
    }
    n
}

/// Join `sourceRoot` and a source path with exactly one `/` between them.
/// An empty or whitespace-only root leaves the path unchanged.
pub fn join_source_root(root: &str, path: &str) -> String {
    if root.trim().is_empty() {
        return path.to_string();
    }
    format!(
        "{}/{}",
        root.trim_end_matches(['/', '\\']),
        path.trim_start_matches(['/', '\\'])
    )
}

/// Clean a single path segment: trim it, replace `""`, `.` and `..` with
/// [`UNNAMED_SEGMENT`] and swap characters illegal on common filesystems for `_`.
pub fn sanitize_segment(seg: &str) -> String {
    let seg = seg.trim();
    if seg.is_empty() || seg == "." || seg == ".." {
        return UNNAMED_SEGMENT.to_string();
    }
    seg.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            other => other,
        })
        .collect()
}

/// Apply [`sanitize_segment`] to every `/`-separated segment of `path`.
///
/// Idempotent: `sanitize_segments(&sanitize_segments(p)) == sanitize_segments(p)`.
pub fn sanitize_segments(path: &str) -> String {
    path.split('/')
        .map(sanitize_segment)
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_only_first_prefix() {
        assert_eq!(normalize("webpack:///file:///a.js"), "file:/a.js");
        assert_eq!(normalize("webpack://app/./src/x.ts"), "app/./src/x.ts");
    }

    #[test]
    fn drive_and_backslashes() {
        assert_eq!(normalize(r"C:\work\\src\a.ts"), "work/src/a.ts");
        assert_eq!(normalize("///abs//path.js"), "abs/path.js");
    }

    #[test]
    fn keeps_dot_segments() {
        assert_eq!(normalize("../../src/../x.ts"), "../../src/../x.ts");
        assert_eq!(count_leading_ups("../../src/../x.ts"), 2);
        assert_eq!(count_leading_ups("./../x"), 0);
    }
}
