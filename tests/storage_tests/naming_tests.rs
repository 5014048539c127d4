//! Naming Tests
//!
//! Tests for sanitizing, extension checks and collision suffixes.

use filevault::storage::naming::{
    sanitize, split_extension, with_suffix, DEFAULT_FILENAME, MAX_FILENAME_LEN,
};
use filevault::storage::NamePolicy;
use filevault::VaultError;

// =============================================================================
// Helper Functions
// =============================================================================

fn default_policy() -> NamePolicy {
    NamePolicy::new(["txt", "jpg", "png", "gif", "pdf", "docx"])
}

// =============================================================================
// Sanitize Tests
// =============================================================================

#[test]
fn test_sanitize_path_traversal() {
    assert_eq!(sanitize("../etc/passwd"), "__etc_passwd");
    assert_eq!(sanitize("..\\windows\\system.ini"), "__windows_system.ini");
}

#[test]
fn test_sanitize_keeps_plain_names() {
    assert_eq!(sanitize("notes.txt"), "notes.txt");
    assert_eq!(sanitize("my report v2.pdf"), "my report v2.pdf");
    assert_eq!(sanitize("résumé.docx"), "résumé.docx");
}

#[test]
fn test_sanitize_trims_whitespace() {
    assert_eq!(sanitize("  notes.txt \t"), "notes.txt");
    assert_eq!(sanitize("   "), "");
}

#[test]
fn test_sanitize_control_characters() {
    assert_eq!(sanitize("a\u{0}b.txt"), "a_b.txt");
    assert_eq!(sanitize("line\nbreak.txt"), "line_break.txt");
}

#[test]
fn test_sanitize_output_never_contains_separators() {
    for input in ["a/b/c.txt", "/abs.txt", "..", "....//", "x\\..\\y.png"] {
        let clean = sanitize(input);
        assert!(!clean.contains('/'), "{:?} -> {:?}", input, clean);
        assert!(!clean.contains('\\'), "{:?} -> {:?}", input, clean);
        assert!(!clean.contains(".."), "{:?} -> {:?}", input, clean);
    }
}

#[test]
fn test_sanitize_is_idempotent() {
    for input in ["../etc/passwd", "a..b.txt", " x/y ", "ok.png"] {
        let once = sanitize(input);
        assert_eq!(sanitize(&once), once);
    }
}

// =============================================================================
// Extension Tests
// =============================================================================

#[test]
fn test_split_extension() {
    assert_eq!(split_extension("report.final.pdf"), ("report.final", ".pdf"));
    assert_eq!(split_extension("README"), ("README", ""));
    assert_eq!(split_extension(".hidden"), (".hidden", ""));
}

#[test]
fn test_allows_listed_extensions() {
    let policy = default_policy();
    assert!(policy.allows("notes.txt"));
    assert!(policy.allows("photo.PNG"));
    assert!(policy.allows("archive.tar.pdf"));
}

#[test]
fn test_rejects_unlisted_extensions() {
    let policy = default_policy();
    assert!(!policy.allows("a.exe"));
    assert!(!policy.allows("script.sh"));
}

#[test]
fn test_no_extension_allowed() {
    assert!(default_policy().allows("Makefile"));
}

#[test]
fn test_leading_or_trailing_dot_rejected() {
    let policy = default_policy();
    assert!(!policy.allows(".txt"));
    assert!(!policy.allows("notes."));
}

#[test]
fn test_policy_accepts_dotted_config() {
    let policy = NamePolicy::new([".TXT", " .Pdf "]);
    assert!(policy.allows("a.txt"));
    assert!(policy.allows("b.pdf"));
    assert!(!policy.allows("c.png"));
}

// =============================================================================
// Resolve Tests
// =============================================================================

#[test]
fn test_resolve_empty_uses_default() {
    let policy = default_policy();
    assert_eq!(policy.resolve("").unwrap(), DEFAULT_FILENAME);
    assert_eq!(policy.resolve("  ").unwrap(), DEFAULT_FILENAME);
}

#[test]
fn test_resolve_default_skips_allow_list() {
    // "dat" is not on the list but the synthesized name still goes through
    let policy = NamePolicy::new(["txt"]);
    assert_eq!(policy.resolve("").unwrap(), "file.dat");
}

#[test]
fn test_resolve_sanitizes() {
    let policy = default_policy();
    assert_eq!(policy.resolve("../secret.txt").unwrap(), "__secret.txt");
}

#[test]
fn test_resolve_rejects_disallowed() {
    let result = default_policy().resolve("a.exe");
    assert!(matches!(result, Err(VaultError::Validation(_))));
}

#[test]
fn test_resolve_rejects_overlong_name() {
    let name = format!("{}.txt", "n".repeat(MAX_FILENAME_LEN));
    let result = default_policy().resolve(&name);
    assert!(matches!(result, Err(VaultError::Validation(_))));
}

// =============================================================================
// Suffix Tests
// =============================================================================

#[test]
fn test_with_suffix_keeps_extension() {
    assert_eq!(with_suffix("dup.txt", 42), "dup_42.txt");
    assert_eq!(with_suffix("Makefile", 7), "Makefile_7");
    assert_eq!(with_suffix("a.b.pdf", 0), "a.b_0.pdf");
}

#[test]
fn test_with_suffix_fits_length_limit() {
    let name = format!("{}.txt", "n".repeat(MAX_FILENAME_LEN - 4));
    let suffixed = with_suffix(&name, 999_999);

    assert!(suffixed.len() <= MAX_FILENAME_LEN);
    assert!(suffixed.ends_with("_999999.txt"));
}

#[test]
fn test_with_suffix_respects_char_boundaries() {
    let name = format!("{}.txt", "é".repeat(127));
    let suffixed = with_suffix(&name, 123);

    assert!(suffixed.len() <= MAX_FILENAME_LEN);
    assert!(suffixed.ends_with("_123.txt"));
}
