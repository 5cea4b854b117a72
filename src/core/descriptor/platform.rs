// ─── Platform Filters ───
// Evaluates the os/arch attributes of <resources> against the running platform.

/// Operating system and architecture names in Rust's `std::env::consts` vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }
}

/// JNLP operating system names mapped onto `std::env::consts::OS` values.
const OS_SYNONYMS: &[(&str, &str)] = &[
    ("mac os", "macos"),
    ("mac os x", "macos"),
    ("macosx", "macos"),
    ("darwin", "macos"),
    ("windows 95", "windows"),
    ("windows 98", "windows"),
    ("windows me", "windows"),
    ("windows nt", "windows"),
    ("windows 2000", "windows"),
    ("windows 2003", "windows"),
    ("windows xp", "windows"),
    ("windows vista", "windows"),
    ("windows 7", "windows"),
    ("windows 8", "windows"),
    ("windows 10", "windows"),
    ("windows 11", "windows"),
    ("sunos", "solaris"),
];

/// JNLP architecture names mapped onto `std::env::consts::ARCH` values.
const ARCH_SYNONYMS: &[(&str, &str)] = &[
    ("x86", "x86"),
    ("i386", "x86"),
    ("i486", "x86"),
    ("i586", "x86"),
    ("i686", "x86"),
    ("x64", "x86_64"),
    ("amd64", "x86_64"),
    ("x86-64", "x86_64"),
    ("arm64", "aarch64"),
    ("armv8", "aarch64"),
    ("ppc", "powerpc"),
    ("ppc64", "powerpc64"),
];

/// Whether a resource block filtered by `os`/`arch` applies to `platform`.
///
/// Empty filters match everything. The architecture filter is only looked
/// at once the OS filter has matched.
pub fn is_relevant(os: &str, arch: &str, platform: &Platform) -> bool {
    if !os.trim().is_empty() && !any_token_matches(os, &platform.os, OS_SYNONYMS) {
        return false;
    }
    if arch.trim().is_empty() {
        return true;
    }
    any_token_matches(arch, &platform.arch, ARCH_SYNONYMS)
}

fn any_token_matches(filter: &str, current: &str, synonyms: &[(&str, &str)]) -> bool {
    split_escaped(filter).iter().any(|token| {
        let token = token.to_lowercase();
        token == current || synonym(synonyms, &token) == Some(current)
    })
}

fn synonym<'a>(table: &'a [(&str, &str)], token: &str) -> Option<&'a str> {
    table
        .iter()
        .find(|(alias, _)| *alias == token)
        .map(|(_, canonical)| *canonical)
}

/// Split on spaces, except spaces escaped with a backslash
/// (`"Windows\ NT Linux"` → `["Windows NT", "Linux"]`).
pub fn split_escaped(s: &str) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&' ') => {
                current.push(' ');
                chars.next();
            }
            ' ' => {
                if !current.is_empty() {
                    result.push(std::mem::take(&mut current));
                }
            }
            other => current.push(other),
        }
    }
    if !current.is_empty() {
        result.push(current);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windows() -> Platform {
        Platform::new("windows", "x86_64")
    }

    fn macos() -> Platform {
        Platform::new("macos", "aarch64")
    }

    fn linux() -> Platform {
        Platform::new("linux", "x86_64")
    }

    #[test]
    fn empty_filters_match_everywhere() {
        for platform in [windows(), macos(), linux(), Platform::current()] {
            assert!(is_relevant("", "", &platform));
        }
    }

    #[test]
    fn windows_nt_matches_only_windows() {
        assert!(is_relevant("Windows NT", "", &windows()));
        assert!(!is_relevant("Windows NT", "", &macos()));
        assert!(!is_relevant("Windows NT", "", &linux()));
    }

    #[test]
    fn sunos_matches_none_of_the_desktop_platforms() {
        for platform in [windows(), macos(), linux()] {
            assert!(!is_relevant("SunOS", "", &platform));
        }
    }

    #[test]
    fn escaped_space_keeps_os_name_together() {
        assert!(is_relevant(r"Mac\ OS\ X", "", &macos()));
        // Without the escape "Mac", "OS", "X" are separate names.
        assert!(!is_relevant("Mac OS X", "", &macos()));
        assert!(is_relevant(r"Windows\ NT Linux", "", &linux()));
    }

    #[test]
    fn arch_is_checked_after_os() {
        assert!(is_relevant("Linux", "amd64", &linux()));
        assert!(is_relevant("Linux", "x86_64", &linux()));
        assert!(!is_relevant("Linux", "i386 x86", &linux()));
        assert!(!is_relevant("Windows", "amd64", &linux()));
        assert!(is_relevant("", "arm64", &macos()));
        assert!(!is_relevant("", "arm64", &linux()));
    }

    #[test]
    fn os_names_are_case_insensitive() {
        assert!(is_relevant("LINUX", "", &linux()));
        assert!(is_relevant("windows", "", &windows()));
    }

    #[test]
    fn split_escaped_handles_separators() {
        assert_eq!(split_escaped(r"Windows\ NT Linux"), vec!["Windows NT", "Linux"]);
        assert_eq!(split_escaped("a  b"), vec!["a", "b"]);
        assert!(split_escaped("").is_empty());
    }
}
