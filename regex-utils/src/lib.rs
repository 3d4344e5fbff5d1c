//! Regex utilities for catalog-advisor
//! Extracted to a separate crate for compilation optimization

use once_cell::sync::Lazy;
use regex::Regex;

/// Version token extraction from `--version` output
pub mod version {
    use super::*;

    pub static SEMVER_TOKEN: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"v?(\d+\.\d+\.\d+(?:-[0-9A-Za-z][0-9A-Za-z.-]*)?)")
            .expect("Invalid regex pattern")
    });

    /// Extract the first semantic-version-like token from text
    pub fn extract(text: &str) -> Option<String> {
        SEMVER_TOKEN
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

/// Patterns for pulling structured data out of free-form model output
pub mod response {
    use super::*;

    pub static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"```[A-Za-z]*[ \t]*\r?\n?([\s\S]*?)```").expect("Invalid regex pattern")
    });

    pub static GREEDY_OBJECT: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("Invalid regex pattern"));

    /// Contents of the first fenced code block, if any
    pub fn fenced_block(text: &str) -> Option<&str> {
        FENCED_BLOCK
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
    }

    /// Broadest object-shaped span: first `{` to last `}`
    pub fn greedy_object(text: &str) -> Option<&str> {
        GREEDY_OBJECT.find(text).map(|m| m.as_str())
    }
}

/// Parsing of shell `type <cmd>` output
pub mod shell {
    use super::*;

    // bash: "claude is aliased to `/path/claude'"
    // zsh:  "claude is an alias for /path/claude"
    pub static ALIAS_TARGET: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"(?:aliased to|an alias for)\s+[`'"]?([^`'"\s]+)"#)
            .expect("Invalid regex pattern")
    });

    // "claude is /usr/local/bin/claude" or "claude is hashed (/usr/bin/claude)"
    pub static RESOLVED_PATH: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\bis\s+(?:hashed\s+\()?(/[^\s)]+)").expect("Invalid regex pattern")
    });

    /// Extract the executable a shell alias or lookup resolves to
    pub fn resolve_target(output: &str) -> Option<String> {
        if let Some(caps) = ALIAS_TARGET.captures(output) {
            return caps.get(1).map(|m| m.as_str().to_string());
        }

        if let Some(caps) = RESOLVED_PATH.captures(output) {
            return caps.get(1).map(|m| m.as_str().to_string());
        }

        None
    }

    /// Whether the output describes a shell function rather than a file
    pub fn is_function(output: &str) -> bool {
        output.contains("is a shell function") || output.contains("is a function")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_extraction() {
        let cases = vec![
            ("1.0.43 (Claude Code)", "1.0.43"),
            ("codex-cli 0.20.0", "0.20.0"),
            ("v2.1.3", "2.1.3"),
            ("gemini 0.1.9-nightly.1", "0.1.9-nightly.1"),
        ];

        for (input, expected) in cases {
            assert_eq!(version::extract(input), Some(expected.to_string()), "input: {}", input);
        }

        assert_eq!(version::extract("no version here"), None);
    }

    #[test]
    fn test_fenced_block() {
        let text = "Here you go:\n```json\n{\"a\": 1}\n```\nthanks";
        assert_eq!(response::fenced_block(text), Some("{\"a\": 1}"));

        let plain = "```\n{\"b\": 2}\n```";
        assert_eq!(response::fenced_block(plain), Some("{\"b\": 2}"));

        assert_eq!(response::fenced_block("no fences"), None);
    }

    #[test]
    fn test_greedy_object() {
        let text = "prefix {\"a\": {\"b\": 1}} middle {\"c\": 2} suffix";
        assert_eq!(response::greedy_object(text), Some("{\"a\": {\"b\": 1}} middle {\"c\": 2}"));
    }

    #[test]
    fn test_shell_alias_resolution() {
        assert_eq!(
            shell::resolve_target("claude is aliased to `/home/me/.claude/local/claude'"),
            Some("/home/me/.claude/local/claude".to_string())
        );
        assert_eq!(
            shell::resolve_target("claude is an alias for /home/me/.claude/local/claude"),
            Some("/home/me/.claude/local/claude".to_string())
        );
        assert_eq!(
            shell::resolve_target("gemini is /usr/local/bin/gemini"),
            Some("/usr/local/bin/gemini".to_string())
        );
        assert_eq!(
            shell::resolve_target("codex is hashed (/opt/homebrew/bin/codex)"),
            Some("/opt/homebrew/bin/codex".to_string())
        );
        assert!(shell::is_function("claude is a shell function from /home/me/.zshrc"));
        assert_eq!(shell::resolve_target("bash: type: nothing: not found"), None);
    }
}
