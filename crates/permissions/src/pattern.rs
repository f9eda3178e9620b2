//! Pattern grammar for permission rules.
//!
//! ```text
//! pattern   := toolPart [ "(" argPart ")" ]
//! toolPart  := IDENT [ "*" ] | "*"
//! argPart   := EXACT | PREFIX ":" "*" | GLOB
//! ```
//!
//! Matching is always case-sensitive. File-path arguments are canonicalized
//! (`.`/`..` resolved lexically) before matching against a glob arg part.

const PREFIX_DELIMITERS: &[char] = &[' ', '-', '\t', ';', '|', '&', '\n', '/'];

#[derive(Debug, Clone, PartialEq, Eq)]
enum ToolPart {
    Any,
    /// Exact tool name, or `name*` if `wildcard` is set.
    Name { name: String, wildcard: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ArgPart {
    Exact(String),
    /// `prefix:*`
    Prefix(String),
    /// Path glob containing `*` wildcards.
    Glob(String),
}

/// A single compiled permission pattern, e.g. `Bash(git:*)` or `Write(/tmp/*)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    tool: ToolPart,
    arg: Option<ArgPart>,
}

impl Pattern {
    pub fn parse(raw: &str) -> Self {
        let raw_owned = raw.to_string();
        let (tool_str, arg_str) = match raw.find('(') {
            Some(open) if raw.ends_with(')') => (&raw[..open], Some(&raw[open + 1..raw.len() - 1])),
            _ => (raw, None),
        };

        let tool = if tool_str == "*" {
            ToolPart::Any
        } else if let Some(stripped) = tool_str.strip_suffix('*') {
            ToolPart::Name {
                name: stripped.to_string(),
                wildcard: true,
            }
        } else {
            ToolPart::Name {
                name: tool_str.to_string(),
                wildcard: false,
            }
        };

        let arg = arg_str.map(|a| {
            if let Some(prefix) = a.strip_suffix(":*") {
                ArgPart::Prefix(prefix.to_string())
            } else if a.contains('*') {
                ArgPart::Glob(a.to_string())
            } else {
                ArgPart::Exact(a.to_string())
            }
        });

        Self {
            raw: raw_owned,
            tool,
            arg,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// `mcp__server__*` is just an ordinary tool-name wildcard; no special
    /// casing needed beyond the generic `name*` grammar.
    pub fn matches(&self, tool_name: &str, arg: Option<&str>) -> bool {
        if !self.tool_matches(tool_name) {
            return false;
        }
        match &self.arg {
            None => true,
            Some(part) => match arg {
                None => false,
                Some(a) => arg_part_matches(part, a),
            },
        }
    }

    fn tool_matches(&self, tool_name: &str) -> bool {
        match &self.tool {
            ToolPart::Any => true,
            ToolPart::Name { name, wildcard: false } => name == tool_name,
            ToolPart::Name { name, wildcard: true } => tool_name.starts_with(name.as_str()),
        }
    }
}

fn arg_part_matches(part: &ArgPart, arg: &str) -> bool {
    let canonical = canonicalize_lexical(arg);
    match part {
        ArgPart::Exact(expected) => arg == expected || canonical == *expected,
        ArgPart::Prefix(prefix) => prefix_matches(prefix, arg),
        ArgPart::Glob(glob) => glob_matches(glob, &canonical) || glob_matches(glob, arg),
    }
}

/// `prefix:*` matches `prefix` exactly, or `prefix<delim><anything>` where
/// `<delim>` is one of the recognised separators. `git:*` matches `git` and
/// `git status` and `git/sub`, but not `gitsomething`.
fn prefix_matches(prefix: &str, arg: &str) -> bool {
    if arg == prefix {
        return true;
    }
    match arg.strip_prefix(prefix) {
        Some(rest) => rest.starts_with(|c| PREFIX_DELIMITERS.contains(&c)),
        None => false,
    }
}

fn glob_matches(glob: &str, candidate: &str) -> bool {
    glob_to_regex(glob).is_match(candidate)
}

fn glob_to_regex(glob: &str) -> regex::Regex {
    let mut out = String::from("^");
    for ch in glob.chars() {
        if ch == '*' {
            out.push_str(".*");
        } else {
            out.push_str(&regex::escape(&ch.to_string()));
        }
    }
    out.push('$');
    regex::Regex::new(&out).expect("glob pattern always compiles to a valid regex")
}

/// Lexically resolves `.` and `..` components without touching the
/// filesystem, so `/tmp/../etc/passwd` canonicalizes to `/etc/passwd` even
/// if neither path exists.
pub fn canonicalize_lexical(path: &str) -> String {
    let is_absolute = path.starts_with('/');
    let mut stack: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                if matches!(stack.last(), Some(top) if *top != "..") {
                    stack.pop();
                } else if !is_absolute {
                    stack.push("..");
                }
            }
            other => stack.push(other),
        }
    }
    let joined = stack.join("/");
    if is_absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_tool_and_arg_match() {
        let p = Pattern::parse("Bash(git status)");
        assert!(p.matches("Bash", Some("git status")));
        assert!(!p.matches("Bash", Some("git statusX")));
        assert!(!p.matches("Read", Some("git status")));
    }

    #[test]
    fn prefix_grammar_boundary_cases() {
        let p = Pattern::parse("Bash(git:*)");
        assert!(p.matches("Bash", Some("git")));
        assert!(p.matches("Bash", Some("git status")));
        assert!(p.matches("Bash", Some("git/sub")));
        assert!(!p.matches("Bash", Some("gitsomething")));
    }

    #[test]
    fn wildcard_tool_name() {
        let p = Pattern::parse("mcp__server__*");
        assert!(p.matches("mcp__server__read", None));
        assert!(!p.matches("mcp__other__read", None));
    }

    #[test]
    fn all_tools_wildcard() {
        let p = Pattern::parse("*");
        assert!(p.matches("AnyTool", Some("whatever")));
    }

    #[test]
    fn path_glob_canonicalizes_before_matching() {
        let p = Pattern::parse("Write(/etc/*)");
        assert!(p.matches("Write", Some("/tmp/../etc/passwd")));
        assert!(!p.matches("Write", Some("/tmp/passwd")));
    }

    #[test]
    fn lexical_canonicalize_examples() {
        assert_eq!(canonicalize_lexical("/tmp/../etc/passwd"), "/etc/passwd");
        assert_eq!(canonicalize_lexical("/a/./b/../c"), "/a/c");
        assert_eq!(canonicalize_lexical("a/b/../../c"), "c");
    }
}
