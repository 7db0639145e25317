//! Import policy for sandboxed snippets.
//!
//! The static check runs before any process is spawned so that a snippet
//! reaching for a numeric library fails fast with a readable message. The
//! runner prelude enforces the same list at import time, which also covers
//! imports this scan cannot see (e.g. names built at runtime).

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::{SandboxFailure, SandboxResult};

/// Numeric/array computing libraries. Arithmetic must be written out in
/// plain code.
pub const NUMERIC_LIBRARIES: &[&str] = &[
    "numpy", "pandas", "scipy", "sympy", "numexpr", "mpmath", "polars", "torch", "tensorflow",
    "jax",
];

/// Modules that would give a snippet network or process access, including
/// the C modules the friendly ones are built on.
pub const NETWORK_MODULES: &[&str] = &[
    "socket",
    "_socket",
    "ssl",
    "_ssl",
    "select",
    "selectors",
    "asyncio",
    "urllib",
    "http",
    "requests",
    "httpx",
    "ftplib",
    "smtplib",
    "subprocess",
    "_posixsubprocess",
    "multiprocessing",
    "pty",
    "ctypes",
    "_ctypes",
];

/// Set of top-level module names a snippet may not import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportPolicy {
    pub forbidden: Vec<String>,
}

impl Default for ImportPolicy {
    fn default() -> Self {
        Self {
            forbidden: NUMERIC_LIBRARIES
                .iter()
                .chain(NETWORK_MODULES)
                .map(|m| (*m).to_string())
                .collect(),
        }
    }
}

impl ImportPolicy {
    pub fn new<I, S>(forbidden: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            forbidden: forbidden.into_iter().map(Into::into).collect(),
        }
    }

    /// Comma-joined list handed to the runner prelude.
    pub fn as_arg(&self) -> String {
        self.forbidden.join(",")
    }

    /// Reject `code` if it statically imports a forbidden module.
    pub fn check(&self, code: &str) -> SandboxResult<()> {
        for module in imported_modules(code) {
            let root = module.split('.').next().unwrap_or(&module);
            if self.forbidden.iter().any(|f| f == root) {
                return Err(SandboxFailure::runtime(format!(
                    "import of '{module}' is not permitted in the sandbox; \
                     use plain arithmetic and built-in functions"
                )));
            }
        }
        Ok(())
    }
}

struct ImportPatterns {
    plain: Regex,
    from: Regex,
    dynamic: Regex,
}

fn patterns() -> &'static ImportPatterns {
    static PATTERNS: OnceLock<ImportPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| ImportPatterns {
        plain: Regex::new(r"(?m)(?:^|;)[ \t]*import[ \t]+([^#;\n]+)").expect("valid import pattern"),
        from: Regex::new(r"(?m)(?:^|;)[ \t]*from[ \t]+([A-Za-z_][\w.]*)[ \t]+import\b")
            .expect("valid from-import pattern"),
        dynamic: Regex::new(r#"(?:__import__|import_module)\s*\(\s*['"]([A-Za-z_][\w.]*)['"]"#)
            .expect("valid dynamic import pattern"),
    })
}

/// Module names a snippet imports, as far as a line scan can tell.
pub fn imported_modules(code: &str) -> Vec<String> {
    let p = patterns();
    let mut modules = Vec::new();

    for caps in p.plain.captures_iter(code) {
        for item in caps[1].split(',') {
            if let Some(name) = item.split_whitespace().next() {
                modules.push(name.to_string());
            }
        }
    }
    for caps in p.from.captures_iter(code) {
        modules.push(caps[1].to_string());
    }
    for caps in p.dynamic.captures_iter(code) {
        modules.push(caps[1].to_string());
    }

    modules
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imported_modules_covers_statement_forms() {
        let code = "import os, json as j\nfrom numpy.linalg import inv\nx = 1; import math\n\
                    m = __import__('pandas')\nimport importlib\nimportlib.import_module(\"scipy.stats\")\n";
        let found = imported_modules(code);
        for expected in ["os", "json", "numpy.linalg", "math", "pandas", "importlib", "scipy.stats"] {
            assert!(found.iter().any(|m| m == expected), "missing {expected}: {found:?}");
        }
    }

    #[test]
    fn test_default_policy_rejects_numeric_libraries() {
        let policy = ImportPolicy::default();
        for code in [
            "import numpy as np\nprint(np.mean([1, 2]))",
            "from pandas import DataFrame",
            "import os, scipy",
            "np = __import__(\"numpy\")",
        ] {
            let err = policy.check(code).unwrap_err();
            assert_eq!(err.kind, super::super::error::SandboxErrorKind::RuntimeError);
            assert!(err.message.contains("not permitted"), "{code}");
        }
    }

    #[test]
    fn test_default_policy_rejects_network_modules() {
        let policy = ImportPolicy::default();
        assert!(policy.check("import urllib.request").is_err());
        assert!(policy.check("from socket import socket").is_err());
        assert!(policy.check("import _socket").is_err());
        assert!(policy.check("from _posixsubprocess import fork_exec").is_err());
        assert!(policy.check("import ctypes.util").is_err());
    }

    #[test]
    fn test_default_policy_allows_plain_code() {
        let policy = ImportPolicy::default();
        let code = "import json, math\nvalues = {'a': 10, 'b': 3}\n\
                    print(json.dumps(sum(values.values()) / len(values)))";
        assert!(policy.check(code).is_ok());
    }

    #[test]
    fn test_comments_and_identifiers_do_not_trigger() {
        let policy = ImportPolicy::default();
        assert!(policy.check("# we could import numpy here\nnumpy_free = True").is_ok());
    }

    #[test]
    fn test_as_arg_joins_modules() {
        let policy = ImportPolicy::new(["numpy", "socket"]);
        assert_eq!(policy.as_arg(), "numpy,socket");
    }
}
