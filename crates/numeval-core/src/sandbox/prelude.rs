//! Python runner that wraps every sandboxed snippet.
//!
//! Invoked as `python -I -B runner.py <snippet> <forbidden,modules> <memory_mb>`.
//! Before the snippet runs, the runner blocks the forbidden imports, replaces
//! the `os`/`posix` process entry points with functions that raise
//! `PermissionError`, and drops `RLIMIT_NPROC` to zero. The exit code tells
//! the host how the snippet ended.

/// Snippet failed to compile.
pub const EXIT_SYNTAX: i32 = 65;
/// Snippet raised an exception.
pub const EXIT_RUNTIME: i32 = 70;
/// Snippet ran out of memory or recursion depth.
pub const EXIT_RESOURCE: i32 = 71;

pub const RUNNER_SOURCE: &str = r#"import sys
import traceback

EXIT_SYNTAX = 65
EXIT_RUNTIME = 70
EXIT_RESOURCE = 71


def limit_memory(megabytes):
    if megabytes <= 0:
        return
    try:
        import resource
        limit = megabytes * 1024 * 1024
        resource.setrlimit(resource.RLIMIT_AS, (limit, limit))
    except Exception:
        pass


PROCESS_CALLS = (
    "system", "popen", "fork", "forkpty", "vfork",
    "execv", "execve", "execl", "execle", "execlp", "execlpe", "execvp", "execvpe",
    "spawnl", "spawnle", "spawnlp", "spawnlpe", "spawnv", "spawnve", "spawnvp", "spawnvpe",
    "posix_spawn", "posix_spawnp", "kill", "killpg",
)


def deny_processes():
    import os
    import posix

    def denied(name):
        def call(*args, **kwargs):
            raise PermissionError("os.%s is not permitted in the sandbox" % name)
        return call

    for module in (os, posix):
        for name in PROCESS_CALLS:
            if hasattr(module, name):
                setattr(module, name, denied(name))
    try:
        import resource
        resource.setrlimit(resource.RLIMIT_NPROC, (0, 0))
    except Exception:
        pass


class ImportGuard:
    def __init__(self, blocked):
        self.blocked = blocked

    def find_spec(self, name, path=None, target=None):
        if name.partition(".")[0] in self.blocked:
            raise ImportError("import of '%s' is not permitted in the sandbox" % name)
        return None


def main():
    snippet_path, blocked, megabytes = sys.argv[1], sys.argv[2], int(sys.argv[3])
    with open(snippet_path, encoding="utf-8") as handle:
        source = handle.read()
    try:
        code = compile(source, "<snippet>", "exec")
    except (SyntaxError, ValueError) as exc:
        sys.stderr.write("%s: %s\n" % (type(exc).__name__, exc))
        return EXIT_SYNTAX

    names = set(filter(None, blocked.split(",")))
    for loaded in list(sys.modules):
        if loaded.partition(".")[0] in names:
            del sys.modules[loaded]
    sys.meta_path.insert(0, ImportGuard(names))
    deny_processes()
    limit_memory(megabytes)

    try:
        exec(code, {"__name__": "__main__", "__builtins__": __builtins__})
    except (MemoryError, RecursionError) as exc:
        sys.stderr.write("%s: %s\n" % (type(exc).__name__, exc))
        return EXIT_RESOURCE
    except SystemExit as exc:
        if exc.code in (None, 0):
            return 0
        sys.stderr.write("SystemExit: %s\n" % (exc.code,))
        return EXIT_RUNTIME
    except BaseException:
        traceback.print_exc(limit=-3)
        return EXIT_RUNTIME
    sys.stdout.flush()
    return 0


sys.exit(main())
"#;
