//! Process sandbox behavior against a real interpreter.
//!
//! Skipped when `python3` is not installed.

use std::process::Command;
use std::time::{Duration, Instant};

use numeval_core::sandbox::{
    CodeSandbox, ProcessSandbox, SandboxConfig, SandboxErrorKind, SandboxInvocation,
};

fn python_available() -> bool {
    Command::new("python3")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn sandbox() -> ProcessSandbox {
    ProcessSandbox::new(SandboxConfig {
        timeout_ms: 5_000,
        ..SandboxConfig::default()
    })
}

async fn run(sandbox: &ProcessSandbox, code: &str) -> numeval_core::sandbox::SandboxResult<String> {
    sandbox
        .run(&SandboxInvocation::new(code))
        .await
        .map(|o| o.stdout)
}

#[tokio::test]
async fn prints_are_captured() {
    if !python_available() {
        eprintln!("python3 not available; skipping");
        return;
    }
    let out = run(&sandbox(), "import json\nprint(json.dumps({'a': (10 + 3) / 2}))")
        .await
        .unwrap();
    assert_eq!(out.trim(), "{\"a\": 6.5}");
}

#[tokio::test]
async fn no_state_survives_between_invocations() {
    if !python_available() {
        eprintln!("python3 not available; skipping");
        return;
    }
    let sandbox = sandbox();
    run(&sandbox, "leaked = 41\nopen('scratch.txt', 'w').write('x')\nprint('ok')")
        .await
        .unwrap();

    let err = run(&sandbox, "print(leaked + 1)").await.unwrap_err();
    assert_eq!(err.kind, SandboxErrorKind::RuntimeError);
    assert!(err.message.contains("NameError"), "{}", err.message);

    let out = run(&sandbox, "import os\nprint(os.path.exists('scratch.txt'))")
        .await
        .unwrap();
    assert_eq!(out.trim(), "False");
}

#[tokio::test]
async fn syntax_error_is_classified() {
    if !python_available() {
        eprintln!("python3 not available; skipping");
        return;
    }
    let err = run(&sandbox(), "print((1 + 2)").await.unwrap_err();
    assert_eq!(err.kind, SandboxErrorKind::SyntaxError);
}

#[tokio::test]
async fn runtime_error_is_classified() {
    if !python_available() {
        eprintln!("python3 not available; skipping");
        return;
    }
    let err = run(&sandbox(), "print(1 / 0)").await.unwrap_err();
    assert_eq!(err.kind, SandboxErrorKind::RuntimeError);
    assert!(err.message.contains("ZeroDivisionError"), "{}", err.message);
}

#[tokio::test]
async fn infinite_loop_times_out() {
    if !python_available() {
        eprintln!("python3 not available; skipping");
        return;
    }
    let sandbox = ProcessSandbox::new(SandboxConfig {
        timeout_ms: 300,
        ..SandboxConfig::default()
    });
    let err = run(&sandbox, "while True:\n    pass").await.unwrap_err();
    assert_eq!(err.kind, SandboxErrorKind::TimeoutError);
}

#[tokio::test]
async fn numeric_library_is_blocked_at_runtime() {
    if !python_available() {
        eprintln!("python3 not available; skipping");
        return;
    }
    // Built at runtime, so the static scan cannot see it.
    let err = run(&sandbox(), "name = 'num' + 'py'\n__import__(name)")
        .await
        .unwrap_err();
    assert_eq!(err.kind, SandboxErrorKind::RuntimeError);
    assert!(err.message.contains("not permitted"), "{}", err.message);
}

#[tokio::test]
async fn deep_recursion_is_resource_error() {
    if !python_available() {
        eprintln!("python3 not available; skipping");
        return;
    }
    let err = run(&sandbox(), "def f(n):\n    return f(n + 1)\nf(0)")
        .await
        .unwrap_err();
    assert_eq!(err.kind, SandboxErrorKind::ResourceError);
}

#[tokio::test]
async fn oversized_output_is_resource_error() {
    if !python_available() {
        eprintln!("python3 not available; skipping");
        return;
    }
    let sandbox = ProcessSandbox::new(SandboxConfig {
        max_output_bytes: 16,
        ..SandboxConfig::default()
    });
    let err = run(&sandbox, "print('x' * 100)").await.unwrap_err();
    assert_eq!(err.kind, SandboxErrorKind::ResourceError);
}

#[tokio::test]
async fn oversized_output_is_cut_off_while_streaming() {
    if !python_available() {
        eprintln!("python3 not available; skipping");
        return;
    }
    let sandbox = ProcessSandbox::new(SandboxConfig {
        max_output_bytes: 1024,
        timeout_ms: 5_000,
        ..SandboxConfig::default()
    });
    let started = Instant::now();
    let err = run(
        &sandbox,
        "import sys\nfor _ in range(200):\n    sys.stdout.write('x' * 1_000_000)",
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind, SandboxErrorKind::ResourceError);
    assert!(err.message.contains("stdout exceeds the 1024 byte limit"), "{}", err.message);
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn oversized_stderr_is_resource_error() {
    if !python_available() {
        eprintln!("python3 not available; skipping");
        return;
    }
    let sandbox = ProcessSandbox::new(SandboxConfig {
        max_output_bytes: 1024,
        ..SandboxConfig::default()
    });
    let err = run(&sandbox, "import sys\nsys.stderr.write('e' * 5000)")
        .await
        .unwrap_err();
    assert_eq!(err.kind, SandboxErrorKind::ResourceError);
    assert!(err.message.contains("stderr exceeds"), "{}", err.message);
}

#[tokio::test]
async fn low_level_socket_module_is_blocked() {
    if !python_available() {
        eprintln!("python3 not available; skipping");
        return;
    }
    let sandbox = sandbox();
    for code in [
        "import _socket\nprint(_socket.socket())",
        "name = '_so' + 'cket'\nprint(__import__(name).socket())",
    ] {
        let err = run(&sandbox, code).await.unwrap_err();
        assert_eq!(err.kind, SandboxErrorKind::RuntimeError, "{code}");
        assert!(err.message.contains("not permitted"), "{}", err.message);
    }
}

#[tokio::test]
async fn shell_and_fork_calls_are_denied() {
    if !python_available() {
        eprintln!("python3 not available; skipping");
        return;
    }
    let sandbox = sandbox();
    for code in [
        "import os\nprint('rc', os.system('echo spawned-shell'))",
        "import os\nprint('pid', os.fork())",
        "import posix\nprint('rc', posix.system('echo spawned-shell'))",
        "import os\nos.execv('/bin/sh', ['sh', '-c', 'echo spawned-shell'])",
    ] {
        let err = run(&sandbox, code).await.unwrap_err();
        assert_eq!(err.kind, SandboxErrorKind::RuntimeError, "{code}");
        assert!(err.message.contains("PermissionError"), "{}", err.message);
        assert!(!err.message.contains("spawned-shell\n"), "{}", err.message);
    }
}

#[tokio::test]
async fn nothing_started_by_a_snippet_outlives_the_call() {
    if !python_available() {
        eprintln!("python3 not available; skipping");
        return;
    }
    let scratch = tempfile::tempdir().unwrap();
    let marker = scratch.path().join("marker.txt");
    let code = format!(
        "import os, time\n\
         try:\n    pid = os.fork()\nexcept PermissionError:\n    pid = -1\n\
         if pid == 0:\n    time.sleep(1.5)\n    open({marker:?}, 'w').write('late')\n    os._exit(0)\n\
         while True:\n    pass\n",
        marker = marker.display().to_string()
    );
    let sandbox = ProcessSandbox::new(SandboxConfig {
        timeout_ms: 500,
        ..SandboxConfig::default()
    });

    let err = run(&sandbox, &code).await.unwrap_err();
    assert_eq!(err.kind, SandboxErrorKind::TimeoutError);

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert!(!marker.exists(), "a process from the snippet ran after the call returned");
}
