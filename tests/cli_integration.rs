//! CLI integration tests for hookgen.
//!
//! These tests drive the binary against small header/symbol-list projects
//! laid out in temporary directories.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the hookgen binary command.
fn hookgen() -> Command {
    Command::cargo_bin("hookgen").unwrap()
}

/// Lay out a project reading symbols from `symbols.txt`.
fn project(headers: &[(&str, &str)], symbols: &[&str]) -> TempDir {
    let tmp = TempDir::new().unwrap();

    let names: Vec<String> = headers.iter().map(|(n, _)| format!("\"{}\"", n)).collect();
    for (name, content) in headers {
        fs::write(tmp.path().join(name), content).unwrap();
    }
    fs::write(tmp.path().join("symbols.txt"), symbols.join("\n")).unwrap();
    fs::write(
        tmp.path().join("hookgen.toml"),
        format!(
            r#"[target]
library = "libcuda.so"
headers = [{}]

[symbols]
reader = "list"
list_file = "symbols.txt"

[output]
path = "hook.gen.cc"
includes = ["cuda.h"]
"#,
            names.join(", ")
        ),
    )
    .unwrap();

    tmp
}

fn output(dir: &Path) -> String {
    fs::read_to_string(dir.join("hook.gen.cc")).unwrap()
}

// ============================================================================
// hookgen generate
// ============================================================================

#[test]
fn test_generate_skips_undeclared_symbol() {
    let tmp = project(&[("cuda.h", "int cuFoo(int x);\n")], &["cuFoo", "cuBar"]);

    hookgen()
        .arg("generate")
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("`cuBar` not generated"))
        .stderr(predicate::str::contains("1 trampolines, 1 skipped"));

    let text = output(tmp.path());
    assert_eq!(text.matches("HOOK_C_API HOOK_DECL_EXPORT").count(), 1);
    assert!(text.contains("HOOK_C_API HOOK_DECL_EXPORT int cuFoo(int x) {"));
    assert!(text.contains("return func_entry(x);"));
    assert!(!text.contains(" cuBar("));
}

#[test]
fn test_generate_exact_name_with_versioned_declaration() {
    let tmp = project(
        &[("cuda.h", "int cuBar_v2_ptsz(float y);\n")],
        &["cuBar_v2_ptsz"],
    );

    hookgen()
        .arg("generate")
        .current_dir(tmp.path())
        .assert()
        .success();

    let text = output(tmp.path());
    assert!(text.contains("int cuBar_v2_ptsz(float y) {"));
    assert!(text.contains("hook::ResolveSymbol(\"cuBar_v2_ptsz\")"));
}

#[test]
fn test_generate_first_header_wins() {
    let tmp = project(
        &[
            ("h1.h", "int cuFoo(int x);\n"),
            ("h2.h", "double cuFoo(double y, double z);\n"),
        ],
        &["cuFoo"],
    );

    for _ in 0..2 {
        hookgen()
            .arg("generate")
            .current_dir(tmp.path())
            .assert()
            .success();

        let text = output(tmp.path());
        assert!(text.contains("int cuFoo(int x) {"));
        assert!(!text.contains("double"));
    }
}

#[test]
fn test_generate_follows_renaming_macro() {
    let header = "#define cuGraphInstantiate cuGraphInstantiateWithFlags\n\
                  int cuGraphInstantiate(void **e, void *g, unsigned long long flags);\n\
                  #if defined(__CUDA_API_VERSION_INTERNAL)\n\
                  #undef cuGraphInstantiate\n\
                  int cuGraphInstantiate(void **e, void *g, void *n, char *log, unsigned long size);\n\
                  #endif\n";
    let tmp = project(
        &[("cuda.h", header)],
        &["cuGraphInstantiate", "cuGraphInstantiateWithFlags"],
    );

    hookgen()
        .arg("generate")
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("`cuGraphInstantiate` not generated"))
        .stderr(predicate::str::contains("1 trampolines, 1 skipped"));

    let text = output(tmp.path());
    assert!(text.contains("#undef cuGraphInstantiate\n"));
    assert!(text.contains(
        "int cuGraphInstantiateWithFlags(void **e, void *g, unsigned long long flags) {"
    ));
    assert!(!text.contains("char *log"));
}

#[test]
fn test_generate_with_explicit_config_and_output() {
    let tmp = project(&[("cuda.h", "int cuFoo(int x);\n")], &["cuFoo"]);
    let out = tmp.path().join("out").join("custom.cc");

    hookgen()
        .arg("generate")
        .arg("--config")
        .arg(tmp.path().join("hookgen.toml"))
        .arg("--output")
        .arg(&out)
        .assert()
        .success();

    assert!(fs::read_to_string(&out).unwrap().contains("int cuFoo(int x)"));
    assert!(!tmp.path().join("hook.gen.cc").exists());
}

#[test]
fn test_generate_symbols_file_override() {
    let tmp = project(&[("cuda.h", "int cuFoo(int x);\nint cuBaz(void);\n")], &["cuFoo"]);
    fs::write(tmp.path().join("other.txt"), "cuBaz\n").unwrap();

    hookgen()
        .args(["generate", "--symbols-file", "other.txt"])
        .current_dir(tmp.path())
        .assert()
        .success();

    let text = output(tmp.path());
    assert!(text.contains("int cuBaz() {"));
    assert!(!text.contains(" cuFoo("));
}

#[test]
fn test_generate_check_mode() {
    let tmp = project(&[("cuda.h", "int cuFoo(int x);\n")], &["cuFoo"]);

    hookgen()
        .args(["generate", "--check"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of date"));
    assert!(!tmp.path().join("hook.gen.cc").exists());

    hookgen()
        .arg("generate")
        .current_dir(tmp.path())
        .assert()
        .success();

    hookgen()
        .args(["generate", "--check"])
        .current_dir(tmp.path())
        .assert()
        .success();
}

#[test]
fn test_generate_missing_library_fails() {
    let tmp = project(&[("cuda.h", "int cuFoo(int x);\n")], &["cuFoo"]);

    hookgen()
        .args(["generate", "--reader", "object", "--library", "missing/libcuda.so"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"))
        .stderr(predicate::str::contains("libcuda.so"));

    assert!(!tmp.path().join("hook.gen.cc").exists());
}

#[test]
fn test_generate_bad_header_fails() {
    let tmp = project(&[("cuda.h", "int cuFoo(int x;\n")], &["cuFoo"]);

    hookgen()
        .args(["--no-color", "generate"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unclosed '('"))
        .stderr(predicate::str::contains("cuda.h"));

    assert!(!tmp.path().join("hook.gen.cc").exists());
}

// ============================================================================
// hookgen signatures / resolve / symbols
// ============================================================================

#[test]
fn test_signatures_json() {
    let tmp = project(
        &[("cuda.h", "int cuFoo(int x);\nint cuMemAlloc_v2(void **p, size_t n);\n")],
        &[],
    );

    let assert = hookgen()
        .args(["signatures", "--json"])
        .current_dir(tmp.path())
        .assert()
        .success();

    let json: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    let keys: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, ["cuFoo", "cuMemAlloc_v2", "cuMemAlloc"]);
    assert_eq!(json[2]["kind"], "version");
    assert_eq!(json[2]["signature"]["name"], "cuMemAlloc_v2");
    assert_eq!(json[0]["signature"]["params"][0]["type"], "int");
}

#[test]
fn test_signatures_text() {
    let tmp = project(&[("cuda.h", "int cuFoo(int x);\n")], &[]);

    hookgen()
        .arg("signatures")
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("cuFoo  literal  int cuFoo(int x)"));
}

#[test]
fn test_resolve_reports_tier() {
    let tmp = project(&[("cuda.h", "int cuMemcpyHtoDAsync_v2(int n);\n")], &[]);

    hookgen()
        .args(["resolve", "cuMemcpyHtoDAsync_v2_ptsz", "cuMemcpyHtoDAsync_v3"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "cuMemcpyHtoDAsync_v2_ptsz -> cuMemcpyHtoDAsync_v2 (stem)",
        ))
        .stdout(predicate::str::contains(
            "cuMemcpyHtoDAsync_v3 -> cuMemcpyHtoDAsync (version)",
        ));
}

#[test]
fn test_resolve_miss_fails() {
    let tmp = project(&[("cuda.h", "int cuFoo(int x);\n")], &[]);

    hookgen()
        .args(["resolve", "cuBar"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("`cuBar` not generated"));
}

#[test]
fn test_symbols_filters_by_prefix() {
    let tmp = project(&[("cuda.h", "")], &["cuInit", "nvmlInit", "# comment", "cuFoo"]);

    hookgen()
        .arg("symbols")
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout("cuInit\ncuFoo\n");
}

// ============================================================================
// hookgen completions
// ============================================================================

#[test]
fn test_completions_bash() {
    hookgen()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hookgen"));
}
