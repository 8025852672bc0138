//! Integration tests for the `mb` binary.
//!
//! Each test runs against a temporary vault with `HOME` pointed inside it,
//! so no global configuration leaks in.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test Fixtures
// =============================================================================

struct Vault {
    dir: TempDir,
}

impl Vault {
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, name: &str, contents: &str) {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path().join(name)).unwrap()
    }

    fn mb(&self) -> Command {
        let mut cmd = Command::cargo_bin("mb").unwrap();
        cmd.env("HOME", self.path())
            .env_remove("METABIND_CONFIG")
            .env_remove("XDG_CONFIG_HOME")
            .env_remove("MB_LOG")
            .env_remove("RUST_LOG")
            .arg("--vault")
            .arg(self.path());
        cmd
    }
}

const NOTE: &str = "+++\ntitle = \"A\"\ntags = [\"x\", \"y\"]\n+++\n# A\n";

// =============================================================================
// parse
// =============================================================================

mod parse {
    use super::*;

    #[test]
    fn prints_canonical_form() {
        Vault::new()
            .mb()
            .args(["parse", "frontmatter^notes/a.md#tags[0]"])
            .assert()
            .success()
            .stdout("frontmatter^notes/a.md#tags[0]\n");
    }

    #[test]
    fn relative_to_file() {
        Vault::new()
            .mb()
            .args(["parse", "title", "--file", "notes/a.md"])
            .assert()
            .success()
            .stdout("frontmatter^notes/a.md#title\n");
    }

    #[test]
    fn relative_to_scope() {
        Vault::new()
            .mb()
            .args(["parse", "status", "--scope", "memory^#", "--file", "a.md"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("memory^"))
            .stdout(predicate::str::contains("#status"));
    }

    #[test]
    fn json_output() {
        Vault::new()
            .mb()
            .args(["parse", "frontmatter^a.md#tags[0]", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"storage_type\": \"frontmatter\""))
            .stdout(predicate::str::contains("\"array\": 0"))
            .stdout(predicate::str::contains("\"canonical\": \"frontmatter^a.md#tags[0]\""));
    }

    #[test]
    fn bad_index_fails_with_excerpt() {
        Vault::new()
            .mb()
            .args(["parse", "tags[x]"])
            .assert()
            .code(1)
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains("tags[x]"))
            .stderr(predicate::str::contains("error: invalid bind target"));
    }

    #[test]
    fn deprecated_type_warns() {
        Vault::new()
            .mb()
            .args(["parse", "globalMemory^#theme"])
            .assert()
            .success()
            .stdout("global_memory^global#theme\n")
            .stderr(predicate::str::contains("warning"));
    }
}

// =============================================================================
// check
// =============================================================================

mod check {
    use super::*;

    #[test]
    fn valid_document() {
        let vault = Vault::new();
        vault.write(
            "a.md",
            "# A\nDone: `INPUT[toggle:done]`\n\nTotal: `VIEW[{price} * {count}]`\n",
        );
        vault
            .mb()
            .args(["check", "a.md"])
            .assert()
            .success()
            .stdout(predicate::str::contains("a.md:2: ok input field"))
            .stdout(predicate::str::contains("a.md:4: ok view field"))
            .stdout(predicate::str::contains("2 declaration(s), 0 with errors"));
    }

    #[test]
    fn invalid_declaration_fails() {
        let vault = Vault::new();
        vault.write("a.md", "`INPUT[toggle:done]`\n`VIEW[{a}][chart]`\n");
        vault
            .mb()
            .args(["check", "a.md"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("a.md:2: invalid view field"));
    }

    #[test]
    fn missing_file_fails() {
        Vault::new()
            .mb()
            .args(["check", "nope.md"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("failed to read"));
    }
}

// =============================================================================
// get / set
// =============================================================================

mod values {
    use super::*;

    #[test]
    fn get_prints_json() {
        let vault = Vault::new();
        vault.write("a.md", NOTE);
        vault
            .mb()
            .args(["get", "a.md", "tags[1]"])
            .assert()
            .success()
            .stdout("\"y\"\n");
    }

    #[test]
    fn get_missing_is_null() {
        let vault = Vault::new();
        vault.write("a.md", NOTE);
        vault
            .mb()
            .args(["get", "a.md", "rating"])
            .assert()
            .success()
            .stdout("null\n");
    }

    #[test]
    fn set_persists_and_keeps_body() {
        let vault = Vault::new();
        vault.write("a.md", NOTE);
        vault
            .mb()
            .args(["set", "a.md", "done", "true"])
            .assert()
            .success()
            .stdout(predicate::str::contains("frontmatter^a.md#done = true"));

        let contents = vault.read("a.md");
        assert!(contents.contains("done = true"));
        assert!(contents.contains("title = \"A\""));
        assert!(contents.ends_with("+++\n# A\n"));

        vault
            .mb()
            .args(["get", "a.md", "done"])
            .assert()
            .success()
            .stdout("true\n");
    }

    #[test]
    fn set_keeps_yaml_frontmatter() {
        let vault = Vault::new();
        vault.write("y.md", "---\ntitle: A\n---\nBody\n");
        vault
            .mb()
            .args(["set", "y.md", "title", "B"])
            .assert()
            .success();
        assert_eq!(vault.read("y.md"), "---\ntitle: B\n---\nBody\n");
    }

    #[test]
    fn set_other_document() {
        let vault = Vault::new();
        vault.write("a.md", NOTE);
        vault.write("notes/b.md", "+++\n+++\n");
        vault
            .mb()
            .args(["-q", "set", "a.md", "frontmatter^notes/b.md#rating", "4.5"])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());
        assert!(vault.read("notes/b.md").contains("rating = 4.5"));
    }

    #[test]
    fn set_missing_document_fails() {
        let vault = Vault::new();
        vault
            .mb()
            .args(["set", "missing.md", "x", "1"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("missing.md"));
    }

    #[test]
    fn path_outside_vault_rejected() {
        let vault = Vault::new();
        vault
            .mb()
            .args(["get", "../a.md", "title"])
            .assert()
            .failure();
    }
}

// =============================================================================
// watch
// =============================================================================

mod watch {
    use super::*;

    #[test]
    fn prints_current_value_and_stops() {
        let vault = Vault::new();
        vault.write("a.md", NOTE);
        vault.write(".metabind/config.toml", "cycle_interval_ms = 10\n");
        vault
            .mb()
            .args(["watch", "a.md", "title", "--cycles", "3"])
            .timeout(std::time::Duration::from_secs(30))
            .assert()
            .success()
            .stdout("\"A\"\n");
    }
}

// =============================================================================
// misc
// =============================================================================

#[test]
fn completion_bash() {
    Vault::new()
        .mb()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_mb"));
}

#[test]
fn version_flag_works() {
    Command::cargo_bin("mb")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mb"));
}
