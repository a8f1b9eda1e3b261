// tests/integration_test.rs

//! Integration tests for Anvil
//!
//! These tests verify end-to-end functionality across modules: a real
//! template tree on disk, a real SQLite install database, and full
//! resolution runs over them.

use anvil::db;
use anvil::flag::{Flag, FlagSet};
use anvil::resolver::{partition, Resolution, ResolveFailure, ResolveParams};
use anvil::FsRepository;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A repository directory with templates/, artifacts/, and a database
struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("templates")).unwrap();
        fs::create_dir_all(dir.path().join("artifacts")).unwrap();
        Self { dir }
    }

    fn db_path(&self) -> String {
        self.dir.path().join("anvil.db").to_str().unwrap().to_string()
    }

    fn write_template(&self, name: &str, body: &str) {
        let path = self.dir.path().join("templates").join(format!("{name}.toml"));
        fs::write(path, body).unwrap();
    }

    fn write_artifact(&self, name: &str, version: &str) {
        let path = self
            .dir
            .path()
            .join("artifacts")
            .join(format!("{name}-{version}.anvil.tar"));
        fs::write(path, b"artifact").unwrap();
    }

    fn open(&self) -> FsRepository {
        let conn = db::init(&self.db_path()).unwrap();
        FsRepository::open(
            &self.dir.path().join("templates"),
            &self.dir.path().join("artifacts"),
            conn,
        )
        .unwrap()
    }
}

fn resolve(store: &FsRepository, roots: &[&str]) -> anvil::resolver::Report {
    let names: Vec<String> = roots.iter().map(|s| s.to_string()).collect();
    Resolution::new(store, ResolveParams::default())
        .run(&names)
        .unwrap()
}

#[test]
fn test_database_lifecycle() {
    let dir = TempDir::new().unwrap();
    let db_path = dir
        .path()
        .join("nested/path/anvil.db")
        .to_str()
        .unwrap()
        .to_string();

    db::init(&db_path).unwrap();
    assert!(Path::new(&db_path).exists(), "init should create parents");

    let conn = db::open(&db_path).unwrap();
    let result: i32 = conn.query_row("SELECT 1", [], |row| row.get(0)).unwrap();
    assert_eq!(result, 1);
}

#[test]
fn test_template_scan_and_resolution() {
    let fixture = Fixture::new();
    fixture.write_template(
        "curl",
        r#"
depends = ["libssl(+asm)", "zlib>=1.2"]

[package]
name = "curl"
version = "8.6"
"#,
    );
    fixture.write_template(
        "libssl",
        r#"
[package]
name = "libssl"
version = "3.2"

[flags]
default = ["-asm"]
"#,
    );
    fixture.write_template(
        "zlib",
        r#"
[package]
name = "zlib"
version = "1.3"
"#,
    );
    fixture.write_artifact("curl", "8.6");
    fixture.write_artifact("libssl", "3.2");
    fixture.write_artifact("zlib", "1.3");

    let store = fixture.open();
    let report = resolve(&store, &["curl"]);

    assert!(report.is_clean(), "failures: {:?}", report.failures);
    let names: Vec<&str> = report.install.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["curl", "libssl", "zlib"]);

    // curl's edge flips libssl's default off to on
    let ssl = report.install.iter().find(|e| e.name == "libssl").unwrap();
    assert_eq!(ssl.flags.get("asm"), Some(true));
}

#[test]
fn test_highest_version_template_wins() {
    let fixture = Fixture::new();
    fixture.write_template(
        "zlib-old",
        r#"
[package]
name = "zlib"
version = "1.2"
"#,
    );
    fixture.write_template(
        "zlib-new",
        r#"
[package]
name = "zlib"
version = "1.3"
"#,
    );
    fixture.write_artifact("zlib", "1.3");

    let store = fixture.open();
    let report = resolve(&store, &["zlib"]);
    assert_eq!(report.install[0].version, "1.3");
}

#[test]
fn test_version_bound_blocks_latest() {
    // Lexicographic comparison: "1.3" >= "2.0" is false
    let fixture = Fixture::new();
    fixture.write_template(
        "app",
        r#"
depends = ["zlib>=2.0"]

[package]
name = "app"
version = "1"
"#,
    );
    fixture.write_template(
        "zlib",
        r#"
[package]
name = "zlib"
version = "1.3"
"#,
    );
    fixture.write_artifact("app", "1");
    fixture.write_artifact("zlib", "1.3");

    let store = fixture.open();
    let report = resolve(&store, &["app"]);
    assert!(report
        .failures
        .iter()
        .any(|f| matches!(f, ResolveFailure::VersionUnsatisfiable { package, .. } if package == "zlib")));
}

#[test]
fn test_install_records_and_idempotence() {
    let fixture = Fixture::new();
    fixture.write_template(
        "zlib",
        r#"
[package]
name = "zlib"
version = "1.3"
"#,
    );
    fixture.write_artifact("zlib", "1.3");

    // First resolution wants zlib installed
    let store = fixture.open();
    let report = resolve(&store, &["zlib"]);
    assert_eq!(report.install.len(), 1);

    // Record the install the way the install command does
    let mut conn = store.into_connection();
    db::register_install(&mut conn, "zlib", "1.3", "/", &FlagSet::new(), &[]).unwrap();
    drop(conn);

    // Second resolution finds it already satisfied
    let conn = db::open(&fixture.db_path()).unwrap();
    let store = FsRepository::open(
        &fixture.dir.path().join("templates"),
        &fixture.dir.path().join("artifacts"),
        conn,
    )
    .unwrap();
    let report = resolve(&store, &["zlib"]);
    assert!(report.is_clean());
    assert!(report.install.is_empty());
    assert!(report.forge.is_empty());
}

#[test]
fn test_installed_dependent_conflict_names_the_dependent() {
    // Installed viewer depends on libpng with +apng; an operator
    // override then asks for libpng with -apng. The conflict must name
    // viewer as a contributor.
    let fixture = Fixture::new();
    fixture.write_template(
        "libpng",
        r#"
[package]
name = "libpng"
version = "1.6.43"
"#,
    );
    fixture.write_artifact("libpng", "1.6.43");

    let mut conn = db::init(&fixture.db_path()).unwrap();
    db::register_install(&mut conn, "libpng", "1.6.40", "/", &FlagSet::new(), &[]).unwrap();
    db::register_install(
        &mut conn,
        "viewer",
        "2.1",
        "/",
        &FlagSet::new(),
        &[("libpng(+apng)".to_string(), "libpng".to_string(), false)],
    )
    .unwrap();
    db::models::FlagOverride::set(&conn, "libpng", &Flag::new("apng", false)).unwrap();

    let store = FsRepository::open(
        &fixture.dir.path().join("templates"),
        &fixture.dir.path().join("artifacts"),
        conn,
    )
    .unwrap();
    let report = resolve(&store, &["libpng"]);

    match report
        .failures
        .iter()
        .find(|f| matches!(f, ResolveFailure::FlagConflict { .. }))
    {
        Some(ResolveFailure::FlagConflict {
            package,
            flag,
            first,
            second,
        }) => {
            assert_eq!(package, "libpng");
            assert_eq!(flag, "apng");
            let contributors = format!("{first} / {second}");
            assert!(
                contributors.contains("viewer (installed)"),
                "conflict should name the installed dependent, got: {contributors}"
            );
        }
        other => panic!("expected FlagConflict, got {other:?}"),
    }
}

#[test]
fn test_bootstrap_forge_plan() {
    // gcc and glibc build-depend on each other; a prebuilt gcc breaks
    // the cycle when forging gcc from source.
    let fixture = Fixture::new();
    fixture.write_template(
        "gcc",
        r#"
build_depends = ["glibc"]

[package]
name = "gcc"
version = "13"
"#,
    );
    fixture.write_template(
        "glibc",
        r#"
build_depends = ["gcc"]

[package]
name = "glibc"
version = "2.39"
"#,
    );
    fixture.write_artifact("gcc", "13");

    let store = fixture.open();
    let params = ResolveParams {
        is_forge: true,
        ..Default::default()
    };
    let report = Resolution::new(&store, params.clone())
        .run(&["gcc".to_string()])
        .unwrap();
    assert!(report.is_clean(), "failures: {:?}", report.failures);

    let forged: Vec<&str> = report.forge.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(forged, vec!["gcc", "glibc"]);

    let plan = partition(&store, &report, &params).unwrap();
    assert!(plan.is_clean(), "failures: {:?}", plan.failures);
    let roots: Vec<&str> = plan.builds.iter().map(|g| g.root.name.as_str()).collect();
    assert_eq!(roots, vec!["gcc"]);
}

#[test]
fn test_bootstrap_without_artifact_reports_chain() {
    let fixture = Fixture::new();
    fixture.write_template(
        "gcc",
        r#"
build_depends = ["glibc"]

[package]
name = "gcc"
version = "13"
"#,
    );
    fixture.write_template(
        "glibc",
        r#"
build_depends = ["gcc"]

[package]
name = "glibc"
version = "2.39"
"#,
    );

    let store = fixture.open();
    let report = resolve(&store, &["gcc"]);
    match &report.failures[..] {
        [ResolveFailure::BootstrapImpossible { package, chain }] => {
            assert_eq!(package, "gcc");
            assert_eq!(chain, &["gcc", "glibc", "gcc"]);
        }
        other => panic!("expected BootstrapImpossible, got {other:?}"),
    }
}

#[test]
fn test_determinism_across_runs() {
    let fixture = Fixture::new();
    fixture.write_template(
        "app",
        r#"
depends = ["zebra", "aardvark"]
build_depends = ["make"]

[package]
name = "app"
version = "1"
"#,
    );
    for (name, version) in [("zebra", "1"), ("aardvark", "2"), ("make", "4.4")] {
        fixture.write_template(
            name,
            &format!("[package]\nname = \"{name}\"\nversion = \"{version}\"\n"),
        );
        fixture.write_artifact(name, version);
    }

    let store = fixture.open();
    let baseline = resolve(&store, &["app"]);
    for _ in 0..3 {
        let again = resolve(&store, &["app"]);
        assert_eq!(baseline.forge, again.forge);
        assert_eq!(baseline.install, again.install);
        assert_eq!(baseline.missing, again.missing);
    }
}

#[test]
fn test_bad_template_is_skipped() {
    let fixture = Fixture::new();
    fixture.write_template("broken", "this is not toml [");
    fixture.write_template(
        "zlib",
        r#"
[package]
name = "zlib"
version = "1.3"
"#,
    );
    fixture.write_artifact("zlib", "1.3");

    let store = fixture.open();
    let report = resolve(&store, &["zlib"]);
    assert!(report.is_clean());
}

#[test]
fn test_nested_template_directories_are_scanned() {
    let fixture = Fixture::new();
    let nested: PathBuf = fixture.dir.path().join("templates/core/compression");
    fs::create_dir_all(&nested).unwrap();
    fs::write(
        nested.join("zlib.toml"),
        "[package]\nname = \"zlib\"\nversion = \"1.3\"\n",
    )
    .unwrap();
    fixture.write_artifact("zlib", "1.3");

    let store = fixture.open();
    let report = resolve(&store, &["zlib"]);
    assert!(report.is_clean());
    assert_eq!(report.install[0].name, "zlib");
}
