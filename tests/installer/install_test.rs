//! Coverage for the install procedure against a real filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use keyplace::installer::{InstallError, InstallOutcome, Installer};

struct Layout {
    _root: tempfile::TempDir,
    base: PathBuf,
}

impl Layout {
    fn new() -> Self {
        let root = tempfile::tempdir().expect("should create temp dir");
        let base = root.path().to_path_buf();
        Self { _root: root, base }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.base.join(name)
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, contents).expect("should write fixture");
        path
    }

    fn destination(&self) -> PathBuf {
        self.base.join("credentials").join("google-credentials.json")
    }
}

fn run(installer: &Installer) -> (Result<InstallOutcome, InstallError>, String) {
    let mut out = Vec::new();
    let result = installer.install(&mut out);
    let text = String::from_utf8(out).expect("status output is utf-8");
    (result, text)
}

#[cfg(unix)]
fn mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .expect("should stat")
        .permissions()
        .mode()
        & 0o777
}

#[test]
fn copies_second_candidate_when_first_is_absent() {
    let layout = Layout::new();
    let absent = layout.path("a.json");
    let present = layout.write("b.json", r#"{"k":1}"#);
    let destination = layout.destination();

    let installer = Installer::new(destination.clone(), vec![absent, present.clone()]);
    let (result, _) = run(&installer);

    let outcome = result.expect("install should succeed");
    assert_eq!(
        outcome,
        InstallOutcome::Installed {
            source: present,
            destination: destination.clone(),
        }
    );
    assert_eq!(
        fs::read_to_string(&destination).expect("should read"),
        r#"{"k":1}"#
    );
    #[cfg(unix)]
    assert_eq!(mode(&destination), 0o600);
}

#[cfg(unix)]
#[test]
fn installed_copy_drops_group_and_other_access() {
    use std::os::unix::fs::PermissionsExt;

    let layout = Layout::new();
    let source = layout.write("sa.json", r#"{"type":"service_account"}"#);
    fs::set_permissions(&source, fs::Permissions::from_mode(0o644)).expect("should chmod");
    let destination = layout.destination();

    let (result, _) = run(&Installer::new(destination.clone(), vec![source.clone()]));
    assert!(result.is_ok());
    assert_eq!(mode(&destination), 0o600);
    assert_eq!(mode(&source), 0o644, "source must not be modified");
}

#[test]
fn existing_destination_is_left_untouched() {
    let layout = Layout::new();
    let destination = layout.destination();
    fs::create_dir_all(destination.parent().expect("has parent")).expect("should create dir");
    fs::write(&destination, r#"{"x":true}"#).expect("should write");
    let candidate = layout.write("other.json", r#"{"k":1}"#);

    let (result, text) = run(&Installer::new(destination.clone(), vec![candidate]));

    assert_eq!(
        result.expect("install should succeed"),
        InstallOutcome::AlreadyInstalled {
            destination: destination.clone()
        }
    );
    assert_eq!(
        fs::read_to_string(&destination).expect("should read"),
        r#"{"x":true}"#
    );
    assert!(text.contains("already installed"));
}

#[test]
fn existing_invalid_destination_is_not_revalidated() {
    let layout = Layout::new();
    let destination = layout.write("installed.json", "not json");

    let (result, _) = run(&Installer::new(destination.clone(), Vec::new()));

    assert!(matches!(
        result,
        Ok(InstallOutcome::AlreadyInstalled { .. })
    ));
    assert_eq!(
        fs::read_to_string(&destination).expect("should read"),
        "not json"
    );
}

#[test]
fn no_candidate_fails_without_creating_destination() {
    let layout = Layout::new();
    let destination = layout.destination();
    let searched = vec![layout.path("a.json"), layout.path("b.json")];

    let (result, text) = run(&Installer::new(destination.clone(), searched.clone()));

    match result.expect_err("install should fail") {
        InstallError::NotFound {
            destination: reported,
            searched: reported_searched,
        } => {
            assert_eq!(reported, destination);
            assert_eq!(reported_searched, searched);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!destination.exists());
    assert!(!layout.path("credentials").exists());
    assert!(text.contains(&destination.display().to_string()));
}

#[test]
fn earlier_candidate_wins() {
    let layout = Layout::new();
    let first = layout.write("first.json", r#"{"order":1}"#);
    let second = layout.write("second.json", r#"{"order":2}"#);
    let destination = layout.destination();

    let (result, _) = run(&Installer::new(destination.clone(), vec![first, second]));

    assert!(result.is_ok());
    assert_eq!(
        fs::read_to_string(&destination).expect("should read"),
        r#"{"order":1}"#
    );
}

#[test]
fn invalid_copy_fails_but_stays_in_place() {
    let layout = Layout::new();
    let source = layout.write("broken.json", "not json");
    let destination = layout.destination();

    let (result, text) = run(&Installer::new(destination.clone(), vec![source]));

    match result.expect_err("install should fail") {
        InstallError::Invalid { path, .. } => assert_eq!(path, destination),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        fs::read_to_string(&destination).expect("copy should exist"),
        "not json"
    );
    assert!(text.contains("Copied"));
    assert!(text.contains("NOT valid JSON"));
}

#[test]
fn json_array_is_rejected() {
    let layout = Layout::new();
    let source = layout.write("array.json", "[1, 2, 3]");

    let (result, _) = run(&Installer::new(layout.destination(), vec![source]));

    assert!(matches!(result, Err(InstallError::Invalid { .. })));
}

#[test]
fn directory_candidate_is_skipped() {
    let layout = Layout::new();
    let as_dir = layout.path("dir.json");
    fs::create_dir(&as_dir).expect("should create dir");
    let file = layout.write("file.json", r#"{"k":"v"}"#);
    let destination = layout.destination();

    let (result, _) = run(&Installer::new(destination.clone(), vec![as_dir, file.clone()]));

    match result.expect("install should succeed") {
        InstallOutcome::Installed { source, .. } => assert_eq!(source, file),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn directory_at_destination_is_not_an_install() {
    let layout = Layout::new();
    let destination = layout.destination();
    fs::create_dir_all(&destination).expect("should create dir");
    let candidate = layout.write("sa.json", r#"{"k":1}"#);

    let (result, text) = run(&Installer::new(destination.clone(), vec![candidate]));

    match result.expect_err("install should fail") {
        InstallError::NotAFile { path } => assert_eq!(path, destination),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(destination.is_dir());
    assert!(text.contains("remove it"));
    assert!(!text.contains("already installed"));
}

#[test]
fn parent_occupied_by_file_reports_io_error() {
    let layout = Layout::new();
    let blocker = layout.write("credentials", "not a directory");
    let destination = layout.destination();
    let candidate = layout.write("sa.json", r#"{"k":1}"#);

    let (result, _) = run(&Installer::new(destination.clone(), vec![candidate]));

    match result.expect_err("install should fail") {
        InstallError::Io { path, .. } => assert_eq!(path, blocker),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!destination.is_file());
    assert_eq!(
        fs::read_to_string(&blocker).expect("should read"),
        "not a directory"
    );
}

#[test]
fn no_temp_files_left_beside_installed_key() {
    let layout = Layout::new();
    let source = layout.write("sa.json", r#"{"k":1}"#);
    let destination = layout.destination();

    let (result, _) = run(&Installer::new(destination.clone(), vec![source]));
    assert!(result.is_ok());

    let entries: Vec<_> = fs::read_dir(destination.parent().expect("has parent"))
        .expect("should list")
        .map(|entry| entry.expect("should read entry").file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("google-credentials.json")]);
}
