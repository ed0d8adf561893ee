//! Unit tests for session manifest generation and loading.

use std::fs;
use std::path::{Path, PathBuf};

use arcade_launcher::config::ControlSettings;
use arcade_launcher::models::session::{SessionDescriptor, TargetCommand};
use arcade_launcher::orchestrator::artifact::{
    generate, SessionManifest, WrapperArtifact, MANIFEST_PREFIX, MANIFEST_SUFFIX, MANIFEST_VERSION,
};
use arcade_launcher::AppError;

fn manifest_for(game_dir: &Path, display_name: &str) -> SessionManifest {
    let executable = game_dir.join("main.py");
    SessionManifest::new(
        SessionDescriptor {
            id: display_name.to_lowercase().replace(' ', "-"),
            display_name: display_name.to_owned(),
            executable_path: executable.clone(),
            working_directory: game_dir.to_path_buf(),
        },
        TargetCommand {
            program: PathBuf::from("python3"),
            args: vec![executable],
        },
        ControlSettings::default(),
    )
}

#[test]
fn generated_manifest_loads_back_unchanged() {
    let dir = tempfile::tempdir().expect("tempdir");
    let manifest = manifest_for(Path::new("/games/Spacewar"), "Spacewar");

    let artifact = generate(dir.path(), &manifest).expect("generate");

    assert!(artifact.exists());
    assert!(artifact.is_ephemeral());
    assert_eq!(artifact.load().expect("load"), manifest);
}

#[test]
fn manifest_file_name_carries_prefix_and_session_id() {
    let dir = tempfile::tempdir().expect("tempdir");
    let manifest = manifest_for(Path::new("/games/Pong"), "Pong");

    let artifact = generate(dir.path(), &manifest).expect("generate");
    let name = artifact
        .path()
        .file_name()
        .and_then(|n| n.to_str())
        .expect("utf-8 name");

    assert!(name.starts_with(MANIFEST_PREFIX));
    assert!(name.contains(&manifest.session_id));
    assert!(name.ends_with(".json"));
}

#[test]
fn each_manifest_gets_a_distinct_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let first = generate(dir.path(), &manifest_for(Path::new("/g/A"), "A")).expect("first");
    let second = generate(dir.path(), &manifest_for(Path::new("/g/A"), "A")).expect("second");

    assert_ne!(first.path(), second.path());
}

#[test]
fn hostile_names_are_stored_as_plain_data() {
    let dir = tempfile::tempdir().expect("tempdir");
    let hostile = "Evil\"; rm -rf / #'$(touch pwned)`id`";
    let manifest = manifest_for(Path::new("/games/evil"), hostile);

    let artifact = generate(dir.path(), &manifest).expect("generate");
    let loaded = artifact.load().expect("load");

    assert_eq!(loaded.descriptor.display_name, hostile);
    assert!(!dir.path().join("pwned").exists());
}

#[test]
fn creates_missing_artifact_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let nested = dir.path().join("a").join("b");

    let artifact = generate(&nested, &manifest_for(Path::new("/g/A"), "A")).expect("generate");
    assert!(artifact.path().starts_with(&nested));
}

#[test]
fn unwritable_location_is_generation_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "").expect("write");

    let err = generate(&blocker, &manifest_for(Path::new("/g/A"), "A")).expect_err("fails");
    assert!(matches!(err, AppError::Generation(_)));
}

#[test]
fn remove_reports_whether_anything_was_deleted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let artifact = generate(dir.path(), &manifest_for(Path::new("/g/A"), "A")).expect("generate");

    assert!(artifact.remove().expect("first remove"));
    assert!(!artifact.exists());
    assert!(!artifact.remove().expect("second remove"));
}

#[test]
fn unsupported_version_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut manifest = manifest_for(Path::new("/g/A"), "A");
    manifest.version = MANIFEST_VERSION + 1;
    let path = dir.path().join("future.json");
    fs::write(&path, serde_json::to_vec(&manifest).expect("json")).expect("write");

    let err = WrapperArtifact::claim(&path, dir.path()).load().expect_err("rejected");
    assert!(matches!(err, AppError::Generation(_)));
    assert!(err.to_string().contains("unsupported manifest version"));
}

#[test]
fn garbage_manifest_is_generation_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("garbage.json");
    fs::write(&path, "#!/bin/sh\necho not json\n").expect("write");

    assert!(matches!(
        WrapperArtifact::claim(&path, dir.path()).load(),
        Err(AppError::Generation(_))
    ));
}

#[test]
fn missing_manifest_is_generation_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = WrapperArtifact::claim(dir.path().join("absent.json"), dir.path())
        .load()
        .expect_err("missing");
    assert!(err.to_string().contains("cannot read manifest"));
}

#[cfg(unix)]
#[test]
fn manifest_is_private_to_the_owner() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().expect("tempdir");
    let artifact = generate(dir.path(), &manifest_for(Path::new("/g/A"), "A")).expect("generate");
    let mode = fs::metadata(artifact.path()).expect("metadata").permissions().mode();

    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn claimed_manifest_in_artifact_dir_is_ephemeral() {
    let dir = tempfile::tempdir().expect("tempdir");
    let generated = generate(dir.path(), &manifest_for(Path::new("/g/A"), "A")).expect("generate");

    let claimed = WrapperArtifact::claim(generated.path(), dir.path());
    assert!(claimed.is_ephemeral());
}

#[test]
fn foreign_file_names_are_never_ephemeral() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bare = format!("{MANIFEST_PREFIX}{MANIFEST_SUFFIX}");
    for name in [
        "thesis.txt",
        "arcade-session-notes.txt",
        "session-1.json",
        bare.as_str(),
    ] {
        let path = dir.path().join(name);
        fs::write(&path, "years of work").expect("write");
        assert!(
            !WrapperArtifact::claim(&path, dir.path()).is_ephemeral(),
            "{name} must not be claimed"
        );
    }
}

#[test]
fn manifest_outside_artifact_dir_is_not_ephemeral() {
    let artifacts = tempfile::tempdir().expect("tempdir");
    let elsewhere = tempfile::tempdir().expect("tempdir");
    let path = elsewhere.path().join(format!("{MANIFEST_PREFIX}x{MANIFEST_SUFFIX}"));
    fs::write(&path, "{}").expect("write");

    assert!(!WrapperArtifact::claim(&path, artifacts.path()).is_ephemeral());
}

#[cfg(unix)]
#[test]
fn symlink_into_artifact_dir_is_not_ephemeral() {
    let artifacts = tempfile::tempdir().expect("tempdir");
    let elsewhere = tempfile::tempdir().expect("tempdir");
    let target = elsewhere.path().join("thesis.txt");
    fs::write(&target, "years of work").expect("write");
    let link = artifacts.path().join(format!("{MANIFEST_PREFIX}link{MANIFEST_SUFFIX}"));
    std::os::unix::fs::symlink(&target, &link).expect("symlink");

    assert!(!WrapperArtifact::claim(&link, artifacts.path()).is_ephemeral());
}
