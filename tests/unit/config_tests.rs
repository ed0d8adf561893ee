use std::time::Duration;

use arcade_launcher::config::{ControlSettings, LauncherConfig};

fn minimal_toml(root: &str) -> String {
    format!("games_root = '{root}'\n")
}

fn full_toml(root: &str, artifacts: &str) -> String {
    format!(
        r#"
games_root = '{root}'
entry_points = ["run.sh", "main.sh"]
interpreter = "sh"
interpreter_args = ["-e"]
excluded_dirs = ["tools"]
artifact_dir = '{artifacts}'
http_port = 9100
bind_address = "0.0.0.0"

[control]
tick_rate_hz = 30
help_seconds = 5
grace_ticks = 10
terminate_key = "Esc"
help_key = "h"
"#
    )
}

#[test]
fn minimal_config_uses_defaults() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().to_str().expect("utf8 path");

    let config = LauncherConfig::from_toml_str(&minimal_toml(root)).expect("config parses");

    assert_eq!(config.entry_points, vec!["main.py", "game.py", "run.py"]);
    assert_eq!(config.interpreter, "python3");
    assert_eq!(config.http_port, 8000);
    assert_eq!(config.bind_address.to_string(), "127.0.0.1");
    assert_eq!(config.control, ControlSettings::default());
    assert_eq!(config.control.terminate_key, "F10");
    assert_eq!(config.control.help_key, "F1");
    assert_eq!(
        config.games_root,
        temp.path().canonicalize().expect("canonicalize")
    );
}

#[test]
fn full_config_parses_every_field() {
    let temp = tempfile::tempdir().expect("tempdir");
    let artifacts = tempfile::tempdir().expect("tempdir");
    let toml = full_toml(
        temp.path().to_str().expect("utf8"),
        artifacts.path().to_str().expect("utf8"),
    );

    let config = LauncherConfig::from_toml_str(&toml).expect("config parses");

    assert_eq!(config.entry_points, vec!["run.sh", "main.sh"]);
    assert_eq!(config.interpreter_args, vec!["-e"]);
    assert_eq!(config.excluded_dirs, vec!["tools"]);
    assert_eq!(config.artifact_dir(), artifacts.path());
    assert_eq!(config.http_port, 9100);
    assert_eq!(config.control.tick_rate_hz, 30);
    assert_eq!(config.control.help_ticks(), 150);
    assert_eq!(config.control.grace_ticks, 10);
}

#[test]
fn default_help_duration_is_three_seconds_of_ticks() {
    assert_eq!(ControlSettings::default().help_ticks(), 180);
}

#[test]
fn tick_interval_matches_rate() {
    let interval = ControlSettings::default().tick_interval();
    assert!(interval > Duration::from_millis(16));
    assert!(interval < Duration::from_millis(17));
}

#[test]
fn artifact_dir_defaults_to_temp_dir() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = LauncherConfig::default_for(temp.path()).expect("defaults");
    assert_eq!(config.artifact_dir(), std::env::temp_dir());
}

#[test]
fn rejects_missing_games_root() {
    let temp = tempfile::tempdir().expect("tempdir");
    let missing = temp.path().join("nope");

    let err = LauncherConfig::from_toml_str(&minimal_toml(missing.to_str().expect("utf8")))
        .expect_err("missing root rejected");
    assert!(err.to_string().contains("games_root invalid"));
}

#[test]
fn rejects_zero_tick_rate() {
    let temp = tempfile::tempdir().expect("tempdir");
    let toml = format!(
        "{}\n[control]\ntick_rate_hz = 0\n",
        minimal_toml(temp.path().to_str().expect("utf8"))
    );

    let err = LauncherConfig::from_toml_str(&toml).expect_err("zero rate rejected");
    assert!(err.to_string().contains("tick_rate_hz"));
}

#[test]
fn rejects_identical_hotkeys() {
    let temp = tempfile::tempdir().expect("tempdir");
    let toml = format!(
        "{}\n[control]\nterminate_key = \"F2\"\nhelp_key = \"f2\"\n",
        minimal_toml(temp.path().to_str().expect("utf8"))
    );

    let err = LauncherConfig::from_toml_str(&toml).expect_err("same keys rejected");
    assert!(err.to_string().contains("must differ"));
}

#[test]
fn rejects_unknown_hotkey() {
    let temp = tempfile::tempdir().expect("tempdir");
    let toml = format!(
        "{}\n[control]\nterminate_key = \"PrintScreen\"\n",
        minimal_toml(temp.path().to_str().expect("utf8"))
    );

    assert!(LauncherConfig::from_toml_str(&toml).is_err());
}

#[test]
fn rejects_entry_point_with_path_separator() {
    let temp = tempfile::tempdir().expect("tempdir");
    let toml = format!(
        "games_root = '{}'\nentry_points = [\"../main.py\"]\n",
        temp.path().to_str().expect("utf8")
    );

    let err = LauncherConfig::from_toml_str(&toml).expect_err("separator rejected");
    assert!(err.to_string().contains("plain file names"));
}

#[test]
fn rejects_empty_entry_points() {
    let temp = tempfile::tempdir().expect("tempdir");
    let toml = format!(
        "games_root = '{}'\nentry_points = []\n",
        temp.path().to_str().expect("utf8")
    );

    assert!(LauncherConfig::from_toml_str(&toml).is_err());
}

#[test]
fn load_from_path_reads_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("launcher.toml");
    std::fs::write(&path, minimal_toml(temp.path().to_str().expect("utf8"))).expect("write");

    let config = LauncherConfig::load_from_path(&path).expect("loads");
    assert_eq!(config.http_port, 8000);
}
