//! Loading designs from files

use relab_ast::{AstError, Expr, Program, TimeUnit, TimeValue};
use std::fs;
use tempfile::TempDir;

const DESIGN_TOML: &str = r#"
main = "Blink"

[[reactor]]
name = "Blink"

[[reactor.parameter]]
name = "period"
default = { time = { magnitude = 500, unit = "msec" } }

[[reactor.timer]]
name = "toggle"
offset = { int = 0 }
period = { param_ref = "period" }

[[reactor.output]]
name = "led"
ty = { base = "bool" }
"#;

#[test]
fn test_from_path_toml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blink.toml");
    fs::write(&path, DESIGN_TOML).unwrap();

    let program = Program::from_path(&path).unwrap();
    let blink = program.reactor("Blink").unwrap();
    assert_eq!(
        blink.parameters[0].default,
        Expr::Time(TimeValue::new(500, TimeUnit::Msec))
    );
    assert_eq!(blink.timers[0].offset, Some(Expr::Int(0)));
    assert_eq!(blink.outputs[0].ty.as_ref().unwrap().base, "bool");
}

#[test]
fn test_from_path_json_matches_toml() {
    let dir = TempDir::new().unwrap();
    let from_toml = Program::from_toml_str(DESIGN_TOML).unwrap();

    let path = dir.path().join("blink.json");
    fs::write(&path, serde_json::to_string_pretty(&from_toml).unwrap()).unwrap();

    let from_json = Program::from_path(&path).unwrap();
    assert_eq!(from_json, from_toml);
}

#[test]
fn test_from_path_errors() {
    let dir = TempDir::new().unwrap();

    let path = dir.path().join("blink.lf");
    fs::write(&path, "main reactor Blink {}").unwrap();
    assert!(matches!(
        Program::from_path(&path),
        Err(AstError::UnsupportedFormat(ext)) if ext == "lf"
    ));

    assert!(matches!(
        Program::from_path(dir.path().join("missing.toml")),
        Err(AstError::Io(_))
    ));
}
