use crate::config::models::*;

#[test]
fn src_accepts_single_pattern() {
    let spec: AssetSpec =
        serde_json::from_str(r#"{"src": "src/*.html", "dest": "dist"}"#).expect("valid spec");
    assert_eq!(spec.src.patterns(), ["src/*.html".to_string()]);
}

#[test]
fn src_accepts_pattern_array() {
    let spec: AssetSpec = serde_json::from_str(
        r#"{"src": ["src/vendor.js", "src/scripts/**/*.js"], "dest": "dist/js"}"#,
    )
    .expect("valid spec");
    assert_eq!(
        spec.src.patterns(),
        [
            "src/vendor.js".to_string(),
            "src/scripts/**/*.js".to_string()
        ]
    );
}

#[test]
fn missing_categories_fall_back_to_defaults() {
    let cfg: Configuration =
        serde_json::from_str(r#"{"styles": {"src": "a.scss", "dest": "out/css"}}"#)
            .expect("valid config");
    assert_eq!(cfg.styles.src.patterns(), ["a.scss".to_string()]);
    assert_eq!(cfg.styles.dest, std::path::PathBuf::from("out/css"));
    assert_eq!(cfg.html, Configuration::default().html);
    assert!(cfg.lint.globals.is_empty());
}

#[test]
fn lint_globals_extend_allowlist() {
    let cfg: Configuration = serde_json::from_str(r#"{"lint": {"globals": ["angular"]}}"#)
        .expect("valid config");
    assert_eq!(cfg.lint.globals, ["angular".to_string()]);
}

#[test]
fn err_malformed_category() {
    let res = serde_json::from_str::<Configuration>(r#"{"html": {"dest": "dist"}}"#);
    assert!(res.is_err(), "expected missing `src` field to error");
}
