//! Output minification for release builds.

use super::js;
use anyhow::Result;
use swc_common::{Globals, Mark, GLOBALS};
use swc_ecma_ast::Program;
use swc_ecma_minifier::optimize;
use swc_ecma_minifier::option::{CompressOptions, ExtraOptions, MangleOptions, MinifyOptions};
use swc_ecma_transforms_base::fixer::fixer;
use swc_ecma_transforms_base::resolver;
use swc_ecma_visit::VisitMutWith;

/// Perform JS minification.
///
/// Compression mirrors the settings the bundle was historically shipped with:
/// conditionals, comparisons, booleans, loops, join_vars and drop_console.
pub fn minify_js(name: &str, source: &str) -> Result<String> {
    let cm = js::source_map();
    GLOBALS.set(&Globals::new(), || {
        let mut module = js::parse_module_source(&cm, name, source.to_string())?;

        let unresolved_mark = Mark::new();
        let top_level_mark = Mark::new();
        module.visit_mut_with(&mut resolver(unresolved_mark, top_level_mark, false));

        let options = MinifyOptions {
            compress: Some(CompressOptions {
                conditionals: true,
                comparisons: true,
                bools: true,
                loops: true,
                join_vars: true,
                drop_console: true,
                ..Default::default()
            }),
            mangle: Some(MangleOptions {
                top_level: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut program = optimize(
            Program::Module(module),
            cm.clone(),
            None,
            None,
            &options,
            &ExtraOptions {
                unresolved_mark,
                top_level_mark,
                mangle_name_cache: None,
            },
        );
        program.visit_mut_with(&mut fixer(None));

        js::emit_module(&cm, &program.expect_module(), true)
    })
}

/// Perform HTML minification.
pub fn minify_html(raw: &[u8]) -> Vec<u8> {
    let mut cfg = minify_html::Cfg::default();
    cfg.minify_css = true;
    minify_html::minify(raw, &cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minify_js_strips_console_and_whitespace() -> Result<()> {
        let out = minify_js(
            "test.js",
            "function greet(name) {\n  console.log('hi');\n  return 'hello ' + name;\n}\ngreet('world');\n",
        )?;
        assert!(!out.contains("console.log"), "drop_console should apply");
        assert!(!out.contains('\n') || out.lines().count() <= 1);
        Ok(())
    }

    #[test]
    fn minify_html_collapses_whitespace() {
        let out = minify_html(b"<html>\n  <body>\n    <p>hi   there</p>\n  </body>\n</html>\n");
        let text = String::from_utf8(out).expect("minified HTML is UTF-8");
        assert!(text.len() < 50, "expected collapsed output, got {text:?}");
        assert!(text.contains("hi there"));
    }

    #[test]
    fn err_minify_invalid_js() {
        let res = minify_js("bad.js", "function ( {");
        assert!(res.is_err(), "expected syntax error to propagate");
    }
}
