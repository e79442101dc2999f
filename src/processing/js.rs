//! JS parsing & code generation on top of swc.

use anyhow::{anyhow, bail, Result};
use std::path::Path;
use swc_common::{sync::Lrc, FileName, FilePathMapping, SourceMap, Spanned};
use swc_ecma_ast::{EsVersion, Module};
use swc_ecma_codegen::{text_writer::JsWriter, Emitter};
use swc_ecma_parser::{parse_file_as_module, EsSyntax, Syntax};

/// A parse diagnostic with 1-based source position info.
#[derive(Clone, Debug)]
pub struct ParseDiagnostic {
    pub line: usize,
    pub col: usize,
    pub message: String,
}

/// A fresh source map for one parse/emit session.
pub fn source_map() -> Lrc<SourceMap> {
    Lrc::new(SourceMap::new(FilePathMapping::empty()))
}

/// Parse the file at `path` as an ES module.
///
/// The outer error is an I/O failure; the inner `Err` carries every syntax
/// diagnostic the parser produced, including recovered ones.
pub fn parse_module_file(
    cm: &Lrc<SourceMap>,
    path: &Path,
) -> Result<Result<Module, Vec<ParseDiagnostic>>> {
    let fm = cm
        .load_file(path)
        .map_err(|err| anyhow!("error loading script {:?}: {}", path, err))?;

    let mut recovered = Vec::new();
    let parsed = parse_file_as_module(
        &fm,
        Syntax::Es(EsSyntax::default()),
        EsVersion::latest(),
        None,
        &mut recovered,
    );

    let mut diagnostics: Vec<_> = recovered
        .into_iter()
        .map(|err| diagnostic(cm, err))
        .collect();
    Ok(match parsed {
        Ok(module) if diagnostics.is_empty() => Ok(module),
        Ok(_) => Err(diagnostics),
        Err(err) => {
            diagnostics.push(diagnostic(cm, err));
            Err(diagnostics)
        }
    })
}

/// Parse in-memory source as an ES module, failing on the first diagnostic.
pub fn parse_module_source(cm: &Lrc<SourceMap>, name: &str, source: String) -> Result<Module> {
    let fm = cm.new_source_file(FileName::Custom(name.to_string()).into(), source);
    let mut recovered = Vec::new();
    let parsed = parse_file_as_module(
        &fm,
        Syntax::Es(EsSyntax::default()),
        EsVersion::latest(),
        None,
        &mut recovered,
    );
    match parsed {
        Ok(module) if recovered.is_empty() => Ok(module),
        Ok(_) => {
            let first = diagnostic(cm, recovered.remove(0));
            bail!("{name}:{}:{}: {}", first.line, first.col, first.message);
        }
        Err(err) => {
            let first = diagnostic(cm, err);
            bail!("{name}:{}:{}: {}", first.line, first.col, first.message);
        }
    }
}

fn diagnostic(cm: &Lrc<SourceMap>, err: swc_ecma_parser::error::Error) -> ParseDiagnostic {
    let loc = cm.lookup_char_pos(err.span().lo());
    ParseDiagnostic {
        line: loc.line,
        col: loc.col_display + 1,
        message: err.kind().msg().to_string(),
    }
}

/// Emit a module back to source text.
pub fn emit_module(cm: &Lrc<SourceMap>, module: &Module, minify: bool) -> Result<String> {
    let mut buf = Vec::new();
    {
        let wr = JsWriter::new(cm.clone(), "\n", &mut buf, None);
        let mut emitter = Emitter {
            cfg: swc_ecma_codegen::Config::default().with_minify(minify),
            cm: cm.clone(),
            comments: None,
            wr,
        };
        emitter
            .emit_module(module)
            .map_err(|err| anyhow!("error emitting JS: {}", err))?;
    }
    String::from_utf8(buf).map_err(|err| anyhow!("emitted JS is not valid UTF-8: {}", err))
}
