use log::trace;
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{CompressOptions, MangleOptions, Minifier, MinifierOptions};
use oxc_parser::{Parser as OxcParser, ParserReturn};
use oxc_span::SourceType;
use oxisize_core::FixtureError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinifyMode {
    /// Dead-code elimination only: names, formatting and comments are kept
    Readable,
    /// Compression, name mangling and no comments
    Compact,
}

impl MinifyMode {
    fn minifier_options(self) -> MinifierOptions {
        match self {
            MinifyMode::Readable => {
                MinifierOptions { mangle: None, compress: Some(CompressOptions::default()) }
            }
            MinifyMode::Compact => MinifierOptions {
                mangle: Some(MangleOptions::default()),
                compress: Some(CompressOptions::default()),
            },
        }
    }

    fn codegen_options(self) -> CodegenOptions {
        match self {
            MinifyMode::Readable => CodegenOptions::default(),
            MinifyMode::Compact => CodegenOptions::minify(),
        }
    }
}

/// Minify a bundled script.
pub fn minify(source: &str, mode: MinifyMode) -> Result<String, FixtureError> {
    trace!("Minifying {} bytes ({:?})", source.len(), mode);
    let allocator = Allocator::default();
    let ParserReturn { mut program, errors, panicked, .. } =
        OxcParser::new(&allocator, source, SourceType::cjs()).parse();

    if panicked || !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        return Err(FixtureError::Minify(messages.join("; ")));
    }

    let ret = Minifier::new(mode.minifier_options()).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(mode.codegen_options())
        .with_scoping(ret.scoping)
        .build(&program)
        .code;

    trace!("Minified to {} bytes ({:?})", code.len(), mode);
    Ok(code)
}

/// Both variants of the same bundle, computed concurrently.
pub fn minify_both(source: &str) -> Result<(String, String), FixtureError> {
    let (readable, compact) = rayon::join(
        || minify(source, MinifyMode::Readable),
        || minify(source, MinifyMode::Compact),
    );
    Ok((readable?, compact?))
}
