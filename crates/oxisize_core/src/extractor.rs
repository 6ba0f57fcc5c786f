use log::{debug, trace};
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_parser::{Parser as OxcParser, ParserReturn};
use oxc_span::SourceType;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    error::FixtureError,
    evaluate::StaticEvaluator,
    schema::validate_metadata,
    types::{Fixture, FixtureMetadata, PreparedFixture},
};

/// Reads a fixture, extracts its metadata and writes the stripped module to
/// `out_dir`, mirroring the fixture's path relative to the packages directory.
pub fn prepare_fixture(fixture: &Fixture, out_dir: &Path) -> Result<PreparedFixture, FixtureError> {
    trace!("Preparing fixture: {}", fixture.source_path.display());
    let src = fs::read_to_string(&fixture.source_path)
        .map_err(|e| FixtureError::io(&fixture.source_path, e))?;

    let (code, metadata) = strip_metadata(&src, source_type_for(&fixture.source_path))?;

    let output_path = out_dir.join(&fixture.relative_path);
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).map_err(|e| FixtureError::io(parent, e))?;
    }
    fs::write(&output_path, code).map_err(|e| FixtureError::io(&output_path, e))?;
    debug!("Prepared {} as \"{}\"", output_path.display(), metadata.name);

    Ok(PreparedFixture { output_path, name: metadata.name, threshold: metadata.threshold })
}

/// Evaluates the module's `export default` expression as metadata and returns
/// the source with that statement removed. All other bytes are kept as-is.
pub fn strip_metadata(
    src: &str,
    source_type: SourceType,
) -> Result<(String, FixtureMetadata), FixtureError> {
    let allocator = Allocator::default();
    let ParserReturn { program, errors, panicked, .. } =
        OxcParser::new(&allocator, src, source_type).parse();

    if panicked || !errors.is_empty() {
        return Err(FixtureError::Parse(errors.iter().map(|e| e.to_string()).collect()));
    }

    let Some(decl) = program.body.iter().find_map(|stmt| match stmt {
        Statement::ExportDefaultDeclaration(decl) => Some(decl),
        _ => None,
    }) else {
        return Err(FixtureError::MetadataEvaluation("module has no default export".to_string()));
    };

    let Some(expr) = decl.declaration.as_expression() else {
        return Err(FixtureError::MetadataEvaluation(
            "default export is a declaration, not an expression".to_string(),
        ));
    };

    let value = StaticEvaluator::new(src).with_module_bindings(&program).evaluate(expr)?;
    trace!("Evaluated default export to {:?}", value);
    let metadata = validate_metadata(&value).map_err(FixtureError::MetadataSchema)?;

    let (start, mut end) = (decl.span.start as usize, decl.span.end as usize);
    if src[end..].starts_with(';') {
        end += 1;
    }
    if src[end..].starts_with("\r\n") {
        end += 2;
    } else if src[end..].starts_with('\n') {
        end += 1;
    }

    let mut code = String::with_capacity(src.len() - (end - start));
    code.push_str(&src[..start]);
    code.push_str(&src[end..]);

    Ok((code, metadata))
}

/// Fixtures are always ES modules; the extension only decides JSX/TypeScript.
fn source_type_for(path: &Path) -> SourceType {
    let ext = path.extension().and_then(|e| e.to_str());

    SourceType::default()
        .with_module(true)
        .with_jsx(matches!(ext, Some("tsx") | Some("jsx") | Some("js")))
        .with_typescript(matches!(ext, Some("ts") | Some("tsx") | Some("mts") | Some("cts")))
}

/// Path of a file derived from a prepared fixture, e.g. `Foo.fixture.js` -> `Foo.output.js`.
pub fn sibling_path(fixture_path: &Path, suffix: &str) -> PathBuf {
    let file_name = fixture_path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    let stem = file_name
        .strip_suffix(".fixture.js")
        .or_else(|| file_name.strip_suffix(".js"))
        .unwrap_or(&file_name);
    fixture_path.with_file_name(format!("{}{}", stem, suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn js() -> SourceType {
        SourceType::mjs()
    }

    fn create_fixture(dir: &Path, relative: &str, content: &str) -> Fixture {
        let source_path = dir.join("packages").join(relative);
        fs::create_dir_all(source_path.parent().unwrap()).unwrap();
        fs::write(&source_path, content).expect("Failed to write test file");
        Fixture { source_path, relative_path: PathBuf::from(relative) }
    }

    #[test]
    fn test_strips_default_export() {
        let src = "export const x = 1;\nexport default { name: 'Foo', threshold: 10 };\n";
        let (code, meta) = strip_metadata(src, js()).unwrap();
        assert_eq!(code, "export const x = 1;\n");
        assert_eq!(meta, FixtureMetadata { name: "Foo".into(), threshold: Some(10.0) });
    }

    #[test]
    fn test_stripped_module_has_no_default_export() {
        let src = "import { Text } from '@fluentui/react-text';\n\nconsole.log(Text);\n\nexport default {\n  name: 'Text',\n  threshold: null,\n};\n";
        let (code, _) = strip_metadata(src, js()).unwrap();
        assert!(!code.contains("export default"));

        let allocator = Allocator::default();
        let ret = OxcParser::new(&allocator, &code, js()).parse();
        assert!(ret.errors.is_empty());
        assert!(
            !ret.program.body.iter().any(|s| matches!(s, Statement::ExportDefaultDeclaration(_)))
        );
        assert!(code.contains("console.log(Text);"));
    }

    #[test]
    fn test_default_export_first() {
        let src = "export default { name: 'Bar', threshold: null }\nexport const y = 2;\n";
        let (code, meta) = strip_metadata(src, js()).unwrap();
        assert_eq!(code, "export const y = 2;\n");
        assert_eq!(meta.threshold, None);
    }

    #[test]
    fn test_call_is_not_evaluable() {
        let src = "export default { name: makeName(), threshold: 1 };";
        let err = strip_metadata(src, js()).unwrap_err();
        assert_eq!(err.kind(), "MetadataEvaluationError");
    }

    #[test]
    fn test_imported_reference_is_not_evaluable() {
        let src = "import meta from './meta';\nexport default meta;";
        let err = strip_metadata(src, js()).unwrap_err();
        assert_eq!(err.kind(), "MetadataEvaluationError");
    }

    #[test]
    fn test_constant_expressions_fold() {
        let cases = [
            ("{ name: 'x', threshold: true ? 10 : null }", Some(10.0)),
            ("{ name: 'x', threshold: 1 < 2 ? 5 : 6 }", Some(5.0)),
            ("{ name: 'x', threshold: (0, 10) }", Some(10.0)),
            ("{ name: 'x', threshold: 1 << 3 }", Some(8.0)),
            ("{ name: 'x', threshold: Infinity }", Some(f64::INFINITY)),
            ("{ name: 'x' === 'x' ? 'same' : 'other', threshold: null }", None),
        ];
        for (expr, threshold) in cases {
            let src = format!("export const a = 1;\nexport default {};\n", expr);
            let (code, meta) = strip_metadata(&src, js()).unwrap();
            assert_eq!(code, "export const a = 1;\n");
            assert_eq!(meta.threshold, threshold, "{}", expr);
        }
    }

    #[test]
    fn test_shadowed_global_is_not_evaluable() {
        let src = "const Infinity = 100;\nexport default { name: 'x', threshold: Infinity };\n";
        let err = strip_metadata(src, js()).unwrap_err();
        assert_eq!(err.kind(), "MetadataEvaluationError");
        assert!(err.to_string().contains("shadowed `Infinity`"), "{}", err);
    }

    #[test]
    fn test_missing_default_export() {
        let err = strip_metadata("export const x = 1;", js()).unwrap_err();
        assert_eq!(err.kind(), "MetadataEvaluationError");
        assert!(err.to_string().contains("no default export"));
    }

    #[test]
    fn test_function_declaration_export() {
        let err = strip_metadata("export default function () {}", js()).unwrap_err();
        assert_eq!(err.kind(), "MetadataEvaluationError");
    }

    #[test]
    fn test_schema_violation() {
        let err = strip_metadata("export default { name: 'x' };", js()).unwrap_err();
        assert_eq!(err.kind(), "MetadataSchemaError");
        match err {
            FixtureError::MetadataSchema(violations) => {
                assert_eq!(violations.len(), 1);
                assert_eq!(violations[0].message, "must have required property 'threshold'");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error() {
        let err = strip_metadata("export default {", js()).unwrap_err();
        assert_eq!(err.kind(), "ParseError");
    }

    #[test]
    fn test_jsx_fixture() {
        let src = "import * as React from 'react';\nexport const el = <div />;\nexport default { name: 'Jsx', threshold: null };\n";
        let (code, meta) = strip_metadata(src, source_type_for(Path::new("a.fixture.js"))).unwrap();
        assert_eq!(meta.name, "Jsx");
        assert!(code.contains("<div />"));
    }

    #[test]
    fn test_prepare_writes_mirrored_path() {
        let temp_dir = TempDir::new().unwrap();
        let fixture = create_fixture(
            temp_dir.path(),
            "react-text/bundle-size/Text.fixture.js",
            "export const x = 1;\nexport default { name: 'Text', threshold: 5 };\n",
        );
        let out_dir = temp_dir.path().join("dist");

        let prepared = prepare_fixture(&fixture, &out_dir).unwrap();
        assert_eq!(prepared.output_path, out_dir.join("react-text/bundle-size/Text.fixture.js"));
        assert_eq!(prepared.name, "Text");
        assert_eq!(prepared.threshold, Some(5.0));
        assert_eq!(fs::read_to_string(&prepared.output_path).unwrap(), "export const x = 1;\n");
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let fixture = create_fixture(
            temp_dir.path(),
            "pkg/bundle-size/Foo.fixture.js",
            "// Foo\nexport const x = 1;\n\nexport default { name: 'Foo', threshold: 10 };\n",
        );
        let out_dir = temp_dir.path().join("dist");

        let first = prepare_fixture(&fixture, &out_dir).unwrap();
        let first_code = fs::read(&first.output_path).unwrap();
        let second = prepare_fixture(&fixture, &out_dir).unwrap();
        let second_code = fs::read(&second.output_path).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_code, second_code);
    }

    #[test]
    fn test_prepare_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let fixture = Fixture {
            source_path: temp_dir.path().join("missing.fixture.js"),
            relative_path: PathBuf::from("missing.fixture.js"),
        };
        let err = prepare_fixture(&fixture, &temp_dir.path().join("dist")).unwrap_err();
        assert_eq!(err.kind(), "IOError");
    }

    #[test]
    fn test_sibling_path() {
        let p = Path::new("/dist/pkg/bundle-size/Foo.fixture.js");
        assert_eq!(sibling_path(p, ".output.js"), PathBuf::from("/dist/pkg/bundle-size/Foo.output.js"));
        assert_eq!(sibling_path(p, ".min.js"), PathBuf::from("/dist/pkg/bundle-size/Foo.min.js"));
    }
}
