//
//  mod.rs
//  RouteLens
//

pub mod helpers;
pub mod language;

pub use language::SupportedLanguage;

use std::path::Path;

use tree_sitter::{Parser, Tree};

use crate::error::{Result, RouteLensError};

/// Parse source text with the grammar for `lang`.
///
/// tree-sitter recovers from most syntax errors, so a returned tree may still
/// contain `ERROR` nodes. Callers decide how much damage they tolerate.
pub fn parse_source(lang: SupportedLanguage, source: &str, path: &Path) -> Result<Tree> {
    let mut parser = Parser::new();
    let ts_lang = lang.tree_sitter_language();
    parser
        .set_language(&ts_lang)
        .map_err(|e| RouteLensError::ParserInit(path.to_path_buf(), e.to_string()))?;

    parser
        .parse(source, None)
        .ok_or_else(|| RouteLensError::UnparsableSource {
            path: path.to_path_buf(),
            reason: "parser produced no tree".to_string(),
        })
}

/// Parse with no file context. Used by the text-only entry points.
pub fn parse_text(lang: SupportedLanguage, source: &str) -> Option<Tree> {
    parse_source(lang, source, Path::new("<memory>")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_js_and_ts() {
        let js = parse_text(SupportedLanguage::JavaScript, "const a = () => 1;").unwrap();
        assert!(!js.root_node().has_error());

        let ts = parse_text(
            SupportedLanguage::TypeScript,
            "export const h = async (req: Request): Promise<void> => {};",
        )
        .unwrap();
        assert!(!ts.root_node().has_error());
    }

    #[test]
    fn test_parse_recovers_from_errors() {
        let tree = parse_text(SupportedLanguage::JavaScript, "function (( {").unwrap();
        assert!(tree.root_node().has_error());
    }
}
