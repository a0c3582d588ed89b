pub mod ast;
pub mod blocks;
pub mod error;
pub mod parser;
pub mod preprocess;
pub mod region;
pub mod tokenizer;

pub use ast::*;
pub use error::{Location, ParseError, ParseResult};
pub use parser::{parse, Parser};
pub use preprocess::{extract_metadata, strip};
pub use tokenizer::{tokenize, Token};

#[cfg(feature = "pretty-errors")]
pub use error::{format_error, format_message};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stripped_matches_raw_body() {
        let raw = "---\ntitle: Doc\n---\nimport X from 'x'\n\n# Title\n\nBody text.";
        let from_raw = parse(raw).unwrap();
        let from_stripped = parse(&strip(raw)).unwrap();

        assert_eq!(from_raw.blocks, from_stripped.blocks);
        assert!(from_stripped.metadata.is_none());
    }
}
