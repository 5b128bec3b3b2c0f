//! Peephole optimization over the emitted token stream.
//!
//! Rules run once each, in table order. A rule replaces every
//! non-overlapping occurrence of its pattern, scanning left to right,
//! except `TRUE VERIFY` which removes one occurrence per run and is listed
//! three times.

use lazy_static::lazy_static;
use tracing::debug;

use crate::bytecode::Token;

#[derive(Debug)]
struct Rule {
    pattern: Vec<Token>,
    replacement: Vec<Token>,
    first_only: bool,
}

impl Rule {
    fn new(pattern: &str, replacement: &str) -> Self {
        Self {
            pattern: Token::parse_all(pattern),
            replacement: Token::parse_all(replacement),
            first_only: false,
        }
    }

    fn first_only(mut self) -> Self {
        self.first_only = true;
        self
    }

    fn apply(&self, tokens: Vec<Token>) -> (Vec<Token>, usize) {
        let width = self.pattern.len();
        let mut out = Vec::with_capacity(tokens.len());
        let mut hits = 0;
        let mut i = 0;

        while i < tokens.len() {
            let allowed = !self.first_only || hits == 0;
            if allowed && tokens[i..].starts_with(&self.pattern) {
                out.extend(self.replacement.iter().cloned());
                hits += 1;
                i += width;
            } else {
                out.push(tokens[i].clone());
                i += 1;
            }
        }
        (out, hits)
    }
}

lazy_static! {
    static ref RULES: Vec<Rule> = vec![
        Rule::new("0 ROLL", ""),
        Rule::new("TRUE VERIFY", "").first_only(),
        Rule::new("TRUE VERIFY", "").first_only(),
        Rule::new("TRUE VERIFY", "").first_only(),
        Rule::new("1 ROLL", "SWAP"),
        Rule::new("SWAP SWAP", ""),
        Rule::new("1 PICK", "OVER"),
        Rule::new("2 ROLL", "ROT"),
        Rule::new("2 PICK 2 PICK 2 PICK", "3DUP"),
        Rule::new("3 PICK 3 PICK", "2OVER"),
        Rule::new("3 ROLL 3 ROLL", "2SWAP"),
        Rule::new("SWAP OVER", "TUCK"),
        Rule::new("OVER OVER", "2DUP"),
        Rule::new("SWAP DROP", "NIP"),
        Rule::new("DROP DROP", "2DROP"),
        Rule::new("EQUAL VERIFY", "EQUALVERIFY"),
        Rule::new("1 ADD", "1ADD"),
        Rule::new("1 SUB", "1SUB"),
        Rule::new("SWAP TXSIGHASH ROT", "TXSIGHASH SWAP"),
    ];
}

/// Apply every rewrite rule once, in order.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn optimize(tokens: Vec<Token>) -> Vec<Token> {
    let before = tokens.len();
    let mut rewrites = 0;
    let tokens = RULES.iter().fold(tokens, |tokens, rule| {
        let (tokens, hits) = rule.apply(tokens);
        rewrites += hits;
        tokens
    });
    debug!(
        target: "ivy::optimize",
        before,
        after = tokens.len(),
        rewrites,
        "peephole pass"
    );
    tokens
}
