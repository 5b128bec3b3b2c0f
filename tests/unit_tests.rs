//! Integration tests for the Ivy compiler using `compile_template` as the
//! entry point.
//!
//! These tests validate the full pipeline (parsing through assembly)
//! against complete contracts.

use std::collections::HashMap;
use std::path::PathBuf;

use ivy::{
    Argument, CompileOptions, InstantiateError, IvyError, Primitive, Type,
    compile_contract_parameters, compile_template, compile_template_clauses, compile_template_with,
    disassemble, instantiate,
};
use ivy_compiler::bytecode::{Decoded, OpCode, Token, assemble, encode_int};
use proptest::prelude::*;

/// Load a test contract from the test_scripts directory.
fn load_script(filename: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_scripts")
        .join(filename);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}

/// Compile a test contract, returning its instructions as text.
fn instructions(filename: &str) -> String {
    compile_template(&load_script(filename))
        .unwrap_or_else(|e| panic!("{filename} failed to compile: {e}"))
        .instructions_text()
}

/// The downgraded message of a failing compile.
fn compile_error(source: &str) -> String {
    match compile_template(source) {
        Err(IvyError::Compiler(e)) => {
            assert_eq!(e.source_text, source);
            e.message
        }
        other => panic!("expected a compiler error, got {other:?}"),
    }
}

// =============================================================================
// Instruction Sequences
// =============================================================================

#[test]
fn test_trivial_lock() {
    let template = compile_template(&load_script("TrivialLock.ivy")).unwrap();
    assert_eq!(template.instructions_text(), "TRUE");
    assert_eq!(template.argument_count(), 0);
    assert_eq!(instantiate(&template, &[]).unwrap(), [0x51]);
}

#[test]
fn test_lock_with_public_key() {
    assert_eq!(
        instructions("LockWithPublicKey.ivy"),
        "publicKey TXSIGHASH SWAP CHECKSIG"
    );
}

#[test]
fn test_reveal_preimage() {
    assert_eq!(
        instructions("RevealPreimage.ivy"),
        "hash SWAP SHA256 SWAP EQUAL"
    );
}

#[test]
fn test_trade_offer() {
    assert_eq!(
        instructions("TradeOffer.ivy"),
        "sellerKey sellerProgram requested.amount requested.asset \
         4 ROLL NOT JUMPIF:a \
         NIP DROP SWAP ROT TXSIGHASH ROT CHECKSIG VERIFY \
         0 0x AMOUNT ASSET 1 5 ROLL CHECKOUTPUT \
         JUMP:b $a \
         3 ROLL DROP 0 0x 2SWAP 1 5 ROLL CHECKOUTPUT \
         $b"
    );
}

#[test]
fn test_two_of_three() {
    assert_eq!(
        instructions("TwoOfThree.ivy"),
        "k3 k2 k1 3 SWAP ROT 3 ROLL 2 6 ROLL 6 ROLL 0 CHECKMULTISIG"
    );
}

#[test]
fn test_escrow_nests_dispatch() {
    let text = instructions("EscrowWithDelay.ivy");
    for fragment in ["JUMPIF:a", "JUMP:b", "$a", "$b", "JUMPIF:c", "JUMP:d", "$c", "$d"] {
        assert!(
            text.split_whitespace().any(|word| word == fragment),
            "missing {fragment} in {text}"
        );
    }
    assert!(text.contains("MINTIME LESSTHAN"));
}

#[test]
fn test_unoptimized_output_assembles() {
    let options = CompileOptions::new().with_optimize(false);
    let optimized = compile_template(&load_script("EscrowWithDelay.ivy")).unwrap();
    let plain = compile_template_with(&load_script("EscrowWithDelay.ivy"), &options).unwrap();
    assert!(plain.instructions.len() > optimized.instructions.len());
    assert_eq!(plain.argument_count(), optimized.argument_count());
}

// =============================================================================
// Metadata
// =============================================================================

#[test]
fn test_contract_parameters() {
    let params = compile_contract_parameters(&load_script("TradeOffer.ivy")).unwrap();
    let names: Vec<_> = params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["requested", "sellerProgram", "sellerKey", "offered"]);
    assert_eq!(params[0].ty, Type::from(Primitive::AssetAmount));
    assert_eq!(params[3].ty, Type::VALUE);
}

#[test]
fn test_template_clauses() {
    let clauses = compile_template_clauses(&load_script("TradeOffer.ivy")).unwrap();
    assert_eq!(clauses.len(), 2);

    let trade = &clauses[0];
    assert_eq!(trade.name, "trade");
    assert_eq!(trade.values.len(), 2);
    assert_eq!(trade.values[0].name, "payment");
    assert_eq!(trade.values[0].program.as_deref(), Some("sellerProgram"));
    assert_eq!(trade.values[0].asset_amount.as_deref(), Some("requested"));
    assert_eq!(trade.values[1].name, "offered");
    assert_eq!(trade.values[1].program, None);

    let cancel = &clauses[1];
    assert_eq!(cancel.parameters[0].name, "sellerSig");
    assert_eq!(cancel.values[0].asset_amount, None);
}

#[test]
fn test_clause_time_bounds() {
    let template = compile_template(&load_script("EscrowWithDelay.ivy")).unwrap();
    let timeout = template
        .clauses
        .iter()
        .find(|c| c.name == "timeout")
        .unwrap();
    assert_eq!(timeout.mintimes, ["delay"]);
    assert!(timeout.maxtimes.is_empty());
}

// =============================================================================
// Instantiation
// =============================================================================

#[test]
fn test_instantiate_lock_with_public_key() {
    let template = compile_template(&load_script("LockWithPublicKey.ivy")).unwrap();
    let key = vec![0x11; 32];
    let program = instantiate(&template, &[Argument::Bytes(key.clone())]).unwrap();

    let mut expected = vec![32];
    expected.extend(&key);
    expected.extend([0xae, 0x7c, 0xac]);
    assert_eq!(program, expected);
}

#[test]
fn test_instantiate_asset_amount_takes_two_arguments() {
    let template = compile_template(&load_script("TradeOffer.ivy")).unwrap();
    assert_eq!(template.argument_count(), 4);

    let err = instantiate(&template, &[Argument::Bytes(vec![1; 32])]).unwrap_err();
    assert_eq!(
        err,
        InstantiateError::ArgumentCount {
            template: "TradeOffer".into(),
            expected: 4,
            got: 1
        }
    );

    let program = instantiate(
        &template,
        &[
            Argument::Bytes(vec![0xa5; 32]),
            Argument::Integer(1000),
            Argument::Bytes(vec![0x51]),
            Argument::Bytes(vec![0x22; 32]),
        ],
    )
    .unwrap();

    // Arguments are pushed last first.
    let decoded = disassemble(&program).unwrap();
    assert_eq!(decoded[0], Decoded::Push(vec![0x22; 32]));
    assert_eq!(decoded[1], Decoded::Push(vec![0x51]));
    assert_eq!(decoded[2], Decoded::Push(encode_int(1000)));
    assert_eq!(decoded[3], Decoded::Push(vec![0xa5; 32]));
}

/// Byte offset of every `$label` in `tokens`, found by assembling the
/// prefix before it with each jump stood in for by five raw bytes.
fn label_offsets(tokens: &[Token]) -> HashMap<String, u32> {
    let mut offsets = HashMap::new();
    for (index, token) in tokens.iter().enumerate() {
        let Token::Mnemonic(word) = token else { continue };
        let Some(label) = word.strip_prefix('$') else { continue };
        let prefix: Vec<Token> = tokens[..index]
            .iter()
            .map(|t| match t {
                Token::Mnemonic(w) if w.starts_with("JUMP") => Token::mnemonic("0x0000000000"),
                other => other.clone(),
            })
            .collect();
        let offset = assemble(&prefix).unwrap().len() as u32;
        offsets.insert(label.to_string(), offset);
    }
    offsets
}

#[test]
fn test_jump_targets_resolve_to_label_offsets() {
    let template = compile_template(&load_script("EscrowWithDelay.ivy")).unwrap();
    let args = [
        Argument::Bytes(vec![0x51]),
        Argument::Bytes(vec![0x52]),
        Argument::Bytes(vec![0x33; 32]),
        Argument::Integer(1_700_000_000),
    ];
    let program = instantiate(&template, &args).unwrap();

    let mut tokens: Vec<Token> = vec![
        Token::Integer(1_700_000_000),
        Token::Bytes(vec![0x33; 32]),
        Token::Bytes(vec![0x52]),
        Token::Bytes(vec![0x51]),
    ];
    tokens.extend_from_slice(&template.instructions[args.len()..]);
    let offsets = label_offsets(&tokens);
    assert_eq!(offsets.len(), 4);

    let expected: Vec<(OpCode, u32)> = tokens
        .iter()
        .filter_map(|t| match t {
            Token::Mnemonic(w) => {
                if let Some(label) = w.strip_prefix("JUMPIF:") {
                    Some((OpCode::JumpIf, offsets[label]))
                } else {
                    w.strip_prefix("JUMP:").map(|label| (OpCode::Jump, offsets[label]))
                }
            }
            _ => None,
        })
        .collect();

    let jumps: Vec<(OpCode, u32)> = disassemble(&program)
        .unwrap()
        .into_iter()
        .filter_map(|d| match d {
            Decoded::Jump { opcode, target } => Some((opcode, target)),
            _ => None,
        })
        .collect();
    assert_eq!(jumps.len(), 4);
    assert_eq!(jumps, expected);
    assert!(jumps.iter().all(|(_, t)| (*t as usize) <= program.len()));
}

proptest! {
    #[test]
    fn integer_arguments_are_pushed_minimally(n in any::<i64>()) {
        let source = "contract Deadline(deadline: Time, locked: Value) {
            clause expire() { verify after(deadline) return locked }
        }";
        let template = compile_template(source).unwrap();
        let program = instantiate(&template, &[Argument::Integer(n)]).unwrap();
        let decoded = disassemble(&program).unwrap();
        let expected = match encode_int(n) {
            bytes if bytes.is_empty() => Decoded::Op(OpCode::False),
            bytes => Decoded::Push(bytes),
        };
        prop_assert_eq!(&decoded[0], &expected);
    }
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_unused_parameter() {
    let message = compile_error("contract X(a: Integer, v: Value) { clause c() { return v } }");
    assert!(message.starts_with("NameError at line 1, column 12"), "{message}");
    assert!(message.contains("'a'"), "{message}");
}

#[test]
fn test_undefined_identifier() {
    let message = compile_error(
        "contract X(v: Value) { clause c() { verify missing == 1 return v } }",
    );
    assert!(message.starts_with("NameError"), "{message}");
    assert!(message.contains("missing"), "{message}");
}

#[test]
fn test_repeated_clause_name() {
    let message = compile_error(
        "contract D(v: Value) { clause c(x: Integer) { return v } clause c(x: Integer) { verify x > 0 return v } }",
    );
    assert!(message.starts_with("NameError"), "{message}");
    assert!(message.contains("duplicate clause 'c'"), "{message}");
}

#[test]
fn test_multisig_count_mismatch() {
    let message = compile_error(
        "contract X(k1, k2: PublicKey, v: Value) {
            clause c(s1, s2, s3: Signature) {
                verify checkMultiSig([k1, k2], [s1, s2, s3])
                return v
            }
        }",
    );
    assert!(message.starts_with("IvyTypeError"), "{message}");
    assert!(message.contains("checkMultiSig"), "{message}");
}

#[test]
fn test_value_not_disposed() {
    let message = compile_error(
        "contract X(n: Integer, v: Value) {
            clause a() { return v }
            clause b() { verify n > 0 }
        }",
    );
    assert!(message.starts_with("IvyTypeError"), "{message}");
    assert!(message.contains("clause 'b'"), "{message}");
}

#[test]
fn test_parse_error() {
    let message = compile_error("contract X(v: Value) { clause c() { return v }");
    assert!(message.starts_with("ParseError"), "{message}");
}

#[test]
fn test_type_mismatch() {
    let message = compile_error(
        "contract X(k: PublicKey, v: Value) { clause c() { verify k + 1 > 2 return v } }",
    );
    assert!(message.starts_with("IvyTypeError"), "{message}");
}
