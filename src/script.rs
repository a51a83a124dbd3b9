//! Script interpreter: a stack machine over byte strings
//!
//! Execution walks the script with a program counter and dispatches one
//! opcode at a time. Reaching the end of the script without an error is
//! success; the caller decides what the run means by inspecting the stack.
//! Structural problems (stack underflow, truncated pushes, unknown opcodes,
//! failed verification) are errors carrying the opcode and position.

use crate::error::ScriptError;
use crate::hash::{hash160, Hash256};
use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1, VerifyOnly};

/// Script verification flags. Plumbed through from the caller; reserved for
/// rules layered on top of base interpretation.
pub mod flags {
    pub const NONE: u32 = 0;
    pub const P2SH: u32 = 1 << 0;
    pub const STRICTENC: u32 = 1 << 1;
    pub const DERSIG: u32 = 1 << 2;
    pub const LOW_S: u32 = 1 << 3;
    pub const NULLDUMMY: u32 = 1 << 4;
    pub const SIGPUSHONLY: u32 = 1 << 5;
    pub const MINIMALDATA: u32 = 1 << 6;
    pub const DISCOURAGE_UPGRADABLE_NOPS: u32 = 1 << 7;
    pub const CLEANSTACK: u32 = 1 << 8;
    pub const CHECKLOCKTIMEVERIFY: u32 = 1 << 9;
    pub const CHECKSEQUENCEVERIFY: u32 = 1 << 10;
    pub const WITNESS: u32 = 1 << 11;
    pub const DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM: u32 = 1 << 12;
    pub const MINIMALIF: u32 = 1 << 13;
    pub const NULLFAIL: u32 = 1 << 14;
    pub const WITNESS_PUBKEYTYPE: u32 = 1 << 15;
    pub const CONST_SCRIPTCODE: u32 = 1 << 16;
    pub const TAPROOT: u32 = 1 << 17;
}

/// Opcode bytes used when building scripts.
pub const OP_0: u8 = 0x00;
pub const OP_1: u8 = 0x51;
pub const OP_16: u8 = 0x60;
pub const OP_VERIFY: u8 = 0x69;
pub const OP_RETURN: u8 = 0x6a;
pub const OP_TOALTSTACK: u8 = 0x6b;
pub const OP_FROMALTSTACK: u8 = 0x6c;
pub const OP_DROP: u8 = 0x75;
pub const OP_DUP: u8 = 0x76;
pub const OP_SWAP: u8 = 0x7c;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_ADD: u8 = 0x93;
pub const OP_SUB: u8 = 0x94;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKMULTISIG: u8 = 0xae;

/// One decoded script operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Literal push of 1..=75 bytes following the opcode.
    PushBytes(u8),
    /// Push the empty byte string.
    Push0,
    /// Push a single byte 1..=16.
    PushNum(u8),
    Dup,
    Drop,
    Swap,
    ToAltStack,
    FromAltStack,
    Add,
    Sub,
    Equal,
    EqualVerify,
    Verify,
    Hash160,
    CheckSig,
    Unknown(u8),
}

impl Opcode {
    pub fn from_byte(byte: u8) -> Opcode {
        match byte {
            OP_0 => Opcode::Push0,
            0x01..=0x4b => Opcode::PushBytes(byte),
            OP_1..=OP_16 => Opcode::PushNum(byte - 0x50),
            OP_DUP => Opcode::Dup,
            OP_DROP => Opcode::Drop,
            OP_SWAP => Opcode::Swap,
            OP_TOALTSTACK => Opcode::ToAltStack,
            OP_FROMALTSTACK => Opcode::FromAltStack,
            OP_ADD => Opcode::Add,
            OP_SUB => Opcode::Sub,
            OP_EQUAL => Opcode::Equal,
            OP_EQUALVERIFY => Opcode::EqualVerify,
            OP_VERIFY => Opcode::Verify,
            OP_HASH160 => Opcode::Hash160,
            OP_CHECKSIG => Opcode::CheckSig,
            other => Opcode::Unknown(other),
        }
    }
}

/// Seam for ECDSA verification, so the interpreter itself carries no curve
/// arithmetic. Implementations receive the raw public key bytes, the
/// transaction digest, and the DER signature with its trailing SIGHASH byte.
pub trait SignatureVerifier {
    fn verify(&self, pubkey: &[u8], digest: &Hash256, signature: &[u8]) -> bool;
}

/// Accepts any signature that passed the engine's structural checks.
pub struct StructuralVerifier;

impl SignatureVerifier for StructuralVerifier {
    fn verify(&self, _pubkey: &[u8], _digest: &Hash256, _signature: &[u8]) -> bool {
        true
    }
}

/// Real secp256k1 ECDSA verification over a transaction digest.
pub struct EcdsaVerifier {
    secp: Secp256k1<VerifyOnly>,
}

impl EcdsaVerifier {
    pub fn new() -> EcdsaVerifier {
        EcdsaVerifier {
            secp: Secp256k1::verification_only(),
        }
    }
}

impl Default for EcdsaVerifier {
    fn default() -> EcdsaVerifier {
        EcdsaVerifier::new()
    }
}

impl SignatureVerifier for EcdsaVerifier {
    fn verify(&self, pubkey: &[u8], digest: &Hash256, signature: &[u8]) -> bool {
        let Ok(pubkey) = PublicKey::from_slice(pubkey) else {
            return false;
        };
        // The last byte of a script signature encodes the SIGHASH type.
        let Some((_sighash, der)) = signature.split_last() else {
            return false;
        };
        let Ok(signature) = Signature::from_der(der) else {
            return false;
        };
        let message = Message::from_digest(*digest.as_bytes());
        self.secp.verify_ecdsa(&message, &signature, &pubkey).is_ok()
    }
}

/// The script execution engine: a main stack and an alternative stack of
/// byte strings, a program counter, and verification flags.
pub struct ScriptEngine {
    stack: Vec<Vec<u8>>,
    alt_stack: Vec<Vec<u8>>,
    script: Vec<u8>,
    pc: usize,
    flags: u32,
    digest: Hash256,
    verifier: Box<dyn SignatureVerifier>,
}

impl ScriptEngine {
    pub fn new(script: Vec<u8>, flags: u32) -> ScriptEngine {
        ScriptEngine::with_verifier(script, flags, Box::new(StructuralVerifier), Hash256::ZERO)
    }

    /// Builds an engine with an explicit signature verifier and the
    /// transaction digest signatures are checked against.
    pub fn with_verifier(
        script: Vec<u8>,
        flags: u32,
        verifier: Box<dyn SignatureVerifier>,
        digest: Hash256,
    ) -> ScriptEngine {
        ScriptEngine {
            stack: Vec::new(),
            alt_stack: Vec::new(),
            script,
            pc: 0,
            flags,
            digest,
            verifier,
        }
    }

    pub fn stack(&self) -> &[Vec<u8>] {
        &self.stack
    }

    pub fn alt_stack(&self) -> &[Vec<u8>] {
        &self.alt_stack
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// True iff the stack is non-empty and its top item is truthy. The usual
    /// meaning of "the script succeeded overall".
    pub fn top_is_truthy(&self) -> bool {
        self.stack.last().map(|top| is_truthy(top)).unwrap_or(false)
    }

    /// Replaces the script and resets the program counter; the stacks carry
    /// over, which is how a scriptSig run feeds a scriptPubKey run.
    pub fn set_script(&mut self, script: Vec<u8>) {
        self.script = script;
        self.pc = 0;
    }

    /// Runs the script to completion. An empty script succeeds with an
    /// empty stack.
    pub fn execute(&mut self) -> Result<(), ScriptError> {
        while self.pc < self.script.len() {
            let position = self.pc;
            let byte = self.script[self.pc];
            self.pc += 1;
            self.step(Opcode::from_byte(byte), byte, position)?;
        }
        Ok(())
    }

    fn require(&self, wanted: usize, op: u8, pc: usize) -> Result<(), ScriptError> {
        if self.stack.len() < wanted {
            return Err(ScriptError::InsufficientStack { op, pc });
        }
        Ok(())
    }

    fn step(&mut self, opcode: Opcode, byte: u8, position: usize) -> Result<(), ScriptError> {
        match opcode {
            Opcode::PushBytes(count) => {
                let count = count as usize;
                if self.pc + count > self.script.len() {
                    return Err(ScriptError::PushBeyondEnd { pc: position });
                }
                let data = self.script[self.pc..self.pc + count].to_vec();
                self.pc += count;
                self.stack.push(data);
            }

            Opcode::Push0 => self.stack.push(Vec::new()),

            Opcode::PushNum(value) => self.stack.push(vec![value]),

            Opcode::Dup => {
                self.require(1, byte, position)?;
                let top = self.stack[self.stack.len() - 1].clone();
                self.stack.push(top);
            }

            Opcode::Drop => {
                self.require(1, byte, position)?;
                self.stack.pop();
            }

            Opcode::Swap => {
                self.require(2, byte, position)?;
                let len = self.stack.len();
                self.stack.swap(len - 1, len - 2);
            }

            Opcode::ToAltStack => {
                self.require(1, byte, position)?;
                let top = self.stack.pop().unwrap_or_default();
                self.alt_stack.push(top);
            }

            Opcode::FromAltStack => {
                if self.alt_stack.is_empty() {
                    return Err(ScriptError::InsufficientStack {
                        op: byte,
                        pc: position,
                    });
                }
                let top = self.alt_stack.pop().unwrap_or_default();
                self.stack.push(top);
            }

            Opcode::Add => {
                self.require(2, byte, position)?;
                let b = self.stack.pop().unwrap_or_default();
                let a = self.stack.pop().unwrap_or_default();
                // Operands may each hold up to eight bytes; the sum wraps.
                self.stack
                    .push(encode_num(decode_num(&a).wrapping_add(decode_num(&b))));
            }

            Opcode::Sub => {
                self.require(2, byte, position)?;
                let b = self.stack.pop().unwrap_or_default();
                let a = self.stack.pop().unwrap_or_default();
                self.stack
                    .push(encode_num(decode_num(&a).wrapping_sub(decode_num(&b))));
            }

            Opcode::Equal => {
                self.require(2, byte, position)?;
                let b = self.stack.pop().unwrap_or_default();
                let a = self.stack.pop().unwrap_or_default();
                self.stack.push(if a == b { vec![1] } else { vec![0] });
            }

            Opcode::EqualVerify => {
                self.require(2, byte, position)?;
                let b = self.stack.pop().unwrap_or_default();
                let a = self.stack.pop().unwrap_or_default();
                if a != b {
                    return Err(ScriptError::VerifyFailed {
                        op: byte,
                        pc: position,
                    });
                }
            }

            Opcode::Verify => {
                self.require(1, byte, position)?;
                let top = self.stack.pop().unwrap_or_default();
                if !is_truthy(&top) {
                    return Err(ScriptError::VerifyFailed {
                        op: byte,
                        pc: position,
                    });
                }
            }

            Opcode::Hash160 => {
                self.require(1, byte, position)?;
                let data = self.stack.pop().unwrap_or_default();
                self.stack.push(hash160(&data).as_bytes().to_vec());
            }

            Opcode::CheckSig => {
                self.require(2, byte, position)?;
                let pubkey = self.stack.pop().unwrap_or_default();
                let signature = self.stack.pop().unwrap_or_default();
                let valid = self.check_signature(&signature, &pubkey);
                self.stack.push(if valid { vec![1] } else { Vec::new() });
            }

            Opcode::Unknown(code) => {
                return Err(ScriptError::UnimplementedOpcode {
                    code,
                    pc: position,
                });
            }
        }
        Ok(())
    }

    /// Structural signature checks, then the pluggable verifier. A failed
    /// signature is a false result, never a script error.
    fn check_signature(&self, signature: &[u8], pubkey: &[u8]) -> bool {
        if signature.is_empty() || pubkey.is_empty() {
            return false;
        }

        // DER sequences start with 0x30; anything shorter than the minimal
        // encoding cannot hold two integers.
        if signature.len() < 6 || signature[0] != 0x30 {
            return false;
        }

        match pubkey.len() {
            33 => {
                if pubkey[0] != 0x02 && pubkey[0] != 0x03 {
                    return false;
                }
            }
            65 => {
                if pubkey[0] != 0x04 {
                    return false;
                }
            }
            _ => return false,
        }

        // A standard-length signature with all-zero r and s components is
        // never valid on the curve.
        if signature.len() >= 71 {
            let r_zero = signature[4..36].iter().all(|&b| b == 0);
            let s_zero = signature[38..70].iter().all(|&b| b == 0);
            if r_zero && s_zero {
                return false;
            }
        }

        self.verifier.verify(pubkey, &self.digest, signature)
    }
}

/// Decodes a script number: little-endian magnitude with the sign bit in
/// the top bit of the last byte. Inputs longer than 8 bytes decode as zero.
pub fn decode_num(data: &[u8]) -> i64 {
    if data.is_empty() || data.len() > 8 {
        return 0;
    }

    let mut value: u64 = 0;
    for (i, &byte) in data.iter().enumerate() {
        if i == data.len() - 1 {
            value |= ((byte & 0x7f) as u64) << (8 * i);
            if byte & 0x80 != 0 {
                return -(value as i64);
            }
        } else {
            value |= (byte as u64) << (8 * i);
        }
    }
    value as i64
}

/// Encodes a script number: empty for zero, otherwise the little-endian
/// magnitude with a padding byte when the high bit would collide with the
/// sign, and the sign bit set for negatives.
pub fn encode_num(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }

    let negative = value < 0;
    let mut magnitude = value.unsigned_abs();
    let mut result = Vec::new();
    while magnitude > 0 {
        result.push((magnitude & 0xff) as u8);
        magnitude >>= 8;
    }

    let last = result.len() - 1;
    if negative {
        if result[last] & 0x80 != 0 {
            result.push(0x80);
        } else {
            result[last] |= 0x80;
        }
    } else if result[last] & 0x80 != 0 {
        result.push(0x00);
    }

    result
}

/// A stack value is truthy unless it is empty or encodes zero (including
/// negative zero, a bare 0x80 sign bit).
pub fn is_truthy(data: &[u8]) -> bool {
    let Some((&last, rest)) = data.split_last() else {
        return false;
    };
    if rest.iter().any(|&byte| byte != 0) {
        return true;
    }
    last != 0x00 && last != 0x80
}
