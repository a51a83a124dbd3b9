//! Output script classification and standardness

use crate::script::{OP_CHECKMULTISIG, OP_CHECKSIG, OP_DUP, OP_EQUAL, OP_EQUALVERIFY, OP_HASH160, OP_RETURN};
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};

const HASH160_SIZE: u8 = 20;
const HASH256_SIZE: u8 = 32;
const COMPRESSED_PUBKEY_SIZE: u8 = 33;
const UNCOMPRESSED_PUBKEY_SIZE: u8 = 65;

/// Largest standard OP_RETURN output script.
const MAX_NULL_DATA_SIZE: usize = 80;

/// The recognized output script shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptType {
    P2pk,
    P2pkh,
    P2sh,
    P2wpkh,
    P2wsh,
    P2tr,
    Multisig,
    NullData,
    Unknown,
}

/// Classifies an output script by exact length and byte patterns.
pub fn classify(script: &[u8]) -> ScriptType {
    if script.is_empty() {
        return ScriptType::Unknown;
    }

    // P2PKH: OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG
    if script.len() == 25
        && script[0] == OP_DUP
        && script[1] == OP_HASH160
        && script[2] == HASH160_SIZE
        && script[23] == OP_EQUALVERIFY
        && script[24] == OP_CHECKSIG
    {
        return ScriptType::P2pkh;
    }

    // P2SH: OP_HASH160 <20> OP_EQUAL
    if script.len() == 23
        && script[0] == OP_HASH160
        && script[1] == HASH160_SIZE
        && script[22] == OP_EQUAL
    {
        return ScriptType::P2sh;
    }

    // P2PK: <pubkey> OP_CHECKSIG, compressed or uncompressed
    if script.len() >= 35 && script[script.len() - 1] == OP_CHECKSIG {
        if script[0] == COMPRESSED_PUBKEY_SIZE && (script[1] == 0x02 || script[1] == 0x03) {
            return ScriptType::P2pk;
        }
        if script.len() >= 67 && script[0] == UNCOMPRESSED_PUBKEY_SIZE && script[1] == 0x04 {
            return ScriptType::P2pk;
        }
    }

    // P2WPKH: OP_0 <20>
    if script.len() == 22 && script[0] == 0x00 && script[1] == HASH160_SIZE {
        return ScriptType::P2wpkh;
    }

    // P2WSH: OP_0 <32>
    if script.len() == 34 && script[0] == 0x00 && script[1] == HASH256_SIZE {
        return ScriptType::P2wsh;
    }

    // P2TR: OP_1 <32>
    if script.len() == 34 && script[0] == 0x51 && script[1] == HASH256_SIZE {
        return ScriptType::P2tr;
    }

    // Multisig: OP_M <keys...> OP_N OP_CHECKMULTISIG
    if script.len() >= 4
        && script[script.len() - 1] == OP_CHECKMULTISIG
        && (0x51..=0x60).contains(&script[0])
        && (0x51..=0x60).contains(&script[script.len() - 2])
    {
        return ScriptType::Multisig;
    }

    if script[0] == OP_RETURN {
        return ScriptType::NullData;
    }

    ScriptType::Unknown
}

/// Standardness of an output script. Data carriers are bounded at 80 bytes;
/// bare multisig is bounded at three keys.
pub fn is_standard(script: &[u8]) -> bool {
    match classify(script) {
        ScriptType::P2pk
        | ScriptType::P2pkh
        | ScriptType::P2sh
        | ScriptType::P2wpkh
        | ScriptType::P2wsh
        | ScriptType::P2tr => true,
        ScriptType::NullData => script.len() <= MAX_NULL_DATA_SIZE,
        ScriptType::Multisig => is_standard_multisig(script),
        ScriptType::Unknown => false,
    }
}

fn is_standard_multisig(script: &[u8]) -> bool {
    if script.len() < 4 || script[script.len() - 1] != OP_CHECKMULTISIG {
        return false;
    }

    // Only 1..=3 of 1..=3 is standard, with m no greater than n.
    let m = script[0].wrapping_sub(0x50);
    let n = script[script.len() - 2].wrapping_sub(0x50);
    if !(1..=3).contains(&m) || !(1..=3).contains(&n) {
        return false;
    }
    m <= n
}

/// A transaction is standard when every output script is standard.
pub fn is_standard_transaction(tx: &Transaction) -> bool {
    tx.outputs
        .iter()
        .all(|output| is_standard(&output.script_pubkey))
}
