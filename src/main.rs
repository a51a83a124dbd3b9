//! Node entry point: version, help, and a demonstration mode

use consensus_core::hash::Hash256;
use consensus_core::merkle::merkle_root;
use consensus_core::script_type::{classify, is_standard};
use consensus_core::transaction::{OutPoint, Transaction, TxInput, TxOutput};
use consensus_core::{Block, BlockHeader};
use std::env;
use std::process;

const NAME: &str = "consensus-node";
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    println!("{} v{}", NAME, VERSION);
    println!("An in-memory Bitcoin consensus core");
    println!();

    let args: Vec<String> = env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("version") => print_version(),
        Some("help") => print_help(),
        Some("test") => run_demonstration(),
        Some(other) => {
            println!("Unknown command: {}", other);
            print_help();
            process::exit(1);
        }
        None => start_node(),
    }
}

fn print_version() {
    println!("{} version {}", NAME, VERSION);
}

fn print_help() {
    println!("Usage: {} [command]", NAME);
    println!();
    println!("Commands:");
    println!("  help        Show this help message");
    println!("  version     Show version information");
    println!("  test        Run a short demonstration of the core types");
    println!("  (no args)   Start the node");
}

fn start_node() {
    println!("Starting node...");
    println!();
    demonstrate_types();
    println!("Node startup is not wired to a network yet; exiting.");
}

fn run_demonstration() {
    println!("Running core type demonstration...");
    println!();
    demonstrate_types();
    println!("Demonstration completed");
}

fn demonstrate_types() {
    println!("Building a sample transaction...");

    let input = TxInput::new(OutPoint::null(), vec![0x04, 0xde, 0xad, 0xbe, 0xef], 0xffff_ffff);
    let output = TxOutput::new(
        50_0000_0000,
        // P2PKH with a zero hash
        {
            let mut script = vec![0x76, 0xa9, 0x14];
            script.extend_from_slice(&[0u8; 20]);
            script.extend_from_slice(&[0x88, 0xac]);
            script
        },
    );
    let tx = Transaction::new(1, vec![input], vec![output], 0);

    println!("   Transaction id: {}", tx.txid());
    println!("   Is coinbase:    {}", tx.is_coinbase());
    println!("   Output value:   {} satoshis", tx.total_output());
    match tx.validate() {
        Ok(()) => println!("   Validation:     ok"),
        Err(err) => println!("   Validation:     failed: {}", err),
    }
    println!();

    println!("Building a sample block...");
    let root = merkle_root(&[tx.txid()]);
    let header = BlockHeader::new(1, Hash256::ZERO, root, 1231006505, 0x1d00ffff, 1);
    let block = Block::new(header, vec![tx]);

    println!("   Block id:          {}", block.id());
    println!("   Is genesis:        {}", block.is_genesis());
    println!("   Transaction count: {}", block.transaction_count());
    println!("   Merkle binding:    {}", block.check_merkle_root());
    match block.validate() {
        Ok(()) => println!("   Validation:        ok"),
        Err(err) => println!("   Validation:        failed: {}", err),
    }
    println!();

    println!("Classifying sample scripts...");
    let p2pkh = &block.transactions[0].outputs[0].script_pubkey;
    println!(
        "   P2PKH script:     {:?}, standard: {}",
        classify(p2pkh),
        is_standard(p2pkh)
    );

    let null_data = b"\x6a\x0bHello World".to_vec();
    println!(
        "   OP_RETURN script: {:?}, standard: {}",
        classify(&null_data),
        is_standard(&null_data)
    );
    println!();
}
