//! Basic cerror example
//!
//! Raises coded errors deep in a fake storage stack, wraps them on the way
//! up, and lets `main` classify them by code without caring how many layers
//! of context were added.
//!
//! # Environment Variables
//!
//! - `CERR_LOG_LEVEL=debug` - Set log level (off, error, warn, info, debug, trace)
//! - `CERR_STACK_DEPTH=4` - Keep fewer frames per error
//! - `CERR_STACK_CAPTURE=0` - Skip stack capture

use cerror::{cause, cerr, code, ensure, wrap, CodedError, ResultExt, WrappedError};
use cerror::{kerror, kinfo, kprintln, kwarn};

// CERR_LOG_LEVEL=debug cargo run -p cerror-basic

/// Storage error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disk {
    Busy,
    TimedOut,
    BadBlock,
}

impl std::fmt::Display for Disk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Disk::Busy => f.write_str("BUSY"),
            Disk::TimedOut => f.write_str("ETIMEDOUT"),
            Disk::BadBlock => f.write_str("EBADBLK"),
        }
    }
}

fn read_block(disk: &str, block: u64) -> Result<Vec<u8>, CodedError<Disk>> {
    ensure!(block < 1024, Disk::BadBlock, "block {} out of range on {}", block, disk);
    match block % 3 {
        0 => Ok(vec![0u8; 512]),
        1 => Err(CodedError::new(Disk::Busy, "device is busy")),
        _ => Err(cerr!(Disk::TimedOut, "no answer from {} after {}ms", disk, 30)),
    }
}

fn load_record(disk: &str, block: u64) -> Result<Vec<u8>, WrappedError> {
    read_block(disk, block).wrap_err_with(|| format!("read from disk {}", disk))
}

fn fetch(id: u64) -> Result<Vec<u8>, WrappedError> {
    let record = load_record("a", id).wrap_err("fetch record")?;
    Ok(record)
}

fn main() {
    println!("=== cerror Basic Example ===\n");

    let mut ok = 0;
    for id in [3, 4, 5, 4096] {
        match fetch(id) {
            Ok(bytes) => {
                ok += 1;
                kinfo!("record {}: {} bytes", id, bytes.len());
            }
            Err(err) => match code::<Disk, _>(&err) {
                Some(Disk::Busy) => kwarn!("record {}: {} (retry later)", id, err),
                Some(code) => {
                    kerror!("record {}: {} [{}]", id, err, code);
                    if let Some(root) = cause(&err).downcast_ref::<CodedError<Disk>>() {
                        kprintln!("raised at:\n{}", root.stack_text());
                    }
                }
                None => kerror!("record {}: {} (uncoded)", id, err),
            },
        }
    }

    // Wrapping nothing yields nothing.
    let nothing = wrap(None::<CodedError<Disk>>, "never shown");
    println!("\nwrap(None) -> {:?}", nothing.map(|e| e.to_string()));

    println!("\n{} of 4 records read", ok);
    println!("\n=== Example Complete ===");
}
