#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Signatures of stored delta bases.
//!
//! When a file changed since the previous backup, the server sends the client
//! a signature of the copy it already holds: one rolling checksum and one
//! truncated MD4 sum per block, in the librsync wire layout. The client
//! answers with a delta against those blocks.
//!
//! [`SignatureJob`] produces that stream incrementally so the phase-2 loop
//! never stalls on a large base or a slow client, and [`block_len_for`]
//! chooses the block length from the base's recorded size.
//!
//! # Examples
//!
//! ```
//! use std::io::Cursor;
//! use signature::{SigStep, SignatureJob, block_len_for};
//! use test_support::MemoryTransport;
//!
//! let base = vec![7u8; 10_000];
//! let mut job = SignatureJob::new(8).unwrap();
//! job.begin(Box::new(Cursor::new(base)), block_len_for(10_000)).unwrap();
//!
//! let mut transport = MemoryTransport::new();
//! while job.step(&mut transport).unwrap() != SigStep::Done {}
//! assert_eq!(job.blocks(), 90);
//! ```

mod block_size;
mod error;
mod job;

pub use block_size::{BLOCK_LEN_ALIGN, MIN_BLOCK_LEN, block_len_for};
pub use error::SignatureError;
pub use job::{DEFAULT_STRONG_LEN, MAX_BLOCK_LEN, MD4_SIG_MAGIC, SigState, SigStep, SignatureJob};
