#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! Framed record codec for the backup protocol.
//!
//! Every unit exchanged with a client, and every entry stored in a manifest
//! file, is a [`Record`]: a single command byte, a four digit uppercase
//! hexadecimal payload length and the payload itself. The crate provides
//!
//! - [`Command`], the closed set of record tags with classification helpers;
//! - [`RecordHeader`] encoding and decoding of the 5-byte header;
//! - [`RecordCodec`], a [`tokio_util::codec`] implementation used by buffered
//!   transports;
//! - blocking helpers ([`read_record`], [`write_record`]) for manifest and data
//!   files, where each payload is followed by a newline;
//! - the [`Transport`] trait and [`AsyncStream`], a non-blocking record stream
//!   over any `Read + Write` socket.
//!
//! Decoding is all-or-nothing: callers never observe a partially read record.
//!
//! # Examples
//!
//! ```
//! use protocol::{Command, Record, RecordHeader};
//!
//! let record = Record::new(Command::File, b"/etc/hosts".to_vec());
//! let header = RecordHeader::for_record(&record).unwrap();
//! assert_eq!(&header.encode(), b"f000A");
//! ```

mod codec;
mod command;
mod error;
mod header;
mod io;
mod record;
mod transport;

pub use codec::RecordCodec;
pub use command::{Command, UnknownCommand};
pub use error::{FramingError, TransportError};
pub use header::{HEADER_LEN, MAX_PAYLOAD_LEN, RecordHeader};
pub use io::{Framing, read_record, write_record};
pub use record::Record;
pub use transport::{Append, AsyncStream, DEFAULT_WRITE_CAPACITY, Transport};
