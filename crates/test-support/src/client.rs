//! A scripted backup client.
//!
//! [`ScriptedClient`] plays the client side of phase 2 in-process. It
//! answers every request the server queues as soon as the server services
//! the transport:
//!
//! - a path request without a data path is a new file: the client replies
//!   with the attributes, the path, the file contents as `append` records
//!   and an end-of-file summary `<bytes>:<md5>`;
//! - a path request preceded by a data path is a delta request: the client
//!   collects the signature until `endfile`, then replies like a new file,
//!   prefixed with the data path;
//! - `backupphase2end` is acknowledged with `okbackupphase2end`;
//! - paths registered with [`interrupt`](ScriptedClient::interrupt) are
//!   answered with an interrupt instead of data.

use std::collections::{HashMap, HashSet, VecDeque};

use checksums::{Md5, to_hex};
use protocol::{Append, Command, HEADER_LEN, Record, Transport, TransportError};

use crate::memory::UNBOUNDED;

/// Largest `append` payload the client sends.
pub const CHUNK_LEN: usize = 4096;

/// A request the client has seen, in arrival order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Request {
    /// Full copy of a file.
    New(String),
    /// Delta against the stored data path.
    Delta {
        /// Logical path.
        path: String,
        /// Server data path of the delta base.
        datapath: String,
    },
    /// Request answered with an interrupt.
    Interrupted(String),
}

#[derive(Debug, Default)]
struct Pending {
    datapath: Option<Record>,
    attr: Option<Record>,
    delta: Option<(Record, Record, Option<Record>)>,
    signature: Vec<u8>,
}

/// In-process client implementing [`Transport`] from the server's side.
#[derive(Debug)]
pub struct ScriptedClient {
    capacity: usize,
    queued: Vec<Record>,
    queued_len: usize,
    inbound: VecDeque<Record>,
    contents: HashMap<String, Vec<u8>>,
    interrupts: HashSet<String>,
    pending: Pending,
    requests: Vec<Request>,
    signatures: HashMap<String, Vec<u8>>,
    errors: Vec<String>,
    phase_end_seen: bool,
    received: Vec<Record>,
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedClient {
    /// Client with an unbounded write buffer.
    pub fn new() -> Self {
        Self::with_capacity(UNBOUNDED)
    }

    /// Client whose server-side write buffer holds `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            queued: Vec::new(),
            queued_len: 0,
            inbound: VecDeque::new(),
            contents: HashMap::new(),
            interrupts: HashSet::new(),
            pending: Pending::default(),
            requests: Vec::new(),
            signatures: HashMap::new(),
            errors: Vec::new(),
            phase_end_seen: false,
            received: Vec::new(),
        }
    }

    /// Sets the current contents of `path`.
    pub fn with_file(mut self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.contents.insert(path.to_owned(), contents.into());
        self
    }

    /// Answers requests for `path` with an interrupt.
    pub fn interrupt(mut self, path: &str) -> Self {
        self.interrupts.insert(path.to_owned());
        self
    }

    /// Queues an unsolicited record for the server, such as a warning.
    pub fn push(&mut self, record: Record) {
        self.inbound.push_back(record);
    }

    /// Contents the client sends for `path`.
    pub fn contents_of(&self, path: &str) -> Vec<u8> {
        self.contents
            .get(path)
            .cloned()
            .unwrap_or_else(|| format!("contents of {path}\n").into_bytes())
    }

    /// Requests seen so far.
    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    /// Signature bytes received for `path`.
    pub fn signature(&self, path: &str) -> Option<&[u8]> {
        self.signatures.get(path).map(Vec::as_slice)
    }

    /// Error texts the server sent.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Whether the server announced the end of phase 2.
    pub fn phase_end_seen(&self) -> bool {
        self.phase_end_seen
    }

    /// Every record the server sent, in order.
    pub fn received(&self) -> &[Record] {
        &self.received
    }

    fn handle(&mut self, record: Record) {
        self.received.push(record.clone());
        match record.command() {
            Command::DataPath => self.pending.datapath = Some(record),
            Command::Attribs => self.pending.attr = Some(record),
            Command::Append => self.pending.signature.extend_from_slice(record.payload()),
            Command::EndFile => self.finish_delta(),
            Command::Gen if record.payload() == b"backupphase2end" => {
                self.phase_end_seen = true;
                self.inbound
                    .push_back(Record::with_text(Command::Gen, "okbackupphase2end"));
            }
            Command::Error => self.errors.push(record.text().into_owned()),
            kind if kind.is_path() => self.request(record),
            _ => {}
        }
    }

    fn request(&mut self, path: Record) {
        let name = path.text().into_owned();
        let datapath = self.pending.datapath.take();
        let attr = self.pending.attr.take();
        if self.interrupts.contains(&name) {
            self.requests.push(Request::Interrupted(name.clone()));
            self.inbound
                .push_back(Record::with_text(Command::Interrupt, &name));
            return;
        }
        match (datapath, attr) {
            (Some(datapath), Some(attr)) => {
                self.requests.push(Request::Delta {
                    path: name,
                    datapath: datapath.text().into_owned(),
                });
                self.pending.signature.clear();
                self.pending.delta = Some((path, attr, Some(datapath)));
            }
            (None, Some(attr)) => {
                self.requests.push(Request::New(name));
                self.send_file(None, attr, path);
            }
            (_, None) => self.errors.push(format!("request without attributes: {name}")),
        }
    }

    fn finish_delta(&mut self) {
        let Some((path, attr, datapath)) = self.pending.delta.take() else {
            return;
        };
        let signature = std::mem::take(&mut self.pending.signature);
        self.signatures.insert(path.text().into_owned(), signature);
        self.send_file(datapath, attr, path);
    }

    fn send_file(&mut self, datapath: Option<Record>, attr: Record, path: Record) {
        let contents = self.contents_of(&path.text());
        if let Some(datapath) = datapath {
            self.inbound.push_back(datapath);
        }
        self.inbound.push_back(attr);
        self.inbound.push_back(path);
        for chunk in contents.chunks(CHUNK_LEN) {
            self.inbound.push_back(Record::new(Command::Append, chunk));
        }
        let summary = format!("{}:{}", contents.len(), to_hex(&Md5::digest(&contents)));
        self.inbound
            .push_back(Record::with_text(Command::EndFile, &summary));
    }
}

impl Transport for ScriptedClient {
    fn service(&mut self) -> Result<(), TransportError> {
        self.queued_len = 0;
        for record in std::mem::take(&mut self.queued) {
            self.handle(record);
        }
        Ok(())
    }

    fn read(&mut self) -> Result<Option<Record>, TransportError> {
        Ok(self.inbound.pop_front())
    }

    fn append(&mut self, record: &Record) -> Result<Append, TransportError> {
        let len = HEADER_LEN + record.len();
        if len > self.write_space() {
            return Ok(Append::Blocked);
        }
        self.queued.push(record.clone());
        self.queued_len += len;
        Ok(Append::Queued)
    }

    fn pending_write(&self) -> usize {
        self.queued_len
    }

    fn write_space(&self) -> usize {
        self.capacity.saturating_sub(self.queued_len)
    }
}
