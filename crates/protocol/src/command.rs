//! crates/protocol/src/command.rs
//! Record command tags.

use std::fmt;

/// Error returned when a byte does not name a known [`Command`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UnknownCommand(pub u8);

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown record command byte 0x{:02x}", self.0)
    }
}

impl std::error::Error for UnknownCommand {}

/// Single-byte tag identifying the meaning of a record.
///
/// The discriminant of each variant is the byte used on the wire and in
/// manifest files.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Command {
    /// Encoded stat attributes of the following path.
    Attribs = b'r',
    /// Regular file.
    File = b'f',
    /// Client-side encrypted file.
    EncFile = b'y',
    /// Directory.
    Directory = b'd',
    /// Symbolic link; followed by its target.
    SoftLink = b'l',
    /// Hard link; followed by its target.
    HardLink = b'L',
    /// Device, fifo or socket.
    Special = b's',
    /// Extended attribute / ACL blob stored as file data.
    Metadata = b'm',
    /// Encrypted metadata blob.
    EncMetadata = b'n',
    /// Windows EFS raw file.
    EfsFile = b'k',
    /// Windows backup-stream header.
    Vss = b'v',
    /// Encrypted Windows backup-stream header.
    EncVss = b'V',
    /// Windows backup-stream trailer.
    VssTrailer = b'u',
    /// Encrypted Windows backup-stream trailer.
    EncVssTrailer = b'U',
    /// Block signature reference inside a manifest.
    Sig = b'S',
    /// Stored block data inside a data file.
    Data = b'q',
    /// Fingerprint entry.
    Fingerprint = b'F',
    /// Manifest reference entry.
    Manifest = b'M',
    /// Generic control string such as `backupphase2end`.
    Gen = b'c',
    /// Fatal error text.
    Error = b'e',
    /// Chunk of file or delta data.
    Append = b'a',
    /// Client abandoned a requested path.
    Interrupt = b'i',
    /// Informational text.
    Message = b'p',
    /// Non-fatal warning text.
    Warning = b'w',
    /// End of file; payload is `<bytes>:<md5-hex>` or `endfile`.
    EndFile = b'x',
    /// Storage location of a file's data.
    DataPath = b't',
}

impl Command {
    /// Every command, in declaration order.
    pub const ALL: [Self; 26] = [
        Self::Attribs,
        Self::File,
        Self::EncFile,
        Self::Directory,
        Self::SoftLink,
        Self::HardLink,
        Self::Special,
        Self::Metadata,
        Self::EncMetadata,
        Self::EfsFile,
        Self::Vss,
        Self::EncVss,
        Self::VssTrailer,
        Self::EncVssTrailer,
        Self::Sig,
        Self::Data,
        Self::Fingerprint,
        Self::Manifest,
        Self::Gen,
        Self::Error,
        Self::Append,
        Self::Interrupt,
        Self::Message,
        Self::Warning,
        Self::EndFile,
        Self::DataPath,
    ];

    /// Returns the tag byte.
    #[inline]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Returns the tag as a printable character.
    #[inline]
    pub const fn as_char(self) -> char {
        self as u8 as char
    }

    /// Returns `true` for link kinds whose record is followed by a target.
    pub const fn is_link(self) -> bool {
        matches!(self, Self::SoftLink | Self::HardLink)
    }

    /// Returns `true` for kinds whose content is transferred as file data.
    pub const fn is_filedata(self) -> bool {
        matches!(
            self,
            Self::File | Self::EncFile | Self::Metadata | Self::EncMetadata | Self::EfsFile
        )
    }

    /// Returns `true` for Windows backup-stream kinds.
    pub const fn is_vssdata(self) -> bool {
        matches!(
            self,
            Self::Vss | Self::EncVss | Self::VssTrailer | Self::EncVssTrailer
        )
    }

    /// Returns `true` for kinds encrypted on the client.
    pub const fn is_encrypted(self) -> bool {
        matches!(
            self,
            Self::EncFile
                | Self::EncMetadata
                | Self::EncVss
                | Self::EncVssTrailer
                | Self::EfsFile
        )
    }

    /// Returns `true` for metadata blobs.
    pub const fn is_metadata(self) -> bool {
        matches!(self, Self::Metadata | Self::EncMetadata)
    }

    /// Returns `true` for kinds that name a filesystem entry.
    pub const fn is_path(self) -> bool {
        matches!(
            self,
            Self::File
                | Self::EncFile
                | Self::Directory
                | Self::SoftLink
                | Self::HardLink
                | Self::Special
                | Self::Metadata
                | Self::EncMetadata
                | Self::EfsFile
                | Self::Vss
                | Self::EncVss
                | Self::VssTrailer
                | Self::EncVssTrailer
        )
    }
}

impl TryFrom<u8> for Command {
    type Error = UnknownCommand;

    fn try_from(byte: u8) -> Result<Self, UnknownCommand> {
        Self::ALL
            .into_iter()
            .find(|command| command.as_byte() == byte)
            .ok_or(UnknownCommand(byte))
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        command.as_byte()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}
