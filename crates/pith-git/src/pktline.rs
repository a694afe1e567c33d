//! Git pkt-line format implementation.
//!
//! The pkt-line format frames all negotiation traffic. Each line is
//! prefixed with a 4-character hex length that counts the prefix itself,
//! or is one of the special zero-payload packets ("0000" for flush).

use crate::{GitError, Result};
use std::io::{ErrorKind, Read, Write};

/// Largest total packet size allowed by the format.
pub const MAX_PKT_LEN: usize = 65520;
const PREFIX_LEN: usize = 4;

/// A pkt-line packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PktLine {
    /// Data line with content.
    Data(Vec<u8>),
    /// Flush packet (0000).
    Flush,
    /// Delimiter packet (0001).
    Delimiter,
    /// Response-end packet (0002).
    ResponseEnd,
}

impl PktLine {
    /// Creates a data packet from a string slice.
    pub fn from_string(s: &str) -> Self {
        Self::Data(s.as_bytes().to_vec())
    }

    /// Creates a data packet from bytes.
    pub fn from_bytes(b: impl Into<Vec<u8>>) -> Self {
        Self::Data(b.into())
    }

    /// Encodes the packet to bytes.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Data(data) => {
                let mut result = format!("{:04x}", data.len() + PREFIX_LEN).into_bytes();
                result.extend_from_slice(data);
                result
            }
            Self::Flush => b"0000".to_vec(),
            Self::Delimiter => b"0001".to_vec(),
            Self::ResponseEnd => b"0002".to_vec(),
        }
    }

    /// Returns the data content, or None for special packets.
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Self::Data(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the data as a string, trimming any trailing newline.
    pub fn as_str(&self) -> Option<&str> {
        self.data()
            .and_then(|d| std::str::from_utf8(d).ok())
            .map(|s| s.trim_end_matches('\n'))
    }
}

/// Reader for pkt-line format.
pub struct PktLineReader<R> {
    reader: R,
}

impl<R: Read> PktLineReader<R> {
    /// Creates a new pkt-line reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reads the next packet, blocking until it is complete.
    ///
    /// Returns `None` on a clean end of stream before a length prefix.
    pub fn read(&mut self) -> Result<Option<PktLine>> {
        let mut len_buf = [0u8; PREFIX_LEN];
        let mut filled = 0;
        while filled < PREFIX_LEN {
            match self.reader.read(&mut len_buf[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => {
                    return Err(GitError::protocol(format!(
                        "truncated length prefix ({filled} of {PREFIX_LEN} bytes)"
                    )))
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let len = len_buf
            .iter()
            .try_fold(0usize, |acc, &b| {
                char::from(b).to_digit(16).map(|d| (acc << 4) | d as usize)
            })
            .ok_or_else(|| {
                GitError::protocol(format!(
                    "invalid length prefix {:?}",
                    String::from_utf8_lossy(&len_buf)
                ))
            })?;

        let payload_len = match len {
            0 => return Ok(Some(PktLine::Flush)),
            1 => return Ok(Some(PktLine::Delimiter)),
            2 => return Ok(Some(PktLine::ResponseEnd)),
            3 => return Err(GitError::protocol("length 3 is reserved")),
            len if len > MAX_PKT_LEN => {
                return Err(GitError::protocol(format!("length {len} exceeds {MAX_PKT_LEN}")))
            }
            len => len - PREFIX_LEN,
        };

        let mut data = vec![0u8; payload_len];
        self.reader.read_exact(&mut data).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                GitError::protocol(format!("short read: expected {payload_len} payload bytes"))
            } else {
                e.into()
            }
        })?;

        Ok(Some(PktLine::Data(data)))
    }

    /// Consumes the reader and returns the inner reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Writer for pkt-line format.
pub struct PktLineWriter<W> {
    writer: W,
}

impl<W: Write> PktLineWriter<W> {
    /// Creates a new pkt-line writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a packet.
    pub fn write(&mut self, pkt: &PktLine) -> Result<()> {
        if let PktLine::Data(data) = pkt {
            if data.len() + PREFIX_LEN > MAX_PKT_LEN {
                return Err(GitError::protocol(format!(
                    "packet of {} bytes exceeds {MAX_PKT_LEN}",
                    data.len() + PREFIX_LEN
                )));
            }
        }
        self.writer.write_all(&pkt.encode())?;
        Ok(())
    }

    /// Writes a data line.
    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        self.write(&PktLine::Data(data.to_vec()))
    }

    /// Writes a string line (with newline).
    pub fn write_line(&mut self, s: &str) -> Result<()> {
        let mut data = s.as_bytes().to_vec();
        if !s.ends_with('\n') {
            data.push(b'\n');
        }
        self.write(&PktLine::Data(data))
    }

    /// Writes a flush packet.
    pub fn flush_pkt(&mut self) -> Result<()> {
        self.write(&PktLine::Flush)
    }

    /// Returns the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    /// Hands out at most one byte per read call.
    struct Trickle<R>(R);

    impl<R: Read> Read for Trickle<R> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let end = buf.len().min(1);
            self.0.read(&mut buf[..end])
        }
    }

    #[test]
    fn test_pktline_encode() {
        assert_eq!(PktLine::from_string("hello\n").encode(), b"000ahello\n");
        assert_eq!(PktLine::Flush.encode(), b"0000");
        assert_eq!(PktLine::Delimiter.encode(), b"0001");
        assert_eq!(PktLine::ResponseEnd.encode(), b"0002");
    }

    #[test]
    fn test_want_line_length() {
        let line = format!("want {}\n", "a".repeat(40));
        assert!(PktLine::from_string(&line).encode().starts_with(b"0032want "));
        assert_eq!(PktLine::from_string("done\n").encode(), b"0009done\n");
    }

    #[test]
    fn test_pktline_roundtrip() {
        let packets = vec![
            PktLine::from_string("hello\n"),
            PktLine::from_string("world\n"),
            PktLine::Flush,
        ];

        let mut buf = Vec::new();
        {
            let mut writer = PktLineWriter::new(&mut buf);
            for pkt in &packets {
                writer.write(pkt).unwrap();
            }
        }

        let mut reader = PktLineReader::new(Cursor::new(buf));
        assert_eq!(reader.read().unwrap(), Some(packets[0].clone()));
        assert_eq!(reader.read().unwrap(), Some(packets[1].clone()));
        assert_eq!(reader.read().unwrap(), Some(PktLine::Flush));
        assert_eq!(reader.read().unwrap(), None);
    }

    #[test]
    fn test_pktline_as_str() {
        assert_eq!(PktLine::from_string("hello\n").as_str(), Some("hello"));
        assert_eq!(PktLine::from_string("no newline").as_str(), Some("no newline"));
        assert!(PktLine::from_bytes(vec![0xff, 0xfe]).as_str().is_none());
        assert!(PktLine::Flush.as_str().is_none());
    }

    #[test]
    fn test_flush_separates_sections() {
        let mut buf = Vec::new();
        {
            let mut writer = PktLineWriter::new(&mut buf);
            writer.write_line("# service=git-upload-pack").unwrap();
            writer.flush_pkt().unwrap();
            writer.write_line("want x").unwrap();
            writer.flush_pkt().unwrap();
        }
        assert_eq!(
            buf,
            b"001e# service=git-upload-pack\n0000000bwant x\n0000".to_vec()
        );

        let mut reader = PktLineReader::new(Cursor::new(buf));
        let mut lines = Vec::new();
        while let Some(pkt) = reader.read().unwrap() {
            lines.push(pkt.as_str().map(str::to_string));
        }
        assert_eq!(
            lines,
            [
                Some("# service=git-upload-pack".to_string()),
                None,
                Some("want x".to_string()),
                None
            ]
        );
    }

    #[test]
    fn test_write_line_keeps_single_newline() {
        let mut buf = Vec::new();
        PktLineWriter::new(&mut buf).write_line("test\n").unwrap();
        assert_eq!(buf, b"0009test\n");
    }

    #[test]
    fn test_pktline_special_packets() {
        let mut reader = PktLineReader::new(Cursor::new(b"000100020000".to_vec()));
        assert_eq!(reader.read().unwrap(), Some(PktLine::Delimiter));
        assert_eq!(reader.read().unwrap(), Some(PktLine::ResponseEnd));
        assert_eq!(reader.read().unwrap(), Some(PktLine::Flush));
    }

    #[test]
    fn test_rejects_malformed_prefix() {
        for input in [b"0003".as_slice(), b"zzzz", b"+00a", b"00 5hello"] {
            let mut reader = PktLineReader::new(Cursor::new(input.to_vec()));
            assert!(
                matches!(reader.read(), Err(GitError::Protocol(_))),
                "accepted {:?}",
                String::from_utf8_lossy(input)
            );
        }
    }

    #[test]
    fn test_pktline_short_reads() {
        let mut reader = PktLineReader::new(Cursor::new(b"00".to_vec()));
        assert!(matches!(reader.read(), Err(GitError::Protocol(_))));

        let mut reader = PktLineReader::new(Cursor::new(b"000ahel".to_vec()));
        assert!(matches!(reader.read(), Err(GitError::Protocol(_))));
    }

    #[test]
    fn test_pktline_reads_across_partial_chunks() {
        let mut reader = PktLineReader::new(Trickle(Cursor::new(b"000ahello\n0000".to_vec())));
        assert_eq!(reader.read().unwrap().unwrap().as_str(), Some("hello"));
        assert_eq!(reader.read().unwrap(), Some(PktLine::Flush));
    }

    #[test]
    fn test_pktline_empty_data() {
        assert_eq!(PktLine::from_bytes(Vec::new()).encode(), b"0004");
        let mut reader = PktLineReader::new(Cursor::new(b"0004".to_vec()));
        assert_eq!(reader.read().unwrap(), Some(PktLine::Data(Vec::new())));
    }

    #[test]
    fn test_pktline_writer_rejects_oversized() {
        let mut buf = Vec::new();
        let mut writer = PktLineWriter::new(&mut buf);
        assert!(writer.write_data(&vec![b'x'; MAX_PKT_LEN]).is_err());
        assert!(writer.write_data(&vec![b'x'; MAX_PKT_LEN - 4]).is_ok());
    }

    proptest! {
        /// Property: Data packets survive a write/read cycle
        #[test]
        fn prop_data_roundtrip(payload in prop::collection::vec(any::<u8>(), 0..2048)) {
            let mut buf = Vec::new();
            PktLineWriter::new(&mut buf).write_data(&payload).unwrap();
            let mut reader = PktLineReader::new(Cursor::new(buf));
            prop_assert_eq!(reader.read().unwrap(), Some(PktLine::Data(payload)));
        }

        /// Property: Arbitrary input never panics the reader
        #[test]
        fn prop_reader_no_panic(data in prop::collection::vec(any::<u8>(), 0..512)) {
            let mut reader = PktLineReader::new(Cursor::new(data));
            for _ in 0..64 {
                match reader.read() {
                    Ok(Some(_)) => continue,
                    _ => break,
                }
            }
        }
    }
}
