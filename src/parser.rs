use crate::boxes::{BoxBody, BoxHeader, FourCC, FullBoxHeader, Mp4Box};
use crate::known_boxes::KnownBox;
use crate::util::{ValueMode, be_u8, be_u24, be_u32, be_u64, read_fourcc};
use log::{debug, trace};
use std::io::{self, Read, Seek, SeekFrom};

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("io: {0}")]
    Io(io::Error),
    #[error("unexpected end of source")]
    Truncated,
    #[error("invalid box size {size} for '{typ}'")]
    InvalidSize { typ: FourCC, size: u64 },
    #[error("malformed '{typ}' box: {reason}")]
    Structural { typ: FourCC, reason: &'static str },
    #[error("unsupported primitive read: {bits} bits as {mode}")]
    Unsupported { bits: u32, mode: ValueMode },
}

impl From<io::Error> for ParseError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            ParseError::Truncated
        } else {
            ParseError::Io(e)
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Limits applied while decoding a box tree.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Deepest container nesting accepted. Top-level boxes are at depth 0.
    ///
    /// Default: 32
    pub max_depth: usize,

    /// Largest entry or sample count accepted from a table box.
    ///
    /// Default: 16,777,216
    pub max_table_entries: u32,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_table_entries: 1 << 24,
        }
    }
}

impl ParseOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_table_entries(mut self, max_table_entries: u32) -> Self {
        self.max_table_entries = max_table_entries;
        self
    }
}

/// Read the universal box header at the current position.
///
/// A 32-bit size of 1 is followed by the real 64-bit size. A size of 0 means
/// the box runs to the end of the stream; the stream length is queried and
/// the cursor put back right after the type tag.
pub fn read_box_header<R: Read + Seek>(r: &mut R) -> Result<BoxHeader> {
    let start = r.stream_position()?;
    let size32 = be_u32(r)?;
    let typ = read_fourcc(r)?;

    let (size, header_size, to_end) = match size32 {
        1 => (be_u64(r)?, 16, false),
        0 => {
            let after_tag = r.stream_position()?;
            let stream_end = r.seek(SeekFrom::End(0))?;
            r.seek(SeekFrom::Start(after_tag))?;
            (stream_end.saturating_sub(start), 8, true)
        }
        n => (n as u64, 8, false),
    };

    // Every box must at least cover its own header, so each decoded box moves
    // the cursor forward.
    if size < header_size {
        return Err(ParseError::InvalidSize { typ, size });
    }

    Ok(BoxHeader {
        start,
        size,
        typ,
        header_size,
        to_end,
    })
}

/// Type tag of the box at the current position, without consuming it.
pub fn peek_box_type<R: Read + Seek>(r: &mut R) -> Result<FourCC> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    r.seek(SeekFrom::Current(-8))?;
    Ok(FourCC([buf[4], buf[5], buf[6], buf[7]]))
}

/// Version byte and 24-bit flags of a full box.
pub fn read_full_box_header<R: Read>(r: &mut R) -> Result<FullBoxHeader> {
    let version = be_u8(r)?;
    let flags = be_u24(r)?;
    Ok(FullBoxHeader { version, flags })
}

/// Reader over the payload of a single box.
///
/// Counts the bytes consumed from the box (header included) and refuses to
/// read past its declared size, so a short payload surfaces as
/// [`ParseError::Truncated`] instead of bleeding into the next box.
pub struct BoxReader<'a, R> {
    inner: &'a mut R,
    size: u64,
    consumed: u64,
}

impl<'a, R> BoxReader<'a, R> {
    /// Reader positioned right after `header`.
    pub fn new(inner: &'a mut R, header: &BoxHeader) -> Self {
        Self {
            inner,
            size: header.size,
            consumed: header.header_size,
        }
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn remaining(&self) -> u64 {
        self.size.saturating_sub(self.consumed)
    }
}

impl<R: Read> Read for BoxReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let max = std::cmp::min(buf.len() as u64, self.remaining()) as usize;
        if max == 0 {
            return Ok(0);
        }
        let n = self.inner.read(&mut buf[..max])?;
        self.consumed += n as u64;
        Ok(n)
    }
}

impl<R: Seek> BoxReader<'_, R> {
    /// Seek past whatever is left of the box. Returns the number of bytes
    /// skipped.
    pub fn skip_remaining(&mut self) -> Result<u64> {
        let left = self.remaining();
        if left > 0 {
            let delta = i64::try_from(left).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
            self.inner.seek(SeekFrom::Current(delta))?;
            self.consumed = self.size;
        }
        Ok(left)
    }
}

/// Decode one box starting at the current position, including any children.
///
/// `limit` is the absolute offset the box must not extend past (the end of
/// the source for top-level boxes). On success the cursor sits at the end of
/// the box.
pub fn parse_box<R: Read + Seek>(r: &mut R, limit: u64, options: &ParseOptions) -> Result<Mp4Box> {
    decode_box(r, None, limit, 0, options)
}

/// Decode the children of the container whose header was just read.
pub fn parse_children<R: Read + Seek>(
    r: &mut R,
    parent: &BoxHeader,
    options: &ParseOptions,
) -> Result<Vec<Mp4Box>> {
    decode_children(r, parent, 1, options)
}

fn decode_children<R: Read + Seek>(
    r: &mut R,
    parent: &BoxHeader,
    depth: usize,
    options: &ParseOptions,
) -> Result<Vec<Mp4Box>> {
    let mut consumed = parent.header_size;
    let mut kids = Vec::new();
    while consumed < parent.size {
        let child = decode_box(r, Some(parent.typ), parent.end(), depth, options)?;
        consumed += child.header.size;
        kids.push(child);
    }
    Ok(kids)
}

fn decode_box<R: Read + Seek>(
    r: &mut R,
    parent: Option<FourCC>,
    limit: u64,
    depth: usize,
    options: &ParseOptions,
) -> Result<Mp4Box> {
    let kind = KnownBox::from(peek_box_type(r)?);
    let header = read_box_header(r)?;

    if header.end() > limit {
        return Err(match parent {
            Some(_) => ParseError::Structural {
                typ: header.typ,
                reason: "box extends past the end of its parent",
            },
            None => ParseError::Truncated,
        });
    }
    trace!(
        "'{}' at {} size={} depth={}",
        header.typ, header.start, header.size, depth
    );

    if kind.is_container() {
        if depth >= options.max_depth {
            return Err(ParseError::Structural {
                typ: header.typ,
                reason: "containers nested too deep",
            });
        }
        let children = decode_children(r, &header, depth + 1, options)?;
        return Ok(Mp4Box {
            header,
            full: None,
            body: BoxBody::Container(children),
        });
    }

    let mut br = BoxReader::new(r, &header);
    let full = if kind.is_full_box() {
        Some(read_full_box_header(&mut br)?)
    } else {
        None
    };
    let body = crate::registry::decode_payload(kind, &header, full.as_ref(), &mut br, options)?;

    let left = br.skip_remaining()?;
    match body {
        BoxBody::Opaque => debug!("'{}' at {} (skipped)", header.typ, header.start),
        BoxBody::Free => {}
        _ if left > 0 => debug!("remain {left} (skipped) in '{}'", header.typ),
        _ => {}
    }

    Ok(Mp4Box { header, full, body })
}
