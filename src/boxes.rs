use crate::registry::{
    Co64Data, ElstData, FtypData, HdlrData, HmhdData, MdhdData, MvhdData, SmhdData, StcoData,
    StscData, StssData, StszData, SttsData, TkhdData, VmhdData,
};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub fn as_str_lossy(&self) -> String {
        self.0
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }
}

/// A type tag must be exactly four bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("type tag must be 4 bytes, got {0}")]
pub struct InvalidFourCC(pub usize);

impl FromStr for FourCC {
    type Err = InvalidFourCC;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let b: [u8; 4] = s.as_bytes().try_into().map_err(|_| InvalidFourCC(s.len()))?;
        Ok(FourCC(b))
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}
impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}
impl Serialize for FourCC {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&self.as_str_lossy())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoxHeader {
    pub start: u64,       // file offset of header start
    pub size: u64,        // total size including header, already resolved
    pub typ: FourCC,
    pub header_size: u64, // 8, or 16 with a 64-bit size
    /// Size field was 0: the box runs to the end of the stream.
    pub to_end: bool,
}

impl BoxHeader {
    pub fn end(&self) -> u64 {
        self.start + self.size
    }
}

/// Version and flags carried by "full" boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FullBoxHeader {
    pub version: u8,
    pub flags: u32, // 24 bits
}

/// Decoded payload of a box, one variant per recognized kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum BoxBody {
    Container(Vec<Mp4Box>),
    FileType(FtypData),
    Free,
    MovieHeader(MvhdData),
    TrackHeader(TkhdData),
    MediaHeader(MdhdData),
    Handler(HdlrData),
    VideoMediaHeader(VmhdData),
    SoundMediaHeader(SmhdData),
    HintMediaHeader(HmhdData),
    NullMediaHeader,
    EditList(ElstData),
    TimeToSample(SttsData),
    SampleToChunk(StscData),
    SampleSize(StszData),
    SyncSample(StssData),
    ChunkOffset(StcoData),
    ChunkOffset64(Co64Data),
    /// Unrecognized type; only the header was read.
    Opaque,
}

/// One node of the box tree.
#[derive(Debug, Clone, Serialize)]
pub struct Mp4Box {
    pub header: BoxHeader,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full: Option<FullBoxHeader>,
    pub body: BoxBody,
}

impl Mp4Box {
    pub fn typ(&self) -> FourCC {
        self.header.typ
    }

    pub fn offset(&self) -> u64 {
        self.header.start
    }

    pub fn size(&self) -> u64 {
        self.header.size
    }

    pub fn version(&self) -> Option<u8> {
        self.full.map(|f| f.version)
    }

    pub fn flags(&self) -> Option<u32> {
        self.full.map(|f| f.flags)
    }

    /// Children of a container box, `None` for leaves.
    pub fn children(&self) -> Option<&[Mp4Box]> {
        match &self.body {
            BoxBody::Container(kids) => Some(kids),
            _ => None,
        }
    }

    /// All boxes of type `typ` below this one. See [`find_boxes`].
    pub fn find_boxes(&self, typ: FourCC) -> Vec<&Mp4Box> {
        find_boxes(typ, self.children().unwrap_or(&[]))
    }

    /// First direct child of type `typ`.
    pub fn child(&self, typ: FourCC) -> Option<&Mp4Box> {
        self.children()?.iter().find(|b| b.typ() == typ)
    }
}

/// Depth-first search for boxes of type `typ` among `boxes` and their
/// descendants, in file order.
///
/// A matching box is collected but not searched further, so a match is never
/// reported from inside another match.
pub fn find_boxes(typ: FourCC, boxes: &[Mp4Box]) -> Vec<&Mp4Box> {
    fn walk<'a>(typ: FourCC, boxes: &'a [Mp4Box], out: &mut Vec<&'a Mp4Box>) {
        for b in boxes {
            if b.typ() == typ {
                out.push(b);
            } else if let Some(kids) = b.children() {
                walk(typ, kids, out);
            }
        }
    }

    let mut out = Vec::new();
    walk(typ, boxes, &mut out);
    out
}
