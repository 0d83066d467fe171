use crate::boxes::{BoxBody, BoxHeader, FourCC, FullBoxHeader};
use crate::known_boxes::KnownBox;
use crate::parser::{BoxReader, ParseError, ParseOptions, Result};
use crate::util::{
    FixedPoint, be_i16, be_i32, be_u16, be_u32, be_u64, lang_from_u16, read_fixed, read_fourcc,
    read_int, read_signed_fixed, read_uint, skip_reserved,
};
use serde::Serialize;
use std::io::Read;

/// File Type Box data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FtypData {
    pub major_brand: FourCC,
    pub minor_version: u32,
    pub compatible_brands: Vec<FourCC>,
}

/// Movie Header Box data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MvhdData {
    pub creation_time: u64,
    pub modification_time: u64,
    pub timescale: u32,
    pub duration: u64,
    pub rate: FixedPoint,
    pub volume: FixedPoint,
    pub matrix: [i32; 9],
    pub next_track_id: u32,
}

/// Track Header Box data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TkhdData {
    pub creation_time: u64,
    pub modification_time: u64,
    pub track_id: u32,
    pub duration: u64,
    pub layer: i16,
    pub alternate_group: i16,
    pub volume: FixedPoint,
    pub matrix: [i32; 9],
    pub width: FixedPoint,
    pub height: FixedPoint,
}

/// Media Header Box data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MdhdData {
    pub creation_time: u64,
    pub modification_time: u64,
    pub timescale: u32,
    pub duration: u64,
    pub language: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HandlerType {
    #[serde(rename = "vide")]
    Video,
    #[serde(rename = "soun")]
    Sound,
    #[serde(rename = "hint")]
    Hint,
    #[serde(rename = "meta")]
    Metadata,
    #[serde(rename = "auxv")]
    Auxiliary,
}

impl HandlerType {
    pub fn from_fourcc(cc: FourCC) -> Option<Self> {
        match &cc.0 {
            b"vide" => Some(HandlerType::Video),
            b"soun" => Some(HandlerType::Sound),
            b"hint" => Some(HandlerType::Hint),
            b"meta" => Some(HandlerType::Metadata),
            b"auxv" => Some(HandlerType::Auxiliary),
            _ => None,
        }
    }

    pub fn fourcc(&self) -> FourCC {
        FourCC(match self {
            HandlerType::Video => *b"vide",
            HandlerType::Sound => *b"soun",
            HandlerType::Hint => *b"hint",
            HandlerType::Metadata => *b"meta",
            HandlerType::Auxiliary => *b"auxv",
        })
    }
}

/// Handler Reference Box data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HdlrData {
    pub handler_type: HandlerType,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VmhdData {
    pub graphics_mode: u16,
    pub opcolor: [u16; 3],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmhdData {
    pub balance: FixedPoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HmhdData {
    pub max_pdu_size: u16,
    pub avg_pdu_size: u16,
    pub max_bitrate: u32,
    pub avg_bitrate: u32,
}

/// Edit List Box data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElstData {
    pub entries: Vec<ElstEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElstEntry {
    pub segment_duration: u64,
    pub media_time: i64,
    pub media_rate_integer: i16,
    pub media_rate_fraction: i16,
}

/// Decoding Time-to-Sample Box data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SttsData {
    pub entries: Vec<SttsEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SttsEntry {
    pub sample_count: u32,
    pub sample_delta: u32,
}

/// Sample-to-Chunk Box data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StscData {
    pub entries: Vec<StscEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StscEntry {
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    pub sample_description_index: u32,
}

/// Sample Size Box data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StszData {
    pub sample_size: u32,
    pub sample_count: u32,
    pub sample_sizes: Vec<u32>, // Empty if sample_size > 0
}

/// Sync Sample Box data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StssData {
    pub sample_numbers: Vec<u32>,
}

/// Chunk Offset Box data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StcoData {
    pub chunk_offsets: Vec<u32>,
}

/// 64-bit Chunk Offset Box data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Co64Data {
    pub chunk_offsets: Vec<u64>,
}

// ---------- Dispatch ----------

/// Decode the payload of a leaf box. `r` is positioned after the header and,
/// for full boxes, after version and flags.
///
/// Free space and unrecognized types read nothing; the caller skips them.
pub fn decode_payload<R: Read>(
    kind: KnownBox,
    header: &BoxHeader,
    full: Option<&FullBoxHeader>,
    r: &mut BoxReader<'_, R>,
    options: &ParseOptions,
) -> Result<BoxBody> {
    let typ = header.typ;
    let version = full.map(|f| f.version).unwrap_or(0);

    let body = match kind {
        KnownBox::Moov
        | KnownBox::Trak
        | KnownBox::Edts
        | KnownBox::Mdia
        | KnownBox::Minf
        | KnownBox::Stbl => {
            return Err(ParseError::Structural {
                typ,
                reason: "container has no leaf layout",
            });
        }
        KnownBox::Ftyp => BoxBody::FileType(decode_ftyp(r)?),
        KnownBox::Free | KnownBox::Skip => BoxBody::Free,
        KnownBox::Mvhd => BoxBody::MovieHeader(decode_mvhd(r, version)?),
        KnownBox::Tkhd => BoxBody::TrackHeader(decode_tkhd(r, version)?),
        KnownBox::Mdhd => BoxBody::MediaHeader(decode_mdhd(r, version)?),
        KnownBox::Hdlr => BoxBody::Handler(decode_hdlr(r, typ)?),
        KnownBox::Vmhd => BoxBody::VideoMediaHeader(decode_vmhd(r)?),
        KnownBox::Smhd => BoxBody::SoundMediaHeader(decode_smhd(r)?),
        KnownBox::Hmhd => BoxBody::HintMediaHeader(decode_hmhd(r)?),
        KnownBox::Nmhd => BoxBody::NullMediaHeader,
        KnownBox::Elst => BoxBody::EditList(decode_elst(r, typ, version, options)?),
        KnownBox::Stts => BoxBody::TimeToSample(decode_stts(r, typ, options)?),
        KnownBox::Stsc => BoxBody::SampleToChunk(decode_stsc(r, typ, options)?),
        KnownBox::Stsz => BoxBody::SampleSize(decode_stsz(r, typ, options)?),
        KnownBox::Stss => BoxBody::SyncSample(decode_stss(r, typ, options)?),
        KnownBox::Stco => BoxBody::ChunkOffset(decode_stco(r, typ, options)?),
        KnownBox::Co64 => BoxBody::ChunkOffset64(decode_co64(r, typ, options)?),
        KnownBox::Unknown(_) => BoxBody::Opaque,
    };
    Ok(body)
}

// ---------- Helpers ----------

/// Read a table's leading count and make sure `count` records of
/// `record_len` bytes fit in what is left of the box before allocating.
fn read_entry_count<R: Read>(
    r: &mut BoxReader<'_, R>,
    typ: FourCC,
    record_len: u64,
    options: &ParseOptions,
) -> Result<u32> {
    let count = be_u32(r)?;
    check_table(r, typ, count, record_len, options)?;
    Ok(count)
}

fn check_table<R>(
    r: &BoxReader<'_, R>,
    typ: FourCC,
    count: u32,
    record_len: u64,
    options: &ParseOptions,
) -> Result<()> {
    if count > options.max_table_entries {
        return Err(ParseError::Structural {
            typ,
            reason: "table entry count exceeds the configured limit",
        });
    }
    if count as u64 * record_len > r.remaining() {
        return Err(ParseError::Truncated);
    }
    Ok(())
}

fn read_matrix<R: Read>(r: &mut R) -> Result<[i32; 9]> {
    let mut m = [0i32; 9];
    for v in m.iter_mut() {
        *v = be_i32(r)?;
    }
    Ok(m)
}

/// Time or duration field: 64-bit in version 1 boxes, 32-bit otherwise.
fn time_bits(version: u8) -> u32 {
    if version == 1 { 64 } else { 32 }
}

fn read_time<R: Read>(r: &mut R, version: u8) -> Result<u64> {
    read_uint(r, time_bits(version))
}

// ---------- Decoders ----------

// ftyp: major + minor + compatible brands up to the end of the box
fn decode_ftyp<R: Read>(r: &mut BoxReader<'_, R>) -> Result<FtypData> {
    let major_brand = read_fourcc(r)?;
    let minor_version = be_u32(r)?;
    let mut compatible_brands = Vec::new();
    while r.remaining() > 0 {
        compatible_brands.push(read_fourcc(r)?);
    }
    Ok(FtypData {
        major_brand,
        minor_version,
        compatible_brands,
    })
}

fn decode_mvhd<R: Read>(r: &mut BoxReader<'_, R>, version: u8) -> Result<MvhdData> {
    let creation_time = read_time(r, version)?;
    let modification_time = read_time(r, version)?;
    let timescale = be_u32(r)?;
    let duration = read_time(r, version)?;
    let rate = read_signed_fixed(r, 32)?;
    let volume = read_signed_fixed(r, 16)?;
    // reserved: u16 + 2 * u32
    skip_reserved(r, 10)?;
    let matrix = read_matrix(r)?;
    // pre_defined: 6 * u32
    skip_reserved(r, 24)?;
    let next_track_id = be_u32(r)?;

    Ok(MvhdData {
        creation_time,
        modification_time,
        timescale,
        duration,
        rate,
        volume,
        matrix,
        next_track_id,
    })
}

fn decode_tkhd<R: Read>(r: &mut BoxReader<'_, R>, version: u8) -> Result<TkhdData> {
    let creation_time = read_time(r, version)?;
    let modification_time = read_time(r, version)?;
    let track_id = be_u32(r)?;
    skip_reserved(r, 4)?;
    let duration = read_time(r, version)?;
    skip_reserved(r, 8)?;
    let layer = be_i16(r)?;
    let alternate_group = be_i16(r)?;
    let volume = read_signed_fixed(r, 16)?;
    skip_reserved(r, 2)?;
    let matrix = read_matrix(r)?;
    let width = read_fixed(r, 32)?;
    let height = read_fixed(r, 32)?;

    Ok(TkhdData {
        creation_time,
        modification_time,
        track_id,
        duration,
        layer,
        alternate_group,
        volume,
        matrix,
        width,
        height,
    })
}

// mdhd: times, timescale, duration, language
fn decode_mdhd<R: Read>(r: &mut BoxReader<'_, R>, version: u8) -> Result<MdhdData> {
    let creation_time = read_time(r, version)?;
    let modification_time = read_time(r, version)?;
    let timescale = be_u32(r)?;
    let duration = read_time(r, version)?;
    let language_code = be_u16(r)? & 0x7FFF;
    let _pre_defined = be_u16(r)?;

    Ok(MdhdData {
        creation_time,
        modification_time,
        timescale,
        duration,
        language: lang_from_u16(language_code),
    })
}

// hdlr: handler type + name
fn decode_hdlr<R: Read>(r: &mut BoxReader<'_, R>, typ: FourCC) -> Result<HdlrData> {
    let pre_defined = be_u32(r)?;
    if pre_defined != 0 {
        return Err(ParseError::Structural {
            typ,
            reason: "pre_defined must be zero",
        });
    }

    let handler = read_fourcc(r)?;
    let handler_type = HandlerType::from_fourcc(handler).ok_or(ParseError::Structural {
        typ,
        reason: "unsupported handler type",
    })?;

    // reserved (3 * 4 bytes)
    skip_reserved(r, 12)?;

    // name runs to the end of the box; the last byte is its terminator
    let mut name_bytes = Vec::new();
    r.read_to_end(&mut name_bytes)?;
    name_bytes.pop();
    let name = String::from_utf8_lossy(&name_bytes).to_string();

    Ok(HdlrData { handler_type, name })
}

fn decode_vmhd<R: Read>(r: &mut BoxReader<'_, R>) -> Result<VmhdData> {
    let graphics_mode = be_u16(r)?;
    let mut opcolor = [0u16; 3];
    for c in opcolor.iter_mut() {
        *c = be_u16(r)?;
    }
    Ok(VmhdData {
        graphics_mode,
        opcolor,
    })
}

fn decode_smhd<R: Read>(r: &mut BoxReader<'_, R>) -> Result<SmhdData> {
    let balance = read_signed_fixed(r, 16)?;
    skip_reserved(r, 2)?;
    Ok(SmhdData { balance })
}

fn decode_hmhd<R: Read>(r: &mut BoxReader<'_, R>) -> Result<HmhdData> {
    let max_pdu_size = be_u16(r)?;
    let avg_pdu_size = be_u16(r)?;
    let max_bitrate = be_u32(r)?;
    let avg_bitrate = be_u32(r)?;
    skip_reserved(r, 4)?;
    Ok(HmhdData {
        max_pdu_size,
        avg_pdu_size,
        max_bitrate,
        avg_bitrate,
    })
}

// elst: edit list
fn decode_elst<R: Read>(
    r: &mut BoxReader<'_, R>,
    typ: FourCC,
    version: u8,
    options: &ParseOptions,
) -> Result<ElstData> {
    let record_len = if version == 1 { 20 } else { 12 };
    let entry_count = read_entry_count(r, typ, record_len, options)?;

    let mut entries = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        entries.push(ElstEntry {
            segment_duration: read_time(r, version)?,
            media_time: read_int(r, time_bits(version))?,
            media_rate_integer: be_i16(r)?,
            media_rate_fraction: be_i16(r)?,
        });
    }
    Ok(ElstData { entries })
}

// stts: time-to-sample
fn decode_stts<R: Read>(
    r: &mut BoxReader<'_, R>,
    typ: FourCC,
    options: &ParseOptions,
) -> Result<SttsData> {
    let entry_count = read_entry_count(r, typ, 8, options)?;
    let mut entries = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        entries.push(SttsEntry {
            sample_count: be_u32(r)?,
            sample_delta: be_u32(r)?,
        });
    }
    Ok(SttsData { entries })
}

// stsc: sample-to-chunk
fn decode_stsc<R: Read>(
    r: &mut BoxReader<'_, R>,
    typ: FourCC,
    options: &ParseOptions,
) -> Result<StscData> {
    let entry_count = read_entry_count(r, typ, 12, options)?;
    let mut entries = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        entries.push(StscEntry {
            first_chunk: be_u32(r)?,
            samples_per_chunk: be_u32(r)?,
            sample_description_index: be_u32(r)?,
        });
    }
    Ok(StscData { entries })
}

// stsz: sample sizes
fn decode_stsz<R: Read>(
    r: &mut BoxReader<'_, R>,
    typ: FourCC,
    options: &ParseOptions,
) -> Result<StszData> {
    let sample_size = be_u32(r)?;
    let sample_count = be_u32(r)?;
    let mut sample_sizes = Vec::new();

    // If sample_size is 0, each sample has its own size
    if sample_size == 0 {
        check_table(r, typ, sample_count, 4, options)?;
        sample_sizes.reserve_exact(sample_count as usize);
        for _ in 0..sample_count {
            sample_sizes.push(be_u32(r)?);
        }
    }

    Ok(StszData {
        sample_size,
        sample_count,
        sample_sizes,
    })
}

// stss: sync sample table
fn decode_stss<R: Read>(
    r: &mut BoxReader<'_, R>,
    typ: FourCC,
    options: &ParseOptions,
) -> Result<StssData> {
    let entry_count = read_entry_count(r, typ, 4, options)?;
    let mut sample_numbers = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        sample_numbers.push(be_u32(r)?);
    }
    Ok(StssData { sample_numbers })
}

// stco: 32-bit chunk offsets
fn decode_stco<R: Read>(
    r: &mut BoxReader<'_, R>,
    typ: FourCC,
    options: &ParseOptions,
) -> Result<StcoData> {
    let entry_count = read_entry_count(r, typ, 4, options)?;
    let mut chunk_offsets = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        chunk_offsets.push(be_u32(r)?);
    }
    Ok(StcoData { chunk_offsets })
}

// co64: 64-bit chunk offsets
fn decode_co64<R: Read>(
    r: &mut BoxReader<'_, R>,
    typ: FourCC,
    options: &ParseOptions,
) -> Result<Co64Data> {
    let entry_count = read_entry_count(r, typ, 8, options)?;
    let mut chunk_offsets = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        chunk_offsets.push(be_u64(r)?);
    }
    Ok(Co64Data { chunk_offsets })
}
