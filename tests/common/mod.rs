#![allow(dead_code)]

use mp4tree::{Mp4File, ParseOptions};
use std::io::Cursor;

/// Plain box: 32-bit size, type, payload.
pub fn mp4_box(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&(8 + payload.len() as u32).to_be_bytes());
    v.extend_from_slice(typ);
    v.extend_from_slice(payload);
    v
}

/// Box with version and 24-bit flags ahead of the payload.
pub fn full_box(typ: &[u8; 4], version: u8, flags: u32, payload: &[u8]) -> Vec<u8> {
    let mut p = vec![version];
    p.extend_from_slice(&flags.to_be_bytes()[1..]);
    p.extend_from_slice(payload);
    mp4_box(typ, &p)
}

pub fn container(typ: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
    mp4_box(typ, &children.concat())
}

pub fn be32(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

pub fn ftyp() -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(b"isom");
    p.extend_from_slice(&512u32.to_be_bytes());
    p.extend_from_slice(b"isom");
    p.extend_from_slice(b"iso2");
    mp4_box(b"ftyp", &p)
}

pub fn hdlr(handler: &[u8; 4], name: &str) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&0u32.to_be_bytes()); // pre_defined
    p.extend_from_slice(handler);
    p.extend_from_slice(&[0u8; 12]);
    p.extend_from_slice(name.as_bytes());
    p.push(0);
    full_box(b"hdlr", 0, 0, &p)
}

pub const IDENTITY: [i32; 9] = [0x10000, 0, 0, 0, 0x10000, 0, 0, 0, 0x4000_0000];

pub fn matrix_bytes() -> Vec<u8> {
    IDENTITY.iter().flat_map(|v| v.to_be_bytes()).collect()
}

/// Version 0 track header: 1280x720, track id as given.
pub fn tkhd_v0(track_id: u32) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&be32(&[10, 20, track_id, 0, 3000]));
    p.extend_from_slice(&[0u8; 8]); // reserved
    p.extend_from_slice(&0i16.to_be_bytes()); // layer
    p.extend_from_slice(&0i16.to_be_bytes()); // alternate_group
    p.extend_from_slice(&0x0100i16.to_be_bytes()); // volume 1.0
    p.extend_from_slice(&[0u8; 2]);
    p.extend_from_slice(&matrix_bytes());
    p.extend_from_slice(&(1280u32 << 16).to_be_bytes());
    p.extend_from_slice(&(720u32 << 16).to_be_bytes());
    full_box(b"tkhd", 0, 3, &p)
}

/// Version 0 media header, timescale as given, language "eng".
pub fn mdhd_v0(timescale: u32) -> Vec<u8> {
    let mut p = be32(&[1, 2, timescale, 9000]);
    // 'e' = 5, 'n' = 14, 'g' = 7
    let lang: u16 = (5 << 10) | (14 << 5) | 7;
    p.extend_from_slice(&lang.to_be_bytes());
    p.extend_from_slice(&[0u8; 2]);
    full_box(b"mdhd", 0, 0, &p)
}

pub fn stsc(runs: &[(u32, u32, u32)]) -> Vec<u8> {
    let mut p = be32(&[runs.len() as u32]);
    for &(first, per_chunk, desc) in runs {
        p.extend_from_slice(&be32(&[first, per_chunk, desc]));
    }
    full_box(b"stsc", 0, 0, &p)
}

pub fn stsz(sample_size: u32, sample_count: u32, sizes: &[u32]) -> Vec<u8> {
    let mut p = be32(&[sample_size, sample_count]);
    p.extend_from_slice(&be32(sizes));
    full_box(b"stsz", 0, 0, &p)
}

pub fn stco(offsets: &[u32]) -> Vec<u8> {
    let mut p = be32(&[offsets.len() as u32]);
    p.extend_from_slice(&be32(offsets));
    full_box(b"stco", 0, 0, &p)
}

pub fn stss(samples: &[u32]) -> Vec<u8> {
    let mut p = be32(&[samples.len() as u32]);
    p.extend_from_slice(&be32(samples));
    full_box(b"stss", 0, 0, &p)
}

pub fn parse(bytes: Vec<u8>) -> mp4tree::Result<Mp4File> {
    let len = bytes.len() as u64;
    Mp4File::read(&mut Cursor::new(bytes), len)
}

pub fn parse_with(bytes: Vec<u8>, options: &ParseOptions) -> mp4tree::Result<Mp4File> {
    let len = bytes.len() as u64;
    Mp4File::read_with_options(&mut Cursor::new(bytes), len, options)
}
