mod common;

use common::*;
use mp4tree::boxes::{BoxBody, FourCC, Mp4Box};
use mp4tree::registry::HandlerType;
use mp4tree::{Mp4File, ParseError, ParseOptions};
use std::io::{Cursor, Seek, SeekFrom};

fn movie() -> Vec<u8> {
    let stbl = container(
        b"stbl",
        &[
            full_box(b"stts", 0, 0, &be32(&[1, 4, 512])),
            stsc(&[(1, 2, 1)]),
            stsz(0, 4, &[100, 200, 300, 400]),
            stco(&[1000, 5000]),
        ],
    );
    let minf = container(b"minf", &[full_box(b"vmhd", 0, 1, &[0; 8]), stbl]);
    let mdia = container(b"mdia", &[mdhd_v0(12800), hdlr(b"vide", "VideoHandler"), minf]);
    let trak = container(b"trak", &[tkhd_v0(1), mdia]);
    container(b"moov", &[trak])
}

fn check_sizes(b: &Mp4Box) {
    if let Some(kids) = b.children() {
        let sum: u64 = kids.iter().map(|k| k.size()).sum();
        assert_eq!(sum + b.header.header_size, b.size(), "'{}'", b.typ());
        kids.iter().for_each(check_sizes);
    }
}

#[test]
fn container_children_fill_declared_size() {
    let mut bytes = ftyp();
    bytes.extend_from_slice(&movie());
    let file = parse(bytes.clone()).unwrap();

    assert_eq!(file.size, bytes.len() as u64);
    assert_eq!(file.boxes.len(), 2);
    let total: u64 = file.boxes.iter().map(|b| b.size()).sum();
    assert_eq!(total, file.size);
    file.boxes.iter().for_each(check_sizes);

    let stbl = file.find_boxes(FourCC(*b"stbl"));
    assert_eq!(stbl.len(), 1);
    assert_eq!(stbl[0].children().map(|k| k.len()), Some(4));
}

#[test]
fn unknown_top_level_box_is_skipped() {
    let mut bytes = ftyp();
    bytes.extend_from_slice(&mp4_box(b"wxyz", &[0xAB; 33]));
    bytes.extend_from_slice(&movie());
    let file = parse(bytes).unwrap();

    let types: Vec<FourCC> = file.boxes.iter().map(|b| b.typ()).collect();
    assert_eq!(
        types,
        vec![FourCC(*b"ftyp"), FourCC(*b"wxyz"), FourCC(*b"moov")]
    );
    assert!(matches!(file.boxes[0].body, BoxBody::FileType(_)));
    assert!(matches!(file.boxes[1].body, BoxBody::Opaque));
    assert_eq!(file.boxes[1].size(), 41);
    assert_eq!(file.tracks().len(), 1);
}

#[test]
fn unknown_child_inside_container_is_skipped() {
    let moov = container(b"moov", &[mp4_box(b"udta", &[1, 2, 3]), movie()]);
    let file = parse(moov).unwrap();
    let kids = file.boxes[0].children().unwrap();
    assert_eq!(kids[0].typ(), FourCC(*b"udta"));
    assert!(matches!(kids[0].body, BoxBody::Opaque));
    assert_eq!(kids[1].typ(), FourCC(*b"moov"));
}

#[test]
fn free_space_is_skipped() {
    let mut bytes = mp4_box(b"free", &[0u8; 16]);
    bytes.extend_from_slice(&ftyp());
    let file = parse(bytes).unwrap();
    assert!(matches!(file.boxes[0].body, BoxBody::Free));
    assert_eq!(file.boxes[0].size(), 24);
    assert!(matches!(file.boxes[1].body, BoxBody::FileType(_)));
}

#[test]
fn find_boxes_does_not_descend_into_matches() {
    let inner = container(b"edts", &[full_box(b"elst", 0, 0, &be32(&[0]))]);
    let outer = container(b"edts", &[inner]);
    let file = parse(container(b"moov", &[outer])).unwrap();

    let edts = file.find_boxes(FourCC(*b"edts"));
    assert_eq!(edts.len(), 1);
    assert_eq!(edts[0].offset(), 8);
    assert_eq!(file.find_boxes(FourCC(*b"elst")).len(), 1);
    assert!(file.find_boxes(FourCC(*b"stsz")).is_empty());

    // searching from a box looks at its descendants only
    let moov = &file.boxes[0];
    assert!(moov.find_boxes(FourCC(*b"moov")).is_empty());
    assert_eq!(moov.find_boxes(FourCC(*b"elst")).len(), 1);
}

#[test]
fn find_boxes_keeps_file_order() {
    let moov = container(
        b"moov",
        &[
            container(b"trak", &[tkhd_v0(1)]),
            container(b"trak", &[tkhd_v0(2)]),
        ],
    );
    let file = parse(moov).unwrap();
    let ids: Vec<u32> = file
        .find_boxes(FourCC(*b"tkhd"))
        .iter()
        .filter_map(|b| match &b.body {
            BoxBody::TrackHeader(d) => Some(d.track_id),
            _ => None,
        })
        .collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn child_overrunning_parent_is_structural() {
    // moov claims 16 bytes; its child claims 16 as well
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&16u32.to_be_bytes());
    bytes.extend_from_slice(b"moov");
    bytes.extend_from_slice(&16u32.to_be_bytes());
    bytes.extend_from_slice(b"trak");
    bytes.extend_from_slice(&[0u8; 8]);

    match parse(bytes) {
        Err(ParseError::Structural { typ, .. }) => assert_eq!(typ, FourCC(*b"trak")),
        other => panic!("expected structural error, got {other:?}"),
    }
}

#[test]
fn top_level_box_past_end_is_truncated() {
    let mut bytes = ftyp();
    bytes.extend_from_slice(&100u32.to_be_bytes());
    bytes.extend_from_slice(b"mdat");
    bytes.extend_from_slice(&[0u8; 10]);
    assert!(matches!(parse(bytes), Err(ParseError::Truncated)));
}

#[test]
fn rest_of_stream_box_at_end() {
    let mut bytes = ftyp();
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(b"mdat");
    bytes.extend_from_slice(&[0u8; 40]);
    let file = parse(bytes).unwrap();

    assert_eq!(file.boxes.len(), 2);
    assert!(file.boxes[1].header.to_end);
    assert_eq!(file.boxes[1].size(), 48);
}

#[test]
fn rest_of_stream_box_that_is_not_last_is_rejected() {
    // a size-0 free box inside moov, with more data after moov
    let mut moov = Vec::new();
    moov.extend_from_slice(&16u32.to_be_bytes());
    moov.extend_from_slice(b"moov");
    moov.extend_from_slice(&0u32.to_be_bytes());
    moov.extend_from_slice(b"free");
    let mut bytes = moov;
    bytes.extend_from_slice(&ftyp());

    match parse(bytes) {
        Err(ParseError::Structural { typ, .. }) => assert_eq!(typ, FourCC(*b"free")),
        other => panic!("expected structural error, got {other:?}"),
    }
}

#[test]
fn nesting_limit() {
    let options = ParseOptions::default().with_max_depth(1);
    match parse_with(movie(), &options) {
        Err(ParseError::Structural { typ, .. }) => assert_eq!(typ, FourCC(*b"trak")),
        other => panic!("expected structural error, got {other:?}"),
    }
    assert!(parse_with(movie(), &ParseOptions::default().with_max_depth(5)).is_ok());
}

#[test]
fn from_reader_measures_the_source() {
    let mut bytes = ftyp();
    bytes.extend_from_slice(&movie());
    let mut cur = Cursor::new(bytes.clone());
    cur.seek(SeekFrom::Start(10)).unwrap();

    let file = Mp4File::from_reader(cur).unwrap();
    assert_eq!(file.size, bytes.len() as u64);
    assert_eq!(file.boxes.len(), 2);
}

#[test]
fn tracks_summarise_trak_boxes() {
    let mut bytes = ftyp();
    bytes.extend_from_slice(&movie());
    let file = parse(bytes).unwrap();

    let tracks = file.tracks();
    assert_eq!(tracks.len(), 1);
    let t = &tracks[0];
    assert_eq!(t.track_id, Some(1));
    assert_eq!(t.handler_type, Some(HandlerType::Video));
    assert_eq!(t.timescale, Some(12800));

    let samples = t.samples.expect("sample table");
    assert_eq!(samples.sample_count(), 4);
    assert_eq!(samples.stts.and_then(|s| s.sample_delta(4)), Some(512));
    assert_eq!(samples.sample_location(4).map(|l| (l.chunk, l.offset)), Some((2, 5300)));
    // no stss: every sample is a sync sample
    assert!(samples.is_sync(2));
}

#[test]
fn declared_length_past_u64_range_is_truncated() {
    let mut cur = Cursor::new(ftyp());
    cur.seek(SeekFrom::Start(10)).unwrap();
    assert!(matches!(
        Mp4File::read(&mut cur, u64::MAX),
        Err(ParseError::Truncated)
    ));
}
