use crate::boxes::{BoxBody, FourCC, Mp4Box, find_boxes};
use crate::parser::{ParseError, ParseOptions, Result, parse_box};
use crate::registry::HandlerType;
use crate::samples::SampleTable;
use log::debug;
use serde::Serialize;
use std::io::{Read, Seek, SeekFrom};

/// A decoded file: the top-level boxes in file order.
#[derive(Debug, Clone, Serialize)]
pub struct Mp4File {
    pub size: u64,
    pub boxes: Vec<Mp4Box>,
}

impl Mp4File {
    /// Decode `size` bytes of boxes starting at the current position of `r`.
    ///
    /// # Example
    /// ```no_run
    /// use mp4tree::Mp4File;
    /// use std::fs::File;
    ///
    /// let mut file = File::open("video.mp4")?;
    /// let size = file.metadata()?.len();
    /// let mp4 = Mp4File::read(&mut file, size)?;
    /// println!("{} top-level boxes", mp4.boxes.len());
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn read<R: Read + Seek>(r: &mut R, size: u64) -> Result<Self> {
        Self::read_with_options(r, size, &ParseOptions::default())
    }

    pub fn read_with_options<R: Read + Seek>(
        r: &mut R,
        size: u64,
        options: &ParseOptions,
    ) -> Result<Self> {
        let end = r
            .stream_position()?
            .checked_add(size)
            .ok_or(ParseError::Truncated)?;

        let mut consumed = 0u64;
        let mut boxes = Vec::new();
        while consumed < size {
            let b = parse_box(r, end, options)?;
            consumed += b.size();
            boxes.push(b);
        }
        debug!("decoded {} top-level boxes from {} bytes", boxes.len(), size);

        Ok(Mp4File { size, boxes })
    }

    /// Decode a whole source, measuring its length first.
    pub fn from_reader<R: Read + Seek>(mut r: R) -> Result<Self> {
        let size = r.seek(SeekFrom::End(0))?;
        r.seek(SeekFrom::Start(0))?;
        Self::read(&mut r, size)
    }

    /// All boxes of type `typ` anywhere in the tree, in file order. A box that
    /// matches is not searched for further matches inside it.
    pub fn find_boxes(&self, typ: FourCC) -> Vec<&Mp4Box> {
        find_boxes(typ, &self.boxes)
    }

    /// One entry per track box (`trak`) in the file.
    pub fn tracks(&self) -> Vec<Track<'_>> {
        self.find_boxes(FourCC(*b"trak"))
            .into_iter()
            .map(Track::new)
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Summary of one track box, borrowing from the decoded tree.
#[derive(Debug, Clone)]
pub struct Track<'a> {
    pub trak: &'a Mp4Box,
    pub track_id: Option<u32>,
    pub handler_type: Option<HandlerType>,
    pub timescale: Option<u32>,
    pub samples: Option<SampleTable<'a>>,
}

impl<'a> Track<'a> {
    fn new(trak: &'a Mp4Box) -> Self {
        let mut track = Track {
            trak,
            track_id: None,
            handler_type: None,
            timescale: None,
            samples: None,
        };

        for b in trak.find_boxes(FourCC(*b"tkhd")) {
            if let BoxBody::TrackHeader(tkhd) = &b.body {
                track.track_id = Some(tkhd.track_id);
            }
        }
        for b in trak.find_boxes(FourCC(*b"hdlr")) {
            if let BoxBody::Handler(hdlr) = &b.body {
                track.handler_type = Some(hdlr.handler_type);
            }
        }
        for b in trak.find_boxes(FourCC(*b"mdhd")) {
            if let BoxBody::MediaHeader(mdhd) = &b.body {
                track.timescale = Some(mdhd.timescale);
            }
        }
        track.samples = trak
            .find_boxes(FourCC(*b"stbl"))
            .into_iter()
            .find_map(SampleTable::from_stbl);

        track
    }
}
