//! Sample number lookups over the decoded sample tables.
//!
//! Sample and chunk numbers are 1-based throughout, as stored in the file.
//! Queries take `i64` so out-of-range input (zero, negative) is answered with
//! `None` rather than being unrepresentable.

use crate::boxes::{BoxBody, Mp4Box};
use crate::registry::{StscData, StssData, StszData, SttsData};
use serde::Serialize;

impl StscData {
    /// Map a sample number to `(chunk_index, first_sample_in_chunk)`.
    ///
    /// Runs are walked in order; every run but the last covers
    /// `(next.first_chunk - first_chunk) * samples_per_chunk` samples, and the
    /// last run covers everything after that. Returns `None` for a sample
    /// number below 1, an empty table, or a last run with zero samples per
    /// chunk.
    pub fn resolve_chunk(&self, sample_index: i64) -> Option<(u64, u64)> {
        if sample_index <= 0 || self.entries.is_empty() {
            return None;
        }
        let sample = sample_index as u64;

        let mut cumulative = 0u64;
        let mut idx = 0;
        while idx + 1 < self.entries.len() {
            let run = &self.entries[idx];
            let next = &self.entries[idx + 1];
            let covered = (next.first_chunk as u64)
                .saturating_sub(run.first_chunk as u64)
                .saturating_mul(run.samples_per_chunk as u64);
            if sample <= cumulative.saturating_add(covered) {
                break;
            }
            cumulative += covered;
            idx += 1;
        }

        let run = &self.entries[idx];
        if run.samples_per_chunk == 0 {
            return None;
        }
        let per_chunk = run.samples_per_chunk as u64;
        let chunk_offset = (sample - cumulative - 1) / per_chunk;

        Some((
            run.first_chunk as u64 + chunk_offset,
            cumulative + chunk_offset * per_chunk + 1,
        ))
    }

    pub fn chunk_index(&self, sample_index: i64) -> Option<u64> {
        self.resolve_chunk(sample_index).map(|(chunk, _)| chunk)
    }

    pub fn first_sample_in_chunk(&self, sample_index: i64) -> Option<u64> {
        self.resolve_chunk(sample_index).map(|(_, first)| first)
    }
}

impl StszData {
    /// Size in bytes of sample `sample_index`, or `None` outside
    /// `1..=sample_count`.
    pub fn get_sample_size(&self, sample_index: i64) -> Option<u32> {
        if sample_index <= 0 || sample_index > self.sample_count as i64 {
            return None;
        }
        if self.sample_size != 0 {
            // All samples have the same size
            Some(self.sample_size)
        } else {
            self.sample_sizes.get((sample_index - 1) as usize).copied()
        }
    }
}

impl StssData {
    pub fn is_sync(&self, sample_index: i64) -> bool {
        u32::try_from(sample_index).is_ok_and(|n| self.sample_numbers.contains(&n))
    }
}

impl SttsData {
    /// Duration of sample `sample_index` in media timescale units.
    pub fn sample_delta(&self, sample_index: i64) -> Option<u32> {
        if sample_index <= 0 {
            return None;
        }
        let mut first = 1i64;
        for entry in &self.entries {
            let end = first + entry.sample_count as i64;
            if sample_index < end {
                return Some(entry.sample_delta);
            }
            first = end;
        }
        None
    }
}

/// Where a sample lives in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SampleLocation {
    pub chunk: u64,
    pub offset: u64,
    pub size: u32,
}

#[derive(Debug, Clone, Copy)]
enum ChunkOffsets<'a> {
    Short(&'a [u32]),
    Long(&'a [u64]),
}

impl ChunkOffsets<'_> {
    fn get(&self, chunk: u64) -> Option<u64> {
        let idx = usize::try_from(chunk.checked_sub(1)?).ok()?;
        match self {
            ChunkOffsets::Short(v) => v.get(idx).map(|&o| o as u64),
            ChunkOffsets::Long(v) => v.get(idx).copied(),
        }
    }
}

/// The tables of one sample table (`stbl`) box, joined for lookups.
#[derive(Debug, Clone, Copy)]
pub struct SampleTable<'a> {
    pub stsc: &'a StscData,
    pub stsz: &'a StszData,
    pub stss: Option<&'a StssData>,
    pub stts: Option<&'a SttsData>,
    offsets: ChunkOffsets<'a>,
}

impl<'a> SampleTable<'a> {
    /// Collect the tables from the children of `stbl`. Returns `None` unless
    /// sample-to-chunk, sample-size and one chunk-offset table are present.
    pub fn from_stbl(stbl: &'a Mp4Box) -> Option<Self> {
        let mut stsc = None;
        let mut stsz = None;
        let mut stss = None;
        let mut stts = None;
        let mut offsets = None;

        for child in stbl.children()? {
            match &child.body {
                BoxBody::SampleToChunk(d) => stsc = Some(d),
                BoxBody::SampleSize(d) => stsz = Some(d),
                BoxBody::SyncSample(d) => stss = Some(d),
                BoxBody::TimeToSample(d) => stts = Some(d),
                BoxBody::ChunkOffset(d) => offsets = Some(ChunkOffsets::Short(&d.chunk_offsets)),
                BoxBody::ChunkOffset64(d) => offsets = Some(ChunkOffsets::Long(&d.chunk_offsets)),
                _ => {}
            }
        }

        Some(SampleTable {
            stsc: stsc?,
            stsz: stsz?,
            stss,
            stts,
            offsets: offsets?,
        })
    }

    pub fn sample_count(&self) -> u32 {
        self.stsz.sample_count
    }

    /// Chunk, absolute byte offset and size of sample `sample_index`.
    ///
    /// The offset is the chunk's offset plus the sizes of the samples that
    /// precede this one in the same chunk. `None` when the sample is out of
    /// range or the offset does not fit in 64 bits.
    pub fn sample_location(&self, sample_index: i64) -> Option<SampleLocation> {
        let size = self.stsz.get_sample_size(sample_index)?;
        let (chunk, first) = self.stsc.resolve_chunk(sample_index)?;
        let mut offset = self.offsets.get(chunk)?;
        for s in first..sample_index as u64 {
            offset = offset.checked_add(self.stsz.get_sample_size(s as i64)? as u64)?;
        }
        Some(SampleLocation {
            chunk,
            offset,
            size,
        })
    }

    /// Without a sync sample table every sample is a sync sample.
    pub fn is_sync(&self, sample_index: i64) -> bool {
        match self.stss {
            Some(stss) => stss.is_sync(sample_index),
            None => sample_index > 0 && sample_index <= self.sample_count() as i64,
        }
    }
}
