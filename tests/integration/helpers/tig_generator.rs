//! Synthetic genomes, reads and layouts for end-to-end tests.

#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// A deterministic pseudo-random genome.
pub fn genome(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            b"ACGT"[(state % 4) as usize]
        })
        .collect()
}

pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&b| match b {
            b'A' => b'T',
            b'C' => b'G',
            b'G' => b'C',
            b'T' => b'A',
            other => other,
        })
        .collect()
}

/// A read in a synthetic tig: its id, layout span (`bgn > end` when reversed) and anchor.
#[derive(Clone, Debug)]
pub struct SimRead {
    pub id: u32,
    pub bgn: i32,
    pub end: i32,
    pub anchor: Option<(u32, i32, i32)>,
    pub sequence: Vec<u8>,
}

/// A tig and the genome it was sampled from.
#[derive(Clone, Debug)]
pub struct SimTig {
    pub id: u32,
    pub genome: Vec<u8>,
    pub reads: Vec<SimRead>,
    pub consensus: Option<Vec<u8>>,
    pub extra_children: Vec<String>,
}

impl SimTig {
    /// Reads of `read_len` every `step` bases, every other one reverse complemented, each
    /// anchored on the one before.
    pub fn tiled(
        id: u32,
        first_read: u32,
        genome_len: usize,
        read_len: usize,
        step: usize,
    ) -> Self {
        let genome = genome(genome_len, u64::from(id) * 7919);
        let mut reads: Vec<SimRead> = Vec::new();
        let mut start = 0;
        while start + read_len <= genome_len {
            let id = first_read + reads.len() as u32;
            let forward = genome[start..start + read_len].to_vec();
            let reverse = reads.len() % 2 == 1;
            let (bgn, end) = if reverse {
                ((start + read_len) as i32, start as i32)
            } else {
                (start as i32, (start + read_len) as i32)
            };
            let anchor = reads.last().map(|prev: &SimRead| (prev.id, step as i32, step as i32));
            let sequence = if reverse { reverse_complement(&forward) } else { forward };
            reads.push(SimRead { id, bgn, end, anchor, sequence });
            start += step;
        }
        Self { id, genome, reads, consensus: None, extra_children: Vec::new() }
    }

    /// Adds a read contained in `bgn..end` of the genome, with no anchor.
    pub fn add_contained(&mut self, id: u32, bgn: usize, end: usize) {
        let sequence = self.genome[bgn..end].to_vec();
        self.reads.push(SimRead { id, bgn: bgn as i32, end: end as i32, anchor: None, sequence });
    }

    pub fn layout_len(&self) -> i32 {
        self.reads.iter().map(|r| r.bgn.max(r.end)).max().unwrap_or(0)
    }

    pub fn read_ids(&self) -> Vec<u32> {
        self.reads.iter().map(|r| r.id).collect()
    }

    /// The tig block in layout format.
    pub fn layout(&self) -> String {
        let mut out = String::new();
        let (cns, qlt) = match &self.consensus {
            Some(cns) => (String::from_utf8_lossy(cns).into_owned(), "I".repeat(cns.len())),
            None => (String::new(), String::new()),
        };
        writeln!(out, "tig {}", self.id).unwrap();
        writeln!(out, "len {}", self.layout_len()).unwrap();
        writeln!(out, "cns {cns}").unwrap();
        writeln!(out, "qlt {qlt}").unwrap();
        out.push_str("coverageStat 1.00\nsuggestRepeat F\nsuggestUnique F\n");
        out.push_str("suggestCircular F\nsuggestHaploid F\n");
        writeln!(out, "numChildren {}", self.reads.len() + self.extra_children.len()).unwrap();
        for read in &self.reads {
            let (anchor, a_hang, b_hang) = read.anchor.unwrap_or((0, 0, 0));
            writeln!(
                out,
                "read {} anchor {anchor} hang {a_hang} {b_hang} position {} {}",
                read.id, read.bgn, read.end
            )
            .unwrap();
        }
        for child in &self.extra_children {
            writeln!(out, "{child}").unwrap();
        }
        out.push_str("tigend\n");
        out
    }
}

/// Writes every read of `tigs` to a FASTQ file at Q30.
pub fn write_reads(path: &Path, tigs: &[&SimTig]) {
    let mut out = String::new();
    for read in tigs.iter().flat_map(|t| &t.reads) {
        writeln!(out, "@{} sim", read.id).unwrap();
        writeln!(out, "{}", String::from_utf8_lossy(&read.sequence)).unwrap();
        writeln!(out, "+").unwrap();
        writeln!(out, "{}", "?".repeat(read.sequence.len())).unwrap();
    }
    fs::write(path, out).expect("Failed to write reads");
}

pub fn write_layouts(path: &Path, tigs: &[&SimTig]) {
    let text: String = tigs.iter().map(|t| t.layout()).collect();
    fs::write(path, text).expect("Failed to write layouts");
}
