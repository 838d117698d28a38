//! Sliding-window pairing statistics
//!
//! A run goes through two phases. [`WinStatsBuilder`] consumes pair records one at a
//! time; [`WinStatsBuilder::finish`] then runs the FPKM pass and returns the immutable
//! [`AllWinStats`] used by the formatters.

use crate::config::StatsConfig;
use crate::pair::{check_good, is_a_pair, pair_overlaps, parse_pair, DistanceFilter, Pair, ParseErr};
use crate::reader::TsvReader;
use crate::window::{GenomeHits, HitType, Hits, Windows};
use log::{debug, info, warn};
use std::io::{self, BufRead};

/// Raw record counts of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadTotals {
    pub total_reads: i64,
    pub total_good_reads: i64,
    pub total_bad_reads: i64,
}

impl ReadTotals {
    /// Count one raw record
    pub fn observe(&mut self, fields: &[&str]) {
        if is_a_pair(fields) {
            self.total_reads += 1;
            if check_good(fields) {
                self.total_good_reads += 1;
            }
        }
    }

    pub fn finish(&mut self) {
        self.total_bad_reads = self.total_reads - self.total_good_reads;
    }

    pub fn good_plus_bad(&self) -> i64 {
        self.total_good_reads + self.total_bad_reads
    }
}

/// Count `fields` into `totals` and return the pair if it passes `filter`
pub(crate) fn accept_record(
    fields: &[&str],
    totals: &mut ReadTotals,
    filter: &DistanceFilter,
) -> Result<Option<Pair>, ParseErr> {
    totals.observe(fields);
    let Some(pair) = parse_pair(fields)? else {
        return Ok(None);
    };
    if filter.range_bad(&pair) {
        return Ok(None);
    }
    Ok(Some(pair))
}

/// Feed every record of `reader` to `add`. A parse error aborts the scan and is
/// reported with its line number.
pub(crate) fn scan_records<R, F>(reader: R, mut add: F) -> io::Result<usize>
where
    R: BufRead,
    F: FnMut(&[&str]) -> Result<(), ParseErr>,
{
    let mut tsv = TsvReader::new(reader);
    let mut records = 0;
    while let Some(fields) = tsv.read_record()? {
        records += 1;
        if let Err(e) = add(&fields) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line {}: {}", tsv.line_num(), e),
            ));
        }
    }
    Ok(records)
}

/// Aggregated statistics of a finished run
#[derive(Debug, Clone)]
pub struct AllWinStats {
    /// All sub-genomes combined
    pub hits: Hits,
    pub genome_hits: GenomeHits,
    pub totals: ReadTotals,
    /// FPKM values were computed
    pub fpkm: bool,
    pub name: String,
}

/// Accumulates window hits while records are streamed in
pub struct WinStatsBuilder {
    hits: Hits,
    genome_hits: GenomeHits,
    totals: ReadTotals,
    filter: DistanceFilter,
    read_len: i64,
    fpkm: bool,
    name: String,
    kept_pairs: usize,
}

impl WinStatsBuilder {
    pub fn new(windows: Windows, config: &StatsConfig) -> Self {
        WinStatsBuilder {
            hits: Hits::new(windows),
            genome_hits: GenomeHits::new(windows),
            totals: ReadTotals::default(),
            filter: config.filter,
            read_len: config.read_len,
            fpkm: config.fpkm(),
            name: config.name().to_string(),
            kept_pairs: 0,
        }
    }

    pub fn add_record(&mut self, fields: &[&str]) -> Result<(), ParseErr> {
        if let Some(pair) = accept_record(fields, &mut self.totals, &self.filter)? {
            self.add_pair(&pair);
        }
        Ok(())
    }

    /// Register both ends of `pair`. Each pair is counted once per read end.
    pub fn add_pair(&mut self, pair: &Pair) {
        self.kept_pairs += 1;

        let hit_type = if pair.is_self() {
            HitType::SelfHit
        } else {
            HitType::PairHit
        };
        self.add_both_ends(pair, hit_type);

        if self.read_len != -1 {
            let hit_type = if pair_overlaps(pair, self.read_len) {
                HitType::Overlap
            } else {
                HitType::NonOverlap
            };
            self.add_both_ends(pair, hit_type);
        }
    }

    fn add_both_ends(&mut self, pair: &Pair, hit_type: HitType) {
        for read in [&pair.read1, &pair.read2] {
            self.hits.add_hit(&read.chrom, read.pos, hit_type);
            self.genome_hits
                .add_hit(&read.parent, &read.chrom, read.pos, hit_type);
        }
    }

    pub fn totals(&self) -> &ReadTotals {
        &self.totals
    }

    /// End of input: fix the totals and compute FPKM for every window
    pub fn finish(mut self) -> AllWinStats {
        self.totals.finish();

        if self.fpkm {
            let total = self.totals.total_reads;
            self.hits.compute_fpkm(total);
            self.genome_hits.compute_fpkm(total);
        }

        debug!(
            "Kept {} of {} pair records",
            self.kept_pairs, self.totals.total_reads
        );

        AllWinStats {
            hits: self.hits,
            genome_hits: self.genome_hits,
            totals: self.totals,
            fpkm: self.fpkm,
            name: self.name,
        }
    }
}

/// Compute sliding-window statistics over all records of `reader`
pub fn win_stats<R: BufRead>(
    reader: R,
    windows: Windows,
    config: &StatsConfig,
) -> io::Result<AllWinStats> {
    let mut builder = WinStatsBuilder::new(windows, config);
    let records = scan_records(reader, |fields| builder.add_record(fields))?;

    if builder.totals().total_reads == 0 {
        warn!("No pair records found among {} input lines", records);
    }

    let stats = builder.finish();
    info!(
        "Window statistics: {} reads ({} good, {} bad) on {} chromosomes in {} sub-genomes",
        stats.totals.total_reads,
        stats.totals.total_good_reads,
        stats.totals.total_bad_reads,
        stats.hits.hits.len(),
        stats.genome_hits.ghits.len()
    );
    Ok(stats)
}
