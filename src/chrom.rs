//! Whole-chromosome pairing statistics

use crate::config::StatsConfig;
use crate::pair::{DistanceFilter, ParseErr};
use crate::stats::{accept_record, scan_records, ReadTotals};
use log::info;
use rustc_hash::FxHashMap;
use std::io::{self, BufRead};

/// Self and paired pair counts per chromosome. Each pair is counted once, under the
/// chromosome of its first read.
#[derive(Debug, Clone, Default)]
pub struct ChromStats {
    pub self_hits: FxHashMap<String, i64>,
    pub pair_hits: FxHashMap<String, i64>,
    pub totals: ReadTotals,
    pub name: String,
}

impl ChromStats {
    pub fn self_hits(&self, chrom: &str) -> i64 {
        self.self_hits.get(chrom).copied().unwrap_or(0)
    }

    pub fn pair_hits(&self, chrom: &str) -> i64 {
        self.pair_hits.get(chrom).copied().unwrap_or(0)
    }

    /// Every chromosome with at least one hit, in natural order
    pub fn sorted_chroms(&self) -> Vec<&str> {
        let mut chroms: Vec<&str> = self
            .self_hits
            .keys()
            .chain(self.pair_hits.keys())
            .map(|c| c.as_str())
            .collect();
        chroms.sort_by(|a, b| natord::compare(a, b));
        chroms.dedup();
        chroms
    }

    fn add_record(&mut self, fields: &[&str], filter: &DistanceFilter) -> Result<(), ParseErr> {
        let Some(pair) = accept_record(fields, &mut self.totals, filter)? else {
            return Ok(());
        };

        let counts = if pair.is_self() {
            &mut self.self_hits
        } else {
            &mut self.pair_hits
        };
        *counts.entry(pair.read1.chrom).or_insert(0) += 1;
        Ok(())
    }
}

pub fn chromosome_stats<R: BufRead>(reader: R, config: &StatsConfig) -> io::Result<ChromStats> {
    let mut stats = ChromStats {
        name: config.name().to_string(),
        ..Default::default()
    };
    let filter = config.filter;
    scan_records(reader, |fields| stats.add_record(fields, &filter))?;
    stats.totals.finish();

    info!(
        "Chromosome statistics: {} reads ({} good) on {} chromosomes",
        stats.totals.total_reads,
        stats.totals.total_good_reads,
        stats.sorted_chroms().len()
    );
    Ok(stats)
}
