//! Pairing statistics over a fixed list of BED regions

use crate::config::StatsConfig;
use crate::pair::{pair_overlaps, DistanceFilter, Pair, ParseErr};
use crate::stats::{accept_record, scan_records, ReadTotals};
use crate::window::{HitSet, HitType};
use coitrees::{BasicCOITree, Interval, IntervalTree};
use log::{debug, info, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fs::File;
use std::io::{self, BufRead, BufReader};

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub chrom: String,
    pub start: i64,
    /// Exclusive
    pub end: i64,
    pub hits: HitSet,
}

impl Region {
    pub fn new(chrom: &str, start: i64, end: i64) -> Self {
        Region {
            chrom: chrom.to_string(),
            start,
            end,
            hits: HitSet::default(),
        }
    }

    pub fn len(&self) -> i64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

#[derive(Debug, Clone)]
pub struct RegionStats {
    /// In BED file order
    pub regions: Vec<Region>,
    pub totals: ReadTotals,
    pub fpkm: bool,
    pub name: String,
}

fn parse_coord(value: &str, what: &str, path: &str, line_num: usize) -> io::Result<i64> {
    let coord = value.parse::<i64>().map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{}:{}: invalid {} '{}': {}", path, line_num, what, value, e),
        )
    })?;
    if coord < 0 || coord > i32::MAX as i64 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{}:{}: {} {} out of range", path, line_num, what, coord),
        ));
    }
    Ok(coord)
}

/// Parse BED lines (`chrom start end ...`), keeping their order
pub fn parse_regions<R: BufRead>(reader: R, path: &str) -> io::Result<Vec<Region>> {
    let mut regions = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_num = i + 1;
        let trimmed = line.trim_end();
        if trimmed.is_empty()
            || trimmed.starts_with('#')
            || trimmed.starts_with("track")
            || trimmed.starts_with("browser")
        {
            continue;
        }

        let parts: Vec<&str> = trimmed.split('\t').collect();
        if parts.len() < 3 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{}:{}: invalid BED line, expected at least 3 columns", path, line_num),
            ));
        }

        let start = parse_coord(parts[1], "start", path, line_num)?;
        let end = parse_coord(parts[2], "end", path, line_num)?;
        let region = Region::new(parts[0], start, end);
        if region.is_empty() {
            warn!(
                "{}:{}: region {}:{}-{} is empty and will never receive hits",
                path, line_num, region.chrom, start, end
            );
        }
        regions.push(region);
    }

    Ok(regions)
}

pub fn load_regions(path: &str) -> io::Result<Vec<Region>> {
    let file = File::open(path).map_err(|e| {
        io::Error::new(e.kind(), format!("Failed to open region file '{}': {}", path, e))
    })?;
    let regions = parse_regions(BufReader::new(file), path)?;
    info!("Loaded {} regions from {}", regions.len(), path);
    Ok(regions)
}

/// Interval trees over region indices, one per chromosome
struct RegionIndex {
    trees: FxHashMap<String, BasicCOITree<usize, u32>>,
}

impl RegionIndex {
    fn new(regions: &[Region]) -> Self {
        let mut intervals: FxHashMap<String, Vec<Interval<usize>>> = FxHashMap::default();
        for (i, region) in regions.iter().enumerate() {
            if region.is_empty() {
                continue;
            }
            // Coordinates were range-checked when parsing; coitrees intervals are end-inclusive
            intervals
                .entry(region.chrom.clone())
                .or_default()
                .push(Interval::new(region.start as i32, (region.end - 1) as i32, i));
        }

        let trees = intervals
            .into_iter()
            .map(|(chrom, nodes)| (chrom, BasicCOITree::new(nodes.as_slice())))
            .collect();
        RegionIndex { trees }
    }

    /// Indices of regions on `chrom` containing either position, without duplicates
    fn hit_regions(&self, chrom: &str, positions: [i64; 2]) -> Vec<usize> {
        let mut hit = Vec::new();
        let Some(tree) = self.trees.get(chrom) else {
            return hit;
        };
        for pos in positions {
            let Ok(pos) = i32::try_from(pos) else {
                continue;
            };
            tree.query(pos, pos, |interval| {
                hit.push(interval.metadata.clone());
            });
        }
        hit.sort_unstable();
        hit.dedup();
        hit
    }
}

struct RegionStatsBuilder {
    regions: Vec<Region>,
    index: RegionIndex,
    totals: ReadTotals,
    filter: DistanceFilter,
    read_len: i64,
    seen_chroms: FxHashSet<String>,
}

impl RegionStatsBuilder {
    fn add_record(&mut self, fields: &[&str]) -> Result<(), ParseErr> {
        if let Some(pair) = accept_record(fields, &mut self.totals, &self.filter)? {
            self.add_pair(&pair);
        }
        Ok(())
    }

    /// A pair counts toward a region when both ends share the region's chromosome
    /// and at least one end lies inside it
    fn add_pair(&mut self, pair: &Pair) {
        if pair.read1.chrom != pair.read2.chrom {
            return;
        }
        if !self.seen_chroms.contains(&pair.read1.chrom) {
            self.seen_chroms.insert(pair.read1.chrom.clone());
        }

        let hit_type = if pair.is_self() {
            HitType::SelfHit
        } else {
            HitType::PairHit
        };
        let ovl_type = (self.read_len != -1).then(|| {
            if pair_overlaps(pair, self.read_len) {
                HitType::Overlap
            } else {
                HitType::NonOverlap
            }
        });

        for i in self
            .index
            .hit_regions(&pair.read1.chrom, [pair.read1.pos, pair.read2.pos])
        {
            let hits = &mut self.regions[i].hits;
            hits.inc(hit_type);
            if let Some(ovl_type) = ovl_type {
                hits.inc(ovl_type);
            }
        }
    }
}

pub fn region_stats<R: BufRead>(
    reader: R,
    regions: Vec<Region>,
    config: &StatsConfig,
) -> io::Result<RegionStats> {
    let index = RegionIndex::new(&regions);
    debug!("Indexed regions on {} chromosomes", index.trees.len());

    let mut builder = RegionStatsBuilder {
        regions,
        index,
        totals: ReadTotals::default(),
        filter: config.filter,
        read_len: config.read_len,
        seen_chroms: FxHashSet::default(),
    };
    scan_records(reader, |fields| builder.add_record(fields))?;

    let mut unseen: Vec<&str> = builder
        .regions
        .iter()
        .map(|r| r.chrom.as_str())
        .filter(|chrom| !builder.seen_chroms.contains(*chrom))
        .collect();
    unseen.sort_by(|a, b| natord::compare(a, b));
    unseen.dedup();
    for chrom in unseen {
        warn!("No pairs on {}; its regions have no hits", chrom);
    }

    let mut totals = builder.totals;
    totals.finish();
    let mut regions = builder.regions;

    if config.fpkm() {
        for region in regions.iter_mut() {
            let length = region.len();
            region.hits.compute_fpkm(totals.total_reads, length);
        }
    }

    info!(
        "Region statistics: {} reads ({} good) over {} regions",
        totals.total_reads,
        totals.total_good_reads,
        regions.len()
    );

    Ok(RegionStats {
        regions,
        totals,
        fpkm: config.fpkm(),
        name: config.name().to_string(),
    })
}
