//! Sliding-window indexing and per-window hit aggregation

use rustc_hash::FxHashMap;
use std::ops::Range;

/// Window geometry shared by every chromosome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Windows {
    pub size: i64,
    pub step: i64,
}

impl Windows {
    /// Callers must ensure `step > 0`; [`crate::config::StatsConfig::mode`] enforces it.
    pub fn new(size: i64, step: i64) -> Self {
        Windows { size, step }
    }

    /// Indices of all windows covering `pos`, as a half-open range.
    ///
    /// Window `i` spans `[i * step, i * step + size)`. The range is empty for negative
    /// positions and for positions falling in the gap between windows when `step > size`.
    pub fn wins_hit(&self, pos: i64) -> Range<i64> {
        if pos < 0 {
            return 0..0;
        }

        // First window with `i * step + size > pos`
        let hiwin = pos / self.step;
        let start = ((pos - self.size).div_euclid(self.step) + 1).max(0);
        start..hiwin.saturating_add(1)
    }

    pub fn start(&self, index: usize) -> i64 {
        (index as i64).saturating_mul(self.step)
    }

    pub fn end(&self, index: usize) -> i64 {
        self.start(index).saturating_add(self.size)
    }
}

/// Counter incremented for a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitType {
    SelfHit,
    PairHit,
    Overlap,
    NonOverlap,
}

/// FPKM of `count` hits in a window of `window_length` bp, given the sample's read total.
///
/// Zero lengths and totals are not special-cased: the IEEE-754 result (`inf` or `NaN`)
/// is part of the output.
pub fn fpkm(count: i64, total_sample_reads: i64, window_length: i64) -> f64 {
    let per_million = total_sample_reads as f64 / 1e6;
    let fpm = count as f64 / per_million;
    fpm / (window_length as f64 / 1e3)
}

fn ratio(num: f64, other: f64) -> f64 {
    num / (num + other)
}

/// Hit counts of one window (or region)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HitSet {
    pub self_hits: i64,
    pub pair_hits: i64,
    pub ovl_hits: i64,
    pub non_ovl_hits: i64,
    pub self_fpkm: f64,
    pub pair_fpkm: f64,
    pub ovl_fpkm: f64,
    pub non_ovl_fpkm: f64,
}

impl HitSet {
    pub fn inc(&mut self, hit_type: HitType) {
        match hit_type {
            HitType::SelfHit => self.self_hits += 1,
            HitType::PairHit => self.pair_hits += 1,
            HitType::Overlap => self.ovl_hits += 1,
            HitType::NonOverlap => self.non_ovl_hits += 1,
        }
    }

    pub fn compute_fpkm(&mut self, total_reads: i64, length: i64) {
        self.self_fpkm = fpkm(self.self_hits, total_reads, length);
        self.pair_fpkm = fpkm(self.pair_hits, total_reads, length);
        self.ovl_fpkm = fpkm(self.ovl_hits, total_reads, length);
        self.non_ovl_fpkm = fpkm(self.non_ovl_hits, total_reads, length);
    }

    pub fn pair_prop(&self) -> f64 {
        ratio(self.pair_hits as f64, self.self_hits as f64)
    }

    pub fn self_prop(&self) -> f64 {
        ratio(self.self_hits as f64, self.pair_hits as f64)
    }

    pub fn pair_fpkm_prop(&self) -> f64 {
        ratio(self.pair_fpkm, self.self_fpkm)
    }

    pub fn self_fpkm_prop(&self) -> f64 {
        ratio(self.self_fpkm, self.pair_fpkm)
    }

    pub fn ovl_prop(&self) -> f64 {
        ratio(self.ovl_hits as f64, self.non_ovl_hits as f64)
    }

    pub fn non_ovl_prop(&self) -> f64 {
        ratio(self.non_ovl_hits as f64, self.ovl_hits as f64)
    }

    pub fn ovl_fpkm_prop(&self) -> f64 {
        ratio(self.ovl_fpkm, self.non_ovl_fpkm)
    }

    pub fn non_ovl_fpkm_prop(&self) -> f64 {
        ratio(self.non_ovl_fpkm, self.ovl_fpkm)
    }
}

/// Hit sets of one chromosome, indexed by window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WinHitList(Vec<HitSet>);

impl WinHitList {
    pub fn new() -> Self {
        WinHitList(Vec::new())
    }

    /// Increment `hit_type` in window `index`, growing the list as needed.
    /// Negative indices are ignored.
    pub fn inc_win(&mut self, index: i64, hit_type: HitType) {
        let Ok(index) = usize::try_from(index) else {
            return;
        };
        if self.0.len() <= index {
            self.0.resize(index + 1, HitSet::default());
        }
        self.0[index].inc(hit_type);
    }

    pub fn get(&self, index: usize) -> Option<&HitSet> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HitSet> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, HitSet> {
        self.0.iter_mut()
    }
}

/// Per-chromosome window hits for one genomic view
#[derive(Debug, Clone)]
pub struct Hits {
    pub hits: FxHashMap<String, WinHitList>,
    pub windows: Windows,
}

impl Hits {
    pub fn new(windows: Windows) -> Self {
        Hits {
            hits: FxHashMap::default(),
            windows,
        }
    }

    pub fn add_hit(&mut self, chrom: &str, pos: i64, hit_type: HitType) {
        let range = self.windows.wins_hit(pos);
        if !self.hits.contains_key(chrom) {
            self.hits.insert(chrom.to_string(), WinHitList::new());
        }
        if let Some(list) = self.hits.get_mut(chrom) {
            for index in range {
                list.inc_win(index, hit_type);
            }
        }
    }

    pub fn get(&self, chrom: &str) -> Option<&WinHitList> {
        self.hits.get(chrom)
    }

    pub fn compute_fpkm(&mut self, total_reads: i64) {
        let length = self.windows.size;
        for list in self.hits.values_mut() {
            for win in list.iter_mut() {
                win.compute_fpkm(total_reads, length);
            }
        }
    }

    /// Chromosome names in natural order
    pub fn sorted_chroms(&self) -> Vec<&str> {
        let mut chroms: Vec<&str> = self.hits.keys().map(|c| c.as_str()).collect();
        chroms.sort_by(|a, b| natord::compare(a, b));
        chroms
    }
}

/// Window hits split by sub-genome
#[derive(Debug, Clone)]
pub struct GenomeHits {
    pub ghits: FxHashMap<String, Hits>,
    pub windows: Windows,
}

impl GenomeHits {
    pub fn new(windows: Windows) -> Self {
        GenomeHits {
            ghits: FxHashMap::default(),
            windows,
        }
    }

    pub fn add_hit(&mut self, genome: &str, chrom: &str, pos: i64, hit_type: HitType) {
        let windows = self.windows;
        self.ghits
            .entry(genome.to_string())
            .or_insert_with(|| Hits::new(windows))
            .add_hit(chrom, pos, hit_type);
    }

    pub fn get(&self, genome: &str) -> Option<&Hits> {
        self.ghits.get(genome)
    }

    pub fn compute_fpkm(&mut self, total_reads: i64) {
        for hits in self.ghits.values_mut() {
            hits.compute_fpkm(total_reads);
        }
    }

    /// Sub-genome names in natural order
    pub fn sorted_genomes(&self) -> Vec<&str> {
        let mut genomes: Vec<&str> = self.ghits.keys().map(|g| g.as_str()).collect();
        genomes.sort_by(|a, b| natord::compare(a, b));
        genomes
    }
}
