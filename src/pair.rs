//! Pair record model
//!
//! Parses one tab-split line of a `.pairs` file into a [`Pair`] of two [`Read`]s and
//! classifies the pair by orientation, sub-genome and distance.

use std::num::ParseIntError;

/// Column value marking an unmapped read end
pub const MISSING: &str = "!";

/// Sub-genome label used when the chromosome token carries no `_parent` suffix
pub const DEFAULT_PARENT: &str = "ecoli";

/// Minimum number of columns for a line to count as a pair record
pub const MIN_PAIR_FIELDS: usize = 7;

/// Largest accepted absolute read position (2^40 bp)
pub const MAX_POSITION: i64 = 1 << 40;

#[derive(Debug)]
pub enum ParseErr {
    InvalidPosition { value: String, source: ParseIntError },
    PositionOutOfRange(i64),
}

impl std::fmt::Display for ParseErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseErr::InvalidPosition { value, source } => {
                write!(f, "Invalid position '{}': {}", value, source)
            }
            ParseErr::PositionOutOfRange(pos) => {
                write!(f, "Position {} out of range (limit {})", pos, MAX_POSITION)
            }
        }
    }
}

impl std::error::Error for ParseErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseErr::InvalidPosition { source, .. } => Some(source),
            ParseErr::PositionOutOfRange(_) => None,
        }
    }
}

/// One end of an alignment pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Read {
    pub chrom: String,
    /// Sub-genome (parent) the chromosome belongs to
    pub parent: String,
    pub ok: bool,
    pub pos: i64,
    /// +1 forward, -1 reverse, 0 unknown
    pub dir: i8,
}

impl Read {
    /// An unmapped read end
    pub fn missing() -> Self {
        Read {
            chrom: String::new(),
            parent: String::new(),
            ok: false,
            pos: 0,
            dir: 0,
        }
    }
}

/// Relative orientation of the two ends of a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Unknown,
    In,
    Out,
    Match,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub read1: Read,
    pub read2: Read,
}

impl Pair {
    pub fn abs_pos_dist(&self) -> i64 {
        (self.read2.pos - self.read1.pos).abs()
    }

    /// Classify the orientation of the pair. Swapping the reads never changes the result.
    pub fn face(&self) -> Facing {
        let (d1, d2) = (self.read1.dir, self.read2.dir);
        if (d1 < 0 && d2 < 0) || (d1 > 0 && d2 > 0) {
            return Facing::Match;
        }

        // Ties on position order the reverse-strand read first
        let (left, right) = if (self.read2.pos, self.read2.dir) < (self.read1.pos, self.read1.dir) {
            (&self.read2, &self.read1)
        } else {
            (&self.read1, &self.read2)
        };

        if left.dir < 0 && right.dir > 0 {
            Facing::Out
        } else if left.dir > 0 && right.dir < 0 {
            Facing::In
        } else {
            Facing::Unknown
        }
    }

    /// Both ends map to the same sub-genome
    pub fn is_self(&self) -> bool {
        self.read1.parent == self.read2.parent
    }

    /// Both ends map to the same chromosome of the same sub-genome
    pub fn is_cis(&self) -> bool {
        self.is_self() && self.read1.chrom == self.read2.chrom
    }

    /// Self pair whose reads face each other
    pub fn is_self_in(&self) -> bool {
        self.is_cis() && self.face() == Facing::In
    }
}

/// True for data lines with enough columns; comments and headers are rejected
pub fn is_a_pair(fields: &[&str]) -> bool {
    fields.len() >= MIN_PAIR_FIELDS && !fields[0].starts_with('#')
}

/// True when the first read end is mapped
pub fn check_good(fields: &[&str]) -> bool {
    fields.len() >= 2 && fields[1] != MISSING
}

/// Parse `(chrom_parent, pos, strand)` into a [`Read`].
///
/// The sub-genome is the text after the last `_` of the chromosome token. A missing
/// read end (`!`) yields a read with `ok == false`. A non-numeric position, or one
/// beyond [`MAX_POSITION`] in either direction, is an error.
pub fn parse_read(chrom_token: &str, pos: &str, strand: &str) -> Result<Read, ParseErr> {
    if chrom_token == MISSING {
        return Ok(Read::missing());
    }

    let (chrom, parent) = match chrom_token.rsplit_once('_') {
        Some((chrom, parent)) => (chrom, parent),
        None => (chrom_token, DEFAULT_PARENT),
    };

    let pos = pos.parse::<i64>().map_err(|e| ParseErr::InvalidPosition {
        value: pos.to_string(),
        source: e,
    })?;
    if pos.unsigned_abs() > MAX_POSITION as u64 {
        return Err(ParseErr::PositionOutOfRange(pos));
    }

    let dir = match strand {
        "+" => 1,
        "-" => -1,
        _ => 0,
    };

    Ok(Read {
        chrom: chrom.to_string(),
        parent: parent.to_string(),
        ok: true,
        pos,
        dir,
    })
}

/// Parse a record into a [`Pair`].
///
/// Returns `Ok(None)` for lines that are not pair records or where either end is
/// unmapped; those are skipped by the callers. Malformed positions are fatal.
pub fn parse_pair(fields: &[&str]) -> Result<Option<Pair>, ParseErr> {
    if !is_a_pair(fields) || fields[1] == MISSING || fields[3] == MISSING {
        return Ok(None);
    }

    let read1 = parse_read(fields[1], fields[2], fields[5])?;
    let read2 = parse_read(fields[3], fields[4], fields[6])?;

    Ok(Some(Pair { read1, read2 }))
}

/// Distance thresholds applied to every pair before aggregation. `-1` disables a bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistanceFilter {
    pub max_distance: i64,
    pub min_distance: i64,
    pub pair_min_distance: i64,
    pub self_in_min_distance: i64,
}

impl Default for DistanceFilter {
    fn default() -> Self {
        DistanceFilter {
            max_distance: -1,
            min_distance: -1,
            pair_min_distance: -1,
            self_in_min_distance: -1,
        }
    }
}

impl DistanceFilter {
    /// True when the pair must be excluded from the statistics
    pub fn range_bad(&self, pair: &Pair) -> bool {
        let dist = (pair.read1.pos - pair.read2.pos).abs();

        // Checked ahead of the self/paired split below
        if pair.is_self_in() && dist < self.self_in_min_distance {
            return true;
        }

        let too_far = self.max_distance != -1 && dist > self.max_distance;
        let trans = pair.read1.chrom != pair.read2.chrom;

        if pair.is_self() {
            (self.min_distance != -1 && dist < self.min_distance) || too_far || trans
        } else {
            (self.pair_min_distance != -1 && dist < self.pair_min_distance) || too_far || trans
        }
    }
}

/// Whether the two reads of a pair physically overlap, given the read length
pub fn pair_overlaps(pair: &Pair, read_len: i64) -> bool {
    if !pair.is_cis() {
        return false;
    }

    match pair.face() {
        Facing::Unknown => false,
        Facing::Out => pair.read1.pos == pair.read2.pos,
        Facing::Match => pair.abs_pos_dist() < read_len,
        Facing::In => pair.abs_pos_dist() < read_len.saturating_mul(2),
    }
}
