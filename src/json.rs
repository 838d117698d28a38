//! JSON Lines representation of window statistics
//!
//! Ratios are frequently `NaN` (empty windows) or infinite (zero totals), which plain
//! JSON numbers cannot carry. [`JsonFloat`] writes those as the strings `"NaN"`,
//! `"Inf"` and `"-Inf"` and reads them back.

use crate::stats::AllWinStats;
use crate::window::{HitSet, Windows};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::io::{self, BufRead};
use std::ops::{Add, AddAssign, Div, Sub};

#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct JsonFloat(pub f64);

impl From<f64> for JsonFloat {
    fn from(value: f64) -> Self {
        JsonFloat(value)
    }
}

impl From<i64> for JsonFloat {
    fn from(value: i64) -> Self {
        JsonFloat(value as f64)
    }
}

impl Serialize for JsonFloat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let f = self.0;
        if f.is_nan() {
            serializer.serialize_str("NaN")
        } else if f == f64::INFINITY {
            serializer.serialize_str("Inf")
        } else if f == f64::NEG_INFINITY {
            serializer.serialize_str("-Inf")
        } else {
            serializer.serialize_f64(f)
        }
    }
}

struct JsonFloatVisitor;

impl<'de> Visitor<'de> for JsonFloatVisitor {
    type Value = JsonFloat;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "a number or one of \"NaN\", \"Inf\", \"-Inf\"")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<JsonFloat, E> {
        Ok(JsonFloat(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<JsonFloat, E> {
        Ok(JsonFloat(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<JsonFloat, E> {
        Ok(JsonFloat(v as f64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<JsonFloat, E> {
        match v {
            "NaN" => Ok(JsonFloat(f64::NAN)),
            "Inf" => Ok(JsonFloat(f64::INFINITY)),
            "-Inf" => Ok(JsonFloat(f64::NEG_INFINITY)),
            _ => Err(E::invalid_value(de::Unexpected::Str(v), &self)),
        }
    }
}

impl<'de> Deserialize<'de> for JsonFloat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(JsonFloatVisitor)
    }
}

impl Add for JsonFloat {
    type Output = JsonFloat;
    fn add(self, rhs: JsonFloat) -> JsonFloat {
        JsonFloat(self.0 + rhs.0)
    }
}

impl AddAssign for JsonFloat {
    fn add_assign(&mut self, rhs: JsonFloat) {
        self.0 += rhs.0;
    }
}

impl Sub for JsonFloat {
    type Output = JsonFloat;
    fn sub(self, rhs: JsonFloat) -> JsonFloat {
        JsonFloat(self.0 - rhs.0)
    }
}

impl Div<f64> for JsonFloat {
    type Output = JsonFloat;
    fn div(self, rhs: f64) -> JsonFloat {
        JsonFloat(self.0 / rhs)
    }
}

/// Statistics of one window of one sub-genome, as written to JSON Lines
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JsonOutStat {
    pub genome: String,
    pub chr: String,
    pub start: i64,
    pub end: i64,
    pub target_type: String,
    pub alt_type: String,
    pub target_hits: JsonFloat,
    pub alt_hits: JsonFloat,
    pub target_prop: JsonFloat,
    pub alt_prop: JsonFloat,
    pub target_prop_good_bad: JsonFloat,
    pub target_prop_good: JsonFloat,
    pub target_prop_total: JsonFloat,
    pub win_size: i64,
    pub win_step: i64,
    pub target_fpkm: JsonFloat,
    pub alt_fpkm: JsonFloat,
    pub target_fpkm_prop: JsonFloat,
    pub alt_fpkm_prop: JsonFloat,
    pub alt_ovl_hits: JsonFloat,
    pub alt_non_ovl_hits: JsonFloat,
    pub alt_ovl_prop: JsonFloat,
    pub alt_non_ovl_prop: JsonFloat,
    pub alt_ovl_fpkm: JsonFloat,
    pub alt_non_ovl_fpkm: JsonFloat,
    pub alt_ovl_fpkm_prop: JsonFloat,
    pub alt_non_ovl_fpkm_prop: JsonFloat,
    pub name: String,
}

/// Apply `$op` to every numeric statistic of a [`JsonOutStat`]
macro_rules! each_stat {
    ($op:ident) => {
        $op!(
            target_hits,
            alt_hits,
            target_prop,
            alt_prop,
            target_prop_good_bad,
            target_prop_good,
            target_prop_total,
            target_fpkm,
            alt_fpkm,
            target_fpkm_prop,
            alt_fpkm_prop,
            alt_ovl_hits,
            alt_non_ovl_hits,
            alt_ovl_prop,
            alt_non_ovl_prop,
            alt_ovl_fpkm,
            alt_non_ovl_fpkm,
            alt_ovl_fpkm_prop,
            alt_non_ovl_fpkm_prop
        )
    };
}

impl JsonOutStat {
    /// Flatten window `index` of `chr` in sub-genome `genome`
    pub fn from_window(
        genome: &str,
        chr: &str,
        stats: &AllWinStats,
        windows: Windows,
        index: usize,
        win: &HitSet,
    ) -> Self {
        let totals = &stats.totals;
        let pair_hits = win.pair_hits as f64;

        JsonOutStat {
            genome: genome.to_string(),
            chr: chr.to_string(),
            start: windows.start(index),
            end: windows.end(index),
            target_type: "paired".to_string(),
            alt_type: "self".to_string(),
            target_hits: win.pair_hits.into(),
            alt_hits: win.self_hits.into(),
            target_prop: win.pair_prop().into(),
            alt_prop: win.self_prop().into(),
            target_prop_good_bad: (pair_hits / totals.good_plus_bad() as f64).into(),
            target_prop_good: (pair_hits / totals.total_good_reads as f64).into(),
            target_prop_total: (pair_hits / totals.total_reads as f64).into(),
            win_size: windows.size,
            win_step: windows.step,
            target_fpkm: win.pair_fpkm.into(),
            alt_fpkm: win.self_fpkm.into(),
            target_fpkm_prop: win.pair_fpkm_prop().into(),
            alt_fpkm_prop: win.self_fpkm_prop().into(),
            alt_ovl_hits: win.ovl_hits.into(),
            alt_non_ovl_hits: win.non_ovl_hits.into(),
            alt_ovl_prop: win.ovl_prop().into(),
            alt_non_ovl_prop: win.non_ovl_prop().into(),
            alt_ovl_fpkm: win.ovl_fpkm.into(),
            alt_non_ovl_fpkm: win.non_ovl_fpkm.into(),
            alt_ovl_fpkm_prop: win.ovl_fpkm_prop().into(),
            alt_non_ovl_fpkm_prop: win.non_ovl_fpkm_prop().into(),
            name: stats.name.clone(),
        }
    }

    /// Add every statistic of `other` to this record
    pub fn accumulate(&mut self, other: &JsonOutStat) {
        macro_rules! add {
            ($($field:ident),*) => { $(self.$field += other.$field;)* };
        }
        each_stat!(add);
    }

    /// Divide every statistic by `count`
    pub fn div_count(&self, count: f64) -> JsonOutStat {
        let mut out = self.clone();
        macro_rules! div {
            ($($field:ident),*) => { $(out.$field = self.$field / count;)* };
        }
        each_stat!(div);
        out
    }

    /// Subtract every statistic of `control` from this record
    pub fn subtract(&self, control: &JsonOutStat) -> JsonOutStat {
        let mut out = self.clone();
        macro_rules! sub {
            ($($field:ident),*) => { $(out.$field = self.$field - control.$field;)* };
        }
        each_stat!(sub);
        out
    }
}

/// Iterate over the records of a pairviz JSON Lines stream
pub fn read_json_stats<R: BufRead>(reader: R) -> impl Iterator<Item = io::Result<JsonOutStat>> {
    reader
        .lines()
        .enumerate()
        .filter(|(_, line)| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
        .map(|(i, line)| {
            let line = line?;
            serde_json::from_str(&line).map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("line {}: invalid pairviz JSON record: {}", i + 1, e),
                )
            })
        })
}
