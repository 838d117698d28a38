//! Tab-separated and JSON Lines writers for pairing statistics

use crate::chrom::ChromStats;
use crate::json::JsonOutStat;
use crate::region::RegionStats;
use crate::stats::{AllWinStats, ReadTotals};
use crate::window::HitSet;
use std::io::{self, Write};

/// Significant digits of ratio and FPKM columns
const PRECISION: usize = 8;

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Format like C's `%.8g`, spelling non-finite values `NaN`, `+Inf` and `-Inf`
pub fn format_g(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // Rounding to the target precision first fixes the decimal exponent
    let sci = format!("{:.*e}", PRECISION - 1, value);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((&sci, "0"));
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= PRECISION as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exp.abs())
    } else {
        let decimals = (PRECISION as i32 - 1 - exp) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

/// Optional column blocks of a text table
#[derive(Debug, Clone, Copy)]
pub struct Columns<'a> {
    pub fpkm: bool,
    pub overlaps: bool,
    pub name: Option<&'a str>,
}

impl<'a> Columns<'a> {
    fn new(fpkm: bool, overlaps: bool, name: &'a str) -> Self {
        Columns {
            fpkm,
            overlaps,
            name: (!name.is_empty()).then_some(name),
        }
    }
}

pub fn write_header<W: Write>(w: &mut W, columns: &Columns) -> io::Result<()> {
    write!(
        w,
        "chrom\tstart\tend\thit_type\talt_hit_type\thits\talt_hits\tpair_prop\talt_prop\tpair_totprop\tpair_totgoodprop\tpair_totcloseprop\twinsize\twinstep"
    )?;
    if columns.fpkm {
        write!(w, "\tpair_fpkm\talt_fpkm\tpair_prop_fpkm\talt_prop_fpkm")?;
    }
    if columns.overlaps {
        write!(w, "\tovl\tnon_ovl\tovl_prop\tnon_ovl_prop")?;
        if columns.fpkm {
            write!(w, "\tovl_fpkm\tnon_ovl_fpkm\tovl_prop_fpkm\tnon_ovl_prop_fpkm")?;
        }
    }
    if columns.name.is_some() {
        write!(w, "\tname")?;
    }
    writeln!(w)
}

/// Genomic span and geometry of one output row
struct RowSpan<'a> {
    chrom: &'a str,
    start: i64,
    end: i64,
    size: i64,
    step: i64,
}

fn write_row<W: Write>(
    w: &mut W,
    span: &RowSpan,
    win: &HitSet,
    totals: &ReadTotals,
    columns: &Columns,
) -> io::Result<()> {
    let pair_hits = win.pair_hits as f64;
    write!(
        w,
        "{}\t{}\t{}\tpaired\tself\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        span.chrom,
        span.start,
        span.end,
        win.pair_hits,
        win.self_hits,
        format_g(win.pair_prop()),
        format_g(win.self_prop()),
        format_g(pair_hits / totals.good_plus_bad() as f64),
        format_g(pair_hits / totals.total_good_reads as f64),
        format_g(pair_hits / totals.total_reads as f64),
        span.size,
        span.step,
    )?;

    if columns.fpkm {
        write!(
            w,
            "\t{}\t{}\t{}\t{}",
            format_g(win.pair_fpkm),
            format_g(win.self_fpkm),
            format_g(win.pair_fpkm_prop()),
            format_g(win.self_fpkm_prop()),
        )?;
    }

    if columns.overlaps {
        write!(
            w,
            "\t{}\t{}\t{}\t{}",
            win.ovl_hits,
            win.non_ovl_hits,
            format_g(win.ovl_prop()),
            format_g(win.non_ovl_prop()),
        )?;
        if columns.fpkm {
            write!(
                w,
                "\t{}\t{}\t{}\t{}",
                format_g(win.ovl_fpkm),
                format_g(win.non_ovl_fpkm),
                format_g(win.ovl_fpkm_prop()),
                format_g(win.non_ovl_fpkm_prop()),
            )?;
        }
    }

    if let Some(name) = columns.name {
        write!(w, "\t{}", name)?;
    }
    writeln!(w)
}

/// One row per chromosome and window, all sub-genomes combined
pub fn write_win_stats_plain<W: Write>(
    w: &mut W,
    stats: &AllWinStats,
    overlaps: bool,
) -> io::Result<()> {
    let columns = Columns::new(stats.fpkm, overlaps, &stats.name);
    write_header(w, &columns)?;

    let windows = stats.hits.windows;
    for chrom in stats.hits.sorted_chroms() {
        let Some(list) = stats.hits.get(chrom) else {
            continue;
        };
        for (index, win) in list.iter().enumerate() {
            let span = RowSpan {
                chrom,
                start: windows.start(index),
                end: windows.end(index),
                size: windows.size,
                step: windows.step,
            };
            write_row(w, &span, win, &stats.totals, &columns)?;
        }
    }
    Ok(())
}

/// One row per sub-genome, chromosome and window; chromosomes are labelled `chrom_genome`
pub fn write_win_stats_separate_genomes<W: Write>(
    w: &mut W,
    stats: &AllWinStats,
    overlaps: bool,
) -> io::Result<()> {
    let columns = Columns::new(stats.fpkm, overlaps, &stats.name);
    write_header(w, &columns)?;

    for genome in stats.genome_hits.sorted_genomes() {
        let Some(hits) = stats.genome_hits.get(genome) else {
            continue;
        };
        let windows = hits.windows;
        for chrom in hits.sorted_chroms() {
            let Some(list) = hits.get(chrom) else {
                continue;
            };
            let label = format!("{}_{}", chrom, genome);
            for (index, win) in list.iter().enumerate() {
                let span = RowSpan {
                    chrom: &label,
                    start: windows.start(index),
                    end: windows.end(index),
                    size: windows.size,
                    step: windows.step,
                };
                write_row(w, &span, win, &stats.totals, &columns)?;
            }
        }
    }
    Ok(())
}

/// One [`JsonOutStat`] per line for every sub-genome, chromosome and window
pub fn write_win_stats_json<W: Write>(w: &mut W, stats: &AllWinStats) -> io::Result<()> {
    for genome in stats.genome_hits.sorted_genomes() {
        let Some(hits) = stats.genome_hits.get(genome) else {
            continue;
        };
        for chrom in hits.sorted_chroms() {
            let Some(list) = hits.get(chrom) else {
                continue;
            };
            for (index, win) in list.iter().enumerate() {
                let stat = JsonOutStat::from_window(genome, chrom, stats, hits.windows, index, win);
                serde_json::to_writer(&mut *w, &stat)?;
                writeln!(w)?;
            }
        }
    }
    Ok(())
}

/// Write window statistics in the selected format
pub fn write_win_stats<W: Write>(
    w: &mut W,
    stats: &AllWinStats,
    separate_genomes: bool,
    overlaps: bool,
    json_out: bool,
) -> io::Result<()> {
    if json_out {
        write_win_stats_json(w, stats)
    } else if separate_genomes {
        write_win_stats_separate_genomes(w, stats, overlaps)
    } else {
        write_win_stats_plain(w, stats, overlaps)
    }
}

/// One row per region; the window size and step columns hold the region length
pub fn write_region_stats<W: Write>(
    w: &mut W,
    stats: &RegionStats,
    overlaps: bool,
) -> io::Result<()> {
    let columns = Columns::new(stats.fpkm, overlaps, &stats.name);
    write_header(w, &columns)?;

    for region in &stats.regions {
        let span = RowSpan {
            chrom: &region.chrom,
            start: region.start,
            end: region.end,
            size: region.len(),
            step: region.len(),
        };
        write_row(w, &span, &region.hits, &stats.totals, &columns)?;
    }
    Ok(())
}

pub fn write_chrom_stats<W: Write>(w: &mut W, stats: &ChromStats) -> io::Result<()> {
    write!(w, "chrom\tself_hits\tpair_hits\tpair_prop\tpair_totgoodprop\tpair_totprop")?;
    if !stats.name.is_empty() {
        write!(w, "\tname")?;
    }
    writeln!(w)?;

    let totals = &stats.totals;
    for chrom in stats.sorted_chroms() {
        let self_hits = stats.self_hits(chrom);
        let pair_hits = stats.pair_hits(chrom);
        let pair = pair_hits as f64;
        write!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}",
            chrom,
            self_hits,
            pair_hits,
            format_g(pair / (pair + self_hits as f64)),
            format_g(pair / totals.total_good_reads as f64),
            format_g(pair / totals.good_plus_bad() as f64),
        )?;
        if !stats.name.is_empty() {
            write!(w, "\t{}", stats.name)?;
        }
        writeln!(w)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StatsConfig;
    use crate::stats::win_stats;
    use crate::window::Windows;
    use std::io::Cursor;

    #[test]
    fn test_format_g() {
        assert_eq!(format_g(0.0), "0");
        assert_eq!(format_g(0.5), "0.5");
        assert_eq!(format_g(250000.0), "250000");
        assert_eq!(format_g(1.0 / 3.0), "0.33333333");
        assert_eq!(format_g(2.0 / 3.0), "0.66666667");
        assert_eq!(format_g(123456789.0), "1.2345679e+08");
        assert_eq!(format_g(12345678.0), "12345678");
        assert_eq!(format_g(0.0001), "0.0001");
        assert_eq!(format_g(0.00001), "1e-05");
        assert_eq!(format_g(-2.5), "-2.5");
        assert_eq!(format_g(2e8), "2e+08");
        assert_eq!(format_g(f64::NAN), "NaN");
        assert_eq!(format_g(f64::INFINITY), "+Inf");
        assert_eq!(format_g(f64::NEG_INFINITY), "-Inf");
    }

    #[test]
    fn test_header_optional_blocks() {
        let mut out = Vec::new();
        let columns = Columns::new(false, false, "");
        write_header(&mut out, &columns).unwrap();
        let header = String::from_utf8(out).unwrap();
        assert!(header.ends_with("winsize\twinstep\n"));
        assert_eq!(header.split('\t').count(), 14);

        let mut out = Vec::new();
        let columns = Columns::new(true, true, "run1");
        write_header(&mut out, &columns).unwrap();
        let header = String::from_utf8(out).unwrap();
        assert_eq!(header.split('\t').count(), 14 + 4 + 4 + 4 + 1);
        assert!(header.contains("\tovl_fpkm\t"));
        assert!(header.ends_with("\tname\n"));
    }

    fn stats(config: &StatsConfig) -> AllWinStats {
        let input = "r1\tchr1_A\t100\tchr1_B\t105\t+\t-\tUU\n";
        win_stats(Cursor::new(input), Windows::new(10, 10), config).unwrap()
    }

    #[test]
    fn test_plain_rows() {
        let config = StatsConfig {
            win_size: 10,
            win_step: 10,
            read_len: 150,
            name: Some("test".to_string()),
            ..Default::default()
        };
        let stats = stats(&config);
        let mut out = Vec::new();
        write_win_stats(&mut out, &stats, false, true, false).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        // header + windows 0..=10 of chr1
        assert_eq!(lines.len(), 12);
        let header_cols = lines[0].split('\t').count();
        for line in &lines[1..] {
            assert_eq!(line.split('\t').count(), header_cols);
        }

        let empty: Vec<&str> = lines[1].split('\t').collect();
        assert_eq!(&empty[..3], &["chr1", "0", "10"]);
        assert_eq!(empty[7], "NaN");

        let row: Vec<&str> = lines[11].split('\t').collect();
        assert_eq!(
            &row[..14],
            &["chr1", "100", "110", "paired", "self", "2", "0", "1", "0", "2", "2", "2", "10", "10"]
        );
        assert_eq!(row[14], "2e+08");
        assert_eq!(*row.last().unwrap(), "test");
    }

    #[test]
    fn test_separate_genome_rows() {
        let config = StatsConfig {
            win_size: 10,
            win_step: 10,
            no_fpkm: true,
            ..Default::default()
        };
        let stats = stats(&config);
        let mut out = Vec::new();
        write_win_stats(&mut out, &stats, true, false, false).unwrap();
        let text = String::from_utf8(out).unwrap();
        let labels: Vec<&str> = text
            .lines()
            .skip(1)
            .filter(|l| l.split('\t').nth(5) == Some("1"))
            .map(|l| l.split('\t').next().unwrap())
            .collect();
        assert_eq!(labels, vec!["chr1_A", "chr1_B"]);
        assert!(!text.lines().next().unwrap().contains("fpkm"));
    }

    #[test]
    fn test_json_rows() {
        let config = StatsConfig {
            win_size: 10,
            win_step: 10,
            ..Default::default()
        };
        let stats = stats(&config);
        let mut out = Vec::new();
        write_win_stats(&mut out, &stats, false, false, true).unwrap();
        let text = String::from_utf8(out).unwrap();
        let records: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        // windows 0..=10 for each of the two sub-genomes
        assert_eq!(records.len(), 22);
        assert_eq!(records[0]["Genome"], "A");
        assert_eq!(records[0]["TargetProp"], "NaN");
        assert_eq!(records[0]["AltProp"], "NaN");
        assert_eq!(records[10]["Start"], 100);
        assert_eq!(records[10]["TargetHits"], 1.0);
        assert_eq!(records[10]["TargetProp"], 1.0);
        assert_eq!(records[21]["Genome"], "B");
    }

    #[test]
    fn test_chrom_rows() {
        let mut stats = ChromStats {
            name: "x".to_string(),
            ..Default::default()
        };
        stats.self_hits.insert("chr1".to_string(), 3);
        stats.pair_hits.insert("chr1".to_string(), 1);
        stats.totals = ReadTotals {
            total_reads: 8,
            total_good_reads: 4,
            total_bad_reads: 4,
        };
        let mut out = Vec::new();
        write_chrom_stats(&mut out, &stats).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().nth(1), Some("chr1\t3\t1\t0.25\t0.25\t0.125\tx"));
    }
}
