use crate::chrom::chromosome_stats;
use crate::config::{StatsConfig, StatsMode};
use crate::output::{write_chrom_stats, write_region_stats, write_win_stats};
use crate::reader::open_input;
use crate::region::{load_regions, region_stats, Region};
use crate::stats::win_stats;
use log::{debug, info};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

/// One input and where its table goes. `None` means stdin / stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsJob {
    pub input: Option<String>,
    pub output: Option<PathBuf>,
}

/// Output file name for `input` when several inputs are processed together
fn output_name(input: Option<&str>, json_out: bool) -> String {
    let file_name = input
        .filter(|path| *path != "-")
        .and_then(|path| Path::new(path).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stdin".to_string());

    let mut stem = file_name.as_str();
    for ext in [".gz", ".bgz"] {
        stem = stem.strip_suffix(ext).unwrap_or(stem);
    }
    for ext in [".pairs", ".pairsam", ".txt"] {
        stem = stem.strip_suffix(ext).unwrap_or(stem);
    }

    let ext = if json_out { "jsonl" } else { "tsv" };
    format!("{}.pairviz.{}", stem, ext)
}

/// Pair every input with its destination
pub fn plan_jobs(
    inputs: &[String],
    output: Option<&str>,
    output_dir: Option<&str>,
    json_out: bool,
) -> io::Result<Vec<StatsJob>> {
    if inputs.len() <= 1 {
        return Ok(vec![StatsJob {
            input: inputs.first().cloned(),
            output: output.map(PathBuf::from),
        }]);
    }

    if output.is_some() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "--output cannot be used with more than one input; use --output-dir",
        ));
    }

    let dir = Path::new(output_dir.unwrap_or("."));
    let mut seen: FxHashMap<PathBuf, &str> = FxHashMap::default();
    let mut jobs = Vec::with_capacity(inputs.len());
    for input in inputs {
        let output = dir.join(output_name(Some(input), json_out));
        if let Some(previous) = seen.insert(output.clone(), input) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Inputs '{}' and '{}' would both be written to '{}'; rename one of them",
                    previous,
                    input,
                    output.display()
                ),
            ));
        }
        jobs.push(StatsJob {
            input: Some(input.clone()),
            output: Some(output),
        });
    }
    Ok(jobs)
}

fn open_output(output: Option<&Path>) -> io::Result<Box<dyn Write>> {
    match output {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                io::Error::new(
                    e.kind(),
                    format!("Failed to create output '{}': {}", path.display(), e),
                )
            })?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

fn write_job_stats<R: BufRead>(
    reader: R,
    job: &StatsJob,
    mode: &StatsMode,
    regions: &[Region],
    config: &StatsConfig,
) -> io::Result<()> {
    // Every input gets its own aggregate; nothing is shared between jobs
    match mode {
        StatsMode::Chromosome => {
            let stats = chromosome_stats(reader, config)?;
            let mut writer = open_output(job.output.as_deref())?;
            write_chrom_stats(&mut writer, &stats)?;
            writer.flush()
        }
        StatsMode::Region(_) => {
            let stats = region_stats(reader, regions.to_vec(), config)?;
            let mut writer = open_output(job.output.as_deref())?;
            write_region_stats(&mut writer, &stats, config.overlaps())?;
            writer.flush()
        }
        StatsMode::Window(windows) => {
            let stats = win_stats(reader, *windows, config)?;
            let mut writer = open_output(job.output.as_deref())?;
            write_win_stats(
                &mut writer,
                &stats,
                config.separate_genomes,
                config.overlaps(),
                config.json_out,
            )?;
            writer.flush()
        }
    }
}

/// Compute and write the statistics of a single input. Errors after opening the
/// input are prefixed with its path.
pub fn run_stats_job(
    job: &StatsJob,
    mode: &StatsMode,
    regions: &[Region],
    config: &StatsConfig,
) -> io::Result<()> {
    let label = job.input.as_deref().unwrap_or("-");
    debug!("Processing {}", label);
    let reader = open_input(job.input.as_deref())?;

    write_job_stats(reader, job, mode, regions, config)
        .map_err(|e| io::Error::new(e.kind(), format!("{}: {}", label, e)))?;

    if let Some(output) = &job.output {
        info!("Wrote statistics for {} to {}", label, output.display());
    }
    Ok(())
}

/// Run the statistics for every input, in parallel on the global rayon pool
pub fn run_stats(
    config: &StatsConfig,
    mode: &StatsMode,
    inputs: &[String],
    output: Option<&str>,
    output_dir: Option<&str>,
) -> io::Result<()> {
    let jobs = plan_jobs(inputs, output, output_dir, config.json_out)?;

    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)?;
    }

    let regions = match mode {
        StatsMode::Region(path) => load_regions(path)?,
        _ => Vec::new(),
    };

    info!("Computing pair statistics for {} input(s)", jobs.len());
    jobs.par_iter()
        .map(|job| run_stats_job(job, mode, &regions, config))
        .collect::<io::Result<Vec<()>>>()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_name() {
        assert_eq!(output_name(Some("data/s1.pairs.gz"), false), "s1.pairviz.tsv");
        assert_eq!(output_name(Some("s2.pairs"), true), "s2.pairviz.jsonl");
        assert_eq!(output_name(Some("-"), false), "stdin.pairviz.tsv");
        assert_eq!(output_name(None, false), "stdin.pairviz.tsv");
    }

    #[test]
    fn test_plan_jobs_single() {
        let jobs = plan_jobs(&[], None, None, false).unwrap();
        assert_eq!(
            jobs,
            vec![StatsJob {
                input: None,
                output: None
            }]
        );

        let jobs = plan_jobs(&["a.pairs".to_string()], Some("out.tsv"), None, false).unwrap();
        assert_eq!(jobs[0].output, Some(PathBuf::from("out.tsv")));
    }

    #[test]
    fn test_plan_jobs_multiple() {
        let inputs = vec!["x/a.pairs".to_string(), "b.pairs.gz".to_string()];
        let jobs = plan_jobs(&inputs, None, Some("out"), true).unwrap();
        assert_eq!(jobs[0].output, Some(PathBuf::from("out/a.pairviz.jsonl")));
        assert_eq!(jobs[1].output, Some(PathBuf::from("out/b.pairviz.jsonl")));

        let err = plan_jobs(&inputs, Some("o.tsv"), None, false).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_run_stats_job_errors_name_the_input() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("broken.pairs");
        std::fs::write(&input, "r1\tchr1_A\t1\tchr1_A\t2\t+\t-\nr2\tchr1_A\tx\tchr1_A\t2\t+\t-\n")
            .unwrap();
        let input = input.to_str().unwrap().to_string();
        let job = StatsJob {
            input: Some(input.clone()),
            output: Some(dir.path().join("broken.pairviz.tsv")),
        };
        let mode = StatsMode::Window(crate::window::Windows::new(10, 10));

        let err = run_stats_job(&job, &mode, &[], &StatsConfig::default()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().starts_with(&format!("{}: line 2:", input)));
        // Nothing is written for a failed input
        assert!(!dir.path().join("broken.pairviz.tsv").exists());
    }

    #[test]
    fn test_plan_jobs_rejects_colliding_outputs() {
        let inputs = vec![
            "a/s.pairs".to_string(),
            "b/s.pairs.gz".to_string(),
            "c/t.pairs".to_string(),
        ];
        let err = plan_jobs(&inputs, None, Some("out"), false).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        let msg = err.to_string();
        assert!(msg.contains("a/s.pairs") && msg.contains("b/s.pairs.gz"));
        assert!(msg.contains("s.pairviz.tsv"));

        // The same input listed twice collides with itself
        let inputs = vec!["s.pairs".to_string(), "s.pairs".to_string()];
        assert!(plan_jobs(&inputs, None, None, true).is_err());
    }
}
