use clap::Parser;
use log::error;
use pairviz::commands::control::run_subtract_control;
use pairviz::commands::stats::run_stats;
use pairviz::config::StatsConfig;
use pairviz::pair::DistanceFilter;
use rayon::ThreadPoolBuilder;
use std::io;
use std::num::NonZeroUsize;

/// Common options shared between all commands
#[derive(Parser, Debug)]
struct CommonOpts {
    /// Number of threads for processing several inputs in parallel.
    #[clap(short = 't', long = "threads", value_parser, default_value_t = NonZeroUsize::new(4).unwrap())]
    num_threads: NonZeroUsize,

    /// Verbosity level (0 = error, 1 = info, 2 = debug)
    #[clap(short, long, default_value = "0")]
    verbose: u8,
}

/// Options of the statistics run
#[derive(Parser, Debug)]
struct StatsOpts {
    /// Window size.
    #[clap(short = 'w', long, value_parser, default_value_t = -1)]
    win_size: i64,

    /// Window step distance.
    #[clap(short = 's', long, value_parser, default_value_t = -1)]
    win_step: i64,

    /// Distance between two paired reads before they are ignored (-1 = unbounded).
    #[clap(short = 'd', long, value_parser, default_value_t = -1)]
    distance: i64,

    /// Minimum distance between two self reads (-1 = unbounded).
    #[clap(short = 'm', long, value_parser, default_value_t = -1)]
    min_distance: i64,

    /// Minimum distance between two paired reads (-1 = unbounded).
    #[clap(long, value_parser, default_value_t = -1)]
    pair_min_distance: i64,

    /// Minimum distance between inward-facing self reads (-1 = unbounded).
    #[clap(long, value_parser, default_value_t = -1)]
    self_in_min_distance: i64,

    /// Calculate whole-chromosome statistics, not sliding windows.
    #[clap(short = 'c', long, action)]
    chromosome: bool,

    /// Calculate statistics in the regions of this BED file instead of sliding windows.
    #[clap(short = 'r', long, value_parser)]
    region: Option<String>,

    /// Do not compute FPKM statistics.
    #[clap(short = 'f', long, action)]
    no_fpkm: bool,

    /// Print one entry per genome for each chromosome location, distinguishing self and paired reads.
    #[clap(short = 'G', long, action)]
    separate_genomes: bool,

    /// Length of reads in pairs, used to classify pairs as overlapping (-1 = skip).
    #[clap(long, value_parser, default_value_t = -1)]
    read_len: i64,

    /// Name to add as the last column of the table.
    #[clap(short = 'n', long, value_parser)]
    name: Option<String>,

    /// Output JSON Lines instead of a table.
    #[clap(short = 'j', long = "json", action)]
    json_out: bool,
}

impl StatsOpts {
    fn to_config(&self) -> StatsConfig {
        StatsConfig {
            win_size: self.win_size,
            win_step: self.win_step,
            filter: DistanceFilter {
                max_distance: self.distance,
                min_distance: self.min_distance,
                pair_min_distance: self.pair_min_distance,
                self_in_min_distance: self.self_in_min_distance,
            },
            chromosome: self.chromosome,
            region: self.region.clone(),
            no_fpkm: self.no_fpkm,
            separate_genomes: self.separate_genomes,
            read_len: self.read_len,
            name: self.name.clone().filter(|n| !n.is_empty()),
            json_out: self.json_out,
        }
    }
}

/// Windowed self/paired contact statistics for Hi-C pairs files.
#[derive(Parser, Debug)]
#[command(author, version, about, disable_help_subcommand = true)]
enum Args {
    /// Compute pairing statistics in sliding windows, regions or whole chromosomes
    #[command(allow_negative_numbers = true)]
    Stats {
        #[clap(flatten)]
        common: CommonOpts,

        #[clap(flatten)]
        opts: StatsOpts,

        /// Output file (single input only; default stdout)
        #[clap(short = 'o', long, value_parser)]
        output: Option<String>,

        /// Directory for per-input outputs when several inputs are given
        #[clap(long, value_parser)]
        output_dir: Option<String>,

        /// Pairs files, plain or gzip/BGZF-compressed (default stdin)
        inputs: Vec<String>,
    },
    /// Subtract control-chromosome means from pairviz JSON Lines output
    SubtractControl {
        #[clap(flatten)]
        common: CommonOpts,

        /// Chromosome to use as control
        #[clap(short = 'c', long, value_parser)]
        control_chr: String,

        /// Output file (default stdout)
        #[clap(short = 'o', long, value_parser)]
        output: Option<String>,

        /// pairviz JSON Lines file (default stdin)
        input: Option<String>,
    },
}

/// Initialize logging and the thread pool based on common options
fn initialize(common: &CommonOpts) -> io::Result<()> {
    env_logger::Builder::new()
        .filter_level(match common.verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    ThreadPoolBuilder::new()
        .num_threads(common.num_threads.into())
        .build_global()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    match args {
        Args::Stats {
            common,
            opts,
            output,
            output_dir,
            inputs,
        } => {
            initialize(&common)?;

            let config = opts.to_config();
            let mode = match config.mode() {
                Ok(mode) => mode,
                Err(e) => {
                    error!("{}", e);
                    std::process::exit(1);
                }
            };

            if let Err(e) = run_stats(
                &config,
                &mode,
                &inputs,
                output.as_deref(),
                output_dir.as_deref(),
            ) {
                error!("{}", e);
                std::process::exit(1);
            }
        }
        Args::SubtractControl {
            common,
            control_chr,
            output,
            input,
        } => {
            initialize(&common)?;

            if let Err(e) = run_subtract_control(input.as_deref(), &control_chr, output.as_deref())
            {
                error!("{}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
