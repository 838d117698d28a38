//! Normalise window statistics against a control chromosome

use crate::json::{read_json_stats, JsonOutStat};
use crate::reader::open_input;
use log::info;
use std::fs::File;
use std::io::{self, BufWriter, Write};

/// Mean of every statistic over the windows of `control_chr`, with the number of windows
pub fn control_stat_means<'a, I>(records: I, control_chr: &str) -> (JsonOutStat, usize)
where
    I: IntoIterator<Item = &'a JsonOutStat>,
{
    let mut sums = JsonOutStat::default();
    let mut count = 0;
    for record in records {
        if record.chr == control_chr {
            sums.accumulate(record);
            count += 1;
        }
    }
    (sums.div_count(count as f64), count)
}

/// Subtract the control-chromosome means from every window of a pairviz JSON Lines file
pub fn run_subtract_control(
    input: Option<&str>,
    control_chr: &str,
    output: Option<&str>,
) -> io::Result<()> {
    let records = read_json_stats(open_input(input)?).collect::<io::Result<Vec<_>>>()?;

    let (control, count) = control_stat_means(&records, control_chr);
    if count == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Control chromosome '{}' has no windows in the input", control_chr),
        ));
    }
    info!(
        "Subtracting means of {} control windows on {} from {} records",
        count,
        control_chr,
        records.len()
    );

    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout()),
    };
    let mut writer = BufWriter::new(writer);
    for record in &records {
        serde_json::to_writer(&mut writer, &record.subtract(&control))?;
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}
