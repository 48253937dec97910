use log::{info, warn};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Appends every line of `inputs`, in order, to a fresh `output` file.
///
/// Lines are copied verbatim. A shard whose last line has no trailing newline gets
/// one so it cannot merge with the first line of the next shard. Missing inputs are
/// skipped with a warning. Returns the number of lines written.
pub fn combine_jsonl(inputs: &[PathBuf], output: &Path) -> Result<usize> {
    info!("Combining {} files into {}", inputs.len(), output.display());

    let mut writer = BufWriter::new(File::create(output)?);
    let mut total = 0;

    for input in inputs {
        if !input.exists() {
            warn!("File not found: {}", input.display());
            continue;
        }
        let lines = append_lines(input, &mut writer)?;
        info!("Added {} ({} lines) to combined dataset", input.display(), lines);
        total += lines;
    }

    writer.flush()?;
    Ok(total)
}

fn append_lines<W: Write>(input: &Path, writer: &mut W) -> Result<usize> {
    let mut reader = BufReader::new(File::open(input)?);
    let mut line = Vec::new();
    let mut count = 0;

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        writer.write_all(&line)?;
        if line.last() != Some(&b'\n') {
            writer.write_all(b"\n")?;
        }
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn concatenates_in_order_and_fixes_missing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("dataset_0.jsonl");
        let second = dir.path().join("dataset_1.jsonl");
        fs::write(&first, "a\nb").unwrap();
        fs::write(&second, "c\n").unwrap();

        let out = dir.path().join("combined.jsonl");
        let lines = combine_jsonl(&[first, second], &out).unwrap();

        assert_eq!(lines, 3);
        assert_eq!(fs::read_to_string(&out).unwrap(), "a\nb\nc\n");
    }

    #[test]
    fn missing_shard_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("dataset_1.jsonl");
        fs::write(&present, "x\n").unwrap();

        let out = dir.path().join("combined.jsonl");
        let lines = combine_jsonl(&[dir.path().join("dataset_0.jsonl"), present], &out).unwrap();

        assert_eq!(lines, 1);
        assert_eq!(fs::read_to_string(&out).unwrap(), "x\n");
    }
}
