use log::warn;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;

/// Number of times the templates are repeated.
pub const MOCK_REPEATS: usize = 25;

pub const MOCK_TEMPLATES: [&str; 4] = [
    r#"{"text": "This is a positive example", "label": 1}"#,
    r#"{"text": "This is a negative example", "label": 0}"#,
    r#"{"text": "Another positive case", "label": 1}"#,
    r#"{"text": "Another negative case", "label": 0}"#,
];

/// Writes the synthetic dataset to `path` and returns the number of samples.
pub fn write_mock_dataset(path: &Path) -> Result<usize> {
    let mut writer = BufWriter::new(File::create(path)?);
    for _ in 0..MOCK_REPEATS {
        for line in MOCK_TEMPLATES {
            writeln!(writer, "{}", line)?;
        }
    }
    writer.flush()?;

    let samples = MOCK_REPEATS * MOCK_TEMPLATES.len();
    warn!(
        "Created SYNTHETIC mock dataset with {} samples at {}; this is not real training data",
        samples,
        path.display()
    );
    Ok(samples)
}
