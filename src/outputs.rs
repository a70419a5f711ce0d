use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Run outputs for the surrounding CI workflow.
///
/// Values are appended to the file named by `GITHUB_OUTPUT` when it is set,
/// otherwise printed to stdout.
#[derive(Debug, Clone, Default)]
pub struct Outputs {
    file: Option<PathBuf>,
}

impl Outputs {
    pub fn new(file: Option<PathBuf>) -> Self {
        Self { file }
    }

    pub fn from_env() -> Self {
        Self::new(
            std::env::var_os("GITHUB_OUTPUT")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        )
    }

    pub fn set(&self, name: &str, value: &str) -> Result<()> {
        let line = format!("{}={}", name, value.replace('\n', " "));
        match &self.file {
            Some(path) => {
                let mut file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("Failed to open output file {}", path.display()))?;
                writeln!(file, "{}", line)
                    .with_context(|| format!("Failed to write output {}", name))?;
            }
            None => println!("{}", line),
        }
        Ok(())
    }

    /// Emit the workflow failure annotation.
    pub fn fail(&self, message: &str) {
        println!("::error::{}", escape_annotation(message));
    }
}

fn escape_annotation(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
