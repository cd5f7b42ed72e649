//! Output destination plumbing

use crate::config::OutputTarget;
use crate::{Result, SidCaptureError};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use tracing::debug;

/// Open the configured destination behind a buffer
pub fn open(target: &OutputTarget) -> Result<Box<dyn Write>> {
    match target {
        OutputTarget::Stdout => {
            debug!("writing to standard output");
            Ok(Box::new(BufWriter::new(io::stdout().lock())))
        }
        OutputTarget::File(path) => {
            debug!(path = %path.display(), "writing to file");
            let file = File::create(path).map_err(|source| SidCaptureError::Output {
                path: path.clone(),
                source,
            })?;
            Ok(Box::new(BufWriter::new(file)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_file_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.raw");
        let mut out = open(&OutputTarget::File(path.clone())).unwrap();
        out.write_all(&[1, 2, 3]).unwrap();
        out.flush().unwrap();
        drop(out);
        assert_eq!(std::fs::read(path).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_open_missing_directory_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("capture.raw");
        let err = match open(&OutputTarget::File(path.clone())) {
            Ok(_) => panic!("expected an error"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("capture.raw"), "{err}");
    }
}
