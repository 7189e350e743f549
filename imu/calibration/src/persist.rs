use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use csv::{ReaderBuilder, Trim, WriterBuilder};
use imu_traits::{ImuError, ImuResult};
use nalgebra::{DMatrix, Matrix4x3};
use tracing::debug;

const PLACEHOLDER: &str = "{}";

/// File name pattern with a single `{}` replaced by the scale index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTemplate {
    prefix: String,
    suffix: String,
}

impl FileTemplate {
    pub fn new(template: &str) -> ImuResult<Self> {
        match template.split_once(PLACEHOLDER) {
            Some((prefix, suffix)) if !suffix.contains(PLACEHOLDER) => Ok(FileTemplate {
                prefix: prefix.to_string(),
                suffix: suffix.to_string(),
            }),
            _ => Err(ImuError::ConfigurationError(format!(
                "file template {:?} must contain exactly one {}",
                template, PLACEHOLDER
            ))),
        }
    }

    pub(crate) fn from_parts(prefix: &str, suffix: &str) -> Self {
        FileTemplate {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        }
    }

    pub fn path(&self, scale: usize) -> PathBuf {
        PathBuf::from(format!("{}{}{}", self.prefix, scale, self.suffix))
    }
}

impl FromStr for FileTemplate {
    type Err = ImuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileTemplate::new(s)
    }
}

impl fmt::Display for FileTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.prefix, PLACEHOLDER, self.suffix)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Writes `matrix` as comma-terminated rows.
///
/// The data lands in a sibling `.tmp` file first and is renamed over `path`
/// only after a successful sync, so a failed write leaves no partial file.
pub fn write_matrix(path: &Path, matrix: &DMatrix<f64>) -> ImuResult<()> {
    let tmp = temp_path(path);
    let result = write_rows(&tmp, matrix).and_then(|()| fs::rename(&tmp, path).map_err(ImuError::from));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result?;
    debug!(
        "wrote {}x{} matrix to {}",
        matrix.nrows(),
        matrix.ncols(),
        path.display()
    );
    Ok(())
}

/// Writes a solved 4x3 correction for audit.
pub fn write_correction(path: &Path, matrix: &Matrix4x3<f64>) -> ImuResult<()> {
    write_matrix(path, &DMatrix::from_fn(4, 3, |row, col| matrix[(row, col)]))
}

fn write_rows(path: &Path, matrix: &DMatrix<f64>) -> ImuResult<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(File::create(path)?);

    let mut record = Vec::with_capacity(matrix.ncols() + 1);
    for row in matrix.row_iter() {
        record.clear();
        record.extend(row.iter().map(|v| format!("{:?}", v)));
        record.push(String::new());
        writer.write_record(&record).map_err(io::Error::from)?;
    }

    let file = writer
        .into_inner()
        .map_err(|e| ImuError::Io(e.into_error()))?;
    file.sync_all()?;
    Ok(())
}

/// Reads exactly `rows` rows of at least `columns` numeric fields.
///
/// Any field past `columns`, including the trailing empty one, is ignored.
pub fn read_matrix(path: &Path, rows: usize, columns: usize) -> ImuResult<DMatrix<f64>> {
    let parse_error = |line: usize, message: String| ImuError::ParseError {
        path: path.to_path_buf(),
        line,
        message,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| parse_error(0, e.to_string()))?;

    let mut matrix = DMatrix::zeros(rows, columns);
    let mut count = 0;
    for result in reader.records() {
        let record = result.map_err(|e| {
            let line = e.position().map(|p| p.line() as usize).unwrap_or(0);
            parse_error(line, e.to_string())
        })?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(count + 1);

        if count >= rows {
            return Err(parse_error(line, format!("expected {} rows", rows)));
        }
        for col in 0..columns {
            let field = record
                .get(col)
                .filter(|field| !field.is_empty())
                .ok_or_else(|| {
                    parse_error(line, format!("expected {} values, found {}", columns, col))
                })?;
            matrix[(count, col)] = field
                .parse::<f64>()
                .map_err(|e| parse_error(line, format!("{:?}: {}", field, e)))?;
        }
        count += 1;
    }

    if count != rows {
        return Err(parse_error(
            count,
            format!("expected {} rows, found {}", rows, count),
        ));
    }
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("imu-persist-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_template() {
        let template = FileTemplate::new("w[{}].txt").unwrap();
        assert_eq!(template.path(3), PathBuf::from("w[3].txt"));
        assert_eq!(template.to_string(), "w[{}].txt");
        assert!(FileTemplate::new("w.txt").is_err());
        assert!(FileTemplate::new("{}_{}.txt").is_err());
    }

    #[test]
    fn test_row_format() {
        let dir = scratch_dir("format");
        let path = dir.join("x.txt");
        let matrix = DMatrix::from_row_slice(2, 3, &[1.0, -2.5, 3.0, 0.0, 4.0, 1e-3]);
        write_matrix(&path, &matrix).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "1.0,-2.5,3.0,\n0.0,4.0,0.001,\n");
        assert!(!temp_path(&path).exists());
        assert_eq!(read_matrix(&path, 2, 3).unwrap(), matrix);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_reads_hand_written_rows() {
        let dir = scratch_dir("hand");
        let path = dir.join("w.txt");
        fs::write(&path, "1, 2, 3, 1,\n-4,5.5,6,1\n").unwrap();
        let matrix = read_matrix(&path, 2, 4).unwrap();
        assert_eq!(matrix[(1, 1)], 5.5);
        assert_eq!(matrix[(0, 3)], 1.0);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_parse_errors() {
        let dir = scratch_dir("errors");
        let path = dir.join("w.txt");

        let missing = read_matrix(&dir.join("absent.txt"), 1, 3).unwrap_err();
        assert!(matches!(missing, ImuError::ParseError { .. }));

        fs::write(&path, "1,2,x,\n").unwrap();
        match read_matrix(&path, 1, 3).unwrap_err() {
            ImuError::ParseError { line, .. } => assert_eq!(line, 1),
            other => panic!("unexpected error {:?}", other),
        }

        fs::write(&path, "1,2,3,\n4,5,\n").unwrap();
        match read_matrix(&path, 2, 3).unwrap_err() {
            ImuError::ParseError { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {:?}", other),
        }

        fs::write(&path, "1,2,3,\n").unwrap();
        assert!(read_matrix(&path, 2, 3).is_err());
        assert!(read_matrix(&path, 0, 3).is_err());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_failed_write_leaves_nothing() {
        let dir = scratch_dir("failed");
        let path = dir.join("missing-dir").join("x.txt");
        assert!(write_matrix(&path, &DMatrix::zeros(1, 3)).is_err());
        assert!(!path.exists());
        assert!(!temp_path(&path).exists());
        fs::remove_dir_all(dir).unwrap();
    }
}
