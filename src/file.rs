use std::{
    io::{Read, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::{Column, Frame};

const MISSING: &[&str] = &["", "NA", "N/A", "NaN", "nan", "NULL", "null", "None"];

#[derive(Clone, Debug, PartialEq)]
pub struct File {
    path: PathBuf,
    file_type: FileType,
    gz: bool,
}

impl File {
    pub fn new(path: impl Into<PathBuf>, file_type: FileType, gz: bool) -> Self {
        Self {
            path: path.into(),
            file_type,
            gz,
        }
    }

    #[inline(always)]
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    #[inline(always)]
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    #[inline(always)]
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub fn gz(&self) -> bool {
        self.gz
    }

    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Frame, crate::Error> {
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(crate::Error::InputNotFound(self.path.clone()));
            },
            Err(e) => return Err(e.into()),
        };
        let frame = if self.gz {
            let decoder = flate2::read::GzDecoder::new(file);
            self.read_from_reader(decoder)
        } else {
            self.read_from_reader(file)
        }?;
        info!(
            "Loaded {} rows and {} columns from {}",
            frame.nrows(),
            frame.ncols(),
            self.path.display()
        );
        Ok(frame)
    }

    pub fn read_from_reader(&self, reader: impl std::io::Read) -> Result<Frame, crate::Error> {
        Self::read_text_file(reader, self.file_type.separator())
    }

    #[doc(hidden)]
    pub fn read_text_file(mut reader: impl std::io::Read, sep: u8) -> Result<Frame, crate::Error> {
        let mut file = String::new();
        reader.read_to_string(&mut file)?;
        let mut records = split_records(file.trim_start_matches('\u{feff}'), sep as char)?;
        records.retain(|(_, r)| !(r.len() == 1 && r[0].trim().is_empty()));
        if records.is_empty() {
            return Err(crate::Error::EmptyFile);
        }
        let (_, header) = records.remove(0);
        let ncols = header.len();
        for (line, record) in &records {
            if record.len() != ncols {
                return Err(crate::Error::IncompleteFile(*line, record.len(), ncols));
            }
        }
        debug!("Parsed {} records with {} fields", records.len(), ncols);

        let columns = header
            .into_par_iter()
            .enumerate()
            .map(|(j, name)| {
                let cells = records
                    .iter()
                    .map(|(_, r)| r[j].trim())
                    .collect::<Vec<_>>();
                infer_column(name.trim().to_string(), &cells)
            })
            .collect::<Vec<_>>();
        Frame::new(columns)
    }

    #[tracing::instrument(skip(self, frame), fields(path = %self.path.display()))]
    pub fn write(&self, frame: &Frame) -> Result<(), crate::Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::File::create(&self.path)?;
        if self.gz {
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            Self::write_text_file(encoder, frame, self.file_type.separator())
        } else {
            Self::write_text_file(file, frame, self.file_type.separator())
        }
    }

    #[doc(hidden)]
    pub fn write_text_file(
        writer: impl std::io::Write,
        frame: &Frame,
        sep: u8,
    ) -> Result<(), crate::Error> {
        let mut writer = std::io::BufWriter::with_capacity(128 * 1024, writer);
        let sep = sep as char;
        let header = frame
            .colnames()
            .iter()
            .map(|x| quote(x, sep))
            .collect::<Vec<_>>()
            .join(&sep.to_string());
        writeln!(writer, "{}", header)?;
        let rows = (0..frame.nrows())
            .into_par_iter()
            .map(|i| {
                frame
                    .columns()
                    .iter()
                    .map(|c| quote(&c.format_cell(i), sep))
                    .collect::<Vec<_>>()
                    .join(&sep.to_string())
            })
            .collect::<Vec<_>>();
        for row in rows {
            writeln!(writer, "{}", row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, crate::Error> {
        let path = path.into();
        let extension = path
            .file_name()
            .ok_or(crate::Error::NoFileName)?
            .to_str()
            .ok_or(crate::Error::InvalidFileName)?
            .split('.')
            .filter(|x| !x.is_empty())
            .collect::<Vec<&str>>();
        if extension.len() < 2 {
            return Err(crate::Error::NoFileExtension);
        }
        let gz = extension[extension.len() - 1] == "gz";
        if gz && extension.len() < 3 {
            return Err(crate::Error::NoFileExtension);
        }
        let extension = extension[extension.len() - if gz { 2 } else { 1 }];
        let file_type = FileType::from_str(extension)?;
        Ok(Self {
            path,
            file_type,
            gz,
        })
    }
}

impl FromStr for File {
    type Err = crate::Error;

    #[cfg_attr(coverage_nightly, coverage(off))]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_path(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Comma-separated values, row major.
    /// Expects the first row to be the column names.
    Csv,
    /// Tab-separated values, row major.
    /// Expects the first row to be the column names.
    Tsv,
    /// Space-separated values, row major.
    /// Expects the first row to be the column names.
    Txt,
}

impl FileType {
    #[inline]
    pub fn separator(self) -> u8 {
        match self {
            FileType::Csv => b',',
            FileType::Tsv => b'\t',
            FileType::Txt => b' ',
        }
    }
}

impl FromStr for FileType {
    type Err = crate::Error;

    #[cfg_attr(coverage_nightly, coverage(off))]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "csv" => Self::Csv,
            "tsv" => Self::Tsv,
            "txt" => Self::Txt,
            _ => return Err(crate::Error::UnsupportedFileType(s.to_string())),
        })
    }
}

/// Moves `from` to `to`, copying across file systems when a rename is not possible.
#[tracing::instrument]
pub fn relocate(from: &Path, to: &Path) -> Result<(), crate::Error> {
    if !from.exists() {
        return Err(crate::Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} was not found", from.display()),
        )));
    }
    if let Some(parent) = to.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    if let Err(e) = std::fs::rename(from, to) {
        warn!("rename failed ({}), falling back to copy", e);
        std::fs::copy(from, to)?;
        std::fs::remove_file(from)?;
    }
    debug!("Moved {} to {}", from.display(), to.display());
    Ok(())
}

fn quote(field: &str, sep: char) -> String {
    if field.contains(sep) || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Splits text into records of fields, honouring double-quoted fields. Each record carries its
/// 1-based starting line.
fn split_records(text: &str, sep: char) -> Result<Vec<(usize, Vec<String>)>, crate::Error> {
    let mut records = vec![];
    let mut record = vec![];
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut start = 1;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                },
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                },
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            '\r' => {},
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push((start, std::mem::take(&mut record)));
                line += 1;
                start = line;
            },
            c if c == sep => record.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err(crate::Error::UnterminatedQuote(start));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push((start, record));
    }
    Ok(records)
}

fn is_missing(cell: &str) -> bool {
    MISSING.contains(&cell)
}

/// Infers the dtype of a column the way pandas does: integers without gaps are `int64`, anything
/// numeric is `float64`, everything else is `object`.
fn infer_column(name: String, cells: &[&str]) -> Column {
    let any_missing = cells.iter().any(|c| is_missing(c));
    if !any_missing && !cells.is_empty() {
        if let Ok(ints) = cells.iter().map(|c| c.parse::<i64>()).collect::<Result<Vec<_>, _>>() {
            return Column::int(name, ints);
        }
    }
    let floats = cells
        .iter()
        .map(|c| {
            if is_missing(c) {
                Ok(f64::NAN)
            } else {
                c.parse::<f64>()
            }
        })
        .collect::<Result<Vec<_>, _>>();
    match floats {
        Ok(floats) => Column::float(name, floats),
        Err(_) => Column::text(
            name,
            cells
                .iter()
                .map(|c| (!is_missing(c)).then(|| c.to_string()))
                .collect(),
        ),
    }
}
