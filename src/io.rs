use crate::errors::{BenchError, BenchResult};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// On-disk table formats understood by [`read_table`] and [`write_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Parquet,
    /// Arrow IPC file, also known as feather v2.
    Ipc,
}

impl TableFormat {
    pub fn from_path<P: AsRef<Path>>(path: P) -> BenchResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => Ok(TableFormat::Csv),
            Some("parquet") => Ok(TableFormat::Parquet),
            Some("feather") | Some("ipc") | Some("arrow") => Ok(TableFormat::Ipc),
            _ => Err(BenchError::config(format!(
                "Unsupported table format for file: {}",
                path.display()
            ))),
        }
    }
}

pub fn read_csv<P: AsRef<Path>>(path: P) -> BenchResult<LazyFrame> {
    LazyCsvReader::new(path)
        .finish()
        .map_err(BenchError::PolarsError)
}

/// Reads a CSV file in batches of `chunk_size` rows. The returned frame keeps
/// one chunk per batch; see [`concat_chunks`].
pub fn read_csv_chunked<P: AsRef<Path>>(path: P, chunk_size: usize) -> BenchResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_chunk_size(chunk_size.max(1))
        .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
        .finish()
        .map_err(BenchError::PolarsError)
}

/// Merges the chunks of every column into one contiguous buffer.
pub fn concat_chunks(mut df: DataFrame) -> DataFrame {
    df.as_single_chunk_par();
    df
}

pub fn read_parquet<P: AsRef<Path>>(path: P) -> BenchResult<LazyFrame> {
    LazyFrame::scan_parquet(path, Default::default()).map_err(BenchError::PolarsError)
}

pub fn read_ipc<P: AsRef<Path>>(path: P) -> BenchResult<DataFrame> {
    let file = File::open(path).map_err(BenchError::IoError)?;
    IpcReader::new(file)
        .finish()
        .map_err(BenchError::PolarsError)
}

pub fn write_csv<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> BenchResult<()> {
    let mut file = File::create(path).map_err(BenchError::IoError)?;
    CsvWriter::new(&mut file)
        .finish(df)
        .map_err(BenchError::PolarsError)
}

pub fn write_parquet<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> BenchResult<()> {
    let file = File::create(path).map_err(BenchError::IoError)?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(BenchError::PolarsError)?;
    Ok(())
}

pub fn write_ipc<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> BenchResult<()> {
    let mut file = File::create(path).map_err(BenchError::IoError)?;
    IpcWriter::new(&mut file)
        .finish(df)
        .map_err(BenchError::PolarsError)
}

/// Loads a whole table, picking the reader from the file extension.
pub fn read_table<P: AsRef<Path>>(path: P) -> BenchResult<DataFrame> {
    let path = path.as_ref();
    match TableFormat::from_path(path)? {
        TableFormat::Csv => Ok(read_csv(path)?.collect()?),
        TableFormat::Parquet => Ok(read_parquet(path)?.collect()?),
        TableFormat::Ipc => read_ipc(path),
    }
}

pub fn write_table<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> BenchResult<()> {
    let path = path.as_ref();
    match TableFormat::from_path(path)? {
        TableFormat::Csv => write_csv(df, path),
        TableFormat::Parquet => write_parquet(df, path),
        TableFormat::Ipc => write_ipc(df, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_csv_io() -> BenchResult<()> {
        let dir = tempdir()?;
        let csv_path = dir.path().join("test.csv");
        fs::write(&csv_path, "a,b,c\n1,2,3\n4,5,6")?;

        let df = read_csv(&csv_path)?.collect()?;

        assert_eq!(df.shape(), (2, 3));
        assert_eq!(df.get_column_names(), vec!["a", "b", "c"]);
        Ok(())
    }

    #[test]
    fn test_csv_chunked_matches_single_read() -> BenchResult<()> {
        let dir = tempdir()?;
        let csv_path = dir.path().join("chunks.csv");
        let mut body = String::from("x,category\n");
        for i in 0..50 {
            body.push_str(&format!("{},{}\n", i, ["A", "B"][i % 2]));
        }
        fs::write(&csv_path, body)?;

        let whole = read_csv(&csv_path)?.collect()?;
        let chunked = concat_chunks(read_csv_chunked(&csv_path, 7)?);

        assert!(whole.equals(&chunked));
        Ok(())
    }

    #[test]
    fn test_ipc_round_trip() -> BenchResult<()> {
        let dir = tempdir()?;
        let path = dir.path().join("table.feather");
        let mut df = df! {
            "x" => [1i64, 2, 3],
            "category" => ["A", "B", "A"],
        }?;

        write_table(&mut df, &path)?;
        let back = read_table(&path)?;

        assert!(df.equals(&back));
        Ok(())
    }

    #[test]
    fn test_parquet_io() -> BenchResult<()> {
        let dir = tempdir()?;
        let path = dir.path().join("table.parquet");
        let mut df = df! { "a" => [1i32, 4], "b" => [2i32, 5] }?;

        write_parquet(&mut df, &path)?;
        let back = read_parquet(&path)?.collect()?;

        assert_eq!(back.shape(), (2, 2));
        Ok(())
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let err = TableFormat::from_path("data.xlsx").unwrap_err();
        assert!(matches!(err, BenchError::ConfigError(..)));
    }

    #[test]
    fn test_missing_file_propagates() {
        let err = read_ipc("/definitely/not/here.feather").unwrap_err();
        assert!(matches!(err, BenchError::IoError(_)));
    }
}
