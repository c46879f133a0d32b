use crate::error::{IoError, IoResult};
use oxiclass_core::Tensor;
use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Read an all-numeric CSV file into a `[rows, cols]` tensor and its headers.
///
/// The first line is the header. Every other field must parse as `f64`;
/// the first one that does not is reported with its row and column.
pub fn read_csv<P: AsRef<Path>>(path: P) -> IoResult<(Tensor<f64>, Vec<String>)> {
    let path = path.as_ref();
    let rdr = csv::Reader::from_path(path).map_err(|source| IoError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let (tensor, headers) = read_numeric(rdr)?;
    if tensor.n_rows()? == 0 {
        return Err(IoError::NoRows(path.to_path_buf()));
    }
    debug!(path = %path.display(), shape = %tensor.shape(), "loaded numeric csv");
    Ok((tensor, headers))
}

/// Same as [`read_csv`] over any reader.
pub fn read_csv_from<R: Read>(reader: R) -> IoResult<(Tensor<f64>, Vec<String>)> {
    read_numeric(csv::Reader::from_reader(reader))
}

fn read_numeric<R: Read>(mut rdr: csv::Reader<R>) -> IoResult<(Tensor<f64>, Vec<String>)> {
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let mut data = Vec::new();
    let mut n_rows = 0usize;
    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        for (j, field) in record.iter().enumerate() {
            let value: f64 = field.trim().parse().map_err(|_| IoError::NotNumeric {
                row: row + 1,
                column: headers.get(j).cloned().unwrap_or_else(|| j.to_string()),
                value: field.to_string(),
            })?;
            data.push(value);
        }
        n_rows += 1;
    }

    let tensor = Tensor::new(data, vec![n_rows, headers.len()])?;
    Ok((tensor, headers))
}

/// Deserialize every row of a headed CSV into `T`.
///
/// Leading/trailing whitespace around fields is trimmed before
/// deserialization.
pub fn read_records<T, R>(reader: R) -> IoResult<Vec<T>>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let records = rdr
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()?;
    Ok(records)
}

/// [`read_records`] from a file path.
pub fn read_records_path<T, P>(path: P) -> IoResult<Vec<T>>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let records: Vec<T> = read_records(file)?;
    debug!(path = %path.display(), rows = records.len(), "loaded csv records");
    Ok(records)
}

/// Write a matrix to a CSV file with optional headers.
pub fn write_csv<P: AsRef<Path>>(
    path: P,
    data: &Tensor<f64>,
    headers: Option<&[String]>,
) -> IoResult<()> {
    let mut wtr = csv::Writer::from_path(path.as_ref())?;

    if let Some(h) = headers {
        wtr.write_record(h)?;
    }

    for row in data.rows()? {
        wtr.write_record(row.iter().map(|v| v.to_string()))?;
    }

    wtr.flush()?;
    Ok(())
}
