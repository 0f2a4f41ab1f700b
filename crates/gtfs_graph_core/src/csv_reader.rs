use csv::{ReaderBuilder, Trim, WriterBuilder};
use gtfs_graph_model::RawRow;

use crate::GraphError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn strip_utf8_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(UTF8_BOM).unwrap_or(data)
}

/// Reads every data row of a section as ordered name/value pairs. Rows with
/// only empty fields are dropped; short rows simply lack the trailing names.
pub fn read_rows(file: &str, data: &[u8]) -> Result<Vec<RawRow>, GraphError> {
    let data = strip_utf8_bom(data);
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::None)
        .from_reader(data);
    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| csv_error(file, source))?
        .iter()
        .map(|name| name.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|source| csv_error(file, source))?;
        if record.iter().all(|value| value.trim().is_empty()) {
            continue;
        }
        let mut row = RawRow::new();
        for (name, value) in headers.iter().zip(record.iter()) {
            if !name.is_empty() {
                row.insert(name.as_str(), value);
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Writes `fields` as the header, followed by any extra names the rows carry
/// in first-seen order. Absent values are written empty.
pub fn write_rows(file: &str, fields: &[&str], rows: &[RawRow]) -> Result<Vec<u8>, GraphError> {
    let mut header: Vec<&str> = fields.to_vec();
    for row in rows {
        for name in row.names() {
            if !header.contains(&name) {
                header.push(name);
            }
        }
    }

    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(&header)
        .map_err(|source| csv_error(file, source))?;
    for row in rows {
        writer
            .write_record(header.iter().map(|name| row.get(name).unwrap_or("")))
            .map_err(|source| csv_error(file, source))?;
    }
    writer.into_inner().map_err(|err| GraphError::Io {
        path: file.into(),
        source: err.into_error(),
    })
}

fn csv_error(file: &str, source: csv::Error) -> GraphError {
    GraphError::Csv {
        file: file.to_string(),
        source,
    }
}
