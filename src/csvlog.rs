//! # CSV log persistence.
//!
//! Logs are comma-delimited, minimally quoted, with an optional header row.
//! Writing truncates an existing file.

use std::path::Path;

/// A CSV log read back from disk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CsvLog {
    pub header: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

/// Writes `rows` to `path`, preceded by `header` when given.
pub fn save_csv_log<S, R>(
    path: impl AsRef<Path>,
    header: Option<&[S]>,
    rows: impl IntoIterator<Item = R>,
) -> Result<(), csv::Error>
where
    S: AsRef<str>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b',')
        .quote_style(csv::QuoteStyle::Necessary)
        .flexible(true)
        .from_path(path)?;

    if let Some(header) = header {
        wtr.write_record(header.iter().map(|h| h.as_ref()))?;
    }
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Reads a log written by [`save_csv_log`].
pub fn read_csv_log(path: impl AsRef<Path>, has_header: bool) -> Result<CsvLog, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(has_header)
        .flexible(true)
        .from_path(path)?;

    let header = if has_header {
        Some(rdr.headers()?.iter().map(str::to_string).collect())
    } else {
        None
    };
    let rows = rdr
        .records()
        .map(|r| r.map(|rec| rec.iter().map(str::to_string).collect()))
        .collect::<Result<Vec<Vec<String>>, csv::Error>>()?;

    Ok(CsvLog { header, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_rows_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");

        let rows = vec![vec!["a", "1"], vec!["b,c", "2"]];
        save_csv_log(&path, Some(&["name", "value"][..]), rows).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, "name,value\na,1\n\"b,c\",2\n");

        let log = read_csv_log(&path, true).unwrap();
        assert_eq!(log.header, Some(vec!["name".into(), "value".into()]));
        assert_eq!(log.rows[1], vec!["b,c".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_without_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.csv");

        save_csv_log(&path, None::<&[&str]>, vec![vec!["1", "2", "3"]]).unwrap();

        let log = read_csv_log(&path, false).unwrap();
        assert_eq!(log.header, None);
        assert_eq!(log.rows, vec![vec!["1", "2", "3"]]);
    }

    #[test]
    fn test_unwritable_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("log.csv");
        assert!(save_csv_log(&path, None::<&[&str]>, Vec::<Vec<&str>>::new()).is_err());
    }
}
