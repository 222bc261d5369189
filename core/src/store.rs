/*
    spotify-liked-snapshot | Rust CLI tool to snapshot Liked Songs into datasets.
    Copyright (C) 2025  Israel Alberto Roldan Vega

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use crate::models::{LikedTrackRow, LikedTracksTable};
use arrow_array::{
    builder::{BooleanBuilder, StringBuilder, UInt32Builder, UInt64Builder},
    ArrayRef, RecordBatch,
};
use arrow_schema::{ArrowError, DataType, Field, Schema, SchemaRef};
use log::info;
use parquet::{
    arrow::ArrowWriter,
    basic::Compression,
    errors::ParquetError,
    file::properties::WriterProperties,
};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),
}

/// On-disk encoding of a snapshot, picked from the target path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Csv,
    Parquet,
}

impl SnapshotFormat {
    /// `.csv` (any case) selects CSV; everything else, including no extension, is Parquet.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => SnapshotFormat::Csv,
            _ => SnapshotFormat::Parquet,
        }
    }
}

pub fn arrow_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("snapshot_utc", DataType::Utf8, false),
        Field::new("added_at", DataType::Utf8, true),
        Field::new("track_id", DataType::Utf8, false),
        Field::new("track_name", DataType::Utf8, true),
        Field::new("explicit", DataType::Boolean, true),
        Field::new("popularity", DataType::UInt32, true),
        Field::new("duration_ms", DataType::UInt64, true),
        Field::new("artist_names", DataType::Utf8, false),
        Field::new("artist_ids", DataType::Utf8, false),
        Field::new("album_id", DataType::Utf8, true),
        Field::new("album_name", DataType::Utf8, true),
        Field::new("release_date", DataType::Utf8, true),
        Field::new("release_date_precision", DataType::Utf8, true),
    ]))
}

/// Column-wise copy of the table.
pub fn to_record_batch(table: &LikedTracksTable) -> Result<RecordBatch, StoreError> {
    let rows = table.rows();
    let n = rows.len();

    let mut snapshot_utc = StringBuilder::new();
    let mut added_at = StringBuilder::new();
    let mut track_id = StringBuilder::new();
    let mut track_name = StringBuilder::new();
    let mut explicit = BooleanBuilder::with_capacity(n);
    let mut popularity = UInt32Builder::with_capacity(n);
    let mut duration_ms = UInt64Builder::with_capacity(n);
    let mut artist_names = StringBuilder::new();
    let mut artist_ids = StringBuilder::new();
    let mut album_id = StringBuilder::new();
    let mut album_name = StringBuilder::new();
    let mut release_date = StringBuilder::new();
    let mut release_date_precision = StringBuilder::new();

    for row in rows {
        snapshot_utc.append_value(&row.snapshot_utc);
        added_at.append_option(row.added_at.as_deref());
        track_id.append_value(&row.track_id);
        track_name.append_option(row.track_name.as_deref());
        explicit.append_option(row.explicit);
        popularity.append_option(row.popularity);
        duration_ms.append_option(row.duration_ms);
        artist_names.append_value(&row.artist_names);
        artist_ids.append_value(&row.artist_ids);
        album_id.append_option(row.album_id.as_deref());
        album_name.append_option(row.album_name.as_deref());
        release_date.append_option(row.release_date.as_deref());
        release_date_precision.append_option(row.release_date_precision.as_deref());
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(snapshot_utc.finish()),
        Arc::new(added_at.finish()),
        Arc::new(track_id.finish()),
        Arc::new(track_name.finish()),
        Arc::new(explicit.finish()),
        Arc::new(popularity.finish()),
        Arc::new(duration_ms.finish()),
        Arc::new(artist_names.finish()),
        Arc::new(artist_ids.finish()),
        Arc::new(album_id.finish()),
        Arc::new(album_name.finish()),
        Arc::new(release_date.finish()),
        Arc::new(release_date_precision.finish()),
    ];

    Ok(RecordBatch::try_new(arrow_schema(), columns)?)
}

pub fn write_csv<W: Write>(table: &LikedTracksTable, writer: W) -> Result<(), StoreError> {
    let mut out = csv::Writer::from_writer(writer);
    if table.is_empty() {
        // serde only emits the header alongside the first record
        out.write_record(LikedTracksTable::COLUMNS)?;
    }
    for row in table.rows() {
        out.serialize(row)?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_parquet<W: Write + Send>(
    table: &LikedTracksTable,
    writer: W,
) -> Result<(), StoreError> {
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let batch = to_record_batch(table)?;
    let mut out = ArrowWriter::try_new(writer, batch.schema(), Some(props))?;
    out.write(&batch)?;
    out.close()?;
    Ok(())
}

/// Loads a snapshot previously written by [`save`] in CSV form.
///
/// CSV has no null marker, so an optional text field saved as `Some("")` reads back as `None`.
pub fn read_csv(path: &Path) -> Result<LikedTracksTable, StoreError> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader
        .deserialize::<LikedTrackRow>()
        .collect::<Result<Vec<_>, _>>()?;
    let snapshot_utc = rows
        .first()
        .map(|r| r.snapshot_utc.clone())
        .unwrap_or_default();
    Ok(LikedTracksTable::new(snapshot_utc, rows))
}

/// Writes the whole table to `path`, creating parent directories as needed.
///
/// The file is written next to its destination and renamed into place, so
/// readers never observe a partial snapshot.
pub fn save(table: &LikedTracksTable, path: &Path) -> Result<SnapshotFormat, StoreError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let format = SnapshotFormat::from_path(path);
    let mut temp = NamedTempFile::new_in(parent)?;
    match format {
        SnapshotFormat::Csv => write_csv(table, temp.as_file_mut())?,
        SnapshotFormat::Parquet => write_parquet(table, temp.as_file_mut())?,
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| StoreError::Io(e.error))?;

    info!(
        "Saved {} rows to {} ({:?})",
        table.len(),
        path.display(),
        format
    );
    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::{Array, BooleanArray, StringArray, UInt32Array};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::fs::File;

    fn sample_table() -> LikedTracksTable {
        let stamp = "2025-06-01T12:00:00.000000+00:00";
        let rows = vec![
            LikedTrackRow {
                snapshot_utc: stamp.to_string(),
                added_at: Some("2024-01-01T00:00:00Z".to_string()),
                track_id: "t1".to_string(),
                track_name: Some("First, with comma".to_string()),
                explicit: Some(true),
                popularity: Some(42),
                duration_ms: Some(201000),
                artist_names: "Ann|Bob".to_string(),
                artist_ids: "a1|a3".to_string(),
                album_id: Some("al1".to_string()),
                album_name: Some("Album \"Quoted\"".to_string()),
                release_date: Some("2019".to_string()),
                release_date_precision: Some("year".to_string()),
            },
            LikedTrackRow {
                snapshot_utc: stamp.to_string(),
                added_at: None,
                track_id: "t2".to_string(),
                track_name: None,
                explicit: None,
                popularity: None,
                duration_ms: None,
                artist_names: String::new(),
                artist_ids: String::new(),
                album_id: None,
                album_name: None,
                release_date: None,
                release_date_precision: None,
            },
        ];
        LikedTracksTable::new(stamp, rows)
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SnapshotFormat::from_path(Path::new("a/b.csv")), SnapshotFormat::Csv);
        assert_eq!(SnapshotFormat::from_path(Path::new("a/b.CSV")), SnapshotFormat::Csv);
        assert_eq!(
            SnapshotFormat::from_path(Path::new("a/b.parquet")),
            SnapshotFormat::Parquet
        );
        assert_eq!(SnapshotFormat::from_path(Path::new("a/b")), SnapshotFormat::Parquet);
        assert_eq!(
            SnapshotFormat::from_path(Path::new("liked.csv.bak")),
            SnapshotFormat::Parquet
        );
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/liked.csv");
        let table = sample_table();

        assert_eq!(save(&table, &path).unwrap(), SnapshotFormat::Csv);
        let loaded = read_csv(&path).unwrap();

        assert_eq!(loaded, table);
    }

    #[test]
    fn test_csv_empty_optional_text_reads_back_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("liked.csv");
        let mut rows = sample_table().into_rows();
        rows[0].track_name = Some(String::new());
        let table = LikedTracksTable::new(rows[0].snapshot_utc.clone(), rows);

        save(&table, &path).unwrap();
        let loaded = read_csv(&path).unwrap();

        assert!(loaded.rows()[0].track_name.is_none());
        assert_eq!(loaded.rows()[0].album_id.as_deref(), Some("al1"));
    }

    #[test]
    fn test_csv_header_matches_columns() {
        let mut out = Vec::new();
        write_csv(&sample_table(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(header, LikedTracksTable::COLUMNS.join(","));
    }

    #[test]
    fn test_empty_csv_still_has_header() {
        let mut out = Vec::new();
        write_csv(&LikedTracksTable::default(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.trim_end(), LikedTracksTable::COLUMNS.join(","));
    }

    #[test]
    fn test_parquet_written_with_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("liked_songs.parquet");
        let table = sample_table();

        assert_eq!(save(&table, &path).unwrap(), SnapshotFormat::Parquet);

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path).unwrap())
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<RecordBatch> = reader.collect::<Result<_, _>>().unwrap();
        let total: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(total, 2);

        let schema = batches[0].schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, LikedTracksTable::COLUMNS.to_vec());

        let batch = &batches[0];
        let track_name = batch
            .column(3)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(track_name.value(0), "First, with comma");
        assert!(track_name.is_null(1));

        let explicit = batch
            .column(4)
            .as_any()
            .downcast_ref::<BooleanArray>()
            .unwrap();
        assert!(explicit.value(0));
        assert!(explicit.is_null(1));

        let popularity = batch
            .column(5)
            .as_any()
            .downcast_ref::<UInt32Array>()
            .unwrap();
        assert_eq!(popularity.value(0), 42);
        assert!(popularity.is_null(1));

        let artist_ids = batch
            .column(8)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(artist_ids.value(0), "a1|a3");
        assert_eq!(artist_ids.value(1), "");
    }

    #[test]
    fn test_record_batch_nulls() {
        let batch = to_record_batch(&sample_table()).unwrap();
        assert_eq!(batch.num_columns(), 13);
        assert_eq!(batch.column(3).null_count(), 1);
        assert_eq!(batch.column(7).null_count(), 0);
    }

    #[test]
    fn test_unwritable_target_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();

        let err = save(&sample_table(), &blocker.join("liked.csv")).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
