//! Card dataset file
//!
//! Fixed 11-column CSV consumed by the game layer. Column order and header
//! names are an external contract. Multi-valued fields are joined with `;`.

use std::io::{Read, Write};
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::domain::card::CardRecord;

/// Header row, in column order
pub const DATASET_HEADER: [&str; 11] = [
    "Number",
    "Name",
    "Card Type",
    "Types",
    "Rarity",
    "HP",
    "Weakness",
    "Resistance",
    "Retreat Cost",
    "Image URL",
    "Local Image",
];

/// Delimiter for multi-valued fields
pub const LIST_DELIMITER: char = ';';

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Dataset I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unexpected dataset header: {found:?}")]
    Header { found: Vec<String> },

    #[error("Invalid {column} value '{value}' on line {line}")]
    InvalidField { line: u64, column: &'static str, value: String },
}

pub type DatasetResult<T> = Result<T, DatasetError>;

/// Join a multi-valued field; an empty sequence is an empty field
#[must_use]
pub fn join_list(values: &[String]) -> String {
    values.join(&LIST_DELIMITER.to_string())
}

/// Inverse of [`join_list`]; an empty field is an empty sequence
#[must_use]
pub fn split_list(field: &str) -> Vec<String> {
    if field.is_empty() {
        return Vec::new();
    }
    field.split(LIST_DELIMITER).map(str::to_string).collect()
}

fn to_row(record: &CardRecord) -> [String; 11] {
    [
        record.number.clone(),
        record.name.clone(),
        record.card_type.clone(),
        join_list(&record.types),
        record.rarity.clone(),
        record.hp.clone().unwrap_or_default(),
        join_list(&record.weakness),
        join_list(&record.resistance),
        record.retreat_cost.to_string(),
        record.image_url.clone().unwrap_or_default(),
        record.local_image_path.clone().unwrap_or_default(),
    ]
}

/// Serialize records, header first, to any writer
pub fn to_writer<W: Write>(writer: W, records: &[CardRecord]) -> DatasetResult<()> {
    let mut csv_writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    csv_writer.write_record(DATASET_HEADER)?;
    for record in records {
        csv_writer.write_record(to_row(record))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the dataset in one go: temp file in the target directory, then rename
pub fn write_dataset(path: &Path, records: &[CardRecord]) -> DatasetResult<()> {
    let parent = path.parent().filter(|parent| !parent.as_os_str().is_empty());
    if let Some(parent) = parent {
        std::fs::create_dir_all(parent)?;
    }

    let file_name = path.file_name().and_then(|name| name.to_str()).unwrap_or("dataset.csv");
    let temp_path = path.with_file_name(format!(".{}.{:08x}.part", file_name, fastrand::u32(..)));

    let result = std::fs::File::create(&temp_path)
        .map_err(DatasetError::from)
        .and_then(|file| to_writer(std::io::BufWriter::new(file), records))
        .and_then(|()| std::fs::rename(&temp_path, path).map_err(DatasetError::from));

    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    result?;

    info!("✓ Saved {} cards to {}", records.len(), path.display());
    Ok(())
}

/// Parse a dataset back into records
///
/// `holographic` is not part of the file and reads back as `false`.
pub fn from_reader<R: Read>(reader: R) -> DatasetResult<Vec<CardRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

    let header = csv_reader.headers()?;
    if header.iter().ne(DATASET_HEADER.iter().copied()) {
        return Err(DatasetError::Header {
            found: header.iter().map(str::to_string).collect(),
        });
    }

    let mut records = Vec::new();
    for row in csv_reader.records() {
        let row = row?;
        let line = row.position().map_or(0, csv::Position::line);
        let field = |index: usize| row.get(index).unwrap_or_default().to_string();
        let optional = |index: usize| Some(field(index)).filter(|value| !value.is_empty());

        let retreat = field(8);
        let retreat_cost = if retreat.is_empty() {
            0
        } else {
            retreat.parse().map_err(|_| DatasetError::InvalidField {
                line,
                column: DATASET_HEADER[8],
                value: retreat.clone(),
            })?
        };

        records.push(CardRecord {
            number: field(0),
            name: field(1),
            card_type: field(2),
            types: split_list(&field(3)),
            rarity: field(4),
            holographic: false,
            hp: optional(5),
            weakness: split_list(&field(6)),
            resistance: split_list(&field(7)),
            retreat_cost,
            image_url: optional(9),
            local_image_path: optional(10),
            detail_url: None,
        });
    }
    Ok(records)
}

/// Read a dataset file written by [`write_dataset`]
pub fn read_dataset(path: &Path) -> DatasetResult<Vec<CardRecord>> {
    let file = std::fs::File::open(path)?;
    from_reader(std::io::BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn charizard() -> CardRecord {
        CardRecord {
            number: "004/102".to_string(),
            name: "Charizard, \"Flame\"".to_string(),
            card_type: "Fire Pokémon".to_string(),
            types: vec!["fire".to_string(), "fighting".to_string()],
            rarity: "Rare".to_string(),
            holographic: true,
            hp: Some("120".to_string()),
            weakness: vec!["water".to_string()],
            resistance: Vec::new(),
            retreat_cost: 3,
            image_url: Some("https://www.serebii.net/card/base1/004.jpg".to_string()),
            local_image_path: Some("images/base1/004_Charizard.jpg".to_string()),
            detail_url: Some("https://www.serebii.net/card/base1/004.shtml".to_string()),
        }
    }

    fn trainer() -> CardRecord {
        let mut record = CardRecord {
            number: "150/190".to_string(),
            name: "Iono".to_string(),
            ..CardRecord::default()
        };
        record.classify_as_trainer();
        record
    }

    fn written(records: &[CardRecord]) -> String {
        let mut buffer = Vec::new();
        to_writer(&mut buffer, records).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn header_once_and_eleven_columns_per_row() {
        let output = written(&[charizard(), trainer()]);
        let mut reader = csv::ReaderBuilder::new().has_headers(false).from_reader(output.as_bytes());
        let rows: Vec<_> = reader.records().map(Result::unwrap).collect();

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.len() == 11));
        assert_eq!(rows[0].iter().collect::<Vec<_>>(), DATASET_HEADER.to_vec());
        assert_eq!(rows.iter().filter(|row| row.get(0) == Some("Number")).count(), 1);
    }

    #[test]
    fn multi_valued_fields_are_semicolon_joined() {
        let output = written(&[charizard()]);
        let data_line = output.lines().nth(1).unwrap();
        assert!(data_line.contains(",fire;fighting,"));
        assert!(data_line.contains("\"Charizard, \"\"Flame\"\"\""));
        assert_eq!(split_list("fire;fighting"), vec!["fire".to_string(), "fighting".to_string()]);
    }

    #[test]
    fn empty_dataset_is_header_only() {
        assert_eq!(
            written(&[]).trim_end(),
            "Number,Name,Card Type,Types,Rarity,HP,Weakness,Resistance,Retreat Cost,Image URL,Local Image"
        );
    }

    #[test]
    fn file_round_trip_drops_only_unpersisted_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("cards.csv");
        write_dataset(&path, &[charizard(), trainer()]).unwrap();

        let records = read_dataset(&path).unwrap();
        let expected = CardRecord {
            holographic: false,
            detail_url: None,
            ..charizard()
        };
        assert_eq!(records[0], expected);
        assert_eq!(records[1].types, vec!["trainer".to_string()]);
        assert_eq!(records[1].hp, None);
        assert!(records[1].weakness.is_empty());

        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn wrong_header_is_rejected() {
        let result = from_reader("Name,Number\nx,y\n".as_bytes());
        assert!(matches!(result, Err(DatasetError::Header { .. })));
    }

    proptest! {
        #[test]
        fn join_then_split_restores_tokens(tokens in proptest::collection::vec("[a-z]{1,10}", 0..5)) {
            prop_assert_eq!(split_list(&join_list(&tokens)), tokens);
        }
    }
}
