//! CSV import for perfumes.
//!
//! Rows are processed independently: a bad row increments the error count
//! and never aborts the batch. Perfumes are upserted on the (name, brand)
//! composite key; note names that don't resolve are silently dropped.

use std::collections::HashMap;

use tracing::{debug, warn};
use uuid::Uuid;

use sillage_core::{
    CreateParfumRequest, Genre, ImportSummary, OlfactoryNoteRepository, ParfumRepository,
    UpdateParfumRequest,
};
use sillage_db::Database;

use crate::error::ApiError;

/// One successfully parsed import row.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub name: String,
    pub brand: String,
    pub genre: Genre,
    pub description: Option<String>,
    /// Raw note names, resolved against the catalog later.
    pub note_names: Vec<String>,
    pub price: Option<f64>,
}

/// Parse the CSV payload. Returns the good rows plus the count of rows
/// that failed shape validation. An unreadable header is a request error.
pub fn parse_rows(data: &[u8]) -> Result<(Vec<ParsedRow>, u64), ApiError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| ApiError::BadRequest(format!("unreadable CSV header: {}", e)))?
        .clone();
    let index_of = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

    let Some(name_idx) = index_of("name") else {
        return Err(ApiError::BadRequest("missing 'name' column".to_string()));
    };
    let Some(brand_idx) = index_of("brand") else {
        return Err(ApiError::BadRequest("missing 'brand' column".to_string()));
    };
    let Some(genre_idx) = index_of("genre") else {
        return Err(ApiError::BadRequest("missing 'genre' column".to_string()));
    };
    let description_idx = index_of("description");
    let notes_idx = index_of("notes");
    let price_idx = index_of("price");

    let mut rows = Vec::new();
    let mut errors: u64 = 0;

    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(_) => {
                errors += 1;
                continue;
            }
        };

        let get = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let name = get(Some(name_idx));
        let brand = get(Some(brand_idx));
        let genre = get(Some(genre_idx)).and_then(Genre::parse);
        let (Some(name), Some(brand), Some(genre)) = (name, brand, genre) else {
            errors += 1;
            continue;
        };

        let price = match get(price_idx) {
            Some(raw) => match raw.parse::<f64>() {
                Ok(price) if price >= 0.0 => Some(price),
                _ => {
                    errors += 1;
                    continue;
                }
            },
            None => None,
        };

        rows.push(ParsedRow {
            name: name.to_string(),
            brand: brand.to_string(),
            genre,
            description: get(description_idx).map(str::to_string),
            note_names: get(notes_idx)
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            price,
        });
    }

    Ok((rows, errors))
}

/// Import the payload: parse, resolve note names, upsert row by row.
pub async fn import_parfums_csv(db: &Database, data: &[u8]) -> Result<ImportSummary, ApiError> {
    let (rows, mut errors) = parse_rows(data)?;
    let total = rows.len() as u64 + errors;

    // Resolve every note name in one lookup.
    let mut all_names: Vec<String> = rows
        .iter()
        .flat_map(|row| row.note_names.iter().cloned())
        .collect();
    all_names.sort();
    all_names.dedup();
    let resolved: HashMap<String, Uuid> = db.notes.resolve_names(&all_names).await?;

    let mut imported: u64 = 0;
    for row in rows {
        let note_ids: Vec<Uuid> = row
            .note_names
            .iter()
            .filter_map(|name| resolved.get(&name.to_lowercase()).copied())
            .collect();

        let outcome = match db.parfums.find_id_by_name_brand(&row.name, &row.brand).await {
            Ok(Some(existing)) => {
                db.parfums
                    .update(
                        existing,
                        UpdateParfumRequest {
                            genre: Some(row.genre),
                            description: row.description.clone(),
                            note_ids: Some(note_ids),
                            price: row.price,
                            ..Default::default()
                        },
                    )
                    .await
            }
            Ok(None) => db
                .parfums
                .insert(CreateParfumRequest {
                    name: row.name.clone(),
                    brand: row.brand.clone(),
                    genre: row.genre,
                    description: row.description.clone(),
                    note_ids,
                    top_note_ids: vec![],
                    heart_note_ids: vec![],
                    base_note_ids: vec![],
                    photo_url: None,
                    merchant_links: vec![],
                    barcode: None,
                    price: row.price,
                })
                .await
                .map(|_| ()),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => imported += 1,
            Err(e) => {
                warn!(
                    subsystem = "api",
                    component = "csv_import",
                    name = %row.name,
                    brand = %row.brand,
                    error = %e,
                    "Import row failed"
                );
                errors += 1;
            }
        }
    }

    debug!(
        subsystem = "api",
        component = "csv_import",
        row_count = total,
        imported = imported,
        errors = errors,
        "CSV import finished"
    );

    Ok(ImportSummary {
        imported,
        errors,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows_happy_path() {
        let data = b"name,brand,genre,description,notes,price\n\
            Nuit,Maison,femme,Chaud,\"Jasmin,Vanille\",120\n";
        let (rows, errors) = parse_rows(data).unwrap();
        assert_eq!(errors, 0);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Nuit");
        assert_eq!(rows[0].genre, Genre::Femme);
        assert_eq!(rows[0].note_names, vec!["Jasmin", "Vanille"]);
        assert_eq!(rows[0].price, Some(120.0));
    }

    #[test]
    fn test_parse_rows_counts_bad_rows_without_aborting() {
        let data = b"name,brand,genre\n\
            ,Maison,femme\n\
            Bon,Maison,homme\n\
            Autre,Maison,pas-un-genre\n";
        let (rows, errors) = parse_rows(data).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Bon");
        assert_eq!(errors, 2);
    }

    #[test]
    fn test_parse_rows_accepts_english_genre_aliases() {
        let data = b"name,brand,genre\nClassique,Maison,male\n";
        let (rows, errors) = parse_rows(data).unwrap();
        assert_eq!(errors, 0);
        assert_eq!(rows[0].genre, Genre::Homme);
    }

    #[test]
    fn test_parse_rows_missing_required_column_is_request_error() {
        let data = b"name,genre\nSans Marque,femme\n";
        assert!(parse_rows(data).is_err());
    }

    #[test]
    fn test_parse_rows_negative_price_is_row_error() {
        let data = b"name,brand,genre,price\nNegatif,Maison,mixte,-5\n";
        let (rows, errors) = parse_rows(data).unwrap();
        assert!(rows.is_empty());
        assert_eq!(errors, 1);
    }
}
