use log::{error, info};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

pub const REQUIRED_COLUMNS: [&str; 9] = [
    "NOME",
    "CPF/CNPJ",
    "DDD",
    "FONE",
    "EMAIL-1",
    "CIDADE",
    "UF",
    "CEP",
    "FULL-LOGRADOURO",
];

#[derive(Debug, Error)]
pub enum ContactsError {
    #[error("could not open contacts file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("could not read CSV headers: {0}")]
    Headers(csv::Error),
    #[error("missing required column: {0}")]
    MissingColumn(String),
}

/// One row of the operator-supplied enriched CSV. Read-only after load.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EnrichedContact {
    #[serde(rename = "NOME")]
    pub name: String,
    #[serde(rename = "CPF/CNPJ")]
    pub tax_id: String,
    #[serde(rename = "DDD")]
    pub area_code: String,
    #[serde(rename = "FONE")]
    pub phone: String,
    #[serde(rename = "EMAIL-1")]
    pub email: String,
    #[serde(rename = "CIDADE")]
    pub city: String,
    #[serde(rename = "UF")]
    pub state: String,
    #[serde(rename = "CEP")]
    pub postal_code: String,
    #[serde(rename = "FULL-LOGRADOURO")]
    pub full_address: String,
}

impl EnrichedContact {
    /// Field values keyed by the CSV header names, which double as the
    /// template placeholder names.
    pub fn as_fields(&self) -> Vec<(String, String)> {
        vec![
            ("NOME".to_string(), self.name.clone()),
            ("CPF/CNPJ".to_string(), self.tax_id.clone()),
            ("DDD".to_string(), self.area_code.clone()),
            ("FONE".to_string(), self.phone.clone()),
            ("EMAIL-1".to_string(), self.email.clone()),
            ("CIDADE".to_string(), self.city.clone()),
            ("UF".to_string(), self.state.clone()),
            ("CEP".to_string(), self.postal_code.clone()),
            ("FULL-LOGRADOURO".to_string(), self.full_address.clone()),
        ]
    }
}

/// Loads the enriched contacts CSV (semicolon-delimited, UTF-8). A missing
/// required column aborts the whole load before any row is parsed; a bad
/// row is logged and skipped.
pub fn load_contacts<P: AsRef<Path>>(path: P) -> Result<Vec<EnrichedContact>, ContactsError> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref).map_err(|e| ContactsError::Io {
        path: path_ref.display().to_string(),
        source: e,
    })?;

    let contacts = read_contacts(file)?;
    info!("Loaded {} contacts from {:?}", contacts.len(), path_ref);
    Ok(contacts)
}

fn read_contacts<R: Read>(reader: R) -> Result<Vec<EnrichedContact>, ContactsError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(ContactsError::Headers)?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(ContactsError::MissingColumn(column.to_string()));
        }
    }

    let mut contacts = Vec::new();
    for result in rdr.deserialize() {
        match result {
            Ok(contact) => contacts.push(contact),
            Err(e) => error!("Error parsing contact row: {}", e),
        }
    }
    Ok(contacts)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "NOME;CPF/CNPJ;DDD;FONE;EMAIL-1;CIDADE;UF;CEP;FULL-LOGRADOURO";

    #[test]
    fn test_load_valid_rows() {
        let csv_data = format!(
            "{}\nAna Souza;12345678900;98;987654321;ana@x.com;São Luís;MA;65000-000;Rua A, 1\n",
            HEADER
        );
        let contacts = read_contacts(csv_data.as_bytes()).unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].name, "Ana Souza");
        assert_eq!(contacts[0].area_code, "98");
        assert_eq!(contacts[0].full_address, "Rua A, 1");
    }

    #[test]
    fn test_missing_column_aborts() {
        let csv_data = "NOME;DDD;FONE\nAna;98;987654321\n";
        let err = read_contacts(csv_data.as_bytes()).unwrap_err();
        assert!(matches!(err, ContactsError::MissingColumn(col) if col == "CPF/CNPJ"));
    }

    #[test]
    fn test_bad_row_is_skipped() {
        let csv_data = format!(
            "{}\nAna;1;98;9;a@x;SL;MA;650;Rua A\nrow;with;too;few\nBia;2;98;8;b@x;SL;MA;650;Rua B\n",
            HEADER
        );
        let contacts = read_contacts(csv_data.as_bytes()).unwrap();
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[1].name, "Bia");
    }

    #[test]
    fn test_as_fields_uses_header_names() {
        let csv_data = format!(
            "{}\nAna;1;98;987654321;a@x;SL;MA;65000;Rua A\n",
            HEADER
        );
        let contacts = read_contacts(csv_data.as_bytes()).unwrap();
        let fields = contacts[0].as_fields();
        assert!(fields.contains(&("NOME".to_string(), "Ana".to_string())));
        assert!(fields.contains(&("FULL-LOGRADOURO".to_string(), "Rua A".to_string())));
        assert_eq!(fields.len(), REQUIRED_COLUMNS.len());
    }
}
