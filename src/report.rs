use crate::enrichment::ContactDetails;
use crate::extractor::DoctorRecord;
use log::info;
use std::path::Path;

const HEADER: [&str; 4] = ["NOME", "CIDADE", "UF", "DT_NASCIMENTO"];
const ENRICHED_HEADER: [&str; 6] = ["NOME", "CIDADE", "UF", "DT_NASCIMENTO", "TELEFONE", "ENDERECO"];
const UNAVAILABLE: &str = "Não disponível";

pub fn write_doctor_csv<P: AsRef<Path>>(
    path: P,
    records: &[DoctorRecord],
) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path.as_ref())?;
    write_rows(&mut writer, records)?;
    info!(
        "Wrote {} records to {:?}",
        records.len(),
        path.as_ref()
    );
    Ok(())
}

/// The search output rendered as a CSV string, for display alongside the
/// file download.
pub fn doctor_csv_string(records: &[DoctorRecord]) -> Result<String, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(Vec::new());
    write_rows(&mut writer, records)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_rows<W: std::io::Write>(
    writer: &mut csv::Writer<W>,
    records: &[DoctorRecord],
) -> Result<(), csv::Error> {
    writer.write_record(HEADER)?;
    for record in records {
        writer.write_record([
            record.name.as_str(),
            record.city.as_str(),
            record.state.as_str(),
            record.birth_date.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads a doctors CSV back for the enrichment pass. The registration
/// number is not part of the CSV contract and comes back empty.
pub fn read_doctor_csv<P: AsRef<Path>>(path: P) -> Result<Vec<DoctorRecord>, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .trim(csv::Trim::All)
        .from_path(path.as_ref())?;

    let headers = rdr.headers()?.clone();
    let index_of = |name: &str| headers.iter().position(|h| h == name);
    let name_idx = index_of("NOME");
    let city_idx = index_of("CIDADE");
    let state_idx = index_of("UF");
    let birth_idx = index_of("DT_NASCIMENTO");

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row?;
        let field = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i)).unwrap_or("").to_string()
        };
        records.push(DoctorRecord {
            name: field(name_idx),
            registration: String::new(),
            city: field(city_idx),
            state: field(state_idx),
            birth_date: field(birth_idx),
        });
    }
    Ok(records)
}

pub fn write_enriched_csv<P: AsRef<Path>>(
    path: P,
    rows: &[(DoctorRecord, Option<ContactDetails>)],
) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path.as_ref())?;

    writer.write_record(ENRICHED_HEADER)?;
    for (record, details) in rows {
        let phone = details
            .as_ref()
            .and_then(|d| d.phone.as_deref())
            .unwrap_or(UNAVAILABLE);
        let address = details
            .as_ref()
            .and_then(|d| d.address.as_deref())
            .unwrap_or(UNAVAILABLE);
        writer.write_record([
            record.name.as_str(),
            record.city.as_str(),
            record.state.as_str(),
            record.birth_date.as_str(),
            phone,
            address,
        ])?;
    }
    writer.flush()?;
    info!("Wrote {} enriched rows to {:?}", rows.len(), path.as_ref());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<DoctorRecord> {
        vec![
            DoctorRecord {
                name: "MARIA SILVA".to_string(),
                registration: "12345".to_string(),
                city: "SÃO LUÍS".to_string(),
                state: "MA".to_string(),
                birth_date: String::new(),
            },
            DoctorRecord {
                name: "JOSÉ PEREIRA".to_string(),
                registration: "67890".to_string(),
                city: "N/A".to_string(),
                state: "MA".to_string(),
                birth_date: String::new(),
            },
        ]
    }

    #[test]
    fn test_csv_header_contract() {
        let csv = doctor_csv_string(&sample()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("NOME;CIDADE;UF;DT_NASCIMENTO"));
        assert_eq!(lines.next(), Some("MARIA SILVA;SÃO LUÍS;MA;"));
        assert_eq!(lines.next(), Some("JOSÉ PEREIRA;N/A;MA;"));
    }

    #[test]
    fn test_empty_result_still_writes_header() {
        let csv = doctor_csv_string(&[]).unwrap();
        assert_eq!(csv.trim_end(), "NOME;CIDADE;UF;DT_NASCIMENTO");
    }
}
