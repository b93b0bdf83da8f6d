use log::error;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

const ADDRESS_UNAVAILABLE: &str = "Não disponível";

/// One doctor as rendered on the registry results page. The state always
/// comes from the search parameters; the site's own rendering of it is
/// not trusted. The registry never renders a birth date, but the
/// downstream CSV contract carries the column.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DoctorRecord {
    pub name: String,
    pub registration: String,
    pub city: String,
    pub state: String,
    pub birth_date: String,
}

/// Extracts every result fragment of the rendered page. A fragment that
/// fails to parse is logged and skipped; the rest of the page is still
/// extracted.
pub fn parse_page(html: &str, search_state: &str) -> Vec<DoctorRecord> {
    let document = Html::parse_document(html);
    let item_selector = Selector::parse("div.resultado-item").unwrap();

    let mut records = Vec::new();
    for item in document.select(&item_selector) {
        match parse_item(item, search_state) {
            Some(record) => records.push(record),
            None => error!("Skipping result item that failed to parse."),
        }
    }
    records
}

fn parse_item(item: ElementRef, search_state: &str) -> Option<DoctorRecord> {
    let name = select_text(item, "h4")?;
    let registration = labeled_value(&select_text(item, "div.col-md-4")?)?;

    let full_address = select_text(item, "div.endereco")
        .and_then(|text| labeled_value(&text))
        .unwrap_or_else(|| ADDRESS_UNAVAILABLE.to_string());

    let (_street, city_uf) = split_address(&full_address);
    let city = city_from_segment(&city_uf);

    Some(DoctorRecord {
        name,
        registration,
        city,
        state: search_state.to_string(),
        birth_date: String::new(),
    })
}

fn select_text(item: ElementRef, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).unwrap();
    let element = item.select(&sel).next()?;
    let text: String = element.text().collect();
    let trimmed = text.trim().to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// The registry renders labeled fields as `Label: value`. Anything before
/// the first colon is the label.
fn labeled_value(text: &str) -> Option<String> {
    text.split(':').nth(1).map(|v| v.trim().to_string())
}

/// Splits `Street stuff - City/UF` into street and city/state segments.
/// With a single segment the city/state part is empty.
pub fn split_address(full_address: &str) -> (String, String) {
    let parts: Vec<&str> = full_address.split(" - ").collect();
    let street = parts.first().map(|s| s.trim()).unwrap_or("").to_string();
    let city_uf = if parts.len() > 1 {
        parts.last().map(|s| s.trim()).unwrap_or("").to_string()
    } else {
        String::new()
    };
    (street, city_uf)
}

/// Derives the city from a `City/UF` segment. The UF half is discarded;
/// the search state is authoritative for it.
pub fn city_from_segment(city_uf: &str) -> String {
    if let Some(city) = city_uf.split('/').next() {
        let city = city.trim();
        if !city.is_empty() {
            return city.to_string();
        }
    }
    "N/A".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <div id="resultados">
          <div class="resultado-item">
            <h4>MARIA DO CARMO SILVA</h4>
            <div class="col-md-4">CRM: 12345</div>
            <div class="endereco">Endereço: RUA DAS FLORES, 100 - CENTRO - SÃO LUÍS/MA</div>
          </div>
          <div class="resultado-item">
            <h4>JOSÉ AUGUSTO PEREIRA</h4>
            <div class="col-md-4">CRM: 67890</div>
          </div>
          <div class="resultado-item">
            <div class="col-md-4">CRM: 11111</div>
          </div>
        </div>
    "#;

    #[test]
    fn test_parse_page_extracts_and_skips() {
        let records = parse_page(PAGE, "SP");
        // The third item has no heading and is skipped.
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "MARIA DO CARMO SILVA");
        assert_eq!(records[0].registration, "12345");
        assert_eq!(records[0].city, "SÃO LUÍS");
        assert_eq!(records[0].birth_date, "");
    }

    #[test]
    fn test_state_always_comes_from_the_search() {
        // Page shows MA, search asked for SP.
        let records = parse_page(PAGE, "SP");
        assert!(records.iter().all(|r| r.state == "SP"));
    }

    #[test]
    fn test_missing_address_yields_na_city() {
        let records = parse_page(PAGE, "MA");
        assert_eq!(records[1].city, "N/A");
    }

    #[test]
    fn test_split_address_first_and_last_segments() {
        let (street, city_uf) = split_address("AV. PRINCIPAL, 42 - BAIRRO NOVO - IMPERATRIZ/MA");
        assert_eq!(street, "AV. PRINCIPAL, 42");
        assert_eq!(city_uf, "IMPERATRIZ/MA");
    }

    #[test]
    fn test_split_address_single_segment() {
        let (street, city_uf) = split_address("Não disponível");
        assert_eq!(street, "Não disponível");
        assert_eq!(city_uf, "");
    }

    #[test]
    fn test_city_from_segment_with_slash() {
        assert_eq!(city_from_segment("IMPERATRIZ/MA"), "IMPERATRIZ");
    }

    #[test]
    fn test_city_from_segment_without_slash() {
        assert_eq!(city_from_segment("IMPERATRIZ"), "IMPERATRIZ");
    }

    #[test]
    fn test_city_from_empty_segment() {
        assert_eq!(city_from_segment(""), "N/A");
        assert_eq!(city_from_segment("  "), "N/A");
    }

    #[test]
    fn test_labeled_value() {
        assert_eq!(labeled_value("CRM: 12345").as_deref(), Some("12345"));
        assert_eq!(labeled_value("no colon here"), None);
    }
}
