use crate::browser::{BrowserError, BrowserSession};
use crate::config::RegistryConfig;
use crate::delay;
use crate::extractor::{self, DoctorRecord};
use log::{error, info, warn};
use std::time::Duration;
use thiserror::Error;

const FORM: &str = "#buscaForm";
const NAME_INPUT: &str = "input[name='nome']";
const CRM_INPUT: &str = "input[name='crm']";
const UF_SELECT: &str = "select[name='uf']";
const SPECIALTY_SELECT: &str = "select[name='especialidade']";
const AREA_SELECT: &str = "select[name='areaAtuacao']";
const STATUS_SELECT: &str = "select[name='tipoSituacao']";
const SEARCH_BUTTON: &str = "button.w-100.btn-buscar.btnPesquisar";
const BUSY_INDICATOR: &str = ".loading";
const TOTAL_LABEL: &str = "#resultados .text-center";

const FORM_TIMEOUT: Duration = Duration::from_secs(10);
const BUSY_APPEAR_TIMEOUT: Duration = Duration::from_secs(10);
const BUSY_CLEAR_TIMEOUT: Duration = Duration::from_secs(30);

pub const UF_CODES: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB",
    "PR", "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("a state (UF) is required before searching")]
    MissingState,

    #[error("unknown state code: {0}")]
    UnknownState(String),

    #[error("could not read the total result count from {0:?}")]
    TotalCount(String),

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    Active,
    Inactive,
}

impl RegistrationStatus {
    /// The registry form encodes situation as a value, not a label.
    pub fn form_value(&self) -> &'static str {
        match self {
            RegistrationStatus::Active => "A",
            RegistrationStatus::Inactive => "I",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchFilters {
    pub name: Option<String>,
    pub crm: Option<String>,
    pub state: String,
    pub status: RegistrationStatus,
    pub specialty: Option<String>,
    pub area_of_practice: Option<String>,
}

impl SearchFilters {
    /// The state is the one mandatory filter; everything else narrows the
    /// search. Runs before any browser or network action.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let state = self.state.trim();
        if state.is_empty() {
            return Err(RegistryError::MissingState);
        }
        if !UF_CODES.contains(&state) {
            return Err(RegistryError::UnknownState(state.to_string()));
        }
        Ok(())
    }

    pub fn summary(&self) -> String {
        let mut parts = vec![format!("UF={}", self.state)];
        if let Some(name) = &self.name {
            parts.push(format!("nome={}", name));
        }
        if let Some(crm) = &self.crm {
            parts.push(format!("crm={}", crm));
        }
        parts.push(format!("situacao={}", self.status.form_value()));
        if let Some(s) = &self.specialty {
            parts.push(format!("especialidade={}", s));
        }
        if let Some(a) = &self.area_of_practice {
            parts.push(format!("area={}", a));
        }
        parts.join(" ")
    }
}

/// `ceil(total_records / page_size)`; an empty result set has no pages.
pub fn total_pages(total_records: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    (total_records + page_size - 1) / page_size
}

pub struct RegistryScraper {
    session: BrowserSession,
    search_url: String,
    page_size: usize,
}

impl RegistryScraper {
    pub fn open(config: &RegistryConfig) -> Result<Self, RegistryError> {
        let session = BrowserSession::launch(config.headless)?;
        Ok(RegistryScraper {
            session,
            search_url: config.search_url.clone(),
            page_size: config.page_size,
        })
    }

    /// Runs the whole search: form fill, submit, paginated walk. A page
    /// that fails to load is logged and skipped; the walk continues with
    /// the next one.
    pub fn search(&self, filters: &SearchFilters) -> Result<Vec<DoctorRecord>, RegistryError> {
        filters.validate()?;

        info!("Starting search - {}", filters.summary());

        self.session.goto(&self.search_url)?;
        self.session.wait_for(FORM, FORM_TIMEOUT)?;

        self.fill_form(filters)?;
        self.submit_and_wait()?;

        let total_records = self.read_total_records()?;
        let pages = total_pages(total_records, self.page_size);
        info!("Total records: {}, pages: {}", total_records, pages);

        let mut records = Vec::new();
        for page in 1..=pages {
            info!("Processing page {} of {}", page, pages);

            if page > 1 {
                if let Err(e) = self.goto_page(page) {
                    error!("Error advancing to page {}: {}", page, e);
                    continue;
                }
            }

            let html = self.session.page_html()?;
            let page_records = extractor::parse_page(&html, filters.state.trim());
            info!("Extracted {} records from page {}", page_records.len(), page);
            records.extend(page_records);

            delay::between_pages();
        }

        info!("Search finished with {} records.", records.len());
        Ok(records)
    }

    fn fill_form(&self, filters: &SearchFilters) -> Result<(), RegistryError> {
        if let Some(name) = filters.name.as_deref().filter(|n| !n.trim().is_empty()) {
            match self.session.type_into(NAME_INPUT, name) {
                Ok(()) => info!("Name filter filled: {}", name),
                Err(e) => warn!("Could not fill name field: {}", e),
            }
        }

        if let Some(crm) = filters.crm.as_deref().filter(|c| !c.trim().is_empty()) {
            match self.session.type_into(CRM_INPUT, crm) {
                Ok(()) => info!("CRM filter filled: {}", crm),
                Err(e) => warn!("Could not fill CRM field: {}", e),
            }
        }

        let state = filters.state.trim();
        if !self.session.select_by_label(UF_SELECT, state)? {
            return Err(RegistryError::UnknownState(state.to_string()));
        }
        info!("UF selected: {}", state);
        delay::after_state_select();

        // Optional dropdowns: an absent label is reported but never aborts
        // the rest of the form.
        if let Some(specialty) = filters.specialty.as_deref().filter(|s| !s.is_empty()) {
            match self.session.select_by_label(SPECIALTY_SELECT, specialty) {
                Ok(true) => {}
                Ok(false) => warn!("Specialty not found: {}", specialty),
                Err(e) => warn!("Could not reach specialty dropdown: {}", e),
            }
        }

        if let Some(area) = filters.area_of_practice.as_deref().filter(|a| !a.is_empty()) {
            match self.session.select_by_label(AREA_SELECT, area) {
                Ok(true) => {}
                Ok(false) => warn!("Area of practice not found: {}", area),
                Err(e) => warn!("Could not reach area-of-practice dropdown: {}", e),
            }
        }

        if !self
            .session
            .select_by_value(STATUS_SELECT, filters.status.form_value())?
        {
            warn!("Status option not found: {}", filters.status.form_value());
        }

        Ok(())
    }

    fn submit_and_wait(&self) -> Result<(), RegistryError> {
        self.session.wait_for(SEARCH_BUTTON, FORM_TIMEOUT)?;
        self.session.js_click(SEARCH_BUTTON)?;
        self.busy_cycle()?;
        delay::results_settle();
        Ok(())
    }

    /// The busy indicator flashes around every asynchronous refresh: it
    /// must appear and then clear before the page can be trusted.
    fn busy_cycle(&self) -> Result<(), BrowserError> {
        self.session
            .wait_visible(BUSY_INDICATOR, BUSY_APPEAR_TIMEOUT)?;
        self.session.wait_hidden(BUSY_INDICATOR, BUSY_CLEAR_TIMEOUT)
    }

    fn read_total_records(&self) -> Result<usize, RegistryError> {
        self.session.wait_for(TOTAL_LABEL, FORM_TIMEOUT)?;
        let text = self.session.inner_text(TOTAL_LABEL)?;
        parse_total(&text)
    }

    fn goto_page(&self, page: usize) -> Result<(), RegistryError> {
        let selector = format!(".paginationjs-page[data-num='{}']", page);
        self.session.wait_for(&selector, FORM_TIMEOUT)?;
        self.session.js_click(&selector)?;
        self.busy_cycle()?;
        delay::page_settle();
        Ok(())
    }
}

/// The results header reads like `245 resultados encontrados`. A label
/// whose first token is not a number means the markup changed; that is an
/// error, not an empty result set.
fn parse_total(text: &str) -> Result<usize, RegistryError> {
    text.split_whitespace()
        .next()
        .and_then(|token| token.parse::<usize>().ok())
        .ok_or_else(|| RegistryError::TotalCount(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(total_pages(23, 10), 3);
        assert_eq!(total_pages(20, 10), 2);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(0, 10), 0);
    }

    #[test]
    fn test_parse_total() {
        assert_eq!(parse_total("245 resultados encontrados").unwrap(), 245);
        assert_eq!(parse_total("0 resultados").unwrap(), 0);
    }

    #[test]
    fn test_parse_total_fails_on_non_numeric_label() {
        assert!(parse_total("Nenhum resultado encontrado").is_err());
        assert!(parse_total("").is_err());
    }

    #[test]
    fn test_validate_requires_state() {
        let filters = SearchFilters {
            name: None,
            crm: None,
            state: "  ".to_string(),
            status: RegistrationStatus::Active,
            specialty: None,
            area_of_practice: None,
        };
        assert!(matches!(
            filters.validate(),
            Err(RegistryError::MissingState)
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_state() {
        let filters = SearchFilters {
            name: None,
            crm: None,
            state: "XX".to_string(),
            status: RegistrationStatus::Active,
            specialty: None,
            area_of_practice: None,
        };
        assert!(matches!(
            filters.validate(),
            Err(RegistryError::UnknownState(_))
        ));
    }

    #[test]
    fn test_status_form_values() {
        assert_eq!(RegistrationStatus::Active.form_value(), "A");
        assert_eq!(RegistrationStatus::Inactive.form_value(), "I");
    }
}
