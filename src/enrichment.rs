use log::{error, info};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};
use std::time::Duration;

const PERSON_ENDPOINT: &str = "consulta/pessoa/";
const COMPANY_ENDPOINT: &str = "consulta/empresa/";

/// First phone and address found for a name. Either half may be missing
/// even on a hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactDetails {
    pub phone: Option<String>,
    pub address: Option<String>,
}

pub struct LookupClient {
    client: Client,
    base_url: String,
}

impl LookupClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", token);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&bearer).unwrap_or(HeaderValue::from_static("")),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()
            .expect("Failed to build Lookup Client");

        LookupClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Looks a display name up on the person endpoint, falling back to the
    /// company endpoint when the person lookup comes back empty or fails.
    /// Never raises to the caller: `None` means nothing was found.
    pub fn lookup(&self, name: &str) -> Option<ContactDetails> {
        info!("Querying person endpoint for: {}", name);
        if let Some(details) = self.query_endpoint(PERSON_ENDPOINT, name) {
            return Some(details);
        }

        info!("Trying company endpoint for: {}", name);
        self.query_endpoint(COMPANY_ENDPOINT, name)
    }

    fn query_endpoint(&self, endpoint: &str, name: &str) -> Option<ContactDetails> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let body = json!({ "nome": name });

        let response = match self.client.post(&url).json(&body).send() {
            Ok(r) => r,
            Err(e) => {
                error!("Lookup request to {} failed: {}", url, e);
                return None;
            }
        };

        let status = response.status();
        let text = match response.text() {
            Ok(t) => t,
            Err(e) => {
                error!("Failed to read lookup response from {}: {}", url, e);
                return None;
            }
        };

        if !status.is_success() {
            error!("Lookup at {} returned {}: {}", url, status, text);
            return None;
        }

        let data: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                error!("Failed to decode lookup JSON: {}. Body was: {}", e, text);
                return None;
            }
        };

        extract_details(&data)
    }
}

/// Boundary check on the lookup response: a hit requires a nonempty
/// `telefones` or `enderecos` list; the first entry of each is taken.
fn extract_details(data: &Value) -> Option<ContactDetails> {
    let phone = first_entry(data, "telefones");
    let address = first_entry(data, "enderecos");

    if phone.is_none() && address.is_none() {
        return None;
    }

    Some(ContactDetails { phone, address })
}

fn first_entry(data: &Value, key: &str) -> Option<String> {
    let first = data.get(key)?.as_array()?.first()?;
    match first {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_details_takes_first_of_each() {
        let data = json!({
            "telefones": ["98 99999-0000", "98 3222-1111"],
            "enderecos": ["RUA A, 1 - SÃO LUÍS/MA"]
        });
        let details = extract_details(&data).unwrap();
        assert_eq!(details.phone.as_deref(), Some("98 99999-0000"));
        assert_eq!(details.address.as_deref(), Some("RUA A, 1 - SÃO LUÍS/MA"));
    }

    #[test]
    fn test_extract_details_empty_lists_is_a_miss() {
        // An empty person response is what triggers the company fallback.
        let data = json!({ "telefones": [], "enderecos": [] });
        assert_eq!(extract_details(&data), None);
    }

    #[test]
    fn test_extract_details_missing_keys_is_a_miss() {
        assert_eq!(extract_details(&json!({})), None);
    }

    #[test]
    fn test_extract_details_phone_only() {
        let data = json!({ "telefones": ["98 98888-7777"] });
        let details = extract_details(&data).unwrap();
        assert_eq!(details.phone.as_deref(), Some("98 98888-7777"));
        assert_eq!(details.address, None);
    }

    #[test]
    fn test_extract_details_structured_entries_are_stringified() {
        let data = json!({ "telefones": [{"ddd": "98", "numero": "99999-0000"}] });
        let details = extract_details(&data).unwrap();
        assert!(details.phone.unwrap().contains("99999-0000"));
    }
}
