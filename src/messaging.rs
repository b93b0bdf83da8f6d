use crate::contacts::EnrichedContact;
use crate::template;
use log::{error, info};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};
use std::time::Duration;

const PREVIEW_LEN: usize = 50;

/// A sending agent on the messaging platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// A reusable message body; `short_preview` is for listings only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    pub id: String,
    pub short_preview: String,
    pub full_content: String,
    pub media_url: Option<String>,
}

/// One configured WhatsApp sending channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Integration {
    pub key: String,
    pub label: String,
}

/// Outcome of a send call. Errors carry the logged detail; nothing raises.
#[derive(Debug, Clone)]
pub enum SendStatus {
    Success(Value),
    Error(String),
}

impl SendStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, SendStatus::Success(_))
    }
}

pub struct MessagingClient {
    client: Client,
    base_url: String,
}

impl MessagingClient {
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
            .expect("Failed to build Messaging Client");

        MessagingClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn employees(&self) -> Option<Vec<Operator>> {
        let data = self.get("/v2/employees")?;
        Some(parse_operators(&data))
    }

    pub fn templates(&self) -> Option<Vec<MessageTemplate>> {
        let data = self.get("/v2/template/all")?;
        Some(flatten_templates(&data))
    }

    pub fn whatsapp_integrations(&self) -> Option<Vec<Integration>> {
        let data = self.get("/v2/whatsapp/integrations/official")?;
        Some(parse_integrations(&data))
    }

    /// Creates a WhatsApp-Business-by-broker contact and returns the new
    /// customer id, or `None` when the platform rejects it.
    pub fn create_contact(&self, payload: &Value) -> Option<String> {
        info!("Creating contact: {}", payload);
        let data = self.post("/v2/contacts/whatsapp-business-by-brokers", payload)?;

        let id = data
            .get("_id")
            .or_else(|| data.get("customer").and_then(|c| c.get("_id")))
            .and_then(|v| v.as_str());

        match id {
            Some(id) => Some(id.to_string()),
            None => {
                error!("Contact response carried no _id: {}", data);
                None
            }
        }
    }

    pub fn send_message(
        &self,
        customer_id: &str,
        message: &str,
        operator_id: Option<&str>,
    ) -> SendStatus {
        let payload = json!({
            "message": message,
            "sent_by": "operator",
            "operator": operator_id,
        });

        let path = format!("/v2/messages/{}/send", customer_id);
        match self.post(&path, &payload) {
            Some(body) => SendStatus::Success(body),
            None => SendStatus::Error(format!("send to {} failed", customer_id)),
        }
    }

    fn get(&self, path: &str) -> Option<Value> {
        let url = format!("{}{}", self.base_url, path);
        let response = match self.client.get(&url).send() {
            Ok(r) => r,
            Err(e) => {
                error!("Request to {} failed: {}", url, e);
                return None;
            }
        };
        read_json(&url, response)
    }

    fn post(&self, path: &str, body: &Value) -> Option<Value> {
        let url = format!("{}{}", self.base_url, path);
        let response = match self.client.post(&url).json(body).send() {
            Ok(r) => r,
            Err(e) => {
                error!("Request to {} failed: {}", url, e);
                return None;
            }
        };
        read_json(&url, response)
    }
}

fn read_json(url: &str, response: reqwest::blocking::Response) -> Option<Value> {
    let status = response.status();
    let text = match response.text() {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to read response from {}: {}", url, e);
            return None;
        }
    };

    if !status.is_success() {
        error!("{} returned {}: {}", url, status, text);
        return None;
    }

    match serde_json::from_str(&text) {
        Ok(v) => Some(v),
        Err(e) => {
            error!("Failed to decode JSON from {}: {}. Body was: {}", url, e, text);
            None
        }
    }
}

/// Creates the contact, renders the template against the row, and sends.
/// Every failure is logged and reported as `false`; one bad contact never
/// stops a batch.
pub fn deliver(
    client: &MessagingClient,
    contact: &EnrichedContact,
    message_template: &str,
    operator_id: Option<&str>,
    integration_key: &str,
) -> bool {
    let payload = contact_payload(contact, integration_key);

    let customer_id = match client.create_contact(&payload) {
        Some(id) => id,
        None => {
            error!("Could not create contact for {}", contact.name);
            return false;
        }
    };

    let message = template::render(message_template, &contact.as_fields());

    info!("Sending message to customer {}", customer_id);
    let status = client.send_message(&customer_id, &message, operator_id);
    if let SendStatus::Error(detail) = &status {
        error!("Send failed for {}: {}", contact.name, detail);
    }
    status.is_success()
}

pub fn contact_payload(contact: &EnrichedContact, integration_key: &str) -> Value {
    json!({
        "full_name": contact.name,
        "cel_phone": format_phone(&contact.area_code, &contact.phone),
        "integration": integration_key,
    })
}

/// Brazilian mobile format: with a DDD plus nine digits the number is
/// rendered `+55 XX XXXXX-XXXX`; anything shorter is passed through as
/// bare digits.
pub fn format_phone(area_code: &str, phone: &str) -> String {
    let raw = format!("{}{}", area_code.trim(), phone.trim());
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() >= 11 {
        format!("+55 {} {}-{}", &digits[..2], &digits[2..7], &digits[7..11])
    } else {
        digits
    }
}

fn parse_operators(data: &Value) -> Vec<Operator> {
    let items = array_at(data, "employees");

    let mut operators = Vec::new();
    for item in items {
        // Entries without an id cannot be selected as senders.
        let id = match item.get("_id").and_then(|v| v.as_str()) {
            Some(id) => id.to_string(),
            None => continue,
        };
        operators.push(Operator {
            id,
            name: str_field(item, "name"),
            email: str_field(item, "email"),
        });
    }
    operators
}

fn parse_integrations(data: &Value) -> Vec<Integration> {
    let items = array_at(data, "integrations");

    let mut integrations = Vec::new();
    for item in items {
        let key = match item.get("key").and_then(|v| v.as_str()) {
            Some(key) => key.to_string(),
            None => continue,
        };
        let label = item
            .get("label")
            .and_then(|v| v.as_str())
            .unwrap_or("Unnamed")
            .to_string();
        integrations.push(Integration { key, label });
    }
    integrations
}

/// The template listing nests inconsistently: `templates.templates`, a
/// `templates` array, or a flat list have all been observed.
pub fn flatten_templates(data: &Value) -> Vec<MessageTemplate> {
    let list = data
        .get("templates")
        .and_then(|t| t.get("templates"))
        .and_then(|v| v.as_array())
        .or_else(|| data.get("templates").and_then(|v| v.as_array()))
        .or_else(|| data.as_array());

    let mut templates = Vec::new();
    if let Some(items) = list {
        for item in items {
            let id = match item.get("id") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => continue,
            };
            let content = str_field(item, "content");
            templates.push(MessageTemplate {
                id,
                short_preview: preview(&content),
                full_content: content,
                media_url: item
                    .get("content_media")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
            });
        }
    }
    templates
}

fn preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_LEN {
        let short: String = content.chars().take(PREVIEW_LEN).collect();
        format!("{}...", short)
    } else {
        content.to_string()
    }
}

fn array_at<'a>(data: &'a Value, key: &str) -> Vec<&'a Value> {
    if let Some(items) = data.as_array() {
        items.iter().collect()
    } else if let Some(items) = data.get(key).and_then(|v| v.as_array()) {
        items.iter().collect()
    } else {
        Vec::new()
    }
}

fn str_field(item: &Value, key: &str) -> String {
    item.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_phone_eleven_digits() {
        assert_eq!(format_phone("", "11987654321"), "+55 11 98765-4321");
        assert_eq!(format_phone("11", "987654321"), "+55 11 98765-4321");
    }

    #[test]
    fn test_format_phone_strips_punctuation() {
        assert_eq!(format_phone("11", "98765-4321"), "+55 11 98765-4321");
    }

    #[test]
    fn test_format_phone_short_numbers_stay_unformatted() {
        assert_eq!(format_phone("", "34567890"), "34567890");
        assert_eq!(format_phone("11", "3456-7890"), "1134567890");
    }

    #[test]
    fn test_flatten_templates_nested_twice() {
        let data = json!({
            "templates": {
                "templates": [
                    { "id": "t1", "content": "Olá {NOME}", "content_media": "https://cdn/x.png" }
                ]
            }
        });
        let templates = flatten_templates(&data);
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].id, "t1");
        assert_eq!(templates[0].full_content, "Olá {NOME}");
        assert_eq!(templates[0].media_url.as_deref(), Some("https://cdn/x.png"));
    }

    #[test]
    fn test_flatten_templates_flat_list() {
        let data = json!([
            { "id": 7, "content": "Oi" },
            { "content": "sem id, descartado" }
        ]);
        let templates = flatten_templates(&data);
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].id, "7");
        assert_eq!(templates[0].short_preview, "Oi");
    }

    #[test]
    fn test_flatten_templates_truncates_preview() {
        let long = "x".repeat(80);
        let data = json!({ "templates": [{ "id": "t", "content": long }] });
        let templates = flatten_templates(&data);
        assert_eq!(templates[0].short_preview.chars().count(), 53);
        assert!(templates[0].short_preview.ends_with("..."));
        assert_eq!(templates[0].full_content.len(), 80);
    }

    #[test]
    fn test_parse_operators_drops_entries_without_id() {
        let data = json!([
            { "_id": "op1", "name": "Ana", "email": "ana@x.com" },
            { "name": "sem id" }
        ]);
        let operators = parse_operators(&data);
        assert_eq!(operators.len(), 1);
        assert_eq!(operators[0].id, "op1");
        assert_eq!(operators[0].name, "Ana");
    }

    #[test]
    fn test_parse_operators_nested_shape() {
        let data = json!({ "employees": [{ "_id": "op2", "name": "Bia", "email": "" }] });
        assert_eq!(parse_operators(&data).len(), 1);
    }

    #[test]
    fn test_parse_integrations() {
        let data = json!([
            { "key": "wa-1", "label": "Principal" },
            { "label": "sem key" },
            { "key": "wa-2" }
        ]);
        let integrations = parse_integrations(&data);
        assert_eq!(integrations.len(), 2);
        assert_eq!(integrations[0].label, "Principal");
        assert_eq!(integrations[1].label, "Unnamed");
    }
}
