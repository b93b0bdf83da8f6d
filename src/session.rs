use chrono::Local;
use log::info;

#[derive(Debug, Clone)]
pub struct SearchEntry {
    pub timestamp: String,
    pub summary: String,
    pub result_count: usize,
}

#[derive(Debug, Clone)]
pub struct SendLog {
    pub timestamp: String,
    pub total_contacts: usize,
    pub successful_sends: usize,
}

/// In-memory session state: search history, the template currently in
/// use, and send logs. Created at session start, mutated only by the
/// active command handler, discarded at session end. Advisory only —
/// nothing here survives the process.
#[derive(Debug, Default)]
pub struct SessionContext {
    search_history: Vec<SearchEntry>,
    current_template: Option<String>,
    send_logs: Vec<SendLog>,
}

impl SessionContext {
    pub fn new() -> Self {
        SessionContext::default()
    }

    pub fn record_search(&mut self, summary: String, result_count: usize) {
        self.search_history.push(SearchEntry {
            timestamp: now(),
            summary,
            result_count,
        });
    }

    pub fn record_send(&mut self, total_contacts: usize, successful_sends: usize) {
        self.send_logs.push(SendLog {
            timestamp: now(),
            total_contacts,
            successful_sends,
        });
    }

    pub fn set_template(&mut self, template: String) {
        self.current_template = Some(template);
    }

    pub fn current_template(&self) -> Option<&str> {
        self.current_template.as_deref()
    }

    pub fn search_history(&self) -> &[SearchEntry] {
        &self.search_history
    }

    pub fn send_logs(&self) -> &[SendLog] {
        &self.send_logs
    }

    /// Dumps the session history to the log before the context is dropped.
    pub fn log_summary(&self) {
        for entry in &self.search_history {
            info!(
                "Search at {}: {} ({} results)",
                entry.timestamp, entry.summary, entry.result_count
            );
        }
        for log in &self.send_logs {
            info!(
                "Send batch at {}: {}/{} messages delivered",
                log.timestamp, log.successful_sends, log.total_contacts
            );
        }
    }
}

fn now() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_search() {
        let mut session = SessionContext::new();
        session.record_search("UF=MA".to_string(), 23);
        assert_eq!(session.search_history().len(), 1);
        assert_eq!(session.search_history()[0].result_count, 23);
    }

    #[test]
    fn test_record_send() {
        let mut session = SessionContext::new();
        session.record_send(10, 8);
        assert_eq!(session.send_logs()[0].successful_sends, 8);
    }

    #[test]
    fn test_template_round_trip() {
        let mut session = SessionContext::new();
        assert!(session.current_template().is_none());
        session.set_template("Olá {NOME}".to_string());
        assert_eq!(session.current_template(), Some("Olá {NOME}"));
    }
}
