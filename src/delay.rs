use log::info;
use std::thread;
use std::time::Duration;

// The registry site re-renders asynchronously after every form interaction
// and pagination click. These fixed waits absorb that rendering lag; they
// are not rate limiting.

const DROPDOWN_REPOPULATE_SECS: u64 = 5;
const RESULTS_SETTLE_SECS: u64 = 20;
const PAGE_SETTLE_SECS: u64 = 3;
const BETWEEN_PAGES_SECS: u64 = 2;

pub fn after_state_select() {
    info!(
        "Waiting {} seconds for dependent dropdowns to repopulate...",
        DROPDOWN_REPOPULATE_SECS
    );
    thread::sleep(Duration::from_secs(DROPDOWN_REPOPULATE_SECS));
}

pub fn results_settle() {
    info!(
        "Waiting {} seconds for results to render...",
        RESULTS_SETTLE_SECS
    );
    thread::sleep(Duration::from_secs(RESULTS_SETTLE_SECS));
}

pub fn page_settle() {
    info!("Waiting {} seconds (Page Settle)...", PAGE_SETTLE_SECS);
    thread::sleep(Duration::from_secs(PAGE_SETTLE_SECS));
}

pub fn between_pages() {
    info!("Waiting {} seconds (Page Delay)...", BETWEEN_PAGES_SECS);
    thread::sleep(Duration::from_secs(BETWEEN_PAGES_SECS));
}
