use renum_engine::model::{AnomalyKind, Thread};
use renum_engine::report::LinkReporter;

/// Prints `KIND: <base>/d/<thread-id>` locator lines for anomalous
/// threads.
pub struct UrlLinks {
    base: String,
}

impl UrlLinks {
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn locator(&self, thread: &Thread) -> String {
        format!("{}/d/{}", self.base, thread.id)
    }
}

impl LinkReporter for UrlLinks {
    fn anomaly(&mut self, kind: AnomalyKind, thread: &Thread) {
        println!("{kind}: {}", self.locator(thread));
    }
}
