use std::io::Write;

use renum_engine::report::Progress;

/// How many threads between progress line refreshes.
const REFRESH_EVERY: u64 = 50;

/// Counter line on stderr, rewritten in place.
pub struct StderrProgress {
    done: u64,
    total: u64,
}

impl StderrProgress {
    pub fn new(total: u64) -> Self {
        Self { done: 0, total }
    }

    fn draw(&self) {
        eprint!("\r{}/{} threads", self.done, self.total);
        let _ = std::io::stderr().flush();
    }
}

impl Progress for StderrProgress {
    fn advance(&mut self) {
        self.done += 1;
        if self.done % REFRESH_EVERY == 0 {
            self.draw();
        }
    }

    fn finish(&mut self) {
        self.draw();
        eprintln!();
    }
}
