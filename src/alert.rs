use std::io::{self, Write};

/// Receives the countdown chime for the final seconds of an image.
pub trait AlertSink {
    fn chime(&mut self, remaining: u32);
}

impl<T: AlertSink + ?Sized> AlertSink for Box<T> {
    fn chime(&mut self, remaining: u32) {
        (**self).chime(remaining)
    }
}

/// Rings the terminal bell.
#[derive(Debug, Default)]
pub struct TerminalBell;

impl AlertSink for TerminalBell {
    fn chime(&mut self, remaining: u32) {
        let mut stdout = io::stdout();
        if let Err(e) = stdout.write_all(b"\x07").and_then(|_| stdout.flush()) {
            log::warn!("alert at {}s could not ring the bell: {}", remaining, e);
        }
    }
}

/// Keeps chimes in memory; used by headless runs and tests.
#[derive(Debug, Default, Clone)]
pub struct RecordedAlerts {
    pub chimes: Vec<u32>,
}

impl AlertSink for RecordedAlerts {
    fn chime(&mut self, remaining: u32) {
        self.chimes.push(remaining);
    }
}

/// Drops every chime.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl AlertSink for Silent {
    fn chime(&mut self, _remaining: u32) {}
}
