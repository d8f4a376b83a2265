//! Terminal UI: headers and progress on stdout, diagnostics on stderr.

use appflow_core::Ui;

use crate::styles;

/// UI that writes styled text to the process streams.
#[derive(Debug, Default)]
pub struct ConsoleUi;

impl ConsoleUi {
    pub fn new() -> Self {
        Self
    }
}

impl Ui for ConsoleUi {
    fn header(&self, text: &str) {
        let style = styles::HEADER;
        println!("{style}==> {text}{style:#}");
    }

    fn message(&self, text: &str) {
        println!("{text}");
    }

    fn error(&self, text: &str) {
        let style = styles::ERROR;
        eprintln!("{style}{text}{style:#}");
    }
}
