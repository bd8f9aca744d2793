use colored::*;
use mediamovarr_core::decision::{ConfirmRequest, ConfirmResponse, Confirmer};
use std::io::{self, Write};

use crate::progress::CliReporter;

/// Asks on stdin for each medium-confidence folder. End of input aborts.
pub struct StdinConfirmer<'a> {
    reporter: &'a CliReporter,
}

impl<'a> StdinConfirmer<'a> {
    pub fn new(reporter: &'a CliReporter) -> Self {
        Self { reporter }
    }
}

impl Confirmer for StdinConfirmer<'_> {
    fn confirm(&mut self, request: &ConfirmRequest<'_>) -> io::Result<ConfirmResponse> {
        self.reporter.suspend(|| ask(request))
    }
}

fn ask(request: &ConfirmRequest<'_>) -> io::Result<ConfirmResponse> {
    let result = request.result;
    eprintln!();
    eprintln!(
        "{} looks like {} ({})",
        request.candidate.folder_name().bold(),
        result.media_type.to_string().cyan(),
        format!("{:.2}", result.confidence()).yellow()
    );
    for entry in result.trace() {
        eprintln!("    {:+.2}  {}  {}", entry.delta, entry.source, entry.reason.dimmed());
    }

    let mut input = String::new();
    loop {
        input.clear();
        eprint!("Move this folder? (y)es / (n)o / (q)uit: ");
        io::stderr().flush()?;

        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(ConfirmResponse::Abort);
        }

        match input.trim().to_uppercase().as_str() {
            "Y" | "YES" => return Ok(ConfirmResponse::Accept),
            "N" | "NO" => return Ok(ConfirmResponse::Decline),
            "Q" | "QUIT" => return Ok(ConfirmResponse::Abort),
            _ => continue,
        }
    }
}
