use std::io::Write;

use color_eyre::Report;

const INDENT: &str = "  ";

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Writes human-readable progress and results to the console.
///
/// Regular output goes to `out`, errors go to `err`. `log` lines are only
/// printed in debug mode, i.e. when the CLI was not started with `--quiet`.
pub struct UI<'a> {
    out: &'a mut dyn Write,
    err: &'a mut dyn Write,
    color: bool,
    debug: bool,
    indentation: usize,
}

impl<'a> UI<'a> {
    pub fn new(out: &'a mut dyn Write, err: &'a mut dyn Write, color: bool, debug: bool) -> Self {
        Self {
            out,
            err,
            color,
            debug,
            indentation: 0,
        }
    }

    pub fn indent(&mut self) {
        self.indentation += 1;
    }

    pub fn outdent(&mut self) {
        self.indentation = self.indentation.saturating_sub(1);
    }

    /// Prints `msg` as is, without indentation or decoration.
    pub fn print(&mut self, msg: &str) {
        let _ = writeln!(self.out, "{msg}");
    }

    pub fn info(&mut self, msg: &str) {
        let indent = self.indentation();
        let _ = writeln!(self.out, "{indent}{msg}");
    }

    pub fn success(&mut self, msg: &str) {
        let indent = self.indentation();
        let line = self.paint(GREEN, &format!("✔ {msg}"));
        let _ = writeln!(self.out, "{indent}{line}");
    }

    pub fn log(&mut self, msg: &str) {
        if !self.debug {
            return;
        }
        let indent = self.indentation();
        let line = self.paint(DIM, msg);
        let _ = writeln!(self.out, "{indent}{line}");
    }

    /// Prints an error; in debug mode the full cause chain follows it.
    pub fn error(&mut self, msg: &str, report: &Report) {
        let indent = self.indentation();
        let line = self.paint(RED, &format!("✘ {msg}"));
        let _ = writeln!(self.err, "{indent}{line}");

        if self.debug {
            for cause in report.chain().skip(1) {
                let _ = writeln!(self.err, "{indent}{INDENT}caused by: {cause}");
            }
        }
    }

    fn indentation(&self) -> String {
        INDENT.repeat(self.indentation)
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.color {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}
