// ============================================================================
// src/ui.rs – Operator-facing output (styled on a terminal, capturable in tests)
// ============================================================================

use anyhow::{Context, Result};
use console::Style;
use dialoguer::Input;
use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

/// Human-readable report sink. Commands write their listing here; tracing
/// diagnostics go to stderr separately.
pub struct UX {
    out: RefCell<Box<dyn Write>>,
    styled: bool,
}

/// Handle onto the bytes written through a capturing `UX`.
#[derive(Clone, Default)]
pub struct Captured(Rc<RefCell<Vec<u8>>>);

impl Captured {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl UX {
    pub fn stdout() -> Self {
        Self {
            out: RefCell::new(Box::new(io::stdout())),
            styled: console::Term::stdout().features().colors_supported(),
        }
    }

    /// Unstyled sink whose contents can be read back through the returned handle.
    pub fn capture() -> (Self, Captured) {
        let captured = Captured::default();
        let ux = Self {
            out: RefCell::new(Box::new(SharedBuf(captured.0.clone()))),
            styled: false,
        };
        (ux, captured)
    }

    fn emit(&self, text: &str) {
        let mut out = self.out.borrow_mut();
        // A closed pipe (e.g. `| head`) must not turn into a panic.
        let _ = writeln!(out, "{text}");
        let _ = out.flush();
    }

    fn styled(&self, style: Style, text: &str) -> String {
        if self.styled {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn line(&self, msg: &str) {
        self.emit(msg);
    }

    pub fn blank(&self) {
        self.emit("");
    }

    pub fn heading(&self, msg: &str) {
        let s = self.styled(Style::new().bold(), msg);
        self.emit(&s);
    }

    pub fn success(&self, msg: &str) {
        let s = self.styled(Style::new().green().bold(), msg);
        self.emit(&s);
    }

    pub fn warn(&self, msg: &str) {
        let s = self.styled(Style::new().yellow(), msg);
        self.emit(&s);
    }

    /// Ask the operator for one line of text. Falls back to reading stdin
    /// directly when it is not a terminal.
    pub fn ask(&self, prompt: &str) -> Result<String> {
        if atty::is(atty::Stream::Stdin) {
            return Input::<String>::new()
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
                .context("read confirmation");
        }
        self.emit(prompt);
        let mut answer = String::new();
        io::stdin()
            .lock()
            .read_line(&mut answer)
            .context("read confirmation")?;
        Ok(answer.trim().to_string())
    }

    /// Render aligned `label: value` rows under a title.
    pub fn data_panel(&self, title: &str, rows: &[(&str, String)]) {
        self.heading(title);
        let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        for (label, value) in rows {
            let key = self.styled(Style::new().dim(), &format!("{label:<width$}"));
            self.emit(&format!("  {key}  {value}"));
        }
    }
}
