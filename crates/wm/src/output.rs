//! Colored diagnostics on stderr.

use console::{Style, Term};

/// Diagnostics printer. Rendered HTML and reports go to stdout, everything
/// else goes through here.
pub(crate) struct Output {
    term: Term,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    fn line(&self, style: &Style, msg: &str) {
        let _ = self.term.write_line(&style.apply_to(msg).to_string());
    }

    pub(crate) fn success(&self, msg: &str) {
        self.line(&Style::new().green(), msg);
    }

    pub(crate) fn warning(&self, msg: &str) {
        self.line(&Style::new().yellow(), msg);
    }

    pub(crate) fn error(&self, msg: &str) {
        self.line(&Style::new().red(), msg);
    }

    pub(crate) fn heading(&self, msg: &str) {
        self.line(&Style::new().cyan().bold(), msg);
    }

    /// Print render diagnostics for a page, if any.
    pub(crate) fn render_warnings(&self, page: &str, warnings: &[String]) {
        if warnings.is_empty() {
            return;
        }
        self.warning(&format!("{page}: {} warning(s)", warnings.len()));
        for warning in warnings {
            self.warning(&format!("  {warning}"));
        }
    }
}
