use console::style;

/// Styled terminal messages. Status lines go to stderr so stdout stays
/// clean for JSON that may be piped elsewhere.
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        eprintln!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        eprintln!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        eprintln!("{} {}", style("ℹ").blue(), message);
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    pub fn field(&self, label: &str, value: &str) {
        println!("  {:<12} {}", style(label).dim(), value);
    }

    pub fn numbered(&self, index: usize, text: &str) {
        println!("  {:>2}. {}", style(index).cyan(), text);
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
