use colored::Colorize;

use tokenrepro_common::traits::Notifier;

/// Prints alerts inline with the rest of the terminal output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn alert(&self, title: &str, message: &str) {
        let title = if title.eq_ignore_ascii_case("error") {
            title.red().bold()
        } else {
            title.green().bold()
        };
        println!("[{}] {}", title, message);
    }
}
