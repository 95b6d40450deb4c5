pub mod app;
pub mod notifier;
pub mod view;

pub use app::App;
pub use notifier::ConsoleNotifier;
