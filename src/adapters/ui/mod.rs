pub mod banner;
pub mod tui;

pub use banner::StartupStatus;

/// Prints the welcome banner and applies the neon theme for all subsequent inquire prompts.
/// Call once at startup, after the scheduler has been (auto)started.
pub fn init_ui(status: &StartupStatus<'_>) {
    banner::print_welcome(status);
    tui::apply_theme();
}
