pub mod console_store;
pub mod formatter;

pub use console_store::ConsoleContextStore;
pub use formatter::{
    format_app_line, print_app_details, print_apps, print_context, print_scan_report, status_icon,
};
