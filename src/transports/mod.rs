//! Concrete transports: console, rotating file, database, HTTP and webhook

pub mod batch;
pub mod console;
#[cfg(feature = "database")]
pub mod database;
pub mod file;
#[cfg(feature = "http")]
pub mod http;
pub mod optimize;
pub(crate) mod timer;
#[cfg(feature = "webhook")]
pub mod webhook;

pub use batch::BatchQueue;
pub use console::ConsoleTransport;
#[cfg(feature = "database")]
pub use database::{DatabaseTransport, DbRow, Dialect};
pub use file::FileTransport;
#[cfg(feature = "http")]
pub use http::{HttpTransport, ServiceKind};
pub use optimize::{optimize_entry, OptimizeOptions, ESSENTIAL_FIELDS};
#[cfg(feature = "webhook")]
pub use webhook::{RateWindow, WebhookTransport};
