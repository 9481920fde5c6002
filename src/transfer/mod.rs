mod preview;
mod simulator;
mod validate;

pub use preview::generate_preview;
pub use simulator::{SimulatorConfig, TransferSimulator};
pub use validate::{ALLOWED_MIME_TYPES, MAX_FILE_SIZE, validate};
