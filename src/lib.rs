// src/lib.rs
//
// Host-side transport for Ethernet-to-CAN adapters that speak the fixed
// 13-byte eth2can framing over a plain TCP socket.

#[macro_use]
pub mod logging;
pub mod io;
pub mod settings;

pub use io::{CanBus, CanFilter, CanMessage, Eth2CanBus, IoError};
pub use settings::{load_config, Eth2CanConfig};

/// Apply the ambient parts of a configuration: verbose traces and file logging.
pub fn init_logging(config: &Eth2CanConfig) -> Result<(), IoError> {
    logging::set_verbose(config.verbose);
    if let Some(ref dir) = config.log_dir {
        logging::init_file_logging(dir)?;
    }
    Ok(())
}
