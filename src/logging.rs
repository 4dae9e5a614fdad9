use log::LevelFilter;
use simplelog::{ConfigBuilder, WriteLogger};
use std::fs::File;

const LOG_FILE: &str = "kapok.log";

// Diagnostics go to a side file so stdout stays clean for the protocol.
// A missing or unwritable log file only costs us the diagnostics.
pub fn init_logging() {
    let Ok(file) = File::create(LOG_FILE) else {
        return;
    };
    let config = ConfigBuilder::new()
        .set_thread_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build();
    if WriteLogger::init(LevelFilter::Info, config, file).is_err() {
        return;
    }
    log::info!(
        "{} logging to {}, default hash {} MB",
        crate::uci::ENGINE_NAME,
        LOG_FILE,
        crate::tt::DEFAULT_TT_MB
    );
}
