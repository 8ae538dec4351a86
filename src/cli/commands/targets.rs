use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::config::load::load_config;

/// Prints one target name per line, in file order. Any problem yields exit
/// code 1 with nothing else printed, so the output stays scriptable.
pub fn list_targets(config_file: &Path, out: &mut impl Write) -> i32 {
    let config = match load_config(config_file) {
        Ok(config) => config,
        Err(err) => {
            debug!("Unable to list targets: {}", err);
            return 1;
        }
    };
    for name in config.target_names() {
        if writeln!(out, "{}", name).is_err() {
            return 1;
        }
    }
    0
}
