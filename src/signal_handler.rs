use std::thread;

use signal_hook::{
    consts::{SIGINT, SIGTERM},
    iterator::Signals,
};

use crate::critical;

pub const INTERRUPTED_EXIT_CODE: i32 = 100;

/// SIGINT/SIGTERM end the run immediately. A running borg child gets the
/// same signal from the terminal and handles its own cleanup.
pub fn signal_handler() {
    thread::spawn(|| {
        let mut signals = match Signals::new([SIGINT, SIGTERM]) {
            Ok(signals) => signals,
            Err(err) => {
                eprintln!("signal handler setup failed: {}", err);
                return;
            }
        };
        if signals.forever().next().is_some() {
            eprintln!("Received interrupt signal!");
            critical!("Received interrupt signal.");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    });
}
