//! The tatamiwm binary: wires the stock configuration to an
//! x11rb-backed connection and runs the event loop.

use std::env;
use std::process::exit;

use tracing::Level;
use tracing_subscriber::fmt as logger;

use tatamiwm::manager::Config;
use tatamiwm::x11rb_backed_wm;

fn main() {
    if let Some(arg) = env::args().nth(1) {
        if arg == "-v" {
            println!("tatamiwm-{}", env!("CARGO_PKG_VERSION"));
            exit(0);
        }
        eprintln!("usage: tatamiwm [-v]");
        exit(1);
    }

    if logger::fmt().with_max_level(Level::INFO).try_init().is_err() {
        eprintln!("tatamiwm: could not initialize logging");
    }

    let mut wm = match x11rb_backed_wm(Config::default()) {
        Ok(wm) => wm,
        Err(e) => {
            eprintln!("tatamiwm: {}", e);
            exit(1);
        }
    };

    wm.scan();
    if let Err(e) = wm.run() {
        eprintln!("tatamiwm: {}", e);
        exit(1);
    }
}
