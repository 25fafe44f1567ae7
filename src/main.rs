//! Process entry point (spec ambient stack, §6 exit-code contract).
//!
//! All the actual wiring lives in `lib.rs::run`; this binary just
//! converts a startup failure into the documented exit code.

fn main() {
    if let Err(err) = provision_ble::run() {
        log::error!("startup failed: {}", err);
        std::process::exit(1);
    }
}
