//! image-promoter CLI entry point
//!
//! Parses nothing and loads nothing itself: everything is delegated to
//! `cli::run`. Errors are printed to stderr and exit with status 1.

use image_promoter::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
