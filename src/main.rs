//! pageclone CLI binary
//!
//! All logic lives in the library; main only maps the exit code.

fn main() {
    // cli::run() prints everything, including errors
    if let Err(code) = pageclone::cli::run() {
        std::process::exit(code.as_i32());
    }
}
