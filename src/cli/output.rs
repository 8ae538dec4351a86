//! Terminal progress output.
//!
//! Steps and sub-steps go to stdout, warnings and failures to stderr.

use colored::Colorize;

/// Force colors off (`--no-color`); otherwise `colored` decides from the
/// terminal and `NO_COLOR`.
pub fn set_color(enabled: bool) {
    if !enabled {
        colored::control::set_override(false);
    }
}

/// Print a top-level step (blue "::" and bold text)
pub fn step(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{} {}", "::".blue(), msg.to_string().bold());
}

/// Print a sub-step (blue "-->", indented)
pub fn substep(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {} {}", "-->".blue(), msg);
}

/// Print subprocess output under the current sub-step
pub fn detail(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("      {}", msg);
}

/// Same as [`detail`] on stderr
pub fn detail_err(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("      {}", msg);
}

/// Print a warning (yellow, indented) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("      {}", msg.to_string().yellow());
}

/// Print a fatal error (red, indented) to stderr
pub fn failure(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("      {}", msg.to_string().red());
}
