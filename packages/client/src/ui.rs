//! UI utilities for the client.

use std::io::Write;

/// Redisplay the prompt after printing a message
pub fn redisplay_prompt(user_name: &str) {
    print!("{}> ", user_name);
    std::io::stdout().flush().ok();
}

/// Print a pre-formatted block and put the prompt back
pub fn print_and_prompt(text: &str, user_name: &str) {
    print!("{}", text);
    redisplay_prompt(user_name);
}
