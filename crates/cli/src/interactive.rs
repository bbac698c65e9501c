use std::io::{self, Write};

/// Interactive prompt utilities for CLI commands
pub struct Prompt;

impl Prompt {
    /// Ask a yes/no question with a default answer
    pub fn confirm(message: &str, default: bool) -> io::Result<bool> {
        let default_str = if default { "Y/n" } else { "y/N" };
        loop {
            print!("{} [{}]: ", message, default_str);
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            match Self::parse_answer(&input, default) {
                Some(answer) => return Ok(answer),
                None => println!("Please enter 'y' or 'n'"),
            }
        }
    }

    fn parse_answer(input: &str, default: bool) -> Option<bool> {
        match input.trim().to_lowercase().as_str() {
            "" => Some(default),
            "y" | "yes" | "true" | "1" => Some(true),
            "n" | "no" | "false" | "0" => Some(false),
            _ => None,
        }
    }
}
