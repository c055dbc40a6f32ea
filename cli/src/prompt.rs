//! Terminal prompts

use anyhow::{bail, Result};
use std::io::{self, Write};

/// Print `label` and read one trimmed line from stdin
pub fn line(label: &str) -> Result<String> {
    let mut input = String::new();
    print!("{label}");
    io::stdout().flush()?;
    if io::stdin().read_line(&mut input)? == 0 {
        bail!("stdin closed");
    }
    Ok(input.trim().to_string())
}

/// Read a password without echoing it
pub fn password(label: &str) -> Result<String> {
    Ok(rpassword::prompt_password(label)?)
}

pub fn yes_no(label: &str) -> Result<bool> {
    Ok(is_yes(&line(label)?))
}

fn is_yes(answer: &str) -> bool {
    answer.trim().to_lowercase().starts_with('y')
}

/// Validate a multi-cluster count
pub fn parse_cluster_count(input: &str) -> std::result::Result<usize, &'static str> {
    match input.trim().parse::<usize>() {
        Ok(n) if n >= 2 => Ok(n),
        Ok(_) => Err("Please enter at least 2 if you want multiple. Or press Ctrl+C to exit."),
        Err(_) => Err("Invalid number. Please try again."),
    }
}

/// Ask for a cluster count until a valid one is given
pub fn cluster_count() -> Result<usize> {
    loop {
        let answer = line("How many clusters do you want to monitor? Enter a number: ")?;
        match parse_cluster_count(&answer) {
            Ok(n) => return Ok(n),
            Err(message) => println!("{message}"),
        }
    }
}

/// Host, username and password for one cluster
pub struct Credentials {
    pub host: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Prompt for whatever was not given up front
    pub fn ask(host: Option<&str>, username: Option<&str>) -> Result<Self> {
        let host = match host {
            Some(h) => h.to_string(),
            None => line("Enter the Isilon cluster IP/Hostname: ")?,
        };
        let username = match username {
            Some(u) => u.to_string(),
            None => line("Enter your username: ")?,
        };
        let password = password("Enter your password: ")?;
        Ok(Self {
            host,
            username,
            password,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y"));
        assert!(is_yes(" Yes "));
        assert!(!is_yes("n"));
        assert!(!is_yes(""));
    }

    #[test]
    fn test_parse_cluster_count() {
        assert_eq!(parse_cluster_count("3"), Ok(3));
        assert_eq!(parse_cluster_count(" 2 "), Ok(2));
        assert!(parse_cluster_count("1").unwrap_err().contains("at least 2"));
        assert!(parse_cluster_count("two").unwrap_err().contains("Invalid number"));
    }
}
