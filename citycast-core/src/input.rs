use anyhow::{Context, Result, anyhow};
use std::io::{BufRead, Write};

use crate::model::City;

/// Prompt for a city count and then that many city names.
///
/// Input is read as whitespace-separated tokens, so the names may arrive on
/// one line or many. Prompts go to `prompt`.
pub fn read_cities<R: BufRead, W: Write>(input: R, mut prompt: W) -> Result<Vec<City>> {
    let mut tokens = Tokens::new(input);

    write!(prompt, "Enter number of cities: ")?;
    prompt.flush()?;
    let raw = tokens.next_token()?.ok_or_else(|| anyhow!("No city count given."))?;
    let count: usize = raw
        .parse()
        .with_context(|| format!("'{raw}' is not a valid number of cities"))?;

    let mut cities = Vec::with_capacity(count.min(1024));
    for i in 0..count {
        write!(prompt, "Enter city name: ")?;
        prompt.flush()?;
        let name = tokens
            .next_token()?
            .ok_or_else(|| anyhow!("Input ended after {i} of {count} city names."))?;
        cities.push(City::new(name));
    }
    Ok(cities)
}

/// Whitespace tokenizer over a line-buffered reader.
struct Tokens<R> {
    input: R,
    pending: std::vec::IntoIter<String>,
}

impl<R: BufRead> Tokens<R> {
    fn new(input: R) -> Self {
        Self { input, pending: Vec::new().into_iter() }
    }

    fn next_token(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(token) = self.pending.next() {
                return Ok(Some(token));
            }
            let mut line = String::new();
            if self.input.read_line(&mut line).context("Failed to read from standard input")? == 0 {
                return Ok(None);
            }
            self.pending = line
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
                .into_iter();
        }
    }
}
