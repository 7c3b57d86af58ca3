use std::io::{BufRead, Write};

use crate::error::Result;

/// Prompt for a glucose value until one parses. `None` at end of input.
pub fn read_glucose<R, W>(input: &mut R, output: &mut W) -> Result<Option<f64>>
where
    R: BufRead,
    W: Write,
{
    let mut line = String::new();
    loop {
        write!(output, "Enter the glucose value: ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        match line.trim().parse::<f64>() {
            Ok(value) => return Ok(Some(value)),
            Err(_) => writeln!(output, "Error: invalid value. Enter a valid number.")?,
        }
    }
}

/// Ask a yes/no question; `s` (sim) and `y` count as yes.
pub fn confirm<R, W>(input: &mut R, output: &mut W, question: &str) -> Result<bool>
where
    R: BufRead,
    W: Write,
{
    write!(output, "{question} (s/n): ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim().to_lowercase();
    Ok(answer == "s" || answer == "y")
}
