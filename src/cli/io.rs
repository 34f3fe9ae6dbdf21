//! Output handling for CLI
//!
//! - Results go to the given writer (stdout in `run`)
//! - One trailing newline per block
//! - Logs go to stderr, never here

use std::io::Write;

use super::errors::CliResult;

/// Write a block of text, terminated by exactly one newline
pub fn write_block(out: &mut impl Write, text: &str) -> CliResult<()> {
    out.write_all(text.trim_end_matches('\n').as_bytes())?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Write one line per item
pub fn write_lines<I, S>(out: &mut impl Write, lines: I) -> CliResult<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for line in lines {
        writeln!(out, "{}", line.as_ref())?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_block_single_newline() {
        let mut out = Vec::new();
        write_block(&mut out, "SELECT 1\n\n").unwrap();
        write_block(&mut out, "SELECT 2").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "SELECT 1\nSELECT 2\n");
    }

    #[test]
    fn test_write_lines() {
        let mut out = Vec::new();
        write_lines(&mut out, ["a", "b"]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a\nb\n");
    }
}
