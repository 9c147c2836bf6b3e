use crate::engines::generation::Chromosome;
use crate::error::{CodevolveError, Result};
use std::fs;
use std::io;
use std::path::Path;

/// Reads and writes machine code as text hex.
///
/// Digits come in pairs, one pair per byte. Pairs may be separated by any
/// whitespace or written back to back. `#` starts a comment that runs to
/// the end of the line.
pub struct HexConnector;

impl HexConnector {
    /// Load a seed program from a hex file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => CodevolveError::MissingSeedFile {
                path: path.to_path_buf(),
                source,
            },
            _ => CodevolveError::Io(source),
        })?;

        let code = Self::parse(&text)?;
        log::debug!("Loaded {} bytes from {}", code.len(), path.display());
        Ok(code)
    }

    pub fn parse(text: &str) -> Result<Vec<u8>> {
        let mut digits = Vec::new();

        for (number, line) in text.lines().enumerate() {
            let line = match line.find('#') {
                Some(comment) => &line[..comment],
                None => line,
            };

            for c in line.chars().filter(|c| !c.is_whitespace()) {
                let digit = c.to_digit(16).ok_or_else(|| {
                    CodevolveError::InvalidSeed(format!(
                        "'{}' on line {} is not a hex digit",
                        c,
                        number + 1
                    ))
                })?;
                digits.push(digit as u8);
            }
        }

        if digits.len() % 2 != 0 {
            return Err(CodevolveError::InvalidSeed(format!(
                "Odd number of hex digits ({})",
                digits.len()
            )));
        }
        if digits.is_empty() {
            return Err(CodevolveError::InvalidSeed("No code in seed".to_string()));
        }

        Ok(digits.chunks(2).map(|pair| (pair[0] << 4) | pair[1]).collect())
    }

    /// Save a chromosome one instruction per line, readable by [`HexConnector::load`]
    pub fn save<P: AsRef<Path>>(path: P, chromosome: &Chromosome) -> Result<()> {
        let mut text = chromosome.to_hex_lines().join("\n");
        text.push('\n');
        fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::InstructionTable;

    #[test]
    fn test_parse_separated_and_adjacent() {
        assert_eq!(HexConnector::parse("55 48 89 e5\nC3").unwrap(), vec![0x55, 0x48, 0x89, 0xE5, 0xC3]);
        assert_eq!(HexConnector::parse("554889E5C3").unwrap(), vec![0x55, 0x48, 0x89, 0xE5, 0xC3]);
    }

    #[test]
    fn test_parse_skips_comments() {
        let text = "# prologue\n55 # push rbp\n\nC3\n";
        assert_eq!(HexConnector::parse(text).unwrap(), vec![0x55, 0xC3]);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(HexConnector::parse("55 4"), Err(CodevolveError::InvalidSeed(_))));
        assert!(matches!(HexConnector::parse("55 ZZ"), Err(CodevolveError::InvalidSeed(_))));
        assert!(matches!(HexConnector::parse("  \n"), Err(CodevolveError::InvalidSeed(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = HexConnector::load(dir.path().join("code.hex"));
        assert!(matches!(result, Err(CodevolveError::MissingSeedFile { .. })));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evolved.hex");
        let table = InstructionTable::new();
        let code = [0x55, 0x48, 0x89, 0xE5, 0x5D, 0xC3];
        let chromosome = Chromosome::decode(&code, &table).unwrap();

        HexConnector::save(&path, &chromosome).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "55\n48 89 E5\n5D\nC3\n");
        assert_eq!(HexConnector::load(&path).unwrap(), code);
    }
}
