//! Line-preserving text model of the master stylesheet.

use std::path::Path;

use crate::error::{ModError, Result};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Encoding a stylesheet was read in; writes use the same one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// A stylesheet split into lines, remembering how to write it back byte-for-byte
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylesheetDocument {
    lines: Vec<String>,
    encoding: TextEncoding,
    line_ending: LineEnding,
    trailing_newline: bool,
    bom: bool,
}

impl Default for StylesheetDocument {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            encoding: TextEncoding::Utf8,
            line_ending: LineEnding::Lf,
            trailing_newline: true,
            bom: false,
        }
    }
}

impl StylesheetDocument {
    /// Read `path`; a missing file is an empty document
    pub fn read(path: &Path) -> Result<Self> {
        match std::fs::read(path) {
            Ok(bytes) => Self::decode(&bytes, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ModError::from_io(e, path)),
        }
    }

    /// Decode as UTF-8, falling back to Latin-1 for text without control characters
    pub fn decode(bytes: &[u8], path: &Path) -> Result<Self> {
        let (bom, body) = match bytes.strip_prefix(UTF8_BOM) {
            Some(rest) => (true, rest),
            None => (false, bytes),
        };

        let (text, encoding) = match std::str::from_utf8(body) {
            Ok(text) => (text.to_string(), TextEncoding::Utf8),
            Err(_) => {
                if let Some(bad) = body.iter().find(|b| is_forbidden_control(**b)) {
                    return Err(ModError::Encoding {
                        path: path.to_path_buf(),
                        reason: format!("not UTF-8 and contains control byte 0x{:02x}", bad),
                    });
                }
                log::warn!("{} is not UTF-8, reading it as Latin-1", path.display());
                (body.iter().map(|b| *b as char).collect(), TextEncoding::Latin1)
            }
        };

        Ok(Self::parse(&text, encoding, bom))
    }

    fn parse(text: &str, encoding: TextEncoding, bom: bool) -> Self {
        let line_ending = if text.contains("\r\n") {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        };
        let trailing_newline = text.ends_with('\n');

        let mut lines: Vec<String> = text
            .split('\n')
            .map(|line| match line_ending {
                LineEnding::CrLf => line.strip_suffix('\r').unwrap_or(line).to_string(),
                LineEnding::Lf => line.to_string(),
            })
            .collect();
        if trailing_newline || text.is_empty() {
            lines.pop();
        }

        Self {
            lines,
            encoding,
            line_ending,
            trailing_newline: trailing_newline || text.is_empty(),
            bom,
        }
    }

    pub fn to_text(&self) -> String {
        let ending = self.line_ending.as_str();
        let mut text = self.lines.join(ending);
        if self.trailing_newline && !self.lines.is_empty() {
            text.push_str(ending);
        }
        text
    }

    /// Serialize in the encoding the document was read in
    pub fn encode(&self, path: &Path) -> Result<Vec<u8>> {
        let text = self.to_text();
        let mut bytes = if self.bom { UTF8_BOM.to_vec() } else { Vec::new() };

        match self.encoding {
            TextEncoding::Utf8 => bytes.extend_from_slice(text.as_bytes()),
            TextEncoding::Latin1 => {
                for c in text.chars() {
                    let code = c as u32;
                    if code > 0xFF {
                        return Err(ModError::Encoding {
                            path: path.to_path_buf(),
                            reason: format!("character {:?} cannot be written as Latin-1", c),
                        });
                    }
                    bytes.push(code as u8);
                }
            }
        }
        Ok(bytes)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut Vec<String> {
        &mut self.lines
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }

    pub fn trim_trailing_blank_lines(&mut self) {
        while self.lines.last().is_some_and(|l| l.trim().is_empty()) {
            self.lines.pop();
        }
    }
}

fn is_forbidden_control(byte: u8) -> bool {
    byte < 0x20 && !matches!(byte, b'\t' | b'\n' | b'\r' | 0x0C)
}
