//! Plain-text tig layout files.
//!
//! A layout file holds any number of tig blocks:
//!
//! ```text
//! tig 1
//! len 1500
//! cns ACGT...
//! qlt 5??...
//! coverageStat 1.00
//! suggestRepeat F
//! suggestUnique F
//! suggestCircular F
//! suggestHaploid F
//! numChildren 2
//! read 100 anchor 0 hang 0 0 position 0 1000
//! read 101 anchor 100 hang 200 210 position 1210 200 skip 0 0
//! tigend
//! ```
//!
//! `cns`/`qlt` are empty when the tig has no consensus; qualities are phred+33. A child's
//! `position` is `bgn end` with `bgn > end` for a reverse-complemented child, and anchor `0` means
//! the child has no anchor. Blank lines and lines starting with `#` are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use log::debug;

use crate::errors::CnsError;
use crate::tig::{ChildKind, TgPosition, Tig};

const QUAL_OFFSET: u8 = 33;

/// Line-tracking parser state for one file.
struct LayoutParser {
    path: String,
    line: usize,
}

impl LayoutParser {
    fn error(&self, reason: impl Into<String>) -> anyhow::Error {
        CnsError::InvalidFileFormat {
            file_type: "layout".to_string(),
            path: self.path.clone(),
            line: self.line,
            reason: reason.into(),
        }
        .into()
    }

    fn number<T: FromStr>(&self, token: Option<&str>, what: &str) -> Result<T> {
        let token = token.ok_or_else(|| self.error(format!("missing {what}")))?;
        token.parse().map_err(|_| self.error(format!("invalid {what} '{token}'")))
    }

    fn flag(&self, token: Option<&str>, what: &str) -> Result<bool> {
        match token {
            Some("T") => Ok(true),
            Some("F") => Ok(false),
            Some(other) => Err(self.error(format!("invalid {what} '{other}', expected T or F"))),
            None => Err(self.error(format!("missing {what}"))),
        }
    }

    fn child(&self, kind: ChildKind, tokens: &[&str]) -> Result<TgPosition> {
        let ident: u32 = self.number(tokens.get(1).copied(), "child id")?;
        let mut position: Option<(i32, i32)> = None;
        let mut anchor = 0u32;
        let (mut a_hang, mut b_hang) = (0i32, 0i32);
        let (mut a_skip, mut b_skip) = (0u32, 0u32);

        let mut i = 2;
        while i < tokens.len() {
            let value = |k: usize| tokens.get(i + k).copied();
            match tokens[i] {
                "anchor" => {
                    anchor = self.number(value(1), "anchor")?;
                    i += 2;
                }
                "hang" => {
                    a_hang = self.number(value(1), "a-hang")?;
                    b_hang = self.number(value(2), "b-hang")?;
                    i += 3;
                }
                "position" => {
                    position = Some((
                        self.number(value(1), "position begin")?,
                        self.number(value(2), "position end")?,
                    ));
                    i += 3;
                }
                "skip" => {
                    a_skip = self.number(value(1), "a-skip")?;
                    b_skip = self.number(value(2), "b-skip")?;
                    i += 3;
                }
                other => return Err(self.error(format!("unknown child field '{other}'"))),
            }
        }

        let (bgn, end) =
            position.ok_or_else(|| self.error(format!("child {ident} has no position")))?;
        let mut child = TgPosition::new(kind, ident, bgn, end).with_skips(a_skip, b_skip);
        if anchor != 0 {
            child = child.with_anchor(anchor, a_hang, b_hang);
        } else {
            child.a_hang = a_hang;
            child.b_hang = b_hang;
        }
        Ok(child)
    }
}

/// Parses every tig in a layout stream. `path` is used in error messages only.
///
/// # Errors
///
/// Returns an error on I/O failure or a malformed line.
pub fn parse_layouts<R: BufRead>(reader: R, path: &str) -> Result<Vec<Tig>> {
    let mut parser = LayoutParser { path: path.to_string(), line: 0 };
    let mut tigs = Vec::new();
    let mut current: Option<Tig> = None;
    let mut expected_children: Option<usize> = None;

    for line in reader.lines() {
        parser.line += 1;
        let line = line.with_context(|| format!("Failed to read layout file: {path}"))?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&keyword) = tokens.first() else {
            continue;
        };
        if keyword.starts_with('#') {
            continue;
        }

        if keyword == "tig" {
            if current.is_some() {
                return Err(parser.error("'tig' before the previous tig's 'tigend'"));
            }
            current = Some(Tig::new(parser.number(tokens.get(1).copied(), "tig id")?));
            expected_children = None;
            continue;
        }

        let Some(tig) = current.as_mut() else {
            return Err(parser.error(format!("'{keyword}' outside of a tig block")));
        };
        let value = tokens.get(1).copied();

        match keyword {
            "len" => tig.layout_len = parser.number(value, "length")?,
            "cns" => tig.bases = value.unwrap_or("").as_bytes().to_ascii_uppercase(),
            "qlt" => {
                tig.quals = value
                    .unwrap_or("")
                    .bytes()
                    .map(|q| {
                        q.checked_sub(QUAL_OFFSET).ok_or_else(|| {
                            parser.error(format!("invalid quality character '{}'", q as char))
                        })
                    })
                    .collect::<Result<_>>()?;
            }
            "coverageStat" => tig.coverage_stat = parser.number(value, "coverage stat")?,
            "suggestRepeat" => tig.suggest_repeat = parser.flag(value, "suggestRepeat")?,
            "suggestUnique" => tig.suggest_unique = parser.flag(value, "suggestUnique")?,
            "suggestCircular" => tig.suggest_circular = parser.flag(value, "suggestCircular")?,
            "suggestHaploid" => tig.suggest_haploid = parser.flag(value, "suggestHaploid")?,
            "numChildren" => expected_children = Some(parser.number(value, "child count")?),
            "tigend" => {
                if tig.bases.len() != tig.quals.len() {
                    return Err(parser.error(format!(
                        "tig {} has {} consensus bases but {} qualities",
                        tig.ident,
                        tig.bases.len(),
                        tig.quals.len()
                    )));
                }
                if let Some(n) = expected_children.filter(|&n| n != tig.children.len()) {
                    return Err(parser.error(format!(
                        "tig {} declares {n} children but lists {}",
                        tig.ident,
                        tig.children.len()
                    )));
                }
                if let Some(tig) = current.take() {
                    tigs.push(tig);
                }
            }
            other => match ChildKind::from_keyword(other) {
                Some(kind) => {
                    let child = parser.child(kind, &tokens)?;
                    tig.children.push(child);
                }
                None => return Err(parser.error(format!("unknown keyword '{other}'"))),
            },
        }
    }

    if let Some(tig) = current {
        parser.line += 1;
        return Err(parser.error(format!("tig {} is missing 'tigend'", tig.ident)));
    }
    Ok(tigs)
}

/// Reads every tig from a layout file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or is malformed.
pub fn read_layouts<P: AsRef<Path>>(path: P) -> Result<Vec<Tig>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open layout file: {}", path.display()))?;
    let tigs = parse_layouts(BufReader::new(file), &path.display().to_string())?;
    debug!("Read {} tigs from {}", tigs.len(), path.display());
    Ok(tigs)
}

fn flag(value: bool) -> char {
    if value { 'T' } else { 'F' }
}

/// Writes one tig block.
///
/// # Errors
///
/// Returns any error from `writer`.
pub fn write_tig<W: Write>(writer: &mut W, tig: &Tig) -> std::io::Result<()> {
    writeln!(writer, "tig {}", tig.ident)?;
    writeln!(writer, "len {}", tig.layout_len)?;
    writer.write_all(b"cns ")?;
    writer.write_all(&tig.bases)?;
    writer.write_all(b"\nqlt ")?;
    let quals: Vec<u8> = tig.quals.iter().map(|&q| q.saturating_add(QUAL_OFFSET)).collect();
    writer.write_all(&quals)?;
    writeln!(writer)?;
    writeln!(writer, "coverageStat {:.2}", tig.coverage_stat)?;
    writeln!(writer, "suggestRepeat {}", flag(tig.suggest_repeat))?;
    writeln!(writer, "suggestUnique {}", flag(tig.suggest_unique))?;
    writeln!(writer, "suggestCircular {}", flag(tig.suggest_circular))?;
    writeln!(writer, "suggestHaploid {}", flag(tig.suggest_haploid))?;
    writeln!(writer, "numChildren {}", tig.children.len())?;
    for child in &tig.children {
        write!(
            writer,
            "{} {} anchor {} hang {} {} position {} {}",
            child.kind,
            child.ident,
            child.anchor.unwrap_or(0),
            child.a_hang,
            child.b_hang,
            child.bgn(),
            child.end()
        )?;
        if child.a_skip != 0 || child.b_skip != 0 {
            write!(writer, " skip {} {}", child.a_skip, child.b_skip)?;
        }
        writeln!(writer)?;
    }
    writeln!(writer, "tigend")
}

/// Writes tigs to a new layout file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_layouts<P: AsRef<Path>>(path: P, tigs: &[Tig]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(
        File::create(path)
            .with_context(|| format!("Failed to create layout file: {}", path.display()))?,
    );
    for tig in tigs {
        write_tig(&mut writer, tig)
            .with_context(|| format!("Failed to write layout file: {}", path.display()))?;
    }
    writer.flush().with_context(|| format!("Failed to write layout file: {}", path.display()))?;
    Ok(())
}
