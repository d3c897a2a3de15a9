//! Recognition and rewriting of `G60 X... Y...` coordinate lines.

use regex::Regex;

use crate::quadrupole::Point2D;

/// Digits after the decimal point for every rewritten coordinate.
pub const COORDINATE_DECIMALS: usize = 5;

const COORDINATE_LINE: &str = concat!(
    r"^(?P<prefix>(?:.*[\s\d])?G60\s+)",
    r"X(?P<x>[-+]?(?:\d+\.?\d*|\.\d+))",
    r"(?P<sep>\s+)",
    r"Y(?P<y>[-+]?(?:\d+\.?\d*|\.\d+))",
    r"(?P<suffix>\s.*)?$",
);

/// Compiled matcher for coordinate-bearing drill lines.
#[derive(Debug, Clone)]
pub struct CoordinatePattern {
    regex: Regex,
}

/// A matched coordinate line, split into verbatim text and numeric fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinateLine<'a> {
    /// Everything before the `X`, including the `G60` token.
    pub prefix: &'a str,
    /// Raw X field.
    pub x: &'a str,
    /// Whitespace between the X and Y fields.
    pub separator: &'a str,
    /// Raw Y field.
    pub y: &'a str,
    /// Everything after the Y field (empty or starting with whitespace).
    pub suffix: &'a str,
}

impl CoordinatePattern {
    /// Compiles the coordinate-line pattern.
    ///
    /// # Errors
    ///
    /// Returns the regex error if the pattern cannot be compiled.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(COORDINATE_LINE)?,
        })
    }

    /// Splits `line` (without its terminator) if it carries a coordinate pair.
    pub fn classify<'a>(&self, line: &'a str) -> Option<CoordinateLine<'a>> {
        let caps = self.regex.captures(line)?;
        Some(CoordinateLine {
            prefix: caps.name("prefix")?.as_str(),
            x: caps.name("x")?.as_str(),
            separator: caps.name("sep")?.as_str(),
            y: caps.name("y")?.as_str(),
            suffix: caps.name("suffix").map_or("", |m| m.as_str()),
        })
    }
}

impl CoordinateLine<'_> {
    /// Rewrites the line with `point` in place of the original fields.
    pub fn rewrite(&self, point: Point2D) -> String {
        format!(
            "{prefix}X{x:.prec$}{sep}Y{y:.prec$}{suffix}",
            prefix = self.prefix,
            x = point.x,
            sep = self.separator,
            y = point.y,
            suffix = self.suffix,
            prec = COORDINATE_DECIMALS,
        )
    }
}
