use std::str::FromStr;

use crate::engine::errors::TableError;
use crate::engine::table::TableSource;

/// Entries to dump: `start..stop` by `step`, `stop` defaulting to the table size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRange {
    pub start: u64,
    pub stop: Option<u64>,
    pub step: u64,
}

impl Default for EntryRange {
    fn default() -> Self {
        Self::all()
    }
}

impl EntryRange {
    pub fn all() -> Self {
        Self {
            start: 0,
            stop: None,
            step: 1,
        }
    }

    /// Accepts `N`, `a:b`, `a:b:step`, optionally wrapped in `range(...)`
    /// with commas instead of colons.
    pub fn parse(input: &str) -> Result<Self, String> {
        let trimmed = input.trim();
        let body = match trimmed
            .strip_prefix("range(")
            .and_then(|r| r.strip_suffix(')'))
        {
            Some(inner) => inner.replace(',', ":"),
            None => trimmed.to_string(),
        };

        let number = |s: &str| -> Result<u64, String> {
            s.trim()
                .parse::<u64>()
                .map_err(|_| format!("invalid entry range [{}]", input))
        };
        let parts: Vec<&str> = body.split(':').collect();
        let range = match parts.as_slice() {
            [n] => Self {
                start: 0,
                stop: Some(number(n)?),
                step: 1,
            },
            [a, b] => Self {
                start: number(a)?,
                stop: Some(number(b)?),
                step: 1,
            },
            [a, b, s] => Self {
                start: number(a)?,
                stop: Some(number(b)?),
                step: number(s)?,
            },
            _ => return Err(format!("invalid entry range [{}]", input)),
        };
        if range.step == 0 {
            return Err(format!("zero step in entry range [{}]", input));
        }
        Ok(range)
    }

    /// Entries of a table with `total` rows covered by this range.
    pub fn entries(&self, total: u64) -> impl Iterator<Item = u64> {
        let stop = self.stop.map_or(total, |s| s.min(total));
        (self.start..stop).step_by(self.step as usize)
    }
}

impl FromStr for EntryRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// One `<table>.<entry>.<column> <value>` line per cell in `range`.
pub fn dump_table<S: TableSource>(table: &S, range: &EntryRange) -> Result<Vec<String>, TableError> {
    let mut lines = Vec::new();
    for entry in range.entries(table.entries()) {
        let row = table.load_entry(entry)?;
        for (spec, value) in table.schema().columns().iter().zip(&row) {
            lines.push(format!(
                "{}.{:03}.{} {}",
                table.name(),
                entry,
                spec.name,
                value
            ));
        }
    }
    Ok(lines)
}
