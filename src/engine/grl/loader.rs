use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::engine::errors::GrlError;
use crate::engine::grl::lumi_range::{GoodRunList, LumiRange};

/// Splits a comma-separated list of paths and glob-expands every item.
/// Items matching nothing are dropped, like an unmatched shell glob.
pub fn expand_grl_sources(arg: &str) -> Result<Vec<PathBuf>, GrlError> {
    let mut sources = Vec::new();
    for item in arg.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let matches =
            glob::glob(item).map_err(|e| GrlError::Pattern(format!("{}: {}", item, e)))?;
        let before = sources.len();
        sources.extend(matches.filter_map(Result::ok));
        if sources.len() == before {
            warn!(target: "grl::loader", pattern = item, "GRL pattern matched no file");
        }
    }
    Ok(sources)
}

impl GoodRunList {
    /// Loads and concatenates every source. `.dat` is the flat triple
    /// format, `.xml` the lumi-range collection layout.
    pub fn load<P: AsRef<Path>>(sources: &[P]) -> Result<Self, GrlError> {
        let mut grl = GoodRunList::default();
        for source in sources {
            let path = source.as_ref();
            let ranges = load_file(path)?;
            info!(target: "grl::loader", path = %path.display(), ranges = ranges.len(), "Loaded GRL");
            grl.extend(ranges);
        }
        Ok(grl)
    }
}

fn load_file(path: &Path) -> Result<Vec<LumiRange>, GrlError> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if extension != "dat" && extension != "xml" {
        return Err(GrlError::UnknownExtension(path.to_path_buf()));
    }
    let content = fs::read_to_string(path).map_err(|source| GrlError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if extension == "dat" {
        parse_dat(&content, path)
    } else {
        parse_xml(&content, path)
    }
}

pub fn parse_dat(content: &str, path: &Path) -> Result<Vec<LumiRange>, GrlError> {
    let mut ranges = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let parsed: Result<Vec<i64>, _> = fields.iter().map(|f| f.parse::<i64>()).collect();
        match parsed {
            Ok(v) if v.len() == 3 => ranges.push(LumiRange::new(v[0], v[1], v[2])),
            _ => {
                return Err(GrlError::Parse {
                    path: path.to_path_buf(),
                    reason: format!("line {}: expected `run lbmin lbmax`, got [{}]", lineno + 1, line),
                });
            }
        }
    }
    Ok(ranges)
}

#[derive(Default)]
struct PendingRange {
    start: Option<i64>,
    end: Option<i64>,
}

#[derive(Default)]
struct PendingCollection {
    run: Option<i64>,
    ranges: Vec<PendingRange>,
}

impl PendingCollection {
    // Last range, or a fresh one when `is_filled` says the last is taken.
    fn open_range(&mut self, is_filled: impl Fn(&PendingRange) -> bool) -> &mut PendingRange {
        if self.ranges.last().is_none_or(|r| is_filled(r)) {
            self.ranges.push(PendingRange::default());
        }
        let last = self.ranges.len() - 1;
        &mut self.ranges[last]
    }
}

pub fn parse_xml(content: &str, path: &Path) -> Result<Vec<LumiRange>, GrlError> {
    let parse_error = |reason: String| GrlError::Parse {
        path: path.to_path_buf(),
        reason,
    };
    let parse_int = |tag: &str, raw: &str| {
        raw.trim()
            .parse::<i64>()
            .map_err(|_| parse_error(format!("<{}> is not an integer: [{}]", tag, raw.trim())))
    };

    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut ranges = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut collection: Option<PendingCollection> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = tag_name(e);
                if name == "LumiBlockCollection" {
                    collection = Some(PendingCollection::default());
                } else if name == "LBRange" {
                    let range = range_from_attributes(e, &parse_int, &parse_error)?;
                    if let Some(c) = collection.as_mut() {
                        c.ranges.push(range);
                    }
                }
                stack.push(name);
            }
            Ok(Event::Empty(ref e)) => {
                if tag_name(e) == "LBRange" {
                    let range = range_from_attributes(e, &parse_int, &parse_error)?;
                    if let Some(c) = collection.as_mut() {
                        c.ranges.push(range);
                    }
                }
            }
            Ok(Event::Text(ref t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| parse_error(format!("bad text: {}", e)))?;
                let Some(c) = collection.as_mut() else {
                    continue;
                };
                match stack.last().map(String::as_str) {
                    Some("Run") => c.run = Some(parse_int("Run", &*text)?),
                    Some("Start") => {
                        let start = parse_int("Start", &*text)?;
                        c.open_range(|r| r.start.is_some()).start = Some(start);
                    }
                    Some("End") => {
                        let end = parse_int("End", &*text)?;
                        c.open_range(|r| r.end.is_some()).end = Some(end);
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if stack.pop().as_deref() != Some(name.as_str()) {
                    return Err(parse_error(format!("unbalanced closing tag </{}>", name)));
                }
                if name == "LumiBlockCollection" {
                    if let Some(c) = collection.take() {
                        ranges.extend(finish_collection(c, &parse_error)?);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(parse_error(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(parse_error(format!("unclosed element <{}>", stack.join("/"))));
    }
    Ok(ranges)
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn range_from_attributes<I, P>(
    e: &BytesStart<'_>,
    parse_int: &I,
    parse_error: &P,
) -> Result<PendingRange, GrlError>
where
    I: Fn(&str, &str) -> Result<i64, GrlError>,
    P: Fn(String) -> GrlError,
{
    let mut range = PendingRange::default();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| parse_error(format!("bad LBRange attribute: {}", err)))?;
        let value = attr
            .unescape_value()
            .map_err(|err| parse_error(format!("bad LBRange attribute: {}", err)))?;
        match attr.key.as_ref() {
            b"Start" => range.start = Some(parse_int("Start", &*value)?),
            b"End" => range.end = Some(parse_int("End", &*value)?),
            _ => {}
        }
    }
    Ok(range)
}

fn finish_collection<P>(c: PendingCollection, parse_error: &P) -> Result<Vec<LumiRange>, GrlError>
where
    P: Fn(String) -> GrlError,
{
    let run = c
        .run
        .ok_or_else(|| parse_error("LumiBlockCollection without <Run>".into()))?;
    c.ranges
        .into_iter()
        .map(|r| match (r.start, r.end) {
            (Some(start), Some(end)) => Ok(LumiRange::new(run, start, end)),
            _ => Err(parse_error(format!("LBRange of run {} lacks Start or End", run))),
        })
        .collect()
}
