use std::fs;
use std::path::{Path, PathBuf};

/// Writes good run lists in the flat or XML layout.
pub struct GrlFactory {
    ranges: Vec<(i64, i64, i64)>,
}

impl GrlFactory {
    pub fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    pub fn with_range(mut self, run: i64, lbmin: i64, lbmax: i64) -> Self {
        self.ranges.push((run, lbmin, lbmax));
        self
    }

    pub fn write_dat(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let body: String = self
            .ranges
            .iter()
            .map(|(run, lo, hi)| format!("{} {} {}\n", run, lo, hi))
            .collect();
        fs::write(&path, body).unwrap();
        path
    }

    /// One `LumiBlockCollection` per range, `Start`/`End` as attributes.
    pub fn write_xml(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let mut body = String::from(
            "<?xml version=\"1.0\" ?>\n<LumiRangeCollection>\n  <NamedLumiRange>\n    <Name>test</Name>\n",
        );
        for (run, lo, hi) in &self.ranges {
            body.push_str(&format!(
                "    <LumiBlockCollection>\n      <Run>{}</Run>\n      <LBRange Start=\"{}\" End=\"{}\"/>\n    </LumiBlockCollection>\n",
                run, lo, hi
            ));
        }
        body.push_str("  </NamedLumiRange>\n</LumiRangeCollection>\n");
        fs::write(&path, body).unwrap();
        path
    }
}
