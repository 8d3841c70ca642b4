/// Accepted lumi-block interval of one run, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LumiRange {
    pub run: i64,
    pub lbmin: i64,
    pub lbmax: i64,
}

impl LumiRange {
    pub fn new(run: i64, lbmin: i64, lbmax: i64) -> Self {
        Self { run, lbmin, lbmax }
    }

    pub fn contains(&self, run: i64, lumi_block: i64) -> bool {
        self.run == run && self.lbmin <= lumi_block && lumi_block <= self.lbmax
    }
}

/// True iff some range covers (run, lumi_block). An empty list passes nothing.
pub fn passes(run: i64, lumi_block: i64, ranges: &[LumiRange]) -> bool {
    ranges.iter().any(|r| r.contains(run, lumi_block))
}

/// Good run list: the union of the ranges loaded from one or more sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoodRunList {
    ranges: Vec<LumiRange>,
}

impl GoodRunList {
    pub fn new(ranges: Vec<LumiRange>) -> Self {
        Self { ranges }
    }

    pub fn ranges(&self) -> &[LumiRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn extend(&mut self, ranges: impl IntoIterator<Item = LumiRange>) {
        self.ranges.extend(ranges);
    }

    pub fn passes(&self, run: i64, lumi_block: i64) -> bool {
        passes(run, lumi_block, &self.ranges)
    }
}
