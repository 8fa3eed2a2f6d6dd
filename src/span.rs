use miette::SourceSpan;

/// Position relative to start of source.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Idx(pub u32);

/// Holds a view into a source.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash, Debug)]
pub struct Span {
    start: Idx,
    len: u16,
}

impl Span {
    pub fn new(start: Idx, len: u16) -> Self {
        Span { start, len }
    }

    pub fn offs(&self) -> usize {
        self.start.0 as usize
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn as_range(&self) -> std::ops::Range<usize> {
        let start = self.start.0 as usize;
        let end = start + self.len as usize;
        start..end
    }
}

impl From<Span> for SourceSpan {
    fn from(value: Span) -> Self {
        SourceSpan::new(value.offs().into(), value.len())
    }
}

impl From<Span> for std::ops::Range<usize> {
    fn from(value: Span) -> Self {
        value.as_range()
    }
}
