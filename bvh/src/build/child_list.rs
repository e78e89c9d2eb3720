use crate::build::{BuildRecordMB, MAX_BRANCHING_FACTOR};

/// Per-frame container of up to `MAX_BRANCHING_FACTOR` child build records.
///
/// Each record's set holds one handle on the buffer backing it, so slot
/// bookkeeping is reference bookkeeping: replacing the split slot releases
/// the spent parent reference exactly once, and dropping the list on frame
/// teardown releases one reference per remaining child.
pub struct ChildList {
    children: Vec<BuildRecordMB>,
}

impl ChildList {
    pub fn new(record: BuildRecordMB) -> Self {
        let mut children = Vec::with_capacity(MAX_BRANCHING_FACTOR);
        children.push(record);
        Self { children }
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn record(&self, i: usize) -> &BuildRecordMB {
        &self.children[i]
    }

    pub fn records(&self) -> &[BuildRecordMB] {
        &self.children
    }

    /// Replace the child at `best` with `lrecord` and append `rrecord`.
    ///
    /// For an object split both records alias the buffer the replaced child
    /// referenced; for a temporal split they carry freshly materialized
    /// buffers and the replaced child's reference was the last one held
    /// here, letting the parent buffer unwind as ancestors release theirs.
    pub fn split(&mut self, best: usize, lrecord: BuildRecordMB, rrecord: BuildRecordMB) {
        debug_assert!(best < self.children.len());
        debug_assert!(self.children.len() < MAX_BRANCHING_FACTOR);

        self.children[best] = lrecord;
        self.children.push(rrecord);
    }
}
