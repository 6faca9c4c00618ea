/// One contiguous byte span of the resource. `end` is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    pub index: usize,
    pub start: u64,
    pub end: u64,
}

impl ChunkRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Range` request header.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }

    pub fn covers(&self, total: u64) -> bool {
        self.start == 0 && self.end + 1 == total
    }
}

/// Splits `[0, total - 1]` into `concurrency` contiguous ranges.
///
/// Every range but the last is `total / concurrency` bytes long; the last one
/// absorbs the remainder. When `total` is smaller than `concurrency` the
/// number of ranges drops to `total` so that no range is empty, and an empty
/// resource yields no ranges at all.
pub fn plan(total: u64, concurrency: usize) -> Vec<ChunkRange> {
    if total == 0 {
        return Vec::new();
    }

    let chunks = (concurrency as u64).clamp(1, total);
    let block_size = total / chunks;

    (0..chunks)
        .map(|i| ChunkRange {
            index: i as usize,
            start: i * block_size,
            end: if i == chunks - 1 {
                total - 1
            } else {
                (i + 1) * block_size - 1
            },
        })
        .collect()
}
