/// Literal, case-sensitive prefix predicate over raw line bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixMatcher {
    prefix: Vec<u8>,
}

impl PrefixMatcher {
    pub fn new(prefix: impl AsRef<[u8]>) -> Self {
        Self {
            prefix: prefix.as_ref().to_vec(),
        }
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// True iff `line` begins with the exact prefix bytes. No trimming or case folding.
    #[inline]
    pub fn is_match(&self, line: &[u8]) -> bool {
        line.starts_with(&self.prefix)
    }
}
