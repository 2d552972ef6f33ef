use crate::constants::history::DEFAULT_MAX_UNDO_ENTRIES;

/// Buffer-specific options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferOptions {
    /// Maximum number of undo entries kept; 0 disables recording
    pub max_undo_entries: usize,
    /// Save through a temporary file and rename
    pub atomic_save: bool,
}

impl Default for BufferOptions {
    fn default() -> Self {
        BufferOptions {
            max_undo_entries: DEFAULT_MAX_UNDO_ENTRIES,
            atomic_save: true,
        }
    }
}

impl BufferOptions {
    #[must_use]
    pub fn with_max_undo_entries(mut self, max: usize) -> Self {
        self.max_undo_entries = max;
        self
    }

    #[must_use]
    pub fn with_atomic_save(mut self, atomic: bool) -> Self {
        self.atomic_save = atomic;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = BufferOptions::default();
        assert_eq!(opts.max_undo_entries, 1000);
        assert!(opts.atomic_save);
    }

    #[test]
    fn test_builders() {
        let opts = BufferOptions::default()
            .with_max_undo_entries(5)
            .with_atomic_save(false);
        assert_eq!(opts.max_undo_entries, 5);
        assert!(!opts.atomic_save);
    }
}
