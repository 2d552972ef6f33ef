//! Global constants for the piece-tree buffer

pub mod errors {
    // Error Codes
    pub const OUT_OF_MEMORY: &str = "OUT_OF_MEMORY";
    pub const INVALID_OFFSET: &str = "INVALID_OFFSET";
    pub const INVALID_LINE: &str = "INVALID_LINE";
    pub const INVALID_RANGE: &str = "INVALID_RANGE";
    pub const EMPTY_BUFFER: &str = "EMPTY_BUFFER";
    pub const IO_ERROR: &str = "IO_ERROR";
    pub const NO_PATH: &str = "NO_PATH";
}

pub mod history {
    /// Default bound on the number of undo entries kept per buffer
    pub const DEFAULT_MAX_UNDO_ENTRIES: usize = 1000;

    /// Fixed per-operation overhead used for memory estimates
    pub const OPERATION_OVERHEAD: usize = 32;
}

pub mod io {
    /// Suffix appended to the temporary file used for atomic saves
    pub const TEMP_SUFFIX: &str = ".tmp";
}

pub mod ui {
    /// Display text for buffers with no file path
    pub const NO_NAME: &str = "[No Name]";
}
