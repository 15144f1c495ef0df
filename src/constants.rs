/// Gossip application-state key marking a node that is receiving its
/// initial data set. Visible cluster-wide while the transfer runs.
pub const BOOTSTRAP_MODE: &str = "BOOTSTRAP_MODE";

/// Gossip application-state key under which every node publishes its
/// current on-disk load (a decimal string).
pub const LOAD: &str = "LOAD";

// -
// SSTable component suffixes

pub(crate) const DATA_SUFFIX: &str = "Data.db";
pub(crate) const INDEX_SUFFIX: &str = "Index.db";
pub(crate) const FILTER_SUFFIX: &str = "Filter.db";

/// Marker segment in not-yet-final sstable file names.
pub(crate) const TEMP_MARKER: &str = "tmp";

/// All component suffixes one sstable generation may ship.
pub(crate) const SSTABLE_SUFFIXES: [&str; 3] = [DATA_SUFFIX, INDEX_SUFFIX, FILTER_SUFFIX];
