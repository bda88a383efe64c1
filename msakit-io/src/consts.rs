/// Number of record slots a freshly created alignment has room for.
pub const INITIAL_MSA_CAPACITY: usize = 16;

/// Residue counts after which alphabet guessing tries to classify early.
/// Past the last checkpoint the whole stream is read.
pub const GUESS_CHECKPOINTS: [u64; 3] = [500, 5000, 50000];

/// Residues per output line when writing alignments.
pub const DEFAULT_LINE_WIDTH: usize = 60;
