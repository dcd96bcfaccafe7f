//! Names and file extensions shared across the engine.

pub const APP_NAME: &str = "kiln";

/// Compile cache file, written into the project output directory.
pub const CACHE_FILENAME: &str = "log.csv";

/// Default build description looked up in the working directory.
pub const DEFAULT_DESCRIPTION: &str = "kiln.toml";

/// Setting this environment variable to anything but `0` forces serial job execution.
pub const SERIAL_ENV: &str = "KILN_SERIAL";

pub const OBJ_EXT: &str = "obj";
pub const PREPROCESSED_C_EXT: &str = "i";
pub const PREPROCESSED_CPP_EXT: &str = "ii";

/// Number of leading SHA-256 bytes kept for a preprocessed hash.
pub const PREPROCESSED_HASH_BYTES: usize = 8;
