//! Global constants for rk-core

/// Design file format version written by [`crate::Design::save`]
pub const FILE_FORMAT_VERSION: u32 = 1;

/// Entity token payload version
pub const TOKEN_VERSION: u8 = 1;

/// Name given to the root component of a new design
pub const ROOT_COMPONENT_NAME: &str = "root";

/// Minimum number of samples handed to a single rayon task when sampling curves
pub const SAMPLES_PER_TASK: usize = 64;
