//! fluorin-core
//!
//! Residue alphabet and the sequence preprocessing shared by the encoders and
//! the training pipeline.
//!
//! ```
//! use fluorin_core::{to_residue_list, truncate};
//!
//! assert_eq!(truncate("MSKGEELF", 3), "MSK");
//! assert_eq!(to_residue_list(" msk ge ", 4), vec!['M', 'S', 'K', 'G']);
//! ```
pub mod alphabet;
pub mod sequence;

pub use alphabet::{aa1to_int, int_to_aa1, ALPHABET};
pub use sequence::{normalize, residue_count, to_residue_list, truncate};
