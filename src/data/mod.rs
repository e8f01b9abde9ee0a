//! Sparse binary matrices and dataset loading
//!
//! The engine consumes [`CsrBinaryMatrix`] values; [`BinaryDataset`] pairs a
//! matrix with labels and reads them from text files.

pub mod csr;
pub mod libsvm;

pub use self::csr::*;
pub use self::libsvm::*;
