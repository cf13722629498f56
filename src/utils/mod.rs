//! Cross-cutting utilities.
//!
//! Currently this is only [`fs`], the atomic file-writing helpers shared by
//! roster persistence and blank-manifest creation.

pub mod fs;
