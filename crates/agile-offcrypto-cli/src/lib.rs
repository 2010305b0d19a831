//! `agile-decrypt`: a thin command-line wrapper around [`agile_offcrypto`].
//!
//! The argument parser and driver live in the library so they can be exercised from tests; the
//! binary only calls [`cli::run`].

pub mod cli;
pub mod descriptor_file;

pub use cli::{exit_code_for, run, run_with_args, Args, EXIT_WRONG_PASSWORD};
pub use descriptor_file::DescriptorFile;
