//! cctprof - instrumentation overhead attribution for HPCToolkit profiles
//!
//! Reads calling-context profiles of binaries rewritten with inserted
//! instrumentation, and attributes the cost measured under the
//! instrumentation frames back to the functions, loops, call edges and call
//! sites that triggered it. A version-map classifier splits statement cost
//! between original code and rewriter-generated code versions.

pub mod attribution;
pub mod cct;
pub mod cli;
pub mod config;
pub mod ingest;
pub mod inspect;
pub mod search;
pub mod version_map;
