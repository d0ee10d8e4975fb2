//! MacSyLib core: the search-and-resolution pipeline that turns HMM hits on
//! prokaryotic replicons into scored occurrences of macromolecular systems.
//!
//! The crate is organized the way the pipeline flows: [`model`] and [`hits`]
//! are the immutable inputs, [`cluster`], [`candidates`], [`score`] and
//! [`resolve`] are the stages of the engine, and [`report`] projects the
//! resolver's output into the external tabular contracts. [`pipeline`] wires
//! the stages together per replicon.

pub mod candidates;
pub mod cli;
pub mod cluster;
pub mod common;
pub mod config;
pub mod err;
pub mod hits;
pub mod hmmer;
pub mod model;
pub mod package;
pub mod pipeline;
pub mod replicon;
pub mod report;
pub mod resolve;
pub mod score;
pub mod seqdb;
