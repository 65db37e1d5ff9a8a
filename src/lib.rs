#![forbid(unsafe_code)]

//! Helpers behind the camera roll cleaner: decide whether videos sitting in a
//! local camera-roll dump were already published on a channel, using the
//! video duration as the only matching signal.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod fanout;
pub mod logging;
pub mod matcher;
pub mod probe;
pub mod process;
pub mod report;
pub mod scan;
pub mod sync;
pub mod ytdlp;
