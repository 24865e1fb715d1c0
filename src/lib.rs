#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod corpus;
pub mod dates;
pub mod document;
pub mod extract;
pub mod fix_dates;
pub mod formats;
pub mod html_source;
pub mod identity;
pub mod logging;
pub mod media;
pub mod pipeline;
pub mod source;
