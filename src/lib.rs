pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod table;
