// Purpose - external interfaces: the output device that plays the graph

pub mod output;

pub use output::{OutputDevice, OutputError, OutputStream};
