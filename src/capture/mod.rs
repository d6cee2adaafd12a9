pub mod buffer;
pub mod chart;
pub mod demo;
pub mod error;
pub mod export;
pub mod instrument;
pub mod parse;
pub mod session;
pub mod source;

pub use buffer::{ChannelBuffer, ChannelSet, Sample, CHANNEL_COUNT, DEFAULT_CAPACITY};
pub use chart::{render_channel_png, render_overlay_png, ChartStyle};
pub use demo::DemoSource;
pub use error::CaptureError;
pub use export::{export_csv_file, export_filename, write_csv};
pub use instrument::{instrument_command, InstrumentSource, DEFAULT_INSTRUMENT};
pub use parse::{parse_measurement_line, Reading};
pub use session::{CaptureSession, PollReport};
pub use source::{LineSource, ScriptedSource};
