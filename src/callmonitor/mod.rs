//! FRITZ!Box call monitor
//!
//! The router streams telephony events as text lines on TCP port 1012 once
//! the call monitor is enabled (dial `#96*5*` to enable, `#96*4*` to
//! disable). This module turns that byte stream into hub updates:
//!
//! - [`framer`] rebuilds lines from arbitrary socket chunks
//! - [`parser`] turns a line into a [`CallEvent`]
//! - [`dispatcher`] applies events to the hub
//! - [`handler`] wires the three into the transport callbacks

pub mod dispatcher;
pub mod framer;
pub mod handler;
pub mod parser;

pub use dispatcher::{EventDispatcher, CALL_SWITCH, CALL_SWITCH_NAME, CALL_TEXT_SENSOR};
pub use framer::{FramedLines, LineFramer, DEFAULT_LINE_CAPACITY};
pub use handler::CallMonitorHandler;
pub use parser::{parse_line, split_fields, CallEvent};
