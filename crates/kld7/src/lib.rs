//! Driver for the RFbeam K-LD7 Doppler radar sensor.
//!
//! The sensor talks a small tagged-packet protocol over a serial line. This
//! crate bundles the layers of the driver:
//!
//! - [`transport`]: the serial link abstraction and its `serialport` backend
//! - [`frame`]: packet codec, frame layouts and the frame decoder
//! - [`session`]: command exchange, cached parameters and frame streaming
//!
//! ```no_run
//! use kld7::{FrameKind, Session, SessionConfig, StreamOptions};
//!
//! # fn main() -> Result<(), kld7::SessionError> {
//! let mut radar = Session::open("/dev/ttyUSB0", SessionConfig::default())?;
//! radar.set_param("HOLD", 30)?;
//! for frame in radar.stream(FrameKind::Targets | FrameKind::Done, StreamOptions::count(10))? {
//!     println!("{:?}", frame?);
//! }
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use kld7_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use kld7_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use kld7_session::*;
}

pub use kld7_frame::{FrameData, FrameKind, FrameKinds, RadarParameters, Tag};
pub use kld7_session::{
    Response, Session, SessionConfig, SessionError, StopHandle, StreamOptions,
};
