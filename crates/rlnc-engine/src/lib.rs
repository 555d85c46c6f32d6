//! Random linear network coding over GF(2), GF(2^4), GF(2^8) and GF(2^16).
//!
//! A [`Factory`] validates a coding scheme and generation size once, then
//! builds [`Encoder`]s, [`Decoder`]s and pure [`Recoder`]s that exchange
//! payloads in the wire format described in [`payload`].

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod factory;
pub mod feedback;
pub mod field;
pub mod fulcrum;
pub mod generator;
pub mod matrix;
pub mod metrics;
pub mod observer;
pub mod payload;
pub mod recoder;
pub mod session_metrics;
pub mod storage;

pub use decoder::{DecodeOutcome, Decoder, DecoderState};
pub use encoder::Encoder;
pub use error::{CodingError, Result};
pub use factory::{CodingScheme, Factory, FactoryConfig};
pub use field::Field;
pub use observer::{CodingEvent, ObserverFn};
pub use recoder::Recoder;
pub use session_metrics::{SessionMetrics, SessionMetricsSnapshot};
