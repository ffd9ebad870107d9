pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod musicxml;
pub mod npy;
pub mod segment;
pub mod summary;
pub mod validate;
pub mod xml;

pub use api::{
    encode_document, regenerate, regenerate_unchecked, summarize, BatchDriver, BatchReport,
    DocumentOutput, FailurePolicy,
};
pub use config::{Config, RawConfig};
pub use error::{ConvertError, ErrorKind, Result};
pub use extract::extract;
pub use model::*;
pub use musicxml::{synthesize, SynthConfig};
pub use npy::{npy_bytes, write_npy};
pub use segment::{encode, EncoderConfig, PianoRoll, Window, WindowId};
pub use summary::{pitch_extent, summaries_to_csv, summaries_to_yaml, PieceSummary};
pub use validate::validate;
pub use xml::XmlElement;
