use std::io::Write;
use std::sync::Mutex;

use binlog::mutation::Mutation;
use common::err::CResult;
use common::err::decode_error::ReError;

use crate::destination::codec::{Codec, JsonCodec};

/// Message bus client a destination publishes to.
pub trait Publisher: Send + Sync {
    /// Publishes a batch. `Ok` confirms delivery of the whole batch.
    fn publish(&self, mutations: &[Mutation]) -> CResult<()>;
}

/// Writes one encoded mutation per line.
pub struct StreamPublisher<W: Write + Send> {
    writer: Mutex<W>,
    codec: Box<dyn Codec>,
}

impl<W: Write + Send> StreamPublisher<W> {
    pub fn new(writer: W) -> Self {
        StreamPublisher::with_codec(writer, Box::new(JsonCodec::new()))
    }

    pub fn with_codec(writer: W, codec: Box<dyn Codec>) -> Self {
        StreamPublisher {
            writer: Mutex::new(writer),
            codec,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write + Send> Publisher for StreamPublisher<W> {
    fn publish(&self, mutations: &[Mutation]) -> CResult<()> {
        let mut buf = Vec::new();
        for m in mutations {
            buf.extend(self.codec.encode(m)?);
            buf.push(b'\n');
        }

        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writer
            .write_all(&buf)
            .and_then(|_| writer.flush())
            .map_err(|e| ReError::DestinationErr(format!("publish {} mutations failed: {}", mutations.len(), e)))
    }
}
