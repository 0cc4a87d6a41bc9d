use binlog::mutation::Mutation;
use common::err::CResult;
use common::err::decode_error::ReError;

/// 编解码
pub trait Codec: Send + Sync {
    /// 实例类型名称
    fn name(&self) -> String;

    fn encode(&self, mutation: &Mutation) -> CResult<Vec<u8>>;

    /// Decode failures surface as `ReError::DeserializationErr`.
    fn decode(&self, data: &[u8]) -> CResult<Mutation>;
}

#[derive(Debug, Clone, Default)]
pub struct JsonCodec {}

impl JsonCodec {
    pub fn new() -> Self {
        JsonCodec {}
    }
}

impl Codec for JsonCodec {
    fn name(&self) -> String {
        String::from("JsonCodec")
    }

    fn encode(&self, mutation: &Mutation) -> CResult<Vec<u8>> {
        Ok(serde_json::to_vec(mutation)?)
    }

    fn decode(&self, data: &[u8]) -> CResult<Mutation> {
        serde_json::from_slice(data)
            .map_err(|e| ReError::deserialization(format!("{} failed to decode mutation", self.name()), e))
    }
}
