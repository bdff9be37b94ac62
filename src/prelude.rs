pub use crate::{
    config::{BufferConfig, ByteOrder},
    diagnostics::{Diagnostics, Severity},
    encoding::{Deserializer, DeserializerExt, Serializer, SerializerExt, StringDeserializer, StringSerializer},
    errors::{Error, Result},
    transport::{BlockSource, MemorySink},
    IoBuffer, ItemHeader, SearchOutcome,
};
pub use bytes::Bytes;
pub use half::f16;
