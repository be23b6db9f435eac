use std::collections::HashMap;
use crate::{Error, Result};
use crate::amf::{Amf0Decoder, Amf0Encoder, Amf0Value};
use crate::ByteBuffer;

/// Decoded view of one command-message payload.
///
/// Only the name and transaction id are required; the command object and
/// arguments are parsed best-effort and kept for completeness.
#[derive(Debug, Clone)]
pub struct Command {
    pub name: String,
    pub transaction_id: f64,
    pub command_object: Option<Amf0Value>,
    pub arguments: Vec<Amf0Value>,
}

impl Command {
    /// Create new command
    pub fn new(name: String, transaction_id: f64) -> Self {
        Command {
            name,
            transaction_id,
            command_object: None,
            arguments: Vec::new(),
        }
    }

    /// Build the `_result` reply for `connect`
    pub fn connect_result(transaction_id: f64) -> Self {
        let mut props = HashMap::new();
        props.insert("fmsVer".to_string(), Amf0Value::String("FMS/4,5,0".to_string()));
        props.insert("capabilities".to_string(), Amf0Value::Number(31.0));

        let mut info = HashMap::new();
        info.insert("level".to_string(), Amf0Value::String("status".to_string()));
        info.insert(
            "code".to_string(),
            Amf0Value::String("NetConnection.Connect.Success".to_string()),
        );

        let mut cmd = Command::new("_result".to_string(), transaction_id);
        cmd.command_object = Some(Amf0Value::Object(props));
        cmd.arguments.push(Amf0Value::Object(info));
        cmd
    }

    /// Build the `_result` reply for `createStream`
    pub fn create_stream_result(transaction_id: f64, stream_id: u32) -> Self {
        let mut cmd = Command::new("_result".to_string(), transaction_id);
        cmd.command_object = Some(Amf0Value::Null);
        cmd.arguments.push(Amf0Value::Number(stream_id as f64));
        cmd
    }

    /// Build an `onStatus` notification
    pub fn on_status(level: &str, code: &str) -> Self {
        let mut info = HashMap::new();
        info.insert("level".to_string(), Amf0Value::String(level.to_string()));
        info.insert("code".to_string(), Amf0Value::String(code.to_string()));

        let mut cmd = Command::new("onStatus".to_string(), 0.0);
        cmd.command_object = Some(Amf0Value::Null);
        cmd.arguments.push(Amf0Value::Object(info));
        cmd
    }

    /// Encode command to a message payload
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut encoder = Amf0Encoder::new();

        encoder.encode(&Amf0Value::String(self.name.clone()))?;
        encoder.encode(&Amf0Value::Number(self.transaction_id))?;

        if let Some(ref obj) = self.command_object {
            encoder.encode(obj)?;
        } else {
            encoder.encode(&Amf0Value::Null)?;
        }

        for arg in &self.arguments {
            encoder.encode(arg)?;
        }

        Ok(encoder.get_bytes())
    }

    /// Decode a command from a message payload.
    ///
    /// The payload must open with string(name) followed by number(transaction
    /// id); anything after that is optional and decoded until the first
    /// unreadable value.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut buffer = ByteBuffer::new(data.to_vec());
        let mut decoder = Amf0Decoder::new(&mut buffer);

        let name = decoder
            .decode()?
            .as_string()
            .ok_or_else(|| Error::amf_decode("Command name must be a string"))?
            .to_string();

        let transaction_id = decoder
            .decode()?
            .as_number()
            .ok_or_else(|| Error::amf_decode("Transaction ID must be a number"))?;

        let mut trailing = Vec::new();
        while decoder.has_remaining() {
            match decoder.decode() {
                Ok(value) => trailing.push(value),
                Err(_) => break,
            }
        }

        let mut trailing = trailing.into_iter();
        let command_object = trailing.next();
        let arguments = trailing.collect();

        Ok(Command {
            name,
            transaction_id,
            command_object,
            arguments,
        })
    }
}
