//! Per-node contexts handed to compiled nodes on every firing.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

use crate::error::ProcessingError;
use crate::memory::ProcessorMemory;

/// A shareable line-oriented output channel.
#[derive(Clone)]
pub struct OutputStream {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl OutputStream {
    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    pub fn stderr() -> Self {
        Self::from_writer(io::stderr())
    }

    pub fn sink() -> Self {
        Self::from_writer(io::sink())
    }

    /// Writes `line` followed by a newline. Write failures are logged, not raised.
    pub fn println(&self, line: impl fmt::Display) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
            warn!("Failed to write to output stream: {}", e);
        }
    }
}

impl fmt::Debug for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OutputStream")
    }
}

/// In-memory writer whose contents can be read back, for capturing node output.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stream(&self) -> OutputStream {
        OutputStream::from_writer(self.clone())
    }

    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Everything a processor sees besides the events of one firing.
pub struct ProcessorContext {
    node: String,
    pub out: OutputStream,
    pub err: OutputStream,
    memory: Option<ProcessorMemory>,
}

impl ProcessorContext {
    pub fn new(
        node: impl Into<String>,
        out: OutputStream,
        err: OutputStream,
        memory: Option<ProcessorMemory>,
    ) -> Self {
        Self {
            node: node.into(),
            out,
            err,
            memory,
        }
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn has_memory(&self) -> bool {
        self.memory.is_some()
    }

    pub fn memory(&mut self) -> Result<&mut ProcessorMemory, ProcessingError> {
        let node = &self.node;
        self.memory
            .as_mut()
            .ok_or_else(|| ProcessingError::NoMemory { node: node.clone() })
    }
}

pub struct SinkContext {
    node: String,
    pub out: OutputStream,
    pub err: OutputStream,
}

impl SinkContext {
    pub fn new(node: impl Into<String>, out: OutputStream, err: OutputStream) -> Self {
        Self {
            node: node.into(),
            out,
            err,
        }
    }

    pub fn node(&self) -> &str {
        &self.node
    }
}
