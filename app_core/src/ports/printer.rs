// receipt sink port
//
// Receipts and registration slips only ever talk to this capability. The
// hardware ESC/POS driver and the in-memory capture sink both implement it;
// a missing device therefore never reaches the algorithmic core.

use thiserror::Error;

/// underline weight of subsequent text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Underline {
    Off,
    Single,
    Double,
}

/// horizontal alignment of subsequent text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Error)]
pub enum PrinterError {
    /// device could not be opened
    #[error("printer unavailable: {0}")]
    Unavailable(String),

    /// write to an open device failed
    #[error("printer i/o error")]
    Io(#[from] std::io::Error),
}

pub type PrinterResult<T> = Result<T, PrinterError>;

/// receipt sink capability
pub trait ReceiptSink: Send {
    fn bold_on(&mut self) -> PrinterResult<()>;
    fn bold_off(&mut self) -> PrinterResult<()>;
    fn underline(&mut self, mode: Underline) -> PrinterResult<()>;
    fn align(&mut self, alignment: TextAlign) -> PrinterResult<()>;
    fn text(&mut self, s: &str) -> PrinterResult<()>;
    fn feed(&mut self, lines: u8) -> PrinterResult<()>;
    fn cut(&mut self) -> PrinterResult<()>;
    /// Event logo at the top of the strip; sinks without a stored bitmap
    /// print nothing.
    fn logo(&mut self) -> PrinterResult<()> {
        Ok(())
    }
}

/// In-memory sink. Collects everything written through the capability and
/// hands it back as lines; used by tests and as the fallback when no device
/// is configured.
#[derive(Debug, Default)]
pub struct CaptureSink {
    parts: Vec<String>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured text split on newlines. A trailing newline yields a final
    /// empty element, mirroring what the paper strip looks like.
    pub fn lines(&self) -> Vec<String> {
        self.parts
            .concat()
            .split('\n')
            .map(str::to_string)
            .collect()
    }
}

impl ReceiptSink for CaptureSink {
    fn bold_on(&mut self) -> PrinterResult<()> {
        Ok(())
    }
    fn bold_off(&mut self) -> PrinterResult<()> {
        Ok(())
    }
    fn underline(&mut self, _mode: Underline) -> PrinterResult<()> {
        Ok(())
    }
    fn align(&mut self, _alignment: TextAlign) -> PrinterResult<()> {
        Ok(())
    }
    fn text(&mut self, s: &str) -> PrinterResult<()> {
        self.parts.push(s.to_string());
        Ok(())
    }
    fn feed(&mut self, _lines: u8) -> PrinterResult<()> {
        Ok(())
    }
    fn cut(&mut self) -> PrinterResult<()> {
        Ok(())
    }
}
