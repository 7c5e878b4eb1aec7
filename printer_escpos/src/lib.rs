//! ESC/POS receipt-sink adapters.
//!
//! `EscPosSink` drives the thermal printer over its character device;
//! `MuxSink` tees everything into an in-memory capture and treats the
//! device as best-effort, so a missing or dying printer never fails a
//! readout.

pub mod cp1251;

use app_core::{CaptureSink, PrinterError, PrinterResult, ReceiptSink, TextAlign, Underline};
use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
};
use tracing::warn;

/// default device node of the receipt printer
pub const DEFAULT_DEVICE: &str = "/dev/usb/lp0";

const INIT: &[u8] = b"\x1b@\n";
// FS . (leave Kanji mode), then ESC R / ESC t for the cp1251 code page
const CODE_PAGE: &[u8] = b"\x1c\x2e\x1b\x52\x00\x1bt\x17";
const RESET: &[u8] = b"\x1b@\n";

/// ESC/POS byte driver over any writer (the device file in production,
/// a buffer in tests).
pub struct EscPosSink<W: Write + Send> {
    writer: W,
}

impl EscPosSink<File> {
    /// Open the device and run the init/code-page sequence.
    pub fn open(device: impl AsRef<Path>) -> PrinterResult<Self> {
        let device = device.as_ref();
        let file = OpenOptions::new()
            .write(true)
            .open(device)
            .map_err(|e| PrinterError::Unavailable(format!("{}: {e}", device.display())))?;
        Self::on_writer(file)
    }
}

impl<W: Write + Send> EscPosSink<W> {
    pub fn on_writer(writer: W) -> PrinterResult<Self> {
        let mut sink = EscPosSink { writer };
        sink.raw(INIT)?;
        sink.raw(CODE_PAGE)?;
        Ok(sink)
    }

    fn raw(&mut self, bytes: &[u8]) -> PrinterResult<()> {
        self.writer.write_all(bytes)?;
        Ok(())
    }

    /// Reset the printer and hand the writer back (end of session).
    pub fn finish(mut self) -> PrinterResult<W> {
        self.raw(RESET)?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write + Send> ReceiptSink for EscPosSink<W> {
    fn bold_on(&mut self) -> PrinterResult<()> {
        self.raw(b"\x1b\x45\x01")
    }

    fn bold_off(&mut self) -> PrinterResult<()> {
        self.raw(b"\x1b\x45\x00")
    }

    fn underline(&mut self, mode: Underline) -> PrinterResult<()> {
        let code: u8 = match mode {
            Underline::Off => 0,
            Underline::Single => 1,
            Underline::Double => 2,
        };
        self.raw(&[0x1b, b'-', code])
    }

    fn align(&mut self, alignment: TextAlign) -> PrinterResult<()> {
        let code: u8 = match alignment {
            TextAlign::Left => 0,
            TextAlign::Center => 1,
            TextAlign::Right => 2,
        };
        self.raw(&[0x1b, 0x61, code])
    }

    fn text(&mut self, s: &str) -> PrinterResult<()> {
        let encoded = cp1251::encode(s);
        self.raw(&encoded)
    }

    fn feed(&mut self, lines: u8) -> PrinterResult<()> {
        let feed = vec![b'\n'; lines as usize];
        self.raw(&feed)
    }

    fn cut(&mut self) -> PrinterResult<()> {
        self.raw(b"\n\n\n\x1d\x56\x00")
    }
}

/// Capture plus best-effort device. Every call lands in the capture; the
/// device is dropped on its first error and the readout carries on.
pub struct MuxSink {
    capture: CaptureSink,
    device: Option<EscPosSink<File>>,
}

impl MuxSink {
    /// `device` None means capture-only (no printer configured).
    pub fn open(device: Option<&str>) -> Self {
        let device = device.and_then(|path| match EscPosSink::open(path) {
            Ok(sink) => Some(sink),
            Err(e) => {
                warn!(error = %e, path, "printer_unavailable");
                None
            }
        });
        MuxSink {
            capture: CaptureSink::new(),
            device,
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.capture.lines()
    }

    fn on_device(&mut self, op: impl FnOnce(&mut EscPosSink<File>) -> PrinterResult<()>) {
        if let Some(device) = self.device.as_mut()
            && let Err(e) = op(device)
        {
            warn!(error = %e, "printer_write_failed");
            self.device = None;
        }
    }
}

impl ReceiptSink for MuxSink {
    fn bold_on(&mut self) -> PrinterResult<()> {
        self.on_device(|d| d.bold_on());
        self.capture.bold_on()
    }

    fn bold_off(&mut self) -> PrinterResult<()> {
        self.on_device(|d| d.bold_off());
        self.capture.bold_off()
    }

    fn underline(&mut self, mode: Underline) -> PrinterResult<()> {
        self.on_device(|d| d.underline(mode));
        self.capture.underline(mode)
    }

    fn align(&mut self, alignment: TextAlign) -> PrinterResult<()> {
        self.on_device(|d| d.align(alignment));
        self.capture.align(alignment)
    }

    fn text(&mut self, s: &str) -> PrinterResult<()> {
        self.on_device(|d| d.text(s));
        self.capture.text(s)
    }

    fn feed(&mut self, lines: u8) -> PrinterResult<()> {
        self.on_device(|d| d.feed(lines));
        self.capture.feed(lines)
    }

    fn cut(&mut self) -> PrinterResult<()> {
        self.on_device(|d| d.cut());
        self.capture.cut()
    }
}
