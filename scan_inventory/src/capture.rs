//! Barcode capture sources.
//!
//! Decoding happens elsewhere (camera library, hardware scanner); the core
//! only ever sees decoded barcode strings. A source is consumed once and
//! cannot be restarted.

use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::mpsc;

/// A lazy stream of decoded barcodes
pub trait BarcodeSource: Send {
    /// Next decoded barcode; `None` once the source is exhausted for good
    fn next_barcode(&mut self) -> impl Future<Output = Option<String>> + Send;
}

/// One barcode per line, as produced by keyboard-wedge scanners or a pipe
///
/// Lines are trimmed; blank lines are skipped. Read errors end the stream.
pub struct LineBarcodeSource<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin + Send> LineBarcodeSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

impl LineBarcodeSource<tokio::io::BufReader<tokio::io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new(tokio::io::BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin + Send> BarcodeSource for LineBarcodeSource<R> {
    async fn next_barcode(&mut self) -> Option<String> {
        loop {
            match self.lines.next_line().await {
                Ok(Some(line)) => {
                    let barcode = line.trim();
                    if !barcode.is_empty() {
                        return Some(barcode.to_string());
                    }
                }
                Ok(None) => return None,
                Err(e) => {
                    log::error!("Barcode input failed: {}", e);
                    return None;
                }
            }
        }
    }
}

/// Barcodes pushed from another task (e.g. a camera callback)
pub struct ChannelBarcodeSource {
    rx: mpsc::Receiver<String>,
}

impl ChannelBarcodeSource {
    /// Source plus the sender a decoder pushes into
    pub fn new(buffer: usize) -> (mpsc::Sender<String>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self { rx })
    }
}

impl BarcodeSource for ChannelBarcodeSource {
    async fn next_barcode(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}
