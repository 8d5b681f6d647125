use embedded_io::{Read, ReadReady};
use embedded_io_async::Write;

use crate::fmt::DebugFormat;
use crate::frame::WRITE_RESPONSE_LEN;

/// Byte stream the sensor is attached to.
#[allow(async_fn_in_trait)]
pub trait SerialStream {
    type Error: core::fmt::Debug;

    /// Number of received bytes that can be read without waiting.
    fn available(&mut self) -> usize;

    async fn write(&mut self, frame: &[u8]) -> Result<(), Self::Error>;

    /// Next received byte, or `None` when nothing is buffered.
    fn read(&mut self) -> Option<u8>;
}

/// [`SerialStream`] over an `embedded-io` port such as embassy's `BufferedUart`.
///
/// Ready bytes are staged in an `N` byte buffer so they can be counted before
/// they are consumed. `N` must hold at least one full response; smaller
/// buffers are rejected at compile time.
pub struct IoStream<P, const N: usize = 16> {
    port: P,
    buf: [u8; N],
    start: usize,
    end: usize,
}

impl<P, const N: usize> IoStream<P, N>
where
    P: Read + ReadReady + Write,
{
    pub fn new(port: P) -> Self {
        const {
            assert!(
                N >= WRITE_RESPONSE_LEN,
                "IoStream buffer must hold a full sensor response"
            )
        };
        Self {
            port,
            buf: [0; N],
            start: 0,
            end: 0,
        }
    }

    pub fn into_inner(self) -> P {
        self.port
    }

    fn fill(&mut self) {
        if self.start > 0 {
            self.buf.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }
        while self.end < N {
            match self.port.read_ready() {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    warn!("Port readiness check failed: {:?}", DebugFormat(&e));
                    break;
                }
            }
            match self.port.read(&mut self.buf[self.end..]) {
                Ok(0) => break,
                Ok(n) => self.end += n,
                Err(e) => {
                    warn!("Port read failed: {:?}", DebugFormat(&e));
                    break;
                }
            }
        }
    }
}

impl<P, const N: usize> SerialStream for IoStream<P, N>
where
    P: Read + ReadReady + Write,
{
    type Error = P::Error;

    fn available(&mut self) -> usize {
        self.fill();
        self.end - self.start
    }

    async fn write(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        self.port.write_all(frame).await?;
        self.port.flush().await
    }

    fn read(&mut self) -> Option<u8> {
        if self.start == self.end {
            self.fill();
        }
        if self.start == self.end {
            return None;
        }
        let byte = self.buf[self.start];
        self.start += 1;
        Some(byte)
    }
}
