use core::fmt;

use embedded_hal_async::delay::DelayNs;

use crate::fmt::DebugFormat;
use crate::frame::{
    self, READ_ABC_PERIOD_REQUEST, READ_CO2_REQUEST, READ_RESPONSE_LEN, REQUEST_LEN,
    WRITE_ABC_PERIOD_COMMAND, WRITE_RESPONSE_LEN,
};
use crate::{S8Config, S8Error, SerialStream, WriteOutcome};

/// Senseair S8 attached to a serial stream.
///
/// Every operation is one request/response exchange. The stream must not be
/// used by anyone else while an operation is in flight.
pub struct S8Sensor<'a, S: SerialStream, D: DelayNs> {
    stream: &'a mut S,
    diagnostics: Option<&'a mut dyn fmt::Write>,
    delay: D,
    config: S8Config,
    initialized: bool,
}

impl<'a, S: SerialStream, D: DelayNs> S8Sensor<'a, S, D> {
    /// `diagnostics` receives one line per notable event when `config.debug` is set.
    pub fn new(
        stream: &'a mut S,
        diagnostics: Option<&'a mut dyn fmt::Write>,
        delay: D,
        config: S8Config,
    ) -> Self {
        Self {
            stream,
            diagnostics,
            delay,
            config,
            initialized: false,
        }
    }

    /// Self-test: one concentration read. The outcome is only reported, see
    /// [`S8Sensor::is_initialized`].
    pub async fn begin(&mut self) {
        info!("Initializing S8 sensor");
        self.report(format_args!("Initializing CO2..."));

        match self.read_concentration().await {
            Ok(co2) => {
                info!("S8 sensor ready, CO2: {} ppm", co2);
                self.initialized = true;
                self.report(format_args!("CO2 Successfully Initialized"));
            }
            Err(e) => {
                error!("S8 sensor self-test failed: {:?}", e);
                self.initialized = false;
                self.report(format_args!("CO2 Sensor Failed to Initialize"));
            }
        }
    }

    /// Whether the last [`S8Sensor::begin`] got a valid reading.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// CO2 concentration in ppm.
    pub async fn read_concentration(&mut self) -> Result<u16, S8Error> {
        self.read_register(&READ_CO2_REQUEST, "CO2").await
    }

    /// ABC (automatic baseline correction) period in hours.
    pub async fn read_calibration_period(&mut self) -> Result<u16, S8Error> {
        self.read_register(&READ_ABC_PERIOD_REQUEST, "ABC period").await
    }

    /// Sets the ABC period to [`frame::ABC_PERIOD_HOURS`].
    pub async fn write_calibration_period(&mut self) -> WriteOutcome {
        match self
            .exchange::<WRITE_RESPONSE_LEN>(&WRITE_ABC_PERIOD_COMMAND)
            .await
        {
            Ok(echo) if echo == WRITE_ABC_PERIOD_COMMAND => {
                info!("ABC period set to {} h", frame::ABC_PERIOD_HOURS);
                WriteOutcome::Success
            }
            Ok(echo) => {
                warn!("ABC period update not echoed: {:?}", echo);
                self.report(format_args!("ABC period update rejected: {echo:02x?}"));
                WriteOutcome::Mismatch { echo }
            }
            Err(e) => {
                warn!("ABC period update failed: {:?}", e);
                self.report(format_args!("ABC period update failed: {e}"));
                WriteOutcome::CommunicationError(e)
            }
        }
    }

    async fn read_register(
        &mut self,
        request: &[u8; REQUEST_LEN],
        what: &str,
    ) -> Result<u16, S8Error> {
        let result = self
            .exchange::<READ_RESPONSE_LEN>(request)
            .await
            .and_then(|response| frame::decode_register(&response));

        match &result {
            Ok(value) => debug!("{} register: {}", what, value),
            Err(e) => {
                warn!("{} read failed: {:?}", what, e);
                self.report(format_args!("{what} read failed: {e}"));
            }
        }
        result
    }

    /// Sends `request` until the sensor starts answering, then collects an
    /// `N` byte reply whose header matches the request.
    async fn exchange<const N: usize>(
        &mut self,
        request: &[u8; REQUEST_LEN],
    ) -> Result<[u8; N], S8Error> {
        let mut step = ExchangeStep::Idle;
        loop {
            step = match step {
                ExchangeStep::Idle => {
                    trace!("Exchange Step: Idle -> AwaitingFirstByte");
                    ExchangeStep::AwaitingFirstByte { attempts: 0 }
                }
                ExchangeStep::AwaitingFirstByte { attempts } => {
                    if self.stream.available() > 0 {
                        trace!("Exchange Step: AwaitingFirstByte -> AwaitingFullFrame");
                        ExchangeStep::AwaitingFullFrame { checks: 0 }
                    } else if attempts >= self.config.transmit_attempts {
                        return Err(S8Error::NoResponse);
                    } else {
                        self.stream.write(request).await.map_err(|e| {
                            error!("Serial write failed: {:?}", DebugFormat(&e));
                            S8Error::SerialError
                        })?;
                        self.pause().await;
                        ExchangeStep::AwaitingFirstByte {
                            attempts: attempts + 1,
                        }
                    }
                }
                ExchangeStep::AwaitingFullFrame { checks } => {
                    if self.stream.available() >= N {
                        trace!("Exchange Step: AwaitingFullFrame -> Decoding");
                        ExchangeStep::Decoding
                    } else if checks >= self.config.response_checks {
                        // A partial frame cannot be resynchronised; start the
                        // next exchange from an empty buffer.
                        let mut discarded = 0usize;
                        while self.stream.read().is_some() {
                            discarded += 1;
                        }
                        warn!("Response timed out, discarded {} bytes", discarded);
                        ExchangeStep::Decoding
                    } else {
                        self.pause().await;
                        ExchangeStep::AwaitingFullFrame { checks: checks + 1 }
                    }
                }
                ExchangeStep::Decoding => {
                    let mut response = [0u8; N];
                    for (received, slot) in response.iter_mut().enumerate() {
                        *slot = self
                            .stream
                            .read()
                            .ok_or(S8Error::IncompleteResponse { received })?;
                    }
                    trace!("Received response: {:?}", response);
                    frame::check_header(request, &response)?;
                    return Ok(response);
                }
            }
        }
    }

    async fn pause(&mut self) {
        let us = u32::try_from(self.config.poll_interval.as_micros()).unwrap_or(u32::MAX);
        self.delay.delay_us(us).await;
    }

    fn report(&mut self, line: fmt::Arguments<'_>) {
        if !self.config.debug {
            return;
        }
        if let Some(out) = self.diagnostics.as_deref_mut() {
            // Best effort; a failing sink must not change the exchange.
            let _ = out.write_fmt(line);
            let _ = out.write_char('\n');
        }
    }
}

enum ExchangeStep {
    Idle,
    AwaitingFirstByte { attempts: u8 },
    AwaitingFullFrame { checks: u8 },
    Decoding,
}
