#![no_std]
#![no_main]

use defmt::{error, info, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_rp::peripherals::UART0;
use embassy_rp::{bind_interrupts, uart};
use embassy_s8_sensor::{IoStream, S8Config, S8Error, S8Sensor, WriteOutcome};
use embassy_time::{Delay, Duration, Timer};
use panic_probe as _;

bind_interrupts!(struct Irqs {
    UART0_IRQ => uart::BufferedInterruptHandler<UART0>;
});

#[embassy_executor::main]
async fn main(_spawner: Spawner) -> ! {
    let p = embassy_rp::init(Default::default());

    let tx = p.PIN_0;
    let rx = p.PIN_1;

    // Configure UART, the S8 talks 9600 8N1
    let mut config = uart::Config::default();
    config.baudrate = 9600;
    let mut tx_buffer = [0u8; 32];
    let mut rx_buffer = [0u8; 32];
    let uart = uart::BufferedUart::new(p.UART0, tx, rx, Irqs, &mut tx_buffer, &mut rx_buffer, config);
    let mut stream: IoStream<_> = IoStream::new(uart);

    // Create sensor instance
    let mut sensor = S8Sensor::new(&mut stream, None, Delay, S8Config::default());
    sensor.begin().await;
    if !sensor.is_initialized() {
        warn!("Sensor did not answer the self-test, continuing anyway");
    }

    match sensor.read_calibration_period().await {
        Ok(hours) if hours != embassy_s8_sensor::frame::ABC_PERIOD_HOURS => {
            match sensor.write_calibration_period().await {
                WriteOutcome::Success => info!("ABC period updated"),
                WriteOutcome::Mismatch { echo } => error!("ABC period update rejected: {:?}", echo),
                WriteOutcome::CommunicationError(e) => error!("ABC period update failed: {:?}", e),
            }
        }
        Ok(hours) => info!("ABC period: {} h", hours),
        Err(e) => error!("Could not read ABC period: {:?}", e),
    }

    // Read sensor data
    loop {
        match sensor.read_concentration().await {
            Ok(co2) => info!("CO2: {} ppm", co2),
            Err(e) => match e {
                S8Error::NoResponse => error!("No response"),
                S8Error::IncompleteResponse { received } => error!("Response cut after {} bytes", received),
                S8Error::HeaderMismatch { .. } => error!("Unexpected reply"),
                S8Error::ChecksumMismatch { .. } => error!("Checksum error"),
                S8Error::SerialError => error!("UART error"),
            },
        }

        Timer::after(Duration::from_secs(1)).await;
    }
}
