//! Raspberry Pi GPIO drivers (`rppal`).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rppal::gpio::{Gpio, InputPin, Level, OutputPin, Trigger};
use tracing::{debug, info};

use super::PulseMapping;
use crate::actuator::{ActuatorChannel, ActuatorDriver};
use crate::config::{ActuatorConfig, ReceiverConfig, SafetyConfig};
use crate::error::{HelmError, Result};
use crate::input::{EstopButton, PulseSource, ReceiverChannel};

/// Longest high time accepted as a receiver pulse; anything longer is noise
const MAX_RECEIVER_PULSE_US: u64 = 3000;

/// Marks "no rising edge seen yet"
const NO_EDGE: u64 = u64::MAX;

/// Servo and ESC outputs on software PWM
pub struct RpiActuators {
    pins: HashMap<ActuatorChannel, OutputPin>,
    mapping: PulseMapping,
}

impl RpiActuators {
    /// Claims the four output pins.
    ///
    /// Outputs stay idle (no pulses) until the first write.
    pub fn new(gpio: &Gpio, config: &ActuatorConfig) -> Result<Self> {
        let mut pins = HashMap::new();
        for (channel, pin) in [
            (ActuatorChannel::FrontServo, config.front_servo_pin),
            (ActuatorChannel::FrontThrust, config.front_thrust_pin),
            (ActuatorChannel::BackServo, config.back_servo_pin),
            (ActuatorChannel::BackThrust, config.back_thrust_pin),
        ] {
            pins.insert(channel, gpio.get(pin)?.into_output_low());
            debug!("{:?} on GPIO {}", channel, pin);
        }

        Ok(Self {
            pins,
            mapping: PulseMapping::from_config(config),
        })
    }
}

impl ActuatorDriver for RpiActuators {
    fn write(&mut self, channel: ActuatorChannel, value: f32) -> Result<()> {
        let pulse = self.mapping.pulse_for(channel, value);
        let pin = self
            .pins
            .get_mut(&channel)
            .ok_or_else(|| HelmError::Actuator(format!("{:?} not configured", channel)))?;
        pin.set_pwm(self.mapping.period, pulse)?;
        Ok(())
    }
}

/// E-stop button on a pull-down biased input
pub struct RpiEstopButton {
    pin: InputPin,
}

impl RpiEstopButton {
    pub fn new(gpio: &Gpio, config: &SafetyConfig) -> Result<Self> {
        let pin = gpio.get(config.estop_pin)?.into_input_pulldown();
        info!("E-stop button on GPIO {}", config.estop_pin);
        Ok(Self { pin })
    }
}

impl EstopButton for RpiEstopButton {
    fn is_asserted(&self) -> bool {
        self.pin.is_low()
    }
}

/// Edge timestamps for one receiver channel, in microseconds since the
/// owning [`RpiPulseInput`] was created.
#[derive(Debug)]
struct PulseTiming {
    rise_us: AtomicU64,
    width_us: AtomicU64,
    last_edge_us: AtomicU64,
}

impl PulseTiming {
    fn new() -> Self {
        Self {
            rise_us: AtomicU64::new(NO_EDGE),
            width_us: AtomicU64::new(0),
            last_edge_us: AtomicU64::new(NO_EDGE),
        }
    }

    fn on_edge(&self, level: Level, now_us: u64) {
        match level {
            Level::High => self.rise_us.store(now_us, Ordering::Relaxed),
            Level::Low => {
                let rise = self.rise_us.load(Ordering::Relaxed);
                if rise != NO_EDGE {
                    let width = now_us.saturating_sub(rise);
                    if width <= MAX_RECEIVER_PULSE_US {
                        self.width_us.store(width, Ordering::Relaxed);
                    }
                }
            }
        }
        self.last_edge_us.store(now_us, Ordering::Release);
    }

    fn width(&self, now_us: u64, timeout_us: u64) -> Duration {
        let last = self.last_edge_us.load(Ordering::Acquire);
        if last == NO_EDGE || now_us.saturating_sub(last) > timeout_us {
            return Duration::ZERO;
        }
        Duration::from_micros(self.width_us.load(Ordering::Relaxed))
    }
}

/// Receiver pulse widths measured with GPIO edge interrupts.
///
/// A channel with no edge for the signal timeout reads as zero width.
pub struct RpiPulseInput {
    _pins: Vec<InputPin>,
    timings: HashMap<ReceiverChannel, Arc<PulseTiming>>,
    epoch: Instant,
    timeout_us: u64,
}

impl RpiPulseInput {
    pub fn new(gpio: &Gpio, config: &ReceiverConfig) -> Result<Self> {
        let epoch = Instant::now();
        let mut pins = Vec::with_capacity(ReceiverChannel::ALL.len());
        let mut timings = HashMap::new();

        for (channel, pin_num) in [
            (ReceiverChannel::Throttle, config.throttle_pin),
            (ReceiverChannel::Elevation, config.elevation_pin),
            (ReceiverChannel::Aileron, config.aileron_pin),
            (ReceiverChannel::Rudder, config.rudder_pin),
            (ReceiverChannel::SourceSelect, config.source_select_pin),
            (ReceiverChannel::RemoteStop, config.remote_stop_pin),
        ] {
            let timing = Arc::new(PulseTiming::new());
            let mut pin = gpio.get(pin_num)?.into_input_pulldown();

            let edge_timing = Arc::clone(&timing);
            pin.set_async_interrupt(Trigger::Both, move |level| {
                edge_timing.on_edge(level, epoch.elapsed().as_micros() as u64);
            })?;

            debug!("Receiver {:?} on GPIO {}", channel, pin_num);
            pins.push(pin);
            timings.insert(channel, timing);
        }

        info!("Receiver inputs armed ({} channels)", pins.len());

        Ok(Self {
            _pins: pins,
            timings,
            epoch,
            timeout_us: config.signal_timeout_ms * 1000,
        })
    }
}

impl PulseSource for RpiPulseInput {
    fn pulse_width(&self, channel: ReceiverChannel) -> Duration {
        let now_us = self.epoch.elapsed().as_micros() as u64;
        self.timings
            .get(&channel)
            .map_or(Duration::ZERO, |timing| timing.width(now_us, self.timeout_us))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT_US: u64 = 100_000;

    #[test]
    fn test_pulse_timing_measures_high_time() {
        let timing = PulseTiming::new();
        timing.on_edge(Level::High, 10_000);
        timing.on_edge(Level::Low, 11_500);
        assert_eq!(timing.width(12_000, TIMEOUT_US), Duration::from_micros(1500));
    }

    #[test]
    fn test_pulse_timing_silent_channel_is_zero() {
        let timing = PulseTiming::new();
        assert_eq!(timing.width(0, TIMEOUT_US), Duration::ZERO);

        timing.on_edge(Level::High, 10_000);
        timing.on_edge(Level::Low, 11_500);
        assert_eq!(timing.width(11_500 + TIMEOUT_US + 1, TIMEOUT_US), Duration::ZERO);
    }

    #[test]
    fn test_pulse_timing_ignores_glitches() {
        let timing = PulseTiming::new();
        timing.on_edge(Level::High, 0);
        timing.on_edge(Level::Low, 1200);
        // Missed falling edge: high time spans a whole frame
        timing.on_edge(Level::High, 20_000);
        timing.on_edge(Level::Low, 38_000);
        assert_eq!(timing.width(38_000, TIMEOUT_US), Duration::from_micros(1200));
    }

    #[test]
    fn test_pulse_timing_falling_edge_first() {
        let timing = PulseTiming::new();
        timing.on_edge(Level::Low, 500);
        assert_eq!(timing.width(600, TIMEOUT_US), Duration::ZERO);
    }

    #[test]
    #[ignore] // Requires Raspberry Pi GPIO
    fn test_rpi_estop_button() {
        let gpio = Gpio::new().unwrap();
        let button = RpiEstopButton::new(&gpio, &SafetyConfig::default()).unwrap();
        let _ = button.is_asserted();
    }
}
