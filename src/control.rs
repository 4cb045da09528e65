//! # Control Loop
//!
//! The fixed-rate cycle that ties everything together:
//!
//! 1. Sample the E-stop button and all receiver channels once
//! 2. Take the newest autonomy command, if one arrived
//! 3. Let the [`Arbiter`] decide
//! 4. Write the actuators, then the indicator tower when the rate limit allows
//! 5. Record telemetry on mode changes and at the telemetry interval
//!
//! Nothing in a cycle is fatal. Actuator, indicator and telemetry failures are
//! logged and the next cycle runs as usual.

use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::actuator::{ActuatorCommand, ActuatorDriver, OutputStage};
use crate::arbiter::{Arbiter, ArbiterConfig, Decision, Mode};
use crate::config::Config;
use crate::error::Result;
use crate::indicator::{IndicatorColor, IndicatorFrame, IndicatorScheduler, IndicatorState};
use crate::input::{EstopButton, PulseSource, RcSnapshot, SafetyInputs};
use crate::link::CommandSubscriber;
use crate::serial::{IndicatorLink, SerialPortIO};
use crate::telemetry::{TelemetryEvent, TelemetryRecord, TelemetrySender};

/// Cycles between status log lines (10 s at the default 200 Hz)
const STATUS_LOG_CYCLES: u64 = 2000;

/// Everything the loop reads each cycle
pub struct ControlInputs {
    pub button: Box<dyn EstopButton>,
    pub receiver: Box<dyn PulseSource>,
    pub commands: CommandSubscriber,
}

/// What one cycle did
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub decision: Decision,
    /// Setpoints actually written, `None` if a driver write failed
    pub written: Option<ActuatorCommand>,
    /// Indicator frame due this cycle
    pub frame: Option<IndicatorFrame>,
    pub mode_changed: bool,
}

pub struct ControlLoop<A: ActuatorDriver, P: SerialPortIO> {
    inputs: ControlInputs,
    arbiter: Arbiter,
    output: OutputStage<A>,
    indicator: IndicatorLink<P>,
    scheduler: IndicatorScheduler,
    telemetry: Option<TelemetrySender>,
    telemetry_interval: Duration,
    last_telemetry: Option<Instant>,
    mode: Option<Mode>,
    cycle_period: Duration,
    cycles: u64,
    actuator_failing: bool,
    telemetry_failing: bool,
}

impl<A: ActuatorDriver, P: SerialPortIO> ControlLoop<A, P> {
    /// Builds the loop around a calibrated output stage.
    pub fn new(
        config: &Config,
        inputs: ControlInputs,
        output: OutputStage<A>,
        indicator: IndicatorLink<P>,
    ) -> Self {
        Self {
            inputs,
            arbiter: Arbiter::new(ArbiterConfig::from(&config.safety)),
            output,
            indicator,
            scheduler: IndicatorScheduler::new(Duration::from_millis(
                config.indicator.update_interval_ms,
            )),
            telemetry: None,
            telemetry_interval: Duration::from_millis(config.telemetry.log_interval_ms),
            last_telemetry: None,
            mode: None,
            cycle_period: config.control.cycle_period(),
            cycles: 0,
            actuator_failing: false,
            telemetry_failing: false,
        }
    }

    /// Enables telemetry recording through a writer started with
    /// [`crate::telemetry::spawn_writer`]
    #[must_use]
    pub fn with_telemetry(mut self, sender: TelemetrySender) -> Self {
        self.telemetry = Some(sender);
        self
    }

    pub fn arbiter(&self) -> &Arbiter {
        &self.arbiter
    }

    /// Runs one control cycle at `now`.
    ///
    /// Does not transmit the indicator frame; the caller sends
    /// [`CycleReport::frame`] if present.
    pub fn step(&mut self, now: Instant) -> CycleReport {
        let button_asserted = self.inputs.button.is_asserted();
        let rc = RcSnapshot::sample(self.inputs.receiver.as_ref());
        let safety = SafetyInputs::new(button_asserted, &rc);
        let new_command = self.inputs.commands.take_new();

        let decision = self.arbiter.cycle(&rc, &safety, new_command, now);
        self.cycles += 1;

        let mode_changed = self.mode != Some(decision.mode);
        if mode_changed {
            match self.mode {
                Some(previous) => info!("Mode {} -> {}", previous, decision.mode),
                None => info!("Initial mode: {}", decision.mode),
            }
            if decision.mode == Mode::AutoStale {
                warn!(
                    "No autonomy command for {:?} (timeout {:?})",
                    self.arbiter.freshness().since_update(now),
                    self.arbiter.freshness().timeout()
                );
            }
            self.mode = Some(decision.mode);
        }

        let written = self.write_outputs(&decision.command);
        let frame = self.scheduler.poll(&decision.indicator, now);
        self.record_telemetry(&decision, mode_changed, now);

        if self.cycles % STATUS_LOG_CYCLES == 0 {
            info!(
                "{} cycles, mode {}, {} cycles since last autonomy command",
                self.cycles,
                decision.mode,
                self.arbiter.freshness().cycles_since_update()
            );
        }

        CycleReport {
            decision,
            written,
            frame,
            mode_changed,
        }
    }

    /// Runs the loop until `shutdown` completes, then stops the thrusters.
    ///
    /// The tower is switched off once before the first cycle; the rate
    /// limiter counts from that frame.
    ///
    /// # Errors
    ///
    /// Returns an error only if the final safe-stop write fails.
    pub async fn run<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        if let Some(frame) = self.scheduler.poll(&IndicatorState::OFF, Instant::now()) {
            self.send_indicator(&frame).await;
        }

        let mut ticker = interval(self.cycle_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Control loop running every {:?}", self.cycle_period);

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown requested after {} cycles", self.cycles);
                    break;
                }

                _ = ticker.tick() => {
                    let report = self.step(Instant::now());
                    if let Some(frame) = report.frame {
                        self.send_indicator(&frame).await;
                    }
                }
            }
        }

        self.safe_stop().await
    }

    /// Holds steering, sets thrust to still and shows red if the tower may
    /// be refreshed.
    ///
    /// # Errors
    ///
    /// Returns the actuator write error, after the indicator has been
    /// attempted.
    pub async fn safe_stop(&mut self) -> Result<()> {
        let still = self
            .arbiter
            .last_command()
            .with_thrust(self.arbiter.config().thrust_still);
        let result = self.output.apply(&still);

        let red = IndicatorState::new(IndicatorColor::Red, 100.0);
        match self.scheduler.poll(&red, Instant::now()) {
            Some(frame) => self.send_indicator(&frame).await,
            None => debug!("Skipping final indicator frame (rate limit)"),
        }

        match &result {
            Ok(_) => info!("Thrusters stopped"),
            Err(e) => warn!("Failed to stop thrusters: {}", e),
        }
        result.map(|_| ())
    }

    fn write_outputs(&mut self, command: &ActuatorCommand) -> Option<ActuatorCommand> {
        match self.output.apply(command) {
            Ok(written) => {
                if self.actuator_failing {
                    info!("Actuator writes recovered");
                    self.actuator_failing = false;
                }
                Some(written)
            }
            Err(e) => {
                if !self.actuator_failing {
                    warn!("Actuator write failed: {}", e);
                    self.actuator_failing = true;
                }
                None
            }
        }
    }

    async fn send_indicator(&mut self, frame: &IndicatorFrame) {
        if let Err(e) = self.indicator.send_frame(frame).await {
            warn!("Indicator update failed: {}", e);
        }
    }

    fn record_telemetry(&mut self, decision: &Decision, mode_changed: bool, now: Instant) {
        let Some(sender) = self.telemetry.as_ref() else {
            return;
        };

        let event = if mode_changed {
            TelemetryEvent::ModeChange
        } else {
            match self.last_telemetry {
                Some(last) if now.saturating_duration_since(last) < self.telemetry_interval => {
                    return
                }
                _ => TelemetryEvent::Periodic,
            }
        };

        let freshness = self.arbiter.freshness();
        let record = TelemetryRecord::new(
            event,
            decision,
            freshness.cycles_since_update(),
            freshness.since_update(now),
        );

        match sender.try_record(record) {
            Ok(()) => self.telemetry_failing = false,
            Err(e) if !self.telemetry_failing => {
                warn!("Telemetry record dropped: {}", e);
                self.telemetry_failing = true;
            }
            Err(_) => {}
        }
        self.last_telemetry = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::mocks::RecordingDriver;
    use crate::actuator::{ActuatorChannel, CalibrationSequence, Uncalibrated};
    use crate::arbiter::StopCause;
    use crate::indicator::encode_indicator_frame;
    use crate::input::{MockEstopButton, ReceiverChannel};
    use crate::link::{command_channel, AutonomyCommand, CommandPublisher};
    use crate::serial::port_trait::mocks::MockSerialPort;
    use crate::telemetry::{spawn_writer, TelemetryLogger};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    #[derive(Clone, Default)]
    struct FakeButton(Arc<AtomicBool>);

    impl EstopButton for FakeButton {
        fn is_asserted(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[derive(Clone, Default)]
    struct FakeReceiver(Arc<Mutex<HashMap<ReceiverChannel, Duration>>>);

    impl FakeReceiver {
        fn set(&self, channel: ReceiverChannel, micros: u64) {
            self.0
                .lock()
                .unwrap()
                .insert(channel, Duration::from_micros(micros));
        }

        /// Run switch on; source select high for RC, low for autonomy
        fn rc_mode(&self) {
            self.set(ReceiverChannel::RemoteStop, 1900);
            self.set(ReceiverChannel::SourceSelect, 1900);
            self.set(ReceiverChannel::Elevation, 1700);
            self.set(ReceiverChannel::Aileron, 1600);
            self.set(ReceiverChannel::Rudder, 1300);
        }

        fn auto_mode(&self) {
            self.set(ReceiverChannel::RemoteStop, 1900);
            self.set(ReceiverChannel::SourceSelect, 1100);
        }
    }

    impl PulseSource for FakeReceiver {
        fn pulse_width(&self, channel: ReceiverChannel) -> Duration {
            self.0
                .lock()
                .unwrap()
                .get(&channel)
                .copied()
                .unwrap_or(Duration::ZERO)
        }
    }

    struct Rig {
        control: ControlLoop<RecordingDriver, MockSerialPort>,
        driver: RecordingDriver,
        port: MockSerialPort,
        button: FakeButton,
        receiver: FakeReceiver,
        publisher: CommandPublisher,
    }

    async fn rig(config: &Config) -> Rig {
        let driver = RecordingDriver::new();
        let output = Uncalibrated::new(driver.clone())
            .calibrate(&CalibrationSequence::from_config(config))
            .await
            .unwrap();
        driver.clear();

        let port = MockSerialPort::new();
        let button = FakeButton::default();
        let receiver = FakeReceiver::default();
        let (publisher, commands) = command_channel();

        let inputs = ControlInputs {
            button: Box::new(button.clone()),
            receiver: Box::new(receiver.clone()),
            commands,
        };
        let control = ControlLoop::new(
            config,
            inputs,
            output,
            IndicatorLink::new(port.clone(), "/dev/mock"),
        );

        Rig {
            control,
            driver,
            port,
            button,
            receiver,
            publisher,
        }
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[tokio::test(start_paused = true)]
    async fn test_receiver_off_at_startup() {
        let mut rig = rig(&Config::default()).await;

        let report = rig.control.step(Instant::now());
        assert_eq!(report.decision.mode, Mode::HardStop(StopCause::ReceiverOff));
        assert!(report.mode_changed);
        assert_eq!(report.written, Some(ActuatorCommand::neutral(0.46)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rc_cycle_writes_actuators() {
        let mut rig = rig(&Config::default()).await;
        rig.receiver.rc_mode();

        let report = rig.control.step(Instant::now());
        assert_eq!(report.decision.mode, Mode::Rc);

        let front_thrust = rig.driver.last(ActuatorChannel::FrontThrust).unwrap();
        let back_thrust = rig.driver.last(ActuatorChannel::BackThrust).unwrap();
        let back_steer = rig.driver.last(ActuatorChannel::BackServo).unwrap();
        assert!(approx(front_thrust, 0.56));
        assert!(approx(back_thrust, 0.66));
        assert!(approx(back_steer, 0.3));
        assert_eq!(rig.driver.last(ActuatorChannel::FrontServo), Some(0.5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_button_forces_stop() {
        let mut rig = rig(&Config::default()).await;
        rig.receiver.rc_mode();
        rig.control.step(Instant::now());

        rig.button.0.store(true, Ordering::SeqCst);
        let report = rig.control.step(Instant::now());

        assert_eq!(report.decision.mode, Mode::HardStop(StopCause::Button));
        assert!(report.mode_changed);
        assert_eq!(rig.driver.last(ActuatorChannel::FrontThrust), Some(0.46));
        assert_eq!(rig.driver.last(ActuatorChannel::BackThrust), Some(0.46));
    }

    #[tokio::test(start_paused = true)]
    async fn test_indicator_rate_limited() {
        let mut rig = rig(&Config::default()).await;
        rig.receiver.rc_mode();

        let first = rig.control.step(Instant::now());
        assert_eq!(
            first.frame,
            Some(encode_indicator_frame(&IndicatorState::new(
                IndicatorColor::Yellow,
                75.0
            )))
        );

        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(rig.control.step(Instant::now()).frame, None);

        tokio::time::advance(Duration::from_millis(300)).await;
        assert!(rig.control.step(Instant::now()).frame.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_autonomy_fresh_then_stale() {
        let mut rig = rig(&Config::default()).await;
        rig.receiver.auto_mode();

        let report = rig.control.step(Instant::now());
        assert_eq!(report.decision.mode, Mode::AutoStale);

        rig.publisher.publish(AutonomyCommand::new(0.25, 1.0, 0.75, 1.0));
        let report = rig.control.step(Instant::now());
        assert_eq!(report.decision.mode, Mode::AutoFresh);
        assert!(approx(report.decision.command.front_thrust, 0.88));
        assert_eq!(rig.control.arbiter().freshness().cycles_since_update(), 0);

        tokio::time::advance(Duration::from_millis(1000)).await;
        assert_eq!(rig.control.step(Instant::now()).decision.mode, Mode::AutoFresh);

        tokio::time::advance(Duration::from_millis(600)).await;
        let report = rig.control.step(Instant::now());
        assert_eq!(report.decision.mode, Mode::AutoStale);
        assert!(approx(report.decision.command.front_steer, 0.25));
        assert!(approx(report.decision.command.back_steer, 0.75));
        assert_eq!(rig.driver.last(ActuatorChannel::FrontThrust), Some(0.46));
        assert_eq!(report.decision.indicator.color, IndicatorColor::Purple);
    }

    #[tokio::test(start_paused = true)]
    async fn test_indicator_failure_does_not_stop_loop() {
        let config = Config::default();
        let driver = RecordingDriver::new();
        let output = Uncalibrated::new(driver.clone())
            .calibrate(&CalibrationSequence::from_config(&config))
            .await
            .unwrap();

        let mut button = MockEstopButton::new();
        button.expect_is_asserted().return_const(true);
        let (_publisher, commands) = command_channel();
        let port = MockSerialPort::new();
        port.unplug();

        let control = ControlLoop::new(
            &config,
            ControlInputs {
                button: Box::new(button),
                receiver: Box::new(FakeReceiver::default()),
                commands,
            },
            output,
            IndicatorLink::new(port.clone(), "/dev/mock"),
        );

        let shutdown = tokio::time::sleep(Duration::from_millis(1200));
        assert!(control.run(shutdown).await.is_ok());

        assert!(port.frames().is_empty());
        assert_eq!(driver.last(ActuatorChannel::FrontThrust), Some(0.46));
    }

    #[tokio::test(start_paused = true)]
    async fn test_telemetry_on_mode_change_and_interval() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.telemetry.log_dir = dir.path().to_string_lossy().into_owned();
        config.telemetry.log_interval_ms = 100;

        let rig = rig(&config).await;
        let logger = TelemetryLogger::new(&config.telemetry).unwrap();
        let (sender, writer) = spawn_writer(logger);
        let mut control = rig.control.with_telemetry(sender);

        control.step(Instant::now());
        control.step(Instant::now());
        tokio::time::advance(Duration::from_millis(100)).await;
        control.step(Instant::now());
        rig.receiver.rc_mode();
        control.step(Instant::now());

        drop(control);
        writer.await.unwrap();

        let path = std::fs::read_dir(dir.path())
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        let content = std::fs::read_to_string(path).unwrap();
        let events: Vec<serde_json::Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0]["event"], "mode_change");
        assert_eq!(events[0]["mode"], "hard_stop_receiver_off");
        assert_eq!(events[1]["event"], "periodic");
        assert_eq!(events[2]["event"], "mode_change");
        assert_eq!(events[2]["mode"], "rc");
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_sends_off_first_and_stops_on_shutdown() {
        let rig = rig(&Config::default()).await;
        rig.receiver.rc_mode();

        let shutdown = tokio::time::sleep(Duration::from_millis(1200));
        rig.control.run(shutdown).await.unwrap();

        let frames = rig.port.frames();
        assert!(frames.len() >= 2);
        assert_eq!(frames[0], encode_indicator_frame(&IndicatorState::OFF).to_vec());
        assert_eq!(
            frames[1],
            encode_indicator_frame(&IndicatorState::new(IndicatorColor::Yellow, 75.0)).to_vec()
        );

        assert_eq!(rig.driver.last(ActuatorChannel::FrontThrust), Some(0.46));
        assert_eq!(rig.driver.last(ActuatorChannel::BackThrust), Some(0.46));
        assert!(approx(
            rig.driver.last(ActuatorChannel::BackServo).unwrap(),
            0.3
        ));
    }
}
