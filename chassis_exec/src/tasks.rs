//! # Task runners
//!
//! The executable runs three cyclic tasks, each on its own thread:
//!
//! - The message task polls one link per cycle and runs the receive callbacks (1 ms).
//! - The motor task runs the motor cascade against the latest target angle (5 ms).
//! - The chassis task runs chassis control and replies to the main board (10 ms).
//!
//! Tasks talk through queues: decoded chassis messages and mode requests go from the message task
//! to the chassis task, and target angles go from the remote's key callbacks to the motor task.
//! Stick positions are read from the shared [`RemoteState`] and chassis status is published to a
//! [`StatusCell`]. All tasks stop once the shared shutdown flag is set.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::{
    convert::TryFrom,
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{Receiver, RecvTimeoutError, Sender, SyncSender, TrySendError},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{debug, error, info, trace, warn};

// Internal
use crate::{
    chassis_ctrl::{ChassisCtrl, ChassisMode, Indicator, InputData, StatusCell},
    motion::MotionPrimitives,
    motor_ctrl::{KeyTarget, MotorBus, MotorCtrl},
    params::RemoteParams,
    remote_ctrl::{RemoteCtrl, RemoteState},
};
use comms_if::{
    eqpt::chassis::ChassisMsg,
    msg::{MsgProtocol, MsgSender, PollResult, RecvMsg},
};
use util::{module::State, time::sleep_until_cycle_end};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Everything the chassis task exchanges with the rest of the executable.
pub struct ChassisTaskIo {
    /// Decoded messages from the main board
    pub msgs: Receiver<ChassisMsg>,

    /// Mode switch requests from the remote
    pub modes: Receiver<ChassisMode>,

    pub remote: RemoteState,

    /// Replies to the main board go out through this
    pub sender: MsgSender,

    pub status: StatusCell,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the receive callback for the chassis mean, forwarding decoded messages to the chassis
/// task.
pub fn chassis_msg_callback(tx: Sender<ChassisMsg>) -> impl FnMut(&RecvMsg<'_>) + Send + 'static {
    move |msg: &RecvMsg<'_>| match ChassisMsg::try_from(msg) {
        Ok(m) => {
            trace!("Chassis message {:?}", m);
            if tx.send(m).is_err() {
                warn!("Chassis task has stopped, dropping {:?}", m);
            }
        }
        Err(e) => warn!("Unhandled chassis message: {}", e),
    }
}

/// Bind the remote keys: motor target keys push into the motor queue, mode keys request a mode
/// switch from the chassis task.
///
/// The motor queue is bounded, a target pushed while it is full is dropped.
pub fn bind_remote_keys(
    remote: &mut RemoteCtrl,
    key_targets: &[KeyTarget],
    mode_keys: &RemoteParams,
    targets: SyncSender<f32>,
    modes: Sender<ChassisMode>,
) {
    for kt in key_targets {
        let tx = targets.clone();
        let angle_deg = kt.angle_deg;

        remote.register_key_callback(kt.key, move |key| match tx.try_send(angle_deg) {
            Ok(_) => debug!("Key {} selected motor target {} deg", key, angle_deg),
            Err(TrySendError::Full(_)) => trace!("Motor queue full, key {} dropped", key),
            Err(TrySendError::Disconnected(_)) => warn!("Motor task has stopped"),
        });
    }

    for (key, mode) in [
        (mode_keys.manual_key, ChassisMode::Manual),
        (mode_keys.auto_key, ChassisMode::Auto),
    ]
    .iter()
    .copied()
    {
        let tx = modes.clone();
        remote.register_key_callback(key, move |_| {
            if tx.send(mode).is_err() {
                warn!("Chassis task has stopped, {:?} request dropped", mode);
            }
        });
    }
}

/// Start the message task.
pub fn spawn_msg_task(
    protocol: MsgProtocol,
    period: Duration,
    shutdown: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("msg_task".into())
        .spawn(move || msg_task(protocol, period, shutdown))
}

/// Start the motor task.
pub fn spawn_motor_task<B>(
    ctrl: MotorCtrl,
    bus: B,
    targets: Receiver<f32>,
    period: Duration,
    queue_timeout: Duration,
    shutdown: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>>
where
    B: MotorBus + Send + 'static,
{
    thread::Builder::new()
        .name("motor_task".into())
        .spawn(move || motor_task(ctrl, bus, targets, period, queue_timeout, shutdown))
}

/// Start the chassis task.
pub fn spawn_chassis_task<M, I>(
    ctrl: ChassisCtrl<M, I>,
    io: ChassisTaskIo,
    period: Duration,
    shutdown: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>>
where
    M: MotionPrimitives + Send + 'static,
    I: Indicator + Send + 'static,
{
    thread::Builder::new()
        .name("chassis_task".into())
        .spawn(move || chassis_task(ctrl, io, period, shutdown))
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn msg_task(mut protocol: MsgProtocol, period: Duration, shutdown: Arc<AtomicBool>) {
    info!("Message task started, polling {} channels", protocol.num_polled());

    while !shutdown.load(Ordering::Relaxed) {
        let cycle_start = Instant::now();

        msg_cycle(&mut protocol);

        end_cycle("Message", cycle_start, period);
    }

    info!("Message task stopped");
}

/// One message task cycle: a single poll, so a round over every link takes one cycle per link
/// plus one.
fn msg_cycle(protocol: &mut MsgProtocol) -> PollResult {
    let result = protocol.poll();
    match result {
        PollResult::NoData | PollResult::Ok(_) => (),
        r => debug!("Dropped a frame: {:?} (code {:#04x})", r, r.code()),
    }
    result
}

fn motor_task<B: MotorBus>(
    mut ctrl: MotorCtrl,
    mut bus: B,
    targets: Receiver<f32>,
    period: Duration,
    queue_timeout: Duration,
    shutdown: Arc<AtomicBool>,
) {
    info!("Motor task started");

    while !shutdown.load(Ordering::Relaxed) {
        // Waiting on the queue isn't counted as part of the cycle
        let target = match targets.recv_timeout(queue_timeout) {
            Ok(t) => Some(t),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                warn!("Motor target queue disconnected");
                break;
            }
        };

        let cycle_start = Instant::now();

        match ctrl.drive(&mut bus, target) {
            Ok(report) => {
                if report.current_limited {
                    trace!("Motor current limited at {}", report.current_demand);
                }
            }
            Err(e) => error!("Motor control error: {}", e),
        }

        end_cycle("Motor", cycle_start, period);
    }

    info!("Motor task stopped");
}

fn chassis_task<M, I>(
    mut ctrl: ChassisCtrl<M, I>,
    io: ChassisTaskIo,
    period: Duration,
    shutdown: Arc<AtomicBool>,
) where
    M: MotionPrimitives,
    I: Indicator,
{
    info!("Chassis task started in {:?} mode", ctrl.mode());

    ChassisMsg::Init.send(&io.sender);
    io.status.publish(&ctrl.report());

    while !shutdown.load(Ordering::Relaxed) {
        let cycle_start = Instant::now();

        // Only the latest mode request matters
        let input = InputData {
            msgs: io.msgs.try_iter().collect(),
            mode_request: io.modes.try_iter().last(),
            sticks: io.remote.sticks(),
        };

        match ctrl.proc(&input) {
            Ok((output, report)) => {
                for reply in output.replies.iter() {
                    reply.send(&io.sender);
                }
                io.status.publish(&report);
            }
            Err(e) => error!("Chassis control error: {}", e),
        }

        end_cycle("Chassis", cycle_start, period);
    }

    info!("Chassis task stopped");
}

/// Sleep out the rest of the cycle, warning on overrun.
fn end_cycle(task: &str, cycle_start: Instant, period: Duration) {
    if let Err(overrun) = sleep_until_cycle_end(cycle_start, period) {
        warn!(
            "{} cycle overran by {:.06} s",
            task,
            overrun.as_secs_f64()
        );
    }
}
