//! Main chassis executable entry point.
//!
//! # Architecture
//!
//! The executable is made of three cyclic tasks, see [`chassis_lib::tasks`]:
//!
//!     - Message task: polls the remote and main board links, decodes frames and runs the
//!       receive callbacks
//!     - Motor task: runs the motor cascade against the target angle selected by the remote keys
//!     - Chassis task: runs chassis control on the main board's commands and the remote sticks,
//!       replying to the main board
//!
//! The main thread sets everything up, starts the tasks, and then supervises them, logging the
//! chassis status periodically until one of them stops.
//!
//! # Usage
//!
//!     chassis_exec [params_file]
//!
//! If no parameter file is given `chassis_exec.toml` is loaded from the software root's `params`
//! directory. The file used is copied into the session directory next to the log.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, error, info};
use std::env;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{channel, sync_channel},
    Arc,
};
use std::thread;

// Internal
use chassis_lib::{
    chassis_ctrl::{ChassisCtrl, LogIndicator, StatusCell},
    motor_ctrl::MotorCtrl,
    params::ChassisExecParams,
    remote_ctrl::RemoteCtrl,
    sim::{SimChassis, SimMotor},
    tasks::{self, ChassisTaskIo},
};
use comms_if::{
    channel::{ChannelHandle, TcpChannel},
    msg::{MsgMean, MsgProtocol},
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    raise_error,
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Parameter file used when none is given on the command line.
const DEFAULT_PARAMS_FILE: &str = "chassis_exec.toml";

/// Depth of the motor target queue, a key pressed while it is full is dropped.
const MOTOR_QUEUE_DEPTH: usize = 1;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    color_eyre::install()?;

    // Initialise session
    let session = Session::new("chassis_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Chassis Executable\n");
    info!("Running on: {}", host::get_hostname());
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let args: Vec<String> = env::args().collect();
    debug!("CLI arguments: {:?}", args);

    let params_path = match args.len() {
        1 => util::params::resolve_path(DEFAULT_PARAMS_FILE)
            .wrap_err("Could not locate the default exec params")?,
        2 => PathBuf::from(&args[1]),
        n => {
            return Err(eyre!(
                "Expected zero or one argument, found {}",
                n - 1
            ))
        }
    };
    info!("Loading parameters from {:?}", params_path);

    let params: ChassisExecParams =
        util::params::load_from_path(&params_path).wrap_err("Could not load exec params")?;

    params
        .are_valid()
        .wrap_err("Invalid exec parameters")?;

    info!("Exec parameters loaded");

    let record = session
        .record_params(&params_path)
        .wrap_err("Failed to record the exec params in the session")?;
    debug!("Exec parameters recorded to {:?}", record);

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let motor_ctrl = MotorCtrl::new(&params.motor).wrap_err("Failed to initialise MotorCtrl")?;
    let sim_motor =
        SimMotor::new(params.sim.motor.clone()).wrap_err("Failed to initialise SimMotor")?;
    info!("MotorCtrl init complete");

    let sim_chassis =
        SimChassis::new(params.sim.chassis.clone()).wrap_err("Failed to initialise SimChassis")?;
    let chassis_ctrl = ChassisCtrl::new(
        params.chassis.clone(),
        sim_chassis,
        LogIndicator::new("mode_led"),
    )
    .wrap_err("Failed to initialise ChassisCtrl")?;
    let status = StatusCell::new(chassis_ctrl.mode());
    info!("ChassisCtrl init complete");

    info!("Module initialisation complete\n");

    // ---- INITIALISE LINKS ----

    info!("Initialising links");

    let write_timeout = params.channels.write_timeout();

    let remote_link = ChannelHandle::new(
        TcpChannel::connect(&params.channels.remote_endpoint, write_timeout)
            .wrap_err("Failed to connect the remote link")?,
    );
    info!(
        "Remote link {} connected to {}",
        remote_link.id(),
        params.channels.remote_endpoint
    );

    let board_link = ChannelHandle::new(
        TcpChannel::connect(&params.channels.main_board_endpoint, write_timeout)
            .wrap_err("Failed to connect the main board link")?,
    );
    info!(
        "Main board link {} connected to {}",
        board_link.id(),
        params.channels.main_board_endpoint
    );

    // ---- REGISTER CALLBACKS ----

    let (msg_tx, msg_rx) = channel();
    let (mode_tx, mode_rx) = channel();
    let (target_tx, target_rx) = sync_channel(MOTOR_QUEUE_DEPTH);

    let mut remote = RemoteCtrl::new();
    tasks::bind_remote_keys(
        &mut remote,
        &params.motor.key_targets,
        &params.remote,
        target_tx,
        mode_tx,
    );
    let remote_state = remote.state();

    let mut protocol = MsgProtocol::new();
    protocol.register_receive_callback(MsgMean::Remote, move |msg| remote.handle_msg(msg));
    protocol.register_receive_callback(MsgMean::Chassis, tasks::chassis_msg_callback(msg_tx));
    protocol.register_send_channel(MsgMean::Remote, remote_link.clone());
    protocol.register_send_channel(MsgMean::Chassis, board_link.clone());
    protocol.add_polled_channel(remote_link);
    protocol.add_polled_channel(board_link);
    let sender = protocol.sender();

    info!("Links initialised\n");

    // ---- START TASKS ----

    let shutdown = Arc::new(AtomicBool::new(false));

    let handles = vec![
        tasks::spawn_msg_task(protocol, params.tasks.msg_period(), shutdown.clone())
            .wrap_err("Failed to start the message task")?,
        tasks::spawn_motor_task(
            motor_ctrl,
            sim_motor,
            target_rx,
            params.tasks.motor_period(),
            params.tasks.motor_queue_timeout(),
            shutdown.clone(),
        )
        .wrap_err("Failed to start the motor task")?,
        tasks::spawn_chassis_task(
            chassis_ctrl,
            ChassisTaskIo {
                msgs: msg_rx,
                modes: mode_rx,
                remote: remote_state.clone(),
                sender,
                status: status.clone(),
            },
            params.tasks.chassis_period(),
            shutdown.clone(),
        )
        .wrap_err("Failed to start the chassis task")?,
    ];

    info!("Tasks started\n");

    // ---- SUPERVISION ----

    while !handles.iter().any(|h| h.is_finished()) {
        thread::sleep(params.tasks.status_log_period());

        info!(
            "[{:.03} s] {:?} in {:?} mode, target {}, remote key {} ({} reports)",
            session::get_elapsed_seconds(),
            status.status(),
            status.mode(),
            status.target_index(),
            remote_state.key(),
            remote_state.num_reports()
        );
    }

    // ---- SHUTDOWN ----

    error!("A task has stopped, shutting down");
    shutdown.store(true, Ordering::Relaxed);

    let mut num_panicked = 0;
    for h in handles {
        let name = h.thread().name().unwrap_or("unnamed").to_string();
        if h.join().is_err() {
            error!("Task {} panicked", name);
            num_panicked += 1;
        }
    }

    if num_panicked > 0 {
        raise_error!("{} task(s) panicked", num_panicked);
    }

    info!("End of execution");
    session.exit();

    Ok(())
}
