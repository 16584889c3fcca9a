use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{error, info, warn};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;

use crate::brain::orchestrator::{HeatingOrchestrator, Trigger};
use crate::config::{ActuatorConfig, Config, EnvironmentSourceConfig};
use crate::control::HeaterController;
use crate::io::actuator::dummy::{CommandLog, DummyActuator};
use crate::io::actuator::http_plug::HttpPlug;
use crate::io::actuator::{ActuatorControl, ActuatorError};
use crate::io::dummy::DummyIO;
use crate::io::environment::command::CommandEnvironment;
use crate::io::environment::file::LiveFileEnvironment;
use crate::io::environment::{EnvironmentProvider, EnvironmentSource};
use crate::io::storage::history::CsvHistory;
use crate::io::storage::schedule::JsonScheduleStorage;
use crate::io::storage::training::JsonLinesTrainingStorage;
use crate::io::storage::{PersistEvent, Persistence, ScheduleStorage, TrainingCorpusStorage};
use crate::logging::{LoggingHandle, LOG_FILTER_FILE};
use crate::predictor::recorder::{RecorderEvent, TrainingRecorder};
use crate::predictor::HeatTimePredictor;
use crate::schedule::ScheduleStore;
use crate::time_util::mytime::{RealTimeProvider, TimeProvider};

mod brain;
mod config;
mod control;
mod events;
mod io;
mod logging;
mod predictor;
mod schedule;
mod simulate;
mod time_util;
mod web;

const CONFIG_FILE: &str = "heating.toml";
const TRIGGER_BUFFER: usize = 32;

fn main() {
    println!("Preparing...");

    let logging_handle = logging::init_logging(PathBuf::from(LOG_FILTER_FILE)).expect("Failed to initialize logging");

    let rt = Builder::new_multi_thread()
        .worker_threads(3)
        .enable_time()
        .enable_io()
        .build()
        .expect("Expected to be able to make runtime");

    if std::env::args().any(|arg| arg == "--simulate") {
        simulate::simulate(rt, logging_handle);
        return;
    }

    let config = fs::read_to_string(CONFIG_FILE).expect("Unable to read config file. Is it missing?");
    let config: Config = toml::from_str(&config).expect("Error reading config file");

    let time_provider = RealTimeProvider::default();
    let source = make_environment_source(config.get_environment().get_source(), time_provider);
    let actuator = make_actuator(config.get_actuator()).expect("Failed to set up actuator");

    main_loop(&config, rt, source, actuator, time_provider, logging_handle);
}

fn make_environment_source(config: &EnvironmentSourceConfig, time_provider: RealTimeProvider) -> Box<dyn EnvironmentSource> {
    match config {
        EnvironmentSourceConfig::File { file } => Box::new(LiveFileEnvironment::new(file.clone(), time_provider)),
        EnvironmentSourceConfig::Command { program, args } => Box::new(CommandEnvironment::new(program.clone(), args.clone())),
        EnvironmentSourceConfig::Dummy => {
            warn!("Using dummy environment source, the temperature will stay unknown");
            Box::new(io::environment::dummy::Dummy::create(&()).0)
        }
    }
}

fn make_actuator(config: &ActuatorConfig) -> Result<Box<dyn ActuatorControl>, ActuatorError> {
    match config {
        #[cfg(unix)]
        ActuatorConfig::Gpio { pin, active_low } => {
            let gpio = io::gpio::sysfs_gpio::SysFsGPIO::new();
            Ok(Box::new(io::actuator::gpio_relay::GpioRelay::new(gpio, *pin, *active_low)?))
        }
        #[cfg(not(unix))]
        ActuatorConfig::Gpio { .. } => Err(ActuatorError::Unavailable("GPIO is only supported on unix".to_owned())),
        ActuatorConfig::HttpPlug {
            base_url,
            relay,
            request_timeout_secs,
        } => Ok(Box::new(HttpPlug::new(base_url.clone(), *relay, *request_timeout_secs))),
        ActuatorConfig::Dummy => {
            warn!("Using dummy actuator, nothing will actually be heated");
            Ok(Box::new(DummyActuator::create(&CommandLog::default()).0))
        }
    }
}

/// Wires every component together and runs until a termination signal is received.
fn main_loop<T>(
    config: &Config,
    rt: Runtime,
    source: Box<dyn EnvironmentSource>,
    actuator: Box<dyn ActuatorControl>,
    time_provider: T,
    logging_handle: LoggingHandle<EnvFilter, impl Subscriber + Send + Sync + 'static>,
) where
    T: TimeProvider + Clone + Send + Sync + 'static,
{
    let storage = config.get_storage();
    for file in [
        storage.get_schedule_file(),
        storage.get_training_file(),
        storage.get_environment_history_file(),
        storage.get_status_history_file(),
    ] {
        if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Failed to create {:?}: {}", parent, e);
            }
        }
    }

    let schedule_storage = JsonScheduleStorage::new(storage.get_schedule_file().clone());
    let training_storage = JsonLinesTrainingStorage::new(storage.get_training_file().clone());
    let schedule = rt.block_on(schedule_storage.load());
    let corpus = rt.block_on(training_storage.load_all()).unwrap_or_else(|e| {
        error!("Failed to load training data, starting without: {}", e);
        Vec::new()
    });

    let (trigger_tx, trigger_rx) = mpsc::channel(TRIGGER_BUFFER);
    let (persist_tx, persist_rx) = mpsc::unbounded_channel();
    let (recorder_tx, recorder_rx) = mpsc::unbounded_channel();

    let mut store = ScheduleStore::new(schedule, config.get_schedule().get_zone()).expect("Loaded schedule should be valid");
    {
        let trigger_tx = trigger_tx.clone();
        let persist_tx = persist_tx.clone();
        store.subscribe(move |change| {
            send_trigger(&trigger_tx, Trigger::ScheduleChanged);
            let _ = persist_tx.send(PersistEvent::Schedule(change.new.clone()));
        });
    }
    let store = Arc::new(Mutex::new(store));

    let control = config.get_control();
    let mut controller = HeaterController::new(control.get_hysteresis(), actuator, *control.get_actuator_timeout());
    {
        let persist_tx = persist_tx.clone();
        let recorder_tx = recorder_tx.clone();
        controller.subscribe(move |change| {
            let _ = persist_tx.send(PersistEvent::Status(change.clone()));
            let _ = recorder_tx.send(RecorderEvent::Status(change.clone()));
        });
    }
    match rt.block_on(controller.sync_with_actuator()) {
        Ok(enabled) => info!("Heater is currently {}", io::dummy::to_on_off(enabled)),
        Err(e) => warn!("Failed to read heater state: {}", e),
    }

    let environment = config.get_environment();
    let mut provider = EnvironmentProvider::new(source, *environment.get_read_timeout());
    // Read once up front so the first cycle runs as soon as the orchestrator starts.
    let initial = rt.block_on(provider.update(time_provider.get_utc_time()));
    let _ = persist_tx.send(PersistEvent::Environment(initial.clone()));
    let _ = recorder_tx.send(RecorderEvent::Environment(initial));
    {
        let trigger_tx = trigger_tx.clone();
        let persist_tx = persist_tx.clone();
        provider.subscribe(move |update| {
            send_trigger(&trigger_tx, Trigger::Environment(update.clone()));
            let _ = persist_tx.send(PersistEvent::Environment(update.clone()));
            let _ = recorder_tx.send(RecorderEvent::Environment(update.clone()));
        });
    }

    let mut recorder = TrainingRecorder::new();
    {
        let trigger_tx = trigger_tx.clone();
        let persist_tx = persist_tx.clone();
        recorder.subscribe(move |item| {
            let _ = persist_tx.send(PersistEvent::TrainingItem(item.clone()));
            send_trigger(&trigger_tx, Trigger::NewTrainingItem(item.clone()));
        });
    }
    drop(persist_tx);

    let predictor_config = config.get_predictor();
    let predictor = HeatTimePredictor::new(corpus, predictor_config.get_neighbours(), predictor_config.get_weighting());
    info!("Predictor starting with {} training items", predictor.corpus_len());

    let (orchestrator, status) = HeatingOrchestrator::new(
        store.clone(),
        predictor,
        controller,
        time_provider.clone(),
        config.get_schedule().get_lookahead(),
        provider.latest().cloned(),
    );

    let history = CsvHistory::new(
        storage.get_environment_history_file().clone(),
        storage.get_status_history_file().clone(),
    );
    let persistence = Persistence::new(Box::new(schedule_storage), Box::new(training_storage), history);
    rt.spawn(persistence.run(persist_rx));
    rt.spawn(recorder.run(recorder_rx));
    rt.spawn(provider.run(*environment.get_poll_interval(), time_provider));

    let web = config.get_web();
    if web.is_enabled() {
        let bind = *web.get_bind();
        let state = web::AppState::new(store, status);
        rt.spawn(async move {
            if let Err(e) = web::serve(bind, state).await {
                error!("Web interface stopped: {}", e);
            }
        });
    }

    let logging_handle = Arc::new(logging_handle);
    #[cfg(unix)]
    {
        let logging_handle = logging_handle.clone();
        rt.spawn(async move { reload_log_level_on_hangup(logging_handle).await });
    }

    {
        let shutdown_tx = trigger_tx.clone();
        ctrlc::set_handler(move || {
            println!("Received termination signal.");
            if shutdown_tx.try_send(Trigger::Shutdown).is_err() {
                eprintln!("Failed to request shutdown");
            }
        })
        .expect("Failed to attach kill handler.");
    }
    drop(trigger_tx);

    info!("Beginning main loop.");
    if let Err(e) = rt.block_on(rt.spawn(orchestrator.run(trigger_rx))) {
        error!("Orchestrator task failed: {}", e);
    }
    info!("Stopped.");
    rt.shutdown_timeout(Duration::from_secs(5));
}

fn send_trigger(sender: &mpsc::Sender<Trigger>, trigger: Trigger) {
    if let Err(e) = sender.try_send(trigger) {
        warn!("Dropping trigger: {}", e);
    }
}

#[cfg(unix)]
async fn reload_log_level_on_hangup(logging_handle: Arc<LoggingHandle<EnvFilter, impl Subscriber>>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            warn!("Failed to listen for SIGHUP, log level can't be reloaded: {}", e);
            return;
        }
    };
    while hangup.recv().await.is_some() {
        match logging::reload_log_level(logging_handle.as_ref()) {
            Ok(filter) => info!("Reloaded log level: {}", filter),
            Err(e) => error!("Failed to reload log level: {}", e),
        }
    }
}
