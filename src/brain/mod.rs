use backtrace::Backtrace;
use std::fmt::{Display, Formatter};

pub mod orchestrator;

/// A failure of a single evaluation cycle.
/// The cycle is abandoned but the process keeps running; the next trigger
/// starts a fresh cycle.
#[derive(Debug)]
pub struct BrainFailure {
    description: String,
    trace: Backtrace,
    line_num: u32,
    file_name: String,
    actions: CorrectiveActions,
}

impl BrainFailure {
    pub fn new(
        description: String,
        trace: Backtrace,
        line_num: u32,
        file_name: String,
        actions: CorrectiveActions,
    ) -> Self {
        BrainFailure {
            description,
            trace,
            line_num,
            file_name,
            actions,
        }
    }

    pub fn get_description(&self) -> &str {
        &self.description
    }

    pub fn get_corrective_actions(&self) -> &CorrectiveActions {
        &self.actions
    }
}

impl Display for BrainFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "BrainFailure occured: '{}'", self.description)?;
        writeln!(f, "Recommended corrective actions: {:?}", self.actions)?;
        writeln!(f, "At: Line {} in {}", self.line_num, self.file_name)?;
        writeln!(f, "Trace:{:?}", self.trace)
    }
}

#[derive(Debug, Default)]
pub struct CorrectiveActions {
    actuator_state_unknown: bool,
}

impl CorrectiveActions {
    pub fn new() -> Self {
        CorrectiveActions::default()
    }

    pub fn unknown_actuator() -> Self {
        CorrectiveActions::new().with_unknown_actuator_state()
    }

    pub fn is_actuator_in_unknown_state(&self) -> bool {
        self.actuator_state_unknown
    }

    pub fn with_unknown_actuator_state(mut self) -> Self {
        self.actuator_state_unknown = true;
        self
    }
}

#[macro_export]
macro_rules! brain_fail {
    ($msg:expr) => {{
        let trace = backtrace::Backtrace::new();
        let actions = $crate::brain::CorrectiveActions::new();
        $crate::brain::BrainFailure::new(
            $msg.to_string(),
            trace,
            line!(),
            file!().to_owned(),
            actions,
        )
    }};
    ($msg:expr, $actions:expr) => {{
        let trace = backtrace::Backtrace::new();
        $crate::brain::BrainFailure::new(
            $msg.to_string(),
            trace,
            line!(),
            file!().to_owned(),
            $actions,
        )
    }};
}
