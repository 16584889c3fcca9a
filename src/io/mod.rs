pub mod actuator;
pub mod dummy;
pub mod environment;
pub mod gpio;
pub mod live_data;
pub mod storage;
