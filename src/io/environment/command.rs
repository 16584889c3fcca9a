use async_trait::async_trait;
use log::trace;
use tokio::process::Command;

use super::{Environment, EnvironmentSource, SensorError};

/// Reads a DHT22 style sensor through a helper program which prints a line like
/// `Temp=21.3*  Humidity=45.1%`.
pub struct CommandEnvironment {
    program: String,
    args: Vec<String>,
}

impl CommandEnvironment {
    pub fn new(program: String, args: Vec<String>) -> Self {
        Self { program, args }
    }
}

#[async_trait]
impl EnvironmentSource for CommandEnvironment {
    async fn read(&mut self) -> Result<Environment, SensorError> {
        let output = Command::new(&self.program).args(&self.args).kill_on_drop(true).output().await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            return Err(SensorError::Parse(format!(
                "{} exited with {}: {}{}",
                self.program,
                output.status,
                stdout.trim(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        trace!("{} output: {}", self.program, stdout.trim());

        let line = stdout.lines().find(|line| !line.trim().is_empty()).unwrap_or_default();
        let (temperature, humidity) = parse_dht_output(line)?;
        Ok(Environment::new(temperature, humidity, None))
    }
}

/// Parses `Temp=<temperature>*  Humidity=<humidity>%`.
pub fn parse_dht_output(line: &str) -> Result<(f32, f32), SensorError> {
    let invalid = || SensorError::Parse(format!("could not parse sensor reading: {:?}", line));

    let (_, after_temp) = line.split_once("Temp=").ok_or_else(invalid)?;
    let (temperature, rest) = after_temp.split_once('*').ok_or_else(invalid)?;

    let trimmed = rest.trim_start();
    if trimmed.len() == rest.len() {
        return Err(invalid());
    }
    let humidity = trimmed
        .strip_prefix("Humidity=")
        .and_then(|rest| rest.split_once('%'))
        .map(|(humidity, _)| humidity)
        .ok_or_else(invalid)?;

    let temperature: f32 = temperature.parse().map_err(|_| invalid())?;
    let humidity: f32 = humidity.parse().map_err(|_| invalid())?;
    Ok((temperature, humidity))
}
