use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Method, Request};
use serde::Deserialize;

use crate::io::dummy::to_on_off;

use super::{ActuatorControl, ActuatorError};

/// A smart plug relay switched over HTTP, e.g. `http://<ip>/relay/0?turn=on`.
pub struct HttpPlug {
    client: Client,
    base_url: String,
    relay: usize,
    request_timeout: Duration,
}

#[derive(Deserialize, Debug)]
struct RelayStatus {
    ison: bool,
}

impl HttpPlug {
    pub fn new(base_url: String, relay: usize, request_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            relay,
            request_timeout,
        }
    }

    fn new_request(&self, query: Option<(&str, &str)>) -> Result<Request, reqwest::Error> {
        let mut builder = self
            .client
            .request(Method::GET, format!("{}/relay/{}", self.base_url, self.relay))
            .timeout(self.request_timeout);
        if let Some(query) = query {
            builder = builder.query(&[query]);
        }
        builder.build()
    }

    async fn execute(&self, request: Request) -> Result<RelayStatus, ActuatorError> {
        let response = self.client.execute(request).await?.error_for_status()?;
        let status = response.json::<RelayStatus>().await?;
        Ok(status)
    }
}

#[async_trait]
impl ActuatorControl for HttpPlug {
    async fn set_enabled(&mut self, enabled: bool) -> Result<(), ActuatorError> {
        debug!("Turning heater plug {}", to_on_off(enabled));
        let turn = if enabled { "on" } else { "off" };
        let request = self.new_request(Some(("turn", turn)))?;
        let status = self.execute(request).await?;
        if status.ison != enabled {
            return Err(ActuatorError::UnexpectedResponse(format!(
                "asked to turn {} but plug reports ison={}",
                turn, status.ison
            )));
        }
        Ok(())
    }

    async fn get_enabled(&mut self) -> Result<bool, ActuatorError> {
        let request = self.new_request(None)?;
        Ok(self.execute(request).await?.ison)
    }
}
