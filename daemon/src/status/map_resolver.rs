use anyhow::Context;
use log::debug;
use std::time::Duration;
use url::Url;

use crate::inventory::InstanceDescriptor;

/// Finds the web map URL of an instance, independently of the status probe.
#[async_trait::async_trait]
pub trait MapResolver: Send + Sync {
    /// `game_port` is the host port that answered the status probe.
    async fn resolve(&self, instance: &InstanceDescriptor, game_port: u16) -> Option<String>;
}

/// Reads the map URL straight from an instance label.
pub struct LabelMapResolver {
    label: String,
}

impl LabelMapResolver {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[async_trait::async_trait]
impl MapResolver for LabelMapResolver {
    async fn resolve(&self, instance: &InstanceDescriptor, _game_port: u16) -> Option<String> {
        instance
            .labels
            .get(&self.label)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
    }
}

/// Asks a lookup service `GET {base}/{host_port}` for each non-game TCP port.
pub struct HttpMapResolver {
    client: reqwest::Client,
    base: Url,
}

impl HttpMapResolver {
    pub fn new(base: &Url, timeout: Duration) -> anyhow::Result<Self> {
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build map lookup client")?;
        Ok(Self { client, base })
    }

    async fn lookup(&self, host_port: u16) -> Option<String> {
        let url = self.base.join(&host_port.to_string()).ok()?;
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("map lookup {} failed: {}", url, e);
                return None;
            }
        };
        if !response.status().is_success() {
            return None;
        }
        let body = response.text().await.ok()?;
        let body = body.trim();
        (!body.is_empty()).then(|| body.to_string())
    }
}

#[async_trait::async_trait]
impl MapResolver for HttpMapResolver {
    async fn resolve(&self, instance: &InstanceDescriptor, game_port: u16) -> Option<String> {
        for port in instance.tcp_host_ports() {
            if port == game_port {
                continue;
            }
            if let Some(url) = self.lookup(port).await {
                return Some(url);
            }
        }
        None
    }
}

/// First resolver with an answer wins.
#[derive(Default)]
pub struct ChainMapResolver {
    resolvers: Vec<Box<dyn MapResolver>>,
}

impl ChainMapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resolver: impl MapResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }
}

#[async_trait::async_trait]
impl MapResolver for ChainMapResolver {
    async fn resolve(&self, instance: &InstanceDescriptor, game_port: u16) -> Option<String> {
        for resolver in &self.resolvers {
            if let Some(url) = resolver.resolve(instance, game_port).await {
                return Some(url);
            }
        }
        None
    }
}
