//! Named credential + endpoint bundles.
//!
//! Every platform product (queue, worker, cache) has a built-in preset.
//! Configured environments are layered on top of the preset, so an
//! environment only needs to carry what differs (usually the project id
//! and token).

use serde::{Deserialize, Serialize};

/// Platform products addressed by an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Product {
    Mq,
    Worker,
    Cache,
}

impl Product {
    pub fn as_str(&self) -> &'static str {
        match self {
            Product::Mq => "mq",
            Product::Worker => "worker",
            Product::Cache => "cache",
        }
    }

    /// Name of the optional per-product override environment.
    pub fn override_env(&self) -> String {
        format!("iron_{}", self.as_str())
    }

    /// Built-in endpoint defaults for this product.
    pub fn preset(&self) -> Settings {
        let (host, api_version) = match self {
            Product::Mq => ("mq-aws-us-east-1-1.iron.io", "3"),
            Product::Worker => ("worker-aws-us-east-1.iron.io", "2"),
            Product::Cache => ("cache-aws-us-east-1.iron.io", "1"),
        };
        Settings {
            project_id: String::new(),
            token: String::new(),
            scheme: "https".to_string(),
            host: host.to_string(),
            port: None,
            api_version: api_version.to_string(),
        }
    }
}

/// Endpoint and credentials for one platform project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub project_id: String,
    pub token: String,
    pub scheme: String,
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub api_version: String,
}

impl Settings {
    /// Overlay the non-empty fields of `other` onto `self`.
    pub fn overlay(&mut self, other: &Settings) {
        fn take(dst: &mut String, src: &str) {
            if !src.is_empty() {
                *dst = src.to_string();
            }
        }
        take(&mut self.project_id, &other.project_id);
        take(&mut self.token, &other.token);
        take(&mut self.scheme, &other.scheme);
        take(&mut self.host, &other.host);
        take(&mut self.api_version, &other.api_version);
        if other.port.is_some() {
            self.port = other.port;
        }
    }

    /// Both a project id and a token are present.
    pub fn has_credentials(&self) -> bool {
        !self.project_id.is_empty() && !self.token.is_empty()
    }

    /// `{scheme}://{host}[:port]/{api_version}`, without a trailing slash.
    pub fn base_url(&self) -> String {
        let scheme = if self.scheme.is_empty() {
            "https"
        } else {
            self.scheme.as_str()
        };
        match self.port {
            Some(port) => format!("{scheme}://{}:{port}/{}", self.host, self.api_version),
            None => format!("{scheme}://{}/{}", self.host, self.api_version),
        }
    }
}
