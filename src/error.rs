// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::fmt::Display;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CourierError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation not supported: {0}")]
    OperationNotSupported(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Unsupported workload kind: {0}")]
    UnsupportedWorkloadKind(String),

    #[error("Adapter error: {0}")]
    Adapter(String),

    #[error("Failed to parse kubeconfig: {0}")]
    Kubeconfig(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CourierError {
    /// Classify a Kubernetes API error, keeping the caller's context in the message
    pub fn from_kube(err: kube::Error, context: impl Display) -> Self {
        match err {
            kube::Error::Api(resp) if resp.code == 401 || resp.code == 403 => {
                CourierError::AuthFailed(format!(
                    "{}: {} (check the site token or credentials)",
                    context, resp.message
                ))
            }
            kube::Error::Api(resp) if resp.code == 404 => {
                CourierError::NotFound(format!("{}: {}", context, resp.message))
            }
            kube::Error::Auth(e) => CourierError::AuthFailed(format!(
                "{}: {} (check the site token or credentials)",
                context, e
            )),
            kube::Error::Service(e) => CourierError::ConnectionFailed(format!(
                "{}: {} (server not found or unreachable, check the site URL)",
                context, e
            )),
            other => CourierError::Adapter(format!("{}: {}", context, other)),
        }
    }

    /// Classify a transport-level HTTP error
    pub fn from_http(err: reqwest::Error, context: impl Display) -> Self {
        if err.is_connect() || err.is_timeout() {
            return CourierError::ConnectionFailed(format!(
                "{}: {} (server not found or unreachable, check the site URL)",
                context, err
            ));
        }
        match err.status() {
            Some(status) => Self::from_status(status, context),
            None => CourierError::Adapter(format!("{}: {}", context, err)),
        }
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: StatusCode, context: impl Display) -> Self {
        match status.as_u16() {
            401 | 403 => CourierError::AuthFailed(format!(
                "{}: HTTP {} (check the token or credentials)",
                context, status
            )),
            404 => CourierError::NotFound(format!("{}: HTTP {}", context, status)),
            _ => CourierError::Adapter(format!("{}: HTTP {}", context, status)),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CourierError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, CourierError>;
