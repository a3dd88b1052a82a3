// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Global tracing subscriber setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::ConfigError;
use crate::sections::{LogFormat, LoggingConfig};

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
///
/// # Errors
/// Returns `ConfigError::Tracing` if a global subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ConfigError> {
	let filter = EnvFilter::try_from_default_env()
		.or_else(|_| EnvFilter::try_new(&config.level))
		.map_err(|e| ConfigError::InvalidValue {
			key: "WARDEN_LOG_LEVEL".to_string(),
			message: e.to_string(),
		})?;

	let registry = tracing_subscriber::registry().with(filter);
	let result = match config.format {
		LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
		LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
	};

	result.map_err(|e| ConfigError::Tracing(e.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_second_init_fails() {
		let config = LoggingConfig::default();
		// Another test may have installed a subscriber first.
		let _ = init_tracing(&config);
		let err = init_tracing(&config).unwrap_err();
		assert!(matches!(err, ConfigError::Tracing(_)));
	}

	#[test]
	fn test_invalid_level_is_rejected() {
		let _guard = crate::test_env::ENV_LOCK
			.lock()
			.unwrap_or_else(|e| e.into_inner());
		std::env::remove_var("RUST_LOG");
		let config = LoggingConfig {
			level: "warden=notalevel".to_string(),
			format: LogFormat::Json,
		};
		let err = init_tracing(&config).unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { .. }));
	}
}
