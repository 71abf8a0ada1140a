use clap::Parser;
use std::time::Duration;
use thiserror::Error;
use crate::admission::MAX_WINDOW;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "rate-gate")]
#[command(about = "Admits one request per client per time window")]
pub struct Args {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    /// Admission window in seconds (one request per client per window)
    #[arg(short, long, default_value_t = 5)]
    pub window: u64,

    /// Most clients tracked at once (0 = unbounded)
    #[arg(long, default_value_t = 10_000)]
    pub max_clients: usize,

    /// Seconds a client may stay quiet before its dispenser is dropped
    #[arg(long, default_value_t = 300)]
    pub idle_ttl: u64,

    /// Seconds between registry sweeps
    #[arg(long, default_value_t = 60)]
    pub sweep_interval: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("window must be > 0")]
    ZeroWindow,

    #[error("window must be at most {} seconds", MAX_WINDOW.as_secs())]
    WindowTooLarge,

    #[error("sweep interval must be > 0")]
    ZeroSweepInterval,

    #[error("port must be > 0")]
    ZeroPort,
}

impl Args {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if self.window == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.window() > MAX_WINDOW {
            return Err(ConfigError::WindowTooLarge);
        }
        if self.sweep_interval == 0 {
            return Err(ConfigError::ZeroSweepInterval);
        }
        Ok(())
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window)
    }

    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_policy() {
        let args = Args::parse_from(["rate-gate"]);
        assert_eq!(args.window(), Duration::from_secs(5));
        assert_eq!(args.bind_addr(), "0.0.0.0:8080");
        assert_eq!(args.max_clients, 10_000);
        assert_eq!(args.validate(), Ok(()));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let args = Args::parse_from(["rate-gate", "--window", "0"]);
        assert_eq!(args.validate(), Err(ConfigError::ZeroWindow));

        let args = Args::parse_from(["rate-gate", "--window", "18446744073709551615"]);
        assert_eq!(args.validate(), Err(ConfigError::WindowTooLarge));

        let args = Args::parse_from(["rate-gate", "--window", "86400"]);
        assert_eq!(args.validate(), Ok(()));

        let args = Args::parse_from(["rate-gate", "--sweep-interval", "0"]);
        assert_eq!(args.validate(), Err(ConfigError::ZeroSweepInterval));

        let args = Args::parse_from(["rate-gate", "-p", "0"]);
        assert_eq!(args.validate(), Err(ConfigError::ZeroPort));
    }
}
