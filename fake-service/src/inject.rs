//! Error injection.
//!
//! An injector is consulted once per request, before any upstream is called.
//! When it fires, the request short-circuits: no fan-out, no duration sleep,
//! and the injected error is the whole response.

use rand::Rng;

/// An error chosen to be returned instead of handling the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedError {
    /// Status code of the response.
    pub code: u16,
    /// Error message of the response.
    pub message: String,
}

/// Decides whether a request fails on purpose.
pub trait ErrorInjector: Send + Sync {
    /// Return an error to answer with, or `None` to handle normally.
    fn maybe_inject(&self) -> Option<InjectedError>;
}

/// Rejected injector settings.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InjectorError {
    /// Rate is not a probability.
    #[error("error rate must be within [0, 1], got {0}")]
    Rate(f64),
    /// Code is not an HTTP error status.
    #[error("error code must be within 400-599, got {0}")]
    Code(u16),
}

/// Injects errors on a random fraction of requests.
#[derive(Debug, Clone, PartialEq)]
pub struct RateInjector {
    rate: f64,
    code: u16,
}

impl RateInjector {
    /// Injector failing `rate` of requests with status `code`.
    ///
    /// # Errors
    ///
    /// Returns an error if `rate` is outside `[0, 1]` or `code` is not a
    /// 4xx/5xx status.
    pub fn new(rate: f64, code: u16) -> Result<Self, InjectorError> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(InjectorError::Rate(rate));
        }
        if !(400..=599).contains(&code) {
            return Err(InjectorError::Code(code));
        }
        Ok(Self { rate, code })
    }

    /// Injector that never fires.
    pub fn disabled() -> Self {
        Self {
            rate: 0.0,
            code: 500,
        }
    }

    /// Fraction of requests that fail.
    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl ErrorInjector for RateInjector {
    fn maybe_inject(&self) -> Option<InjectedError> {
        if self.rate <= 0.0 || !rand::thread_rng().gen_bool(self.rate) {
            return None;
        }
        tracing::debug!(code = self.code, "Injecting error");
        Some(InjectedError {
            code: self.code,
            message: "Service error automatically injected".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_never_injects() {
        let injector = RateInjector::new(0.0, 500).unwrap();
        assert!((0..1_000).all(|_| injector.maybe_inject().is_none()));
    }

    #[test]
    fn full_rate_always_injects() {
        let injector = RateInjector::new(1.0, 503).unwrap();
        for _ in 0..100 {
            let injected = injector.maybe_inject().unwrap();
            assert_eq!(injected.code, 503);
            assert!(!injected.message.is_empty());
        }
    }

    #[test]
    fn partial_rate_injects_some() {
        let injector = RateInjector::new(0.5, 500).unwrap();
        let injected = (0..2_000).filter(|_| injector.maybe_inject().is_some()).count();
        assert!((700..1300).contains(&injected), "injected {injected} of 2000");
    }

    #[test]
    fn invalid_settings_rejected() {
        assert_eq!(RateInjector::new(1.5, 500), Err(InjectorError::Rate(1.5)));
        assert_eq!(RateInjector::new(0.1, 200), Err(InjectorError::Code(200)));
    }

    #[test]
    fn disabled_never_injects() {
        let injector = RateInjector::disabled();
        assert_eq!(injector.rate(), 0.0);
        assert!(injector.maybe_inject().is_none());
    }
}
