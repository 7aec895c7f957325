//! Result alias and the logging helper used where one failing component must not stop a run

use crate::error::ModelError;

pub type Result<T> = std::result::Result<T, ModelError>;

pub trait ResultExt<T> {
    /// Log the error at a level matching its recoverability and go on without a value
    fn log_and_continue(self) -> Option<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn log_and_continue(self) -> Option<T> {
        self.inspect_err(|err| {
            if err.is_recoverable() {
                tracing::warn!("Continuing after error: {}", err);
            } else {
                tracing::error!("{}", err);
            }
        })
        .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_and_continue() {
        let ok: Result<u32> = Ok(3);
        assert_eq!(ok.log_and_continue(), Some(3));
        let failed: Result<u32> = Err(ModelError::persistence_error("Link", "missing target"));
        assert_eq!(failed.log_and_continue(), None);
    }
}
