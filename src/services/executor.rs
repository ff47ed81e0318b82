// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use async_trait::async_trait;
use tokio::time::sleep;

use crate::app::bot_config::RetryConfig;
use crate::common::retry::Backoff;
use crate::domain::error::{AppError, TxError, TxErrorKind};

/// Sends native gas token to a bot wallet that ran dry.
#[async_trait]
pub trait GasRefill: Send + Sync {
    async fn refill_gas(&self, wallet: Address) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Counted attempts; insufficient-funds recoveries within `max_refills` are free.
    pub max_attempts: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub max_refills: usize,
    /// Pause before retrying a terminal failure.
    pub terminal_delay: Duration,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        let base = Duration::from_millis(cfg.base_backoff_ms);
        Self {
            max_attempts: cfg.max_attempts.max(1),
            base_backoff: base,
            max_backoff: Duration::from_millis(cfg.max_backoff_ms),
            max_refills: cfg.max_refills,
            terminal_delay: base,
        }
    }
}

/// Runs one state-changing call and recovers by failure class.
pub struct TxExecutor {
    refill: Arc<dyn GasRefill>,
    policy: RetryPolicy,
}

impl TxExecutor {
    pub fn new(refill: Arc<dyn GasRefill>, policy: RetryPolicy) -> Self {
        Self { refill, policy }
    }

    pub async fn execute<T, F, Fut>(
        &self,
        wallet: Address,
        action: &str,
        mut op: F,
    ) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TxError>>,
    {
        let mut attempts = 0usize;
        let mut refills = 0usize;
        let mut backoff = Backoff::new(self.policy.base_backoff, self.policy.max_backoff);

        loop {
            let err = match op().await {
                Ok(v) => return Ok(v),
                Err(e) => e,
            };

            if err.kind == TxErrorKind::InsufficientFunds && refills < self.policy.max_refills {
                refills += 1;
                tracing::warn!(
                    target: "executor",
                    action,
                    wallet = %wallet,
                    refill = refills,
                    "Out of gas funds; refilling from funding account"
                );
                self.refill.refill_gas(wallet).await?;
                continue;
            }

            attempts += 1;
            if attempts >= self.policy.max_attempts {
                tracing::error!(
                    target: "executor",
                    action,
                    wallet = %wallet,
                    attempts,
                    error = %err,
                    "Giving up"
                );
                return Err(AppError::RetriesExhausted {
                    action: action.to_string(),
                    attempts,
                    last: err,
                });
            }

            let delay = match err.kind {
                TxErrorKind::Transient => backoff.next_delay(),
                TxErrorKind::InsufficientFunds | TxErrorKind::Terminal => {
                    self.policy.terminal_delay
                }
            };
            tracing::warn!(
                target: "executor",
                action,
                wallet = %wallet,
                attempt = attempts,
                kind = ?err.kind,
                error = %err.message,
                delay_ms = delay.as_millis() as u64,
                "Transaction failed; retrying"
            );
            sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingRefill {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GasRefill for CountingRefill {
        async fn refill_gas(&self, _wallet: Address) -> Result<(), AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn policy(max_attempts: usize, max_refills: usize) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            max_refills,
            terminal_delay: Duration::from_millis(1),
        }
    }

    fn executor(max_attempts: usize, max_refills: usize) -> (TxExecutor, Arc<CountingRefill>) {
        let refill = Arc::new(CountingRefill::default());
        (
            TxExecutor::new(refill.clone(), policy(max_attempts, max_refills)),
            refill,
        )
    }

    #[tokio::test]
    async fn terminal_failures_exhaust_after_exact_attempts() {
        let (exec, refill) = executor(3, 3);
        let calls = AtomicUsize::new(0);
        let res: Result<(), AppError> = exec
            .execute(Address::ZERO, "supply", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TxError::terminal("execution reverted")) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(refill.calls.load(Ordering::SeqCst), 0);
        match res {
            Err(AppError::RetriesExhausted { attempts, last, .. }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last.kind, TxErrorKind::Terminal);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn insufficient_funds_does_not_consume_attempts() {
        let (exec, refill) = executor(2, 3);
        let calls = AtomicUsize::new(0);
        let res = exec
            .execute(Address::ZERO, "borrow", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    match n {
                        0 | 1 => Err(TxError::insufficient_funds("insufficient funds for gas")),
                        2 => Err(TxError::transient("nonce too low")),
                        _ => Ok(42u32),
                    }
                }
            })
            .await;
        assert_eq!(res.unwrap(), 42);
        assert_eq!(refill.calls.load(Ordering::SeqCst), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn refills_past_the_cap_are_counted() {
        let (exec, refill) = executor(2, 1);
        let calls = AtomicUsize::new(0);
        let res: Result<(), AppError> = exec
            .execute(Address::ZERO, "repay", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TxError::insufficient_funds("insufficient funds")) }
            })
            .await;
        // 1 free refill, then 2 counted attempts.
        assert_eq!(refill.calls.load(Ordering::SeqCst), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(
            res,
            Err(AppError::RetriesExhausted { attempts: 2, .. })
        ));
    }

    #[test]
    fn policy_from_config_never_allows_zero_attempts() {
        let cfg = RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        };
        assert_eq!(RetryPolicy::from(&cfg).max_attempts, 1);
    }
}
