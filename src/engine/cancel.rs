// ==========================================
// 航次排产系统 - 生成请求取消令牌
// ==========================================
// 在承诺处理的间隙检查 (不做计算中途打断)
// ==========================================

use crate::engine::error::{EngineError, EngineResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// 带超时的令牌
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.map(|d| Instant::now() >= d).unwrap_or(false)
    }

    /// 已取消时返回 Cancelled
    pub fn check(&self, processed: usize) -> EngineResult<()> {
        if self.is_cancelled() {
            return Err(EngineError::Cancelled { processed });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(clone.check(0).is_ok());
        token.cancel();
        assert_eq!(clone.check(3), Err(EngineError::Cancelled { processed: 3 }));
    }

    #[test]
    fn test_expired_deadline() {
        let token = CancelToken::with_timeout(Duration::from_millis(0));
        assert!(token.is_cancelled());
    }
}
