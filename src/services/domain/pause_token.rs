/// 协作式暂停令牌
///
/// 各测试列在每个步骤执行前等待此闸门。环境中断（自动模式关闭等）
/// 通过暂停令牌让全部4列在各自的下一个检查点冻结，而不取消执行。
///
/// 基于 `tokio::sync::watch` 实现：等待方先检查当前值再挂起，
/// `pause`/`resume` 幂等且竞争安全（`resume` 不会被并发的 `pause` 吞掉）

use log::debug;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct PauseTokenSource {
    paused: Arc<watch::Sender<bool>>,
}

impl PauseTokenSource {
    /// 创建新的暂停令牌（初始为未暂停）
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { paused: Arc::new(tx) }
    }

    /// 当前是否处于暂停状态
    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    /// 暂停（幂等）
    pub fn pause(&self) {
        let was_paused = self.paused.send_replace(true);
        if !was_paused {
            debug!("[PauseToken] 已暂停");
        }
    }

    /// 恢复（幂等）
    pub fn resume(&self) {
        let was_paused = self.paused.send_replace(false);
        if was_paused {
            debug!("[PauseToken] 已恢复");
        }
    }

    /// 暂停期间挂起，未暂停时立即返回
    ///
    /// 取消令牌触发时同样返回（调用方通过 `ct.is_cancelled()` 区分），
    /// 取消不会隐式恢复暂停状态
    pub async fn wait_while_paused(&self, ct: &CancellationToken) {
        if !*self.paused.borrow() {
            return;
        }

        let mut rx = self.paused.subscribe();
        tokio::select! {
            _ = ct.cancelled() => {}
            result = rx.wait_for(|paused| !*paused) => {
                // 发送端由self持有，通道不会在等待期间关闭
                let _ = result;
            }
        }
    }
}

impl Default for PauseTokenSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// 未暂停时等待立即返回
    #[tokio::test]
    async fn test_wait_returns_immediately_when_not_paused() {
        let token = PauseTokenSource::new();
        let ct = CancellationToken::new();
        tokio::time::timeout(Duration::from_millis(50), token.wait_while_paused(&ct))
            .await
            .unwrap();
    }

    /// 暂停阻塞等待方，恢复后放行
    #[tokio::test]
    async fn test_pause_blocks_until_resume() {
        let token = PauseTokenSource::new();
        let ct = CancellationToken::new();
        token.pause();
        assert!(token.is_paused());

        let waiter = {
            let token = token.clone();
            let ct = ct.clone();
            tokio::spawn(async move { token.wait_while_paused(&ct).await })
        };

        // 等待方应保持挂起
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        token.resume();
        tokio::time::timeout(Duration::from_millis(100), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    /// pause/resume 幂等，resume 不被竞争的 pause 丢失
    #[tokio::test]
    async fn test_pause_resume_idempotent() {
        let token = PauseTokenSource::new();
        token.pause();
        token.pause();
        token.resume();
        token.resume();
        assert!(!token.is_paused());

        let ct = CancellationToken::new();
        tokio::time::timeout(Duration::from_millis(50), token.wait_while_paused(&ct))
            .await
            .unwrap();
    }

    /// 取消令牌触发时等待返回，且不改变暂停状态
    #[tokio::test]
    async fn test_cancellation_releases_wait_without_resuming() {
        let token = PauseTokenSource::new();
        let ct = CancellationToken::new();
        token.pause();

        let waiter = {
            let token = token.clone();
            let ct = ct.clone();
            tokio::spawn(async move { token.wait_while_paused(&ct).await })
        };

        ct.cancel();
        tokio::time::timeout(Duration::from_millis(100), waiter)
            .await
            .unwrap()
            .unwrap();
        // 取消不会隐式恢复
        assert!(token.is_paused());
    }
}
