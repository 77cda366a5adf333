//! Request Coalescer - 同一指纹的合成请求单飞
//!
//! 首个调用方（leader）登记 InFlightCall 并在独立任务中执行 producer，
//! 期间到达的调用方（joined）订阅同一个 watch 通道等待结果。
//!
//! - producer 在独立 tokio 任务中运行，任何调用方放弃等待都不会取消它
//! - 结果广播后立即移除登记，InFlightCall 不会比它代表的那次调用活得更久
//! - 按 key 分片加锁（DashMap），不同 key 之间互不阻塞

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::watch;

use crate::domain::synthesis::SynthesisError;

/// producer 未产出结果就终止（panic 或运行时关闭）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("In-flight call ended without a result")]
pub struct InFlightAborted;

impl From<InFlightAborted> for SynthesisError {
    fn from(err: InFlightAborted) -> Self {
        SynthesisError::Internal(err.to_string())
    }
}

/// 调用方在本次调用中的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallRole {
    /// 发起了 producer
    Leader,
    /// 加入了已在进行中的调用
    Joined,
}

type ResultSlot<T, E> = Option<Result<T, E>>;

struct InFlightCall<T, E> {
    result: watch::Receiver<ResultSlot<T, E>>,
    waiters: Arc<AtomicUsize>,
    started_at: Instant,
}

/// Request Coalescer
pub struct RequestCoalescer<T, E> {
    in_flight: Arc<DashMap<String, InFlightCall<T, E>>>,
}

impl<T, E> RequestCoalescer<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<InFlightAborted> + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// 每个 key 同时至多一个 producer 在运行
    pub async fn run_exclusive<F, Fut>(&self, key: &str, producer: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.join_or_start(key, producer).await.0
    }

    /// 同 `run_exclusive`，额外返回调用方角色
    ///
    /// producer 只在成为 leader 时被调用
    pub async fn join_or_start<F, Fut>(&self, key: &str, producer: F) -> (Result<T, E>, CallRole)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (mut receiver, waiters, sender) = match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                let call = entry.get();
                call.waiters.fetch_add(1, Ordering::SeqCst);
                tracing::debug!(
                    key = %key,
                    waiters = call.waiters.load(Ordering::SeqCst),
                    in_flight_ms = call.started_at.elapsed().as_millis() as u64,
                    "Joined in-flight call"
                );
                (call.result.clone(), call.waiters.clone(), None)
            }
            Entry::Vacant(entry) => {
                let (sender, receiver) = watch::channel(None);
                let waiters = Arc::new(AtomicUsize::new(1));
                entry.insert(InFlightCall {
                    result: receiver.clone(),
                    waiters: waiters.clone(),
                    started_at: Instant::now(),
                });
                (receiver, waiters, Some(sender))
            }
        };

        // 分片锁已释放，再启动 producer
        let role = match sender {
            Some(sender) => {
                let work = producer();
                let cleanup = RemoveOnDrop {
                    in_flight: self.in_flight.clone(),
                    key: key.to_string(),
                };
                tokio::spawn(async move {
                    let _cleanup = cleanup;
                    let result = work.await;
                    // 所有等待者都已离开时发送失败，无需处理
                    let _ = sender.send(Some(result));
                });
                CallRole::Leader
            }
            None => CallRole::Joined,
        };

        let _waiter = WaiterGuard(waiters);
        let slot = match receiver.wait_for(Option::is_some).await {
            Ok(slot) => slot.clone(),
            Err(_) => None,
        };

        (slot.unwrap_or_else(|| Err(E::from(InFlightAborted))), role)
    }

    /// 当前等待某个 key 的调用方数量（含 leader）
    pub fn waiters(&self, key: &str) -> usize {
        self.in_flight
            .get(key)
            .map(|call| call.waiters.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// 进行中的调用数量
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }
}

impl<T, E> Default for RequestCoalescer<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<InFlightAborted> + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// producer 结束（包括 panic）后移除登记
struct RemoveOnDrop<T, E> {
    in_flight: Arc<DashMap<String, InFlightCall<T, E>>>,
    key: String,
}

impl<T, E> Drop for RemoveOnDrop<T, E> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.key);
    }
}

/// 调用方离开（完成或被取消）时减少等待计数
struct WaiterGuard(Arc<AtomicUsize>);

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
