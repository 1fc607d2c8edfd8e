//! Single-shot fan-in barriers over push channels.
//!
//! Both barriers buffer without backpressure and resolve exactly once, after
//! their upstream side has fully completed. They are aggregation state
//! machines, not general stream combinators: no partial emission, no reuse
//! after resolution.

use futures::future::poll_fn;
use serde_json::Value;
use std::task::Poll;
use tokio::sync::mpsc;

/// Collects every item a push channel emits, in arrival order, and resolves
/// with the full list once the channel closes.
///
/// Zero emitted items resolve to an empty list. `wait` consumes the barrier;
/// dropping it instead closes the receiver, which the paired senders observe
/// as a closed channel.
pub struct CollectBarrier<T> {
    rx: mpsc::Receiver<T>,
    buffered: Vec<T>,
}

impl<T> CollectBarrier<T> {
    pub fn new(rx: mpsc::Receiver<T>) -> Self {
        Self { rx, buffered: Vec::new() }
    }

    pub async fn wait(mut self) -> Vec<T> {
        while let Some(item) = self.rx.recv().await {
            self.buffered.push(item);
        }
        self.buffered
    }
}

struct FuseInput {
    rx: mpsc::Receiver<Value>,
    open: bool,
}

/// Deep-merges the items of K push channels into one accumulator and
/// resolves with it once every input has closed.
///
/// Each input is expected to emit one document, but any number is accepted;
/// later-arriving values win key collisions at every nesting level. An
/// input's close is counted exactly once, however often it is polled
/// afterwards. Dropping the barrier drops all receivers, so destruction
/// propagates to the upstream senders.
pub struct FuseBarrier {
    inputs: Vec<FuseInput>,
}

impl FuseBarrier {
    pub fn new(inputs: Vec<mpsc::Receiver<Value>>) -> Self {
        Self { inputs: inputs.into_iter().map(|rx| FuseInput { rx, open: true }).collect() }
    }

    pub async fn wait(self) -> Value {
        let mut inputs = self.inputs;
        let mut remaining = inputs.len();
        let mut accumulator = Value::Object(Default::default());

        poll_fn(move |cx| {
            for input in inputs.iter_mut().filter(|input| input.open) {
                loop {
                    match input.rx.poll_recv(cx) {
                        Poll::Ready(Some(item)) => {
                            accumulator = deep_merge(std::mem::take(&mut accumulator), item);
                        }
                        Poll::Ready(None) => {
                            input.open = false;
                            remaining -= 1;
                            break;
                        }
                        Poll::Pending => break,
                    }
                }
            }
            if remaining == 0 {
                Poll::Ready(std::mem::take(&mut accumulator))
            } else {
                Poll::Pending
            }
        })
        .await
    }
}

/// Recursive last-write-wins merge: objects combine key-by-key, any other
/// collision resolves to `incoming`. Arrays are replaced, not concatenated.
pub fn deep_merge(base: Value, incoming: Value) -> Value {
    match (base, incoming) {
        (Value::Object(mut base), Value::Object(incoming)) => {
            for (key, value) in incoming {
                let merged = match base.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, incoming) => incoming,
    }
}
