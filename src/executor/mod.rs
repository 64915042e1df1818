//! Worker Pool Module
//!
//! Bounded pools that isolate CPU-bound checks from IO-bound heavy steps, so a slow store or
//! masking engine cannot starve validation and neither can block a consumer listener.
//!
//! ## Pool Lifecycle
//! 1. **Start**: `core_workers` workers are spawned with the pool and live until shutdown.
//! 2. **Grow**: a submission that finds the queue full adds a worker, up to `max_workers`.
//! 3. **Reject**: with the queue full at `max_workers`, the submission fails immediately.
//! 4. **Shrink**: extra workers exit after `keep_alive_ms` without work.
//!
//! ## Submodules
//! - **`pool`**: the `WorkerPool` itself.
//! - **`types`**: `PoolKind` and `PoolSettings`.

pub mod pool;
pub mod types;
