//! 事件子系统（eventing）
//!
//! - `EventBus`：类型擦除的发布/订阅协议，`EventBusExt` 提供类型化的 `publish`/`subscribe`；
//! - `OperationHandler`：总线订阅者协议，接收并转换 `Operation`；
//! - `LocalEventBus`：进程内直接派生任务的实现；
//! - `QueuedEventBus`：需先连接、经有界队列分发的实现。
//!
pub mod bus;
pub mod bus_local;
pub mod bus_queued;
pub mod handler;

pub use bus::{Delivery, EventBus, EventBusExt, Subscriber, SubscriberTable};
pub use bus_local::LocalEventBus;
pub use bus_queued::{QueuedEventBus, QueuedEventBusConfig};
pub use handler::OperationHandler;
