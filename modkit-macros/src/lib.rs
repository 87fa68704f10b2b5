//! 事件载荷属性宏
//!
//! - `#[command]`：声明命令事件载荷；
//! - `#[domain_event]`：声明领域事件载荷；
//! - `#[integration_event]`：声明集成事件载荷。
//!
//! 三者均会补齐 `Debug, Clone, serde::Serialize, serde::Deserialize` 派生，
//! 并实现 `::modkit_domain::event::EventPayload`。支持参数 `name = "..."`
//! 指定稳定名称，缺省为类型名的 snake_case。
//!
//! ```rust,ignore
//! #[command(name = "notes.create")]
//! struct CreateNote {
//!     title: String,
//!     content: String,
//! }
//! ```
use proc_macro::TokenStream;

mod derive_utils;
mod event_payload;

use event_payload::Kind;

#[proc_macro_attribute]
pub fn command(attr: TokenStream, item: TokenStream) -> TokenStream {
    event_payload::expand(Kind::Command, attr, item)
}

#[proc_macro_attribute]
pub fn domain_event(attr: TokenStream, item: TokenStream) -> TokenStream {
    event_payload::expand(Kind::Domain, attr, item)
}

#[proc_macro_attribute]
pub fn integration_event(attr: TokenStream, item: TokenStream) -> TokenStream {
    event_payload::expand(Kind::Integration, attr, item)
}
