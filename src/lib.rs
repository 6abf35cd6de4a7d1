//! Brain Dump Bot — Telegram messages in, categorized Notion pages out.

pub mod categorize;
pub mod channels;
pub mod config;
pub mod error;
pub mod llm;
pub mod routing;
pub mod store;
pub mod webhook;
